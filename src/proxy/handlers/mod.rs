// Handlers module - relay endpoint handlers
// Each handler validates its input, then hands off to the shared relay driver

pub mod auth;
pub mod calculator;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::error::RelayError;
use crate::proxy::relay::{self, RelayRequest};
use crate::proxy::server::AppState;
use crate::proxy::session::TokenCookieStore;

/// Read the session, relay, then apply rotation to the outbound cookies.
async fn forward(
    state: &AppState,
    jar: CookieJar,
    request: RelayRequest,
) -> Result<Response, RelayError> {
    let store = TokenCookieStore::new(jar, state.cookies.clone());
    let session = store.read();

    let outcome = relay::relay(&state.upstream, &session, request).await?;

    let jar = store.write(outcome.rotation);
    Ok(match outcome.body {
        Some(body) => (jar, Json(body)).into_response(),
        None => (jar, StatusCode::NO_CONTENT).into_response(),
    })
}
