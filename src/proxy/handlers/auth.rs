// Auth handlers: register, login, authorize
use axum::{body::Bytes, extract::State, response::Response};
use axum_extra::extract::cookie::CookieJar;

use super::forward;
use crate::error::RelayError;
use crate::proxy::relay::RelayRequest;
use crate::proxy::server::AppState;

/// `POST /register` - no session involved, `204` on success
pub async fn handle_register(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<Response, RelayError> {
    let request = RelayRequest::register(&body)?;
    forward(&state, jar, request).await
}

/// `POST /login` - sets both session cookies from the upstream body
pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<Response, RelayError> {
    let request = RelayRequest::login(&body)?;
    forward(&state, jar, request).await
}

/// `GET /authorize` - `{user_id, username}` of the session owner
pub async fn handle_authorize(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Response, RelayError> {
    forward(&state, jar, RelayRequest::authorize()).await
}
