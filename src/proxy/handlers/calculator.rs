// Calculator handlers: calculate, list expressions, get expression
use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use super::forward;
use crate::error::RelayError;
use crate::models::ListExpressionsQuery;
use crate::proxy::relay::RelayRequest;
use crate::proxy::server::AppState;

/// `POST /calculate` - `{expression}` in, `{id}` out
pub async fn handle_calculate(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Bytes,
) -> Result<Response, RelayError> {
    let request = RelayRequest::calculate(&body)?;
    forward(&state, jar, request).await
}

/// `GET /expressions?cursor=&limit=`
pub async fn handle_list_expressions(
    State(state): State<AppState>,
    jar: CookieJar,
    query: Result<Query<ListExpressionsQuery>, QueryRejection>,
) -> Result<Response, RelayError> {
    let Query(query) = query.map_err(|e| RelayError::Validation(e.body_text()))?;
    let request = RelayRequest::list_expressions(query)?;
    forward(&state, jar, request).await
}

/// `GET /expressions/:id`
pub async fn handle_get_expression(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(id): Path<String>,
) -> Result<Response, RelayError> {
    let request = RelayRequest::get_expression(id)?;
    forward(&state, jar, request).await
}
