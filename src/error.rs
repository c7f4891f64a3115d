use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to bind address {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

pub type AppResult<T> = Result<T, AppError>;

/// Failure of a single relay invocation.
///
/// Every variant is raised before any cookie mutation is applied, so turning
/// one into a response never carries a `Set-Cookie` header.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Inbound body or query does not have the operation's required shape.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Credentialed operation attempted without a refresh token.
    #[error("Missing refresh token")]
    Unauthorized,

    /// Upstream answered with a non-2xx status.
    #[error("Upstream responded with {0}")]
    Upstream(StatusCode),

    /// Upstream unreachable, timed out, or answered with an unusable body.
    #[error("Upstream transport error: {0}")]
    Transport(String),
}

impl RelayError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Upstream(status) => *status,
            Self::Transport(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Validation(msg) => msg,
            // Upstream and transport details stay in the log
            _ => status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string(),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
