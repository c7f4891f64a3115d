//! JSON contract between the web UI, the relay and the upstream API.
//!
//! The relay only deserializes the inbound request types and [`LoginTokens`].
//! Everything upstream returns on credentialed calls is forwarded as opaque
//! JSON; the response types below document that payload for clients.

use serde::{Deserialize, Serialize};

/// Body of `register` and `login`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

/// Body of `calculate`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalculateRequest {
    pub expression: String,
}

/// Raw query of the expression listing. `limit` is kept as text here and
/// checked by the relay so a bad value becomes a validation error.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListExpressionsQuery {
    pub cursor: Option<String>,
    pub limit: Option<String>,
}

/// Token pair returned by the upstream `login` endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExpressionStatus {
    Pending,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Expression {
    pub id: String,
    pub status: ExpressionStatus,
    pub result: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorizeResponse {
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CalculateResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpressionsResponse {
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExpressionResponse {
    pub expression: Expression,
}
