// Route relay
// One table row per operation; a single driver forwards them all

use bytes::Bytes;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::RelayError;
use crate::models::{CalculateRequest, Credentials, ListExpressionsQuery, LoginTokens};
use crate::proxy::session::{Rotation, Session};
use crate::proxy::upstream::client::{UpstreamClient, UpstreamResponse};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Register,
    Login,
    Authorize,
    Calculate,
    ListExpressions,
    GetExpression,
}

/// Where a successful call takes its new tokens from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationSource {
    None,
    /// `access_token` / `refresh_token` fields of the response body
    Body,
    /// `Access-Token` / `Refresh-Token` response headers
    Headers,
}

/// What the relay answers with on success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `204 No Content`
    Empty,
    /// JSON object restricted to these top-level fields of the upstream body
    Fields(&'static [&'static str]),
}

#[derive(Debug, Clone)]
pub struct RouteSpec {
    pub method: Method,
    /// Upstream path, relative to the backend API prefix. `{name}` marks a
    /// path parameter.
    pub path: &'static str,
    pub credentialed: bool,
    pub rotation: RotationSource,
    pub shape: ResponseShape,
}

impl Operation {
    pub fn route(self) -> RouteSpec {
        let (method, path, credentialed, rotation, shape) = match self {
            Self::Register => (
                Method::POST,
                "/register",
                false,
                RotationSource::None,
                ResponseShape::Empty,
            ),
            Self::Login => (
                Method::POST,
                "/login",
                false,
                RotationSource::Body,
                ResponseShape::Empty,
            ),
            Self::Authorize => (
                Method::GET,
                "/authorize",
                true,
                RotationSource::None,
                ResponseShape::Fields(&["user_id", "username"]),
            ),
            Self::Calculate => (
                Method::POST,
                "/calculate",
                true,
                RotationSource::Headers,
                ResponseShape::Fields(&["id"]),
            ),
            Self::ListExpressions => (
                Method::GET,
                "/expressions",
                true,
                RotationSource::Headers,
                ResponseShape::Fields(&["expressions"]),
            ),
            Self::GetExpression => (
                Method::GET,
                "/expressions/{id}",
                true,
                RotationSource::Headers,
                ResponseShape::Fields(&["expression"]),
            ),
        };
        RouteSpec {
            method,
            path,
            credentialed,
            rotation,
            shape,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::Login => "login",
            Self::Authorize => "authorize",
            Self::Calculate => "calculate",
            Self::ListExpressions => "list_expressions",
            Self::GetExpression => "get_expression",
        }
    }
}

/// A validated inbound call, ready to be forwarded.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub operation: Operation,
    pub path_params: Vec<(&'static str, String)>,
    /// Only parameters that were actually supplied, in upstream order
    pub query: Vec<(&'static str, String)>,
    pub body: Option<Value>,
}

impl RelayRequest {
    fn new(operation: Operation) -> Self {
        Self {
            operation,
            path_params: Vec::new(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn register(body: &[u8]) -> Result<Self, RelayError> {
        let credentials: Credentials = parse_body(body)?;
        Self::new(Operation::Register).with_body(&credentials)
    }

    pub fn login(body: &[u8]) -> Result<Self, RelayError> {
        let credentials: Credentials = parse_body(body)?;
        Self::new(Operation::Login).with_body(&credentials)
    }

    pub fn authorize() -> Self {
        Self::new(Operation::Authorize)
    }

    pub fn calculate(body: &[u8]) -> Result<Self, RelayError> {
        let request: CalculateRequest = parse_body(body)?;
        Self::new(Operation::Calculate).with_body(&request)
    }

    /// Empty `cursor` / `limit` values are treated as not supplied.
    pub fn list_expressions(query: ListExpressionsQuery) -> Result<Self, RelayError> {
        let mut request = Self::new(Operation::ListExpressions);

        if let Some(cursor) = query.cursor.filter(|c| !c.is_empty()) {
            request.query.push(("cursor", cursor));
        }
        if let Some(limit) = query.limit.filter(|l| !l.is_empty()) {
            let limit: u64 = limit
                .trim()
                .parse()
                .map_err(|_| RelayError::Validation(format!("limit must be a number: {}", limit)))?;
            request.query.push(("limit", limit.to_string()));
        }

        Ok(request)
    }

    pub fn get_expression(id: String) -> Result<Self, RelayError> {
        if id.is_empty() {
            return Err(RelayError::Validation("expression id is empty".into()));
        }
        // A dot segment would be resolved away by the upstream URL parser
        if id == "." || id == ".." {
            return Err(RelayError::Validation("invalid expression id".into()));
        }
        let mut request = Self::new(Operation::GetExpression);
        request.path_params.push(("id", id));
        Ok(request)
    }

    fn with_body<T: serde::Serialize>(mut self, body: &T) -> Result<Self, RelayError> {
        let value =
            serde_json::to_value(body).map_err(|e| RelayError::Validation(e.to_string()))?;
        self.body = Some(value);
        Ok(self)
    }
}

fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, RelayError> {
    serde_json::from_slice(body).map_err(|e| RelayError::Validation(e.to_string()))
}

/// Result of a successful relay: cookie changes plus the shaped body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelayOutcome {
    pub rotation: Rotation,
    /// `None` for operations answering `204 No Content`
    pub body: Option<Value>,
}

/// Forward one validated request and compute the session changes.
///
/// No cookie is touched here: the caller applies `RelayOutcome::rotation`
/// once this returns `Ok`, so every failure leaves the session unchanged.
pub async fn relay(
    upstream: &UpstreamClient,
    session: &Session,
    request: RelayRequest,
) -> Result<RelayOutcome, RelayError> {
    let operation = request.operation;
    let route = operation.route();

    if route.credentialed && !session.has_refresh_token() {
        debug!(
            operation = operation.name(),
            "Rejected: no refresh token in session"
        );
        return Err(RelayError::Unauthorized);
    }

    let response = upstream.call(&route, &request, session).await.map_err(|e| {
        warn!(operation = operation.name(), status = %e.status(), "Relay failed: {}", e);
        e
    })?;

    let rotation = match route.rotation {
        RotationSource::None => Rotation::default(),
        RotationSource::Headers => response.rotation.clone(),
        RotationSource::Body => {
            let tokens: LoginTokens = decode_json(operation, &response.body)?;
            Rotation {
                access_token: Some(tokens.access_token),
                refresh_token: Some(tokens.refresh_token),
            }
        }
    };

    let body = shape_body(operation, route.shape, &response)?;

    if !rotation.is_empty() {
        debug!(
            operation = operation.name(),
            access = rotation.access_token.is_some(),
            refresh = rotation.refresh_token.is_some(),
            "Rotating session tokens"
        );
    }

    Ok(RelayOutcome { rotation, body })
}

fn shape_body(
    operation: Operation,
    shape: ResponseShape,
    response: &UpstreamResponse,
) -> Result<Option<Value>, RelayError> {
    match shape {
        ResponseShape::Empty => Ok(None),
        ResponseShape::Fields(fields) => {
            let mut upstream: Map<String, Value> = decode_json(operation, &response.body)?;
            let mut shaped = Map::with_capacity(fields.len());
            for field in fields {
                let value = upstream.remove(*field).ok_or_else(|| {
                    RelayError::Transport(format!(
                        "{} response is missing field `{}`",
                        operation.name(),
                        field
                    ))
                })?;
                shaped.insert((*field).to_string(), value);
            }
            Ok(Some(Value::Object(shaped)))
        }
    }
}

fn decode_json<T: DeserializeOwned>(operation: Operation, body: &Bytes) -> Result<T, RelayError> {
    serde_json::from_slice(body).map_err(|e| {
        RelayError::Transport(format!(
            "{} response is not valid JSON: {}",
            operation.name(),
            e
        ))
    })
}
