// Upstream client implementation
// Translates a cookie session into bearer / refresh headers for the upstream API

use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{header, Client, StatusCode};
use tracing::debug;

use crate::error::{AppResult, RelayError};
use crate::proxy::config::{BackendConfig, UpstreamProxyConfig};
use crate::proxy::relay::{RelayRequest, RouteSpec};
use crate::proxy::session::{Rotation, Session, REFRESH_TOKEN_HEADER};

/// Characters escaped when a value is placed into one path segment
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Successful upstream answer
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub body: Bytes,
    pub rotation: Rotation,
}

pub struct UpstreamClient {
    http_client: Client,
    base_url: String,
}

impl UpstreamClient {
    pub fn new(
        backend: &BackendConfig,
        timeout_secs: u64,
        proxy_config: Option<UpstreamProxyConfig>,
    ) -> AppResult<Self> {
        let http_client = crate::utils::http::create_client_with_proxy(timeout_secs, proxy_config)?;
        let base_url = backend.base_url();
        tracing::info!("UpstreamClient targeting {}", base_url);

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Build upstream URL
    ///
    /// Each path parameter is encoded as a single segment, so it can never
    /// add segments or a query. Only supplied query parameters are appended,
    /// so there is never a bare `?`.
    pub fn build_url(&self, route: &RouteSpec, request: &RelayRequest) -> String {
        let mut path = route.path.to_string();
        for (name, value) in &request.path_params {
            let segment = utf8_percent_encode(value, PATH_SEGMENT).to_string();
            path = path.replace(&format!("{{{}}}", name), &segment);
        }

        let mut url = format!("{}{}", self.base_url, path);
        for (i, (name, value)) in request.query.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(name);
            url.push('=');
            url.extend(url::form_urlencoded::byte_serialize(value.as_bytes()));
        }
        url
    }

    /// Build request headers. Credentials are attached for credentialed
    /// routes only; an absent access token leaves `Authorization` off so the
    /// upstream falls back to the refresh token.
    pub fn build_headers(
        route: &RouteSpec,
        session: &Session,
        has_body: bool,
    ) -> Result<header::HeaderMap, RelayError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        if has_body {
            headers.insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("application/json"),
            );
        }

        if route.credentialed {
            if let Some(access) = &session.access_token {
                headers.insert(
                    header::AUTHORIZATION,
                    header::HeaderValue::from_str(&format!("Bearer {}", access))
                        .map_err(|e| RelayError::Transport(format!("Invalid access token: {}", e)))?,
                );
            }
            if let Some(refresh) = &session.refresh_token {
                headers.insert(
                    REFRESH_TOKEN_HEADER,
                    header::HeaderValue::from_str(refresh).map_err(|e| {
                        RelayError::Transport(format!("Invalid refresh token: {}", e))
                    })?,
                );
            }
        }

        Ok(headers)
    }

    /// Call the upstream API
    ///
    /// Non-2xx answers become `RelayError::Upstream` carrying the same status;
    /// their body is never read.
    pub async fn call(
        &self,
        route: &RouteSpec,
        request: &RelayRequest,
        session: &Session,
    ) -> Result<UpstreamResponse, RelayError> {
        let url = self.build_url(route, request);
        let headers = Self::build_headers(route, session, request.body.is_some())?;

        let mut builder = self
            .http_client
            .request(route.method.clone(), &url)
            .headers(headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| RelayError::Transport(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        debug!("Upstream {} {} -> {}", route.method, url, status);

        if !status.is_success() {
            return Err(RelayError::Upstream(status));
        }

        let rotation = Rotation::from_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| RelayError::Transport(format!("Read body failed: {}", e)))?;

        Ok(UpstreamResponse {
            status,
            body,
            rotation,
        })
    }
}
