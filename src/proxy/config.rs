use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Relay service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Whether to allow LAN access
    /// - false: local access only 127.0.0.1 (default)
    /// - true: listen on 0.0.0.0
    #[serde(default)]
    pub allow_lan_access: bool,

    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Prefix the relay routes are mounted under
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,

    /// Upstream API location
    #[serde(default)]
    pub backend: BackendConfig,

    /// Upstream request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Outbound proxy for upstream calls
    #[serde(default)]
    pub upstream_proxy: UpstreamProxyConfig,

    /// Attributes of the session cookies
    #[serde(default)]
    pub cookies: CookieConfig,

    /// Directory holding the built web UI
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// Document served when no static file matches
    #[serde(default = "default_fallback_document")]
    pub fallback_document: String,
}

/// Upstream API location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_scheme")]
    pub scheme: String,
    #[serde(default = "default_backend_host")]
    pub host: String,
    #[serde(default = "default_backend_port")]
    pub port: u16,
    /// Path prefix of the upstream API, e.g. `/api/v1`
    #[serde(default = "default_backend_prefix")]
    pub api_prefix: String,
}

/// Upstream proxy configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpstreamProxyConfig {
    /// Whether enabled
    pub enabled: bool,
    /// Proxy address (http://, https://, socks5://)
    pub url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SameSitePolicy {
    Strict,
    #[default]
    Lax,
    None,
}

/// Session cookie attributes. `HttpOnly` is always set and not configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieConfig {
    /// Send cookies only over HTTPS
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: SameSitePolicy,
    #[serde(default = "default_cookie_path")]
    pub path: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            allow_lan_access: false,
            port: default_port(),
            api_prefix: default_api_prefix(),
            backend: BackendConfig::default(),
            request_timeout: default_request_timeout(),
            upstream_proxy: UpstreamProxyConfig::default(),
            cookies: CookieConfig::default(),
            static_dir: default_static_dir(),
            fallback_document: default_fallback_document(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            scheme: default_backend_scheme(),
            host: default_backend_host(),
            port: default_backend_port(),
            api_prefix: default_backend_prefix(),
        }
    }
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            secure: false,
            same_site: SameSitePolicy::default(),
            path: default_cookie_path(),
        }
    }
}

fn default_port() -> u16 {
    3000
}

fn default_api_prefix() -> String {
    "/bff/api/v1".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./.dist")
}

fn default_fallback_document() -> String {
    "index.html".to_string()
}

fn default_backend_scheme() -> String {
    "http".to_string()
}

fn default_backend_host() -> String {
    "localhost".to_string()
}

fn default_backend_port() -> u16 {
    8080
}

fn default_backend_prefix() -> String {
    "/api/v1".to_string()
}

fn default_cookie_path() -> String {
    "/".to_string()
}

impl RelayConfig {
    /// Get the actual listening address
    /// - allow_lan_access = false: returns "127.0.0.1"
    /// - allow_lan_access = true: returns "0.0.0.0"
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    /// Relay mount point without a trailing slash. Empty means the root.
    pub fn normalized_api_prefix(&self) -> String {
        normalize_prefix(&self.api_prefix)
    }
}

impl BackendConfig {
    /// Base URL every upstream path template is appended to
    pub fn base_url(&self) -> String {
        format!(
            "{}://{}:{}{}",
            self.scheme,
            self.host,
            self.port,
            normalize_prefix(&self.api_prefix)
        )
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
