// Token cookie store
// Typed view over the `access_token` / `refresh_token` cookies

use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::proxy::config::{CookieConfig, SameSitePolicy};

pub const ACCESS_TOKEN_COOKIE: &str = "access_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

/// Upstream response headers carrying rotated tokens
pub const ACCESS_TOKEN_HEADER: &str = "access-token";
pub const REFRESH_TOKEN_HEADER: &str = "refresh-token";

/// Authentication state of one browser client, read at request start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}

/// Pending token replacement. `None` means "leave the cookie as it is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Rotation {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Rotation {
    /// Read `Access-Token` / `Refresh-Token` from upstream response headers.
    /// Header names are matched case-insensitively by `HeaderMap`.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let read = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        Self {
            access_token: read(ACCESS_TOKEN_HEADER),
            refresh_token: read(REFRESH_TOKEN_HEADER),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Cookie-backed session storage for a single request/response cycle.
pub struct TokenCookieStore {
    jar: CookieJar,
    settings: CookieConfig,
}

impl TokenCookieStore {
    pub fn new(jar: CookieJar, settings: CookieConfig) -> Self {
        Self { jar, settings }
    }

    /// Current session. Empty cookie values count as absent.
    pub fn read(&self) -> Session {
        Session {
            access_token: self.value(ACCESS_TOKEN_COOKIE),
            refresh_token: self.value(REFRESH_TOKEN_COOKIE),
        }
    }

    /// Set the provided tokens, leaving the others untouched, and hand back
    /// the jar to be attached to the outbound response.
    pub fn write(self, rotation: Rotation) -> CookieJar {
        let Self { mut jar, settings } = self;
        if let Some(token) = rotation.access_token {
            jar = jar.add(token_cookie(ACCESS_TOKEN_COOKIE, token, &settings));
        }
        if let Some(token) = rotation.refresh_token {
            jar = jar.add(token_cookie(REFRESH_TOKEN_COOKIE, token, &settings));
        }
        jar
    }

    fn value(&self, name: &str) -> Option<String> {
        self.jar
            .get(name)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
    }
}

fn token_cookie(name: &'static str, value: String, settings: &CookieConfig) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(settings.secure)
        .same_site(same_site(settings.same_site))
        .path(settings.path.clone())
        .build()
}

fn same_site(policy: SameSitePolicy) -> SameSite {
    match policy {
        SameSitePolicy::Strict => SameSite::Strict,
        SameSitePolicy::Lax => SameSite::Lax,
        SameSitePolicy::None => SameSite::None,
    }
}
