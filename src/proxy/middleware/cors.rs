// CORS middleware
use tower_http::cors::{Any, CorsLayer};

/// Permissive CORS for development setups where the UI is served from
/// another origin. Cookies still require a same-origin deployment.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}
