// proxy module - cookie-session relay in front of the calculator API

pub mod config;
pub mod handlers; // Relay endpoint handlers
pub mod middleware; // Axum middleware
pub mod relay; // Operation table and relay driver
pub mod server;
pub mod session; // Token cookie store
pub mod static_files; // SPA fallback
pub mod upstream; // Upstream client

pub use config::RelayConfig;
pub use server::{build_router, AxumServer};
