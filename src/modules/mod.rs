pub mod config;
pub mod logger;

// Re-export commonly used functions at the modules namespace top level
pub use config::{apply_env_overrides, load_app_config, CONFIG_PATH_ENV};
pub use logger::init_logger;
