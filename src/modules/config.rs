use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::models::AppConfig;

/// Environment variable naming an optional JSON config file
pub const CONFIG_PATH_ENV: &str = "CALC_BFF_CONFIG";

/// Load application config
///
/// A missing file yields defaults. Environment variables are applied on top:
/// `PORT`, `BACKEND_HOST`, `BACKEND_PORT`, `STATIC_DIR`, `LOG_DIR`.
pub fn load_app_config(path: Option<&Path>) -> AppResult<AppConfig> {
    let mut config = match path {
        Some(path) if path.exists() => {
            let content = fs::read_to_string(path).map_err(|e| {
                AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
            })?;
            serde_json::from_str(&content).map_err(|e| {
                AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            })?
        }
        Some(path) => {
            tracing::warn!("Config file {:?} not found, using defaults", path);
            AppConfig::default()
        }
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> AppResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = non_empty("PORT") {
        config.proxy.port = parse_port("PORT", &port)?;
    }
    if let Some(host) = non_empty("BACKEND_HOST") {
        config.proxy.backend.host = host;
    }
    if let Some(port) = non_empty("BACKEND_PORT") {
        config.proxy.backend.port = parse_port("BACKEND_PORT", &port)?;
    }
    if let Some(dir) = non_empty("STATIC_DIR") {
        config.proxy.static_dir = PathBuf::from(dir);
    }
    if let Some(dir) = non_empty("LOG_DIR") {
        config.logging.dir = Some(PathBuf::from(dir));
    }

    Ok(())
}

fn parse_port(key: &str, value: &str) -> AppResult<u16> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{} is not a valid port: {}", key, value)))
}
