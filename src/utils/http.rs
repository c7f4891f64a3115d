use crate::error::AppResult;
use crate::proxy::config::UpstreamProxyConfig;
use reqwest::{Client, Proxy};

const USER_AGENT: &str = concat!("calc-bff/", env!("CARGO_PKG_VERSION"));

/// Create an HTTP client with specified proxy configuration
pub fn create_client_with_proxy(
    timeout_secs: u64,
    proxy_config: Option<UpstreamProxyConfig>,
) -> AppResult<Client> {
    let mut builder = Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT);

    if let Some(config) = proxy_config {
        if config.enabled && !config.url.is_empty() {
            match Proxy::all(&config.url) {
                Ok(proxy) => {
                    builder = builder.proxy(proxy);
                    tracing::info!("HTTP client upstream proxy enabled: {}", config.url);
                }
                Err(e) => {
                    tracing::error!("Invalid proxy address: {}, error: {}", config.url, e);
                }
            }
        }
    }

    Ok(builder.build()?)
}
