use reqwest::{redirect, Client, Proxy};

use crate::error::AppResult;
use crate::proxy::config::UpstreamProxyConfig;

/// Create the backend HTTP client
///
/// Redirects are never followed automatically; the forwarder handles them so
/// that `Authorization` and the body survive the hop.
pub fn create_client_with_proxy(
    timeout_secs: Option<u64>,
    proxy_config: Option<&UpstreamProxyConfig>,
) -> AppResult<Client> {
    let mut builder = Client::builder().redirect(redirect::Policy::none());

    if let Some(secs) = timeout_secs {
        builder = builder.timeout(std::time::Duration::from_secs(secs));
    }

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
