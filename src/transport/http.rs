use super::{HttpRequest, ResponseHead, ResponseHeaders, Transport, TransportError, TransportOutcome};
use crate::request::HttpMethod;
use crate::{Error, Result};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use reqwest::{Method, Proxy};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Transport settings; `from_env` mirrors the `NETKIT_*` knobs.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct HttpTransportConfig {
    pub timeout_secs: u64,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout_secs: u64,
    pub proxy_url: Option<String>,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            pool_max_idle_per_host: 32,
            pool_idle_timeout_secs: 90,
            proxy_url: None,
        }
    }
}

impl HttpTransportConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout_secs: env_parse("NETKIT_HTTP_TIMEOUT_SECS").unwrap_or(defaults.timeout_secs),
            pool_max_idle_per_host: env_parse("NETKIT_HTTP_POOL_MAX_IDLE_PER_HOST")
                .unwrap_or(defaults.pool_max_idle_per_host),
            pool_idle_timeout_secs: env_parse("NETKIT_HTTP_POOL_IDLE_TIMEOUT_SECS")
                .unwrap_or(defaults.pool_idle_timeout_secs),
            proxy_url: env::var("NETKIT_PROXY_URL").ok(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|s| s.parse::<T>().ok())
}

/// reqwest-backed [`Transport`].
///
/// `cancel_all` cancels the current token and installs a fresh one, so calls
/// issued afterwards are unaffected.
pub struct HttpTransport {
    client: reqwest::Client,
    cancel: ArcSwap<CancellationToken>,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_config(&HttpTransportConfig::from_env())
    }

    pub fn with_config(config: &HttpTransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(Duration::from_secs(config.pool_idle_timeout_secs)))
            .http2_adaptive_window(true)
            .http2_keep_alive_interval(Some(Duration::from_secs(30)))
            .http2_keep_alive_timeout(Duration::from_secs(10));

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|_| Error::invalid_url(proxy_url.clone()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(Error::unknown)?;
        Ok(Self::from_client(client))
    }

    /// Wraps an already configured reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self {
            client,
            cancel: ArcSwap::from_pointee(CancellationToken::new()),
        }
    }

    async fn execute(&self, request: HttpRequest) -> std::result::Result<(ResponseHead, bytes::Bytes), reqwest::Error> {
        let response = self
            .client
            .request(to_reqwest_method(request.method), request.url)
            .headers(request.headers)
            .timeout(request.timeout)
            .body(request.body.unwrap_or_default())
            .send()
            .await?;

        let head = ResponseHead {
            status: response.status().as_u16(),
            headers: ResponseHeaders::from(response.headers()),
        };
        let body = response.bytes().await?;
        Ok((head, body))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send_request(&self, request: HttpRequest) -> TransportOutcome {
        let token = self.cancel.load_full();
        let method = request.method;
        let url = request.url.to_string();

        tokio::select! {
            _ = token.cancelled() => {
                debug!(method = %method, url = %url, "transport request cancelled");
                TransportOutcome::failed(TransportError::Cancelled)
            }
            result = self.execute(request) => match result {
                Ok((head, body)) => TransportOutcome {
                    body: Some(body),
                    head: Some(head),
                    error: None,
                },
                Err(e) => {
                    debug!(method = %method, url = %url, error = %e, "transport request failed");
                    TransportOutcome {
                        body: None,
                        head: e.status().map(|s| ResponseHead {
                            status: s.as_u16(),
                            headers: ResponseHeaders::default(),
                        }),
                        error: Some(TransportError::from(&e)),
                    }
                }
            }
        }
    }

    async fn cancel_all(&self) {
        let previous = self.cancel.swap(Arc::new(CancellationToken::new()));
        previous.cancel();
    }
}

fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
        HttpMethod::Head => Method::HEAD,
        HttpMethod::Patch => Method::PATCH,
    }
}

impl From<&reqwest::Error> for TransportError {
    fn from(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::TimedOut
        } else if e.is_connect() {
            TransportError::NotConnected
        } else {
            TransportError::Other(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = HttpTransportConfig::default();
        assert_eq!(config.timeout_secs, 60);
        assert_eq!(config.pool_max_idle_per_host, 32);
        assert_eq!(config.pool_idle_timeout_secs, 90);
        assert!(config.proxy_url.is_none());
    }

    #[test]
    fn test_invalid_proxy_is_rejected() {
        let config = HttpTransportConfig {
            proxy_url: Some("::not a proxy::".into()),
            ..Default::default()
        };
        assert!(matches!(
            HttpTransport::with_config(&config),
            Err(Error::InvalidUrl { .. })
        ));
    }
}
