//! 传输层抽象：发送已构建的请求，返回原始结果（body、响应头、传输错误）。
//!
//! Transport boundary.
//!
//! The client core never talks to the network directly; it hands a fully built
//! [`HttpRequest`] to a [`Transport`] and receives a [`TransportOutcome`] that may
//! carry a body, a response head, a transport error, or any combination. The
//! interception pipeline decides what that triple means.
//!
//! | Item | Role |
//! |------|------|
//! | [`Transport`] | `send_request` + `cancel_all` capability |
//! | [`HttpTransport`] | reqwest-backed implementation |
//! | [`HttpRequest`] | Built request (method, URL, headers, body, timeout, priority) |
//! | [`TransportOutcome`] | Raw `(body, head, error)` result |
//! | [`ResponseHeaders`] | Lower-cased, case-insensitive header map |

pub mod http;

pub use http::HttpTransport;

use crate::request::encoding::encoder_for;
use crate::request::{Endpoint, HttpMethod};
use crate::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CACHE_CONTROL};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Response headers with names normalized to lower case.
///
/// Repeated headers are folded into one comma-separated value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseHeaders(BTreeMap<String, String>);

impl ResponseHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        let name = name.as_ref().to_ascii_lowercase();
        let value = value.into();
        match self.0.get_mut(&name) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => {
                self.0.insert(name, value);
            }
        }
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for ResponseHeaders {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = ResponseHeaders::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl From<&HeaderMap> for ResponseHeaders {
    fn from(map: &HeaderMap) -> Self {
        map.iter()
            .map(|(name, value)| {
                (
                    name.as_str(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect()
    }
}

/// A request ready for the wire.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
    pub timeout: Duration,
    /// Scheduling hint in `[0, 1]`; transports are free to ignore it.
    pub priority: f32,
}

impl HttpRequest {
    /// Builds the wire request for an endpoint: headers, cache policy, timeout,
    /// then the parameters through the endpoint's encoder.
    pub fn from_endpoint(endpoint: &Endpoint) -> Result<Self> {
        let mut request = HttpRequest {
            method: endpoint.method(),
            url: endpoint.url().clone(),
            headers: HeaderMap::new(),
            body: None,
            timeout: endpoint.timeout(),
            priority: endpoint.priority(),
        };

        for (name, value) in endpoint.headers() {
            request.set_header(name, value)?;
        }
        if let Some(directive) = endpoint.cache_policy().header_value() {
            request
                .headers
                .insert(CACHE_CONTROL, HeaderValue::from_static(directive));
        }

        encoder_for(endpoint.encoding()).encode(endpoint, &mut request)?;
        Ok(request)
    }

    pub fn set_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(Error::encode_body_failed)?;
        let value = HeaderValue::from_str(value).map_err(Error::encode_body_failed)?;
        self.headers.insert(name, value);
        Ok(())
    }

    /// Sets a header only when the caller has not already provided one.
    pub fn set_header_if_absent(&mut self, name: &str, value: &str) -> Result<()> {
        if self.headers.contains_key(name) {
            return Ok(());
        }
        self.set_header(name, value)
    }
}

/// Status line and headers of a received response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseHead {
    pub status: u16,
    pub headers: ResponseHeaders,
}

/// Low-level failure reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request cancelled")]
    Cancelled,

    #[error("request timed out")]
    TimedOut,

    #[error("not connected to the network")]
    NotConnected,

    #[error("transport error: {0}")]
    Other(String),
}

/// Raw result of one transport call. Any field may be absent.
#[derive(Debug, Clone, Default)]
pub struct TransportOutcome {
    pub body: Option<Bytes>,
    pub head: Option<ResponseHead>,
    pub error: Option<TransportError>,
}

impl TransportOutcome {
    pub fn response(status: u16, headers: ResponseHeaders, body: impl Into<Bytes>) -> Self {
        Self {
            body: Some(body.into()),
            head: Some(ResponseHead { status, headers }),
            error: None,
        }
    }

    pub fn failed(error: TransportError) -> Self {
        Self {
            body: None,
            head: None,
            error: Some(error),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.head.as_ref().map(|h| h.status)
    }
}

/// Issues built requests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send_request(&self, request: HttpRequest) -> TransportOutcome;

    /// Cancels every outstanding request issued through this transport.
    async fn cancel_all(&self);
}
