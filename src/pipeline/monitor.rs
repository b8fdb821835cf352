use crate::request::Endpoint;
use crate::transport::{HttpRequest, ResponseHeaders};
use bytes::Bytes;
use serde_json::Value;
use tracing::{enabled, info, warn, Level};

/// Longest body excerpt written to logs, in characters.
pub const MAX_LOGGED_BODY_CHARS: usize = 2000;

/// What a monitor sees for every received response.
#[derive(Debug, Clone, Copy)]
pub struct ResponseObservation<'a> {
    pub endpoint: &'a Endpoint,
    pub request: &'a HttpRequest,
    pub status: u16,
    pub headers: &'a ResponseHeaders,
    pub body: Option<&'a Bytes>,
    pub duration_ms: u64,
}

/// Side-effect hook run once per response, before status branching.
pub trait ResponseMonitor: Send + Sync {
    fn observe(&self, observation: &ResponseObservation<'_>);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopResponseMonitor;

impl ResponseMonitor for NoopResponseMonitor {
    fn observe(&self, _observation: &ResponseObservation<'_>) {}
}

/// One tracing event per response: `info` for 2xx, `warn` otherwise.
///
/// Body, query and headers are only rendered when that level is enabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingResponseMonitor;

impl LoggingResponseMonitor {
    /// Whether a response with `status` would be logged by the current subscriber.
    pub fn is_logged(status: u16) -> bool {
        if (200..300).contains(&status) {
            enabled!(Level::INFO)
        } else {
            enabled!(Level::WARN)
        }
    }
}

impl ResponseMonitor for LoggingResponseMonitor {
    fn observe(&self, obs: &ResponseObservation<'_>) {
        if !Self::is_logged(obs.status) {
            return;
        }
        let body = obs.body.map(body_excerpt).unwrap_or_default();
        let query = Value::Object(obs.endpoint.query().clone().into_iter().collect());
        let headers = serde_json::to_string(obs.headers).unwrap_or_default();
        if (200..300).contains(&obs.status) {
            info!(
                endpoint = %obs.endpoint.id(),
                method = %obs.request.method,
                url = %obs.request.url,
                status = obs.status,
                duration_ms = obs.duration_ms,
                query = %query,
                headers = %headers,
                body = %body,
                "http response"
            );
        } else {
            warn!(
                endpoint = %obs.endpoint.id(),
                method = %obs.request.method,
                url = %obs.request.url,
                status = obs.status,
                duration_ms = obs.duration_ms,
                query = %query,
                headers = %headers,
                body = %body,
                "http error response"
            );
        }
    }
}

/// Pretty JSON when the body is JSON, lossy UTF-8 otherwise, truncated.
pub fn body_excerpt(body: &Bytes) -> String {
    let text = match serde_json::from_slice::<Value>(body) {
        Ok(json) => serde_json::to_string_pretty(&json)
            .unwrap_or_else(|_| String::from_utf8_lossy(body).into_owned()),
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    };
    truncate_chars(text, MAX_LOGGED_BODY_CHARS)
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text,
    }
}
