use crate::status_code::StatusCode;
use crate::transport::ResponseHeaders;
use bytes::Bytes;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Shared, clonable underlying cause.
///
/// Errors are cloned when one failure fans out to many waiters (a failed token
/// refresh fails every queued request), so causes live behind an `Arc`.
pub type Cause = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Structured payload of a 4xx response (other than 409).
#[derive(Debug, Clone)]
pub struct ClientError {
    pub status: StatusCode,
    pub headers: ResponseHeaders,
    /// Best-effort inspection of the body: JSON when it parses, raw text otherwise.
    pub payload: Value,
    pub raw_body: Option<Bytes>,
    /// Final URL of the request that produced this response.
    pub url: String,
}

/// Unified error type for every layer of the client.
///
/// Each variant carries enough structured context (status, headers, payload,
/// underlying cause) for callers to branch programmatically.
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("Unknown error: {}", describe_cause(.cause))]
    Unknown {
        #[source]
        cause: Option<Cause>,
    },

    #[error("Network error occurred: {}", describe_cause(.cause))]
    Network {
        #[source]
        cause: Option<Cause>,
    },

    #[error("Client error: HTTP {} - {}", .0.status.code(), .0.payload)]
    Client(ClientError),

    #[error("Conflict error: {}", Value::Object(.payload.clone()))]
    Conflict { payload: Map<String, Value> },

    #[error("Server error: HTTP {status} - {}", describe_body(.body))]
    Server {
        status: u16,
        headers: ResponseHeaders,
        body: Option<Bytes>,
    },

    #[error("Failed to cast HTTP response to the expected type")]
    HttpResponseTypeCastFailed,

    #[error("Data unexpectedly found nil")]
    DataMissing,

    #[error("Request was canceled")]
    Canceled,

    #[error("Failed to encode the request body: {cause}")]
    EncodeBodyFailed {
        #[source]
        cause: Cause,
    },

    #[error("Decoding failed for type '{target_type}': {cause}")]
    DecodingFailed {
        target_type: String,
        #[source]
        cause: Cause,
    },

    #[error("Invalid URL provided: {}", .url.as_deref().unwrap_or("No URL"))]
    InvalidUrl { url: Option<String> },

    #[error("Circuit breaker is open, rejecting the request")]
    CircuitBreakerOpen,

    #[error("{}", .message.as_deref().unwrap_or("No message provided"))]
    Custom {
        code: Option<u16>,
        message: Option<String>,
    },
}

fn describe_cause(cause: &Option<Cause>) -> String {
    cause
        .as_ref()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "No additional information".to_string())
}

fn describe_body(body: &Option<Bytes>) -> String {
    match body {
        None => String::new(),
        Some(bytes) => match serde_json::from_slice::<Value>(bytes) {
            Ok(json) => json.to_string(),
            Err(_) => String::from_utf8_lossy(bytes).into_owned(),
        },
    }
}

impl Error {
    pub fn unknown<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Unknown {
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn network<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::Network {
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn encode_body_failed<E>(cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::EncodeBodyFailed {
            cause: Arc::new(cause),
        }
    }

    pub fn decoding_failed<E>(target_type: impl Into<String>, cause: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Error::DecodingFailed {
            target_type: target_type.into(),
            cause: Arc::new(cause),
        }
    }

    pub fn invalid_url(url: impl Into<String>) -> Self {
        Error::InvalidUrl {
            url: Some(url.into()),
        }
    }

    /// Numeric HTTP status for server, client and custom errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Server { status, .. } => Some(*status),
            Error::Client(err) => Some(err.status.code()),
            Error::Custom { code, .. } => *code,
            _ => None,
        }
    }

    /// Status classification, when the error carries a status.
    pub fn status(&self) -> Option<StatusCode> {
        self.status_code().map(StatusCode::from_code)
    }

    /// True for a 401 response, the trigger for a credential refresh.
    pub fn is_unauthorised(&self) -> bool {
        self.status() == Some(StatusCode::Unauthorised)
    }

    /// True when the failure counts against a circuit breaker (5xx only).
    pub fn is_server_failure(&self) -> bool {
        self.status().map(|s| s.is_server_error()).unwrap_or(false)
    }

    /// Whether the attempt loop may consult the retry policy for this error.
    ///
    /// Cancellation, malformed responses, 4xx responses and request
    /// construction failures surface immediately.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Server { .. }
            | Error::Network { .. }
            | Error::Unknown { .. }
            | Error::DataMissing
            | Error::DecodingFailed { .. }
            | Error::Custom { .. } => true,
            Error::Canceled
            | Error::HttpResponseTypeCastFailed
            | Error::Client(_)
            | Error::Conflict { .. }
            | Error::EncodeBodyFailed { .. }
            | Error::InvalidUrl { .. }
            | Error::CircuitBreakerOpen => false,
        }
    }

    /// Short kind label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Unknown { .. } => "unknown",
            Error::Network { .. } => "network_error",
            Error::Client(_) => "client_error",
            Error::Conflict { .. } => "conflict",
            Error::Server { .. } => "server_error",
            Error::HttpResponseTypeCastFailed => "http_response_type_cast_failed",
            Error::DataMissing => "data_missing",
            Error::Canceled => "canceled",
            Error::EncodeBodyFailed { .. } => "encode_body_failed",
            Error::DecodingFailed { .. } => "decoding_failed",
            Error::InvalidUrl { .. } => "invalid_url",
            Error::CircuitBreakerOpen => "circuit_breaker_open",
            Error::Custom { .. } => "custom_error",
        }
    }
}

impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Error::Conflict { payload: lhs }, Error::Conflict { payload: rhs }) => lhs == rhs,
            _ => self.kind() == other.kind() && self.status_code() == other.status_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client_error(code: u16) -> Error {
        Error::Client(ClientError {
            status: StatusCode::from_code(code),
            headers: ResponseHeaders::default(),
            payload: json!({"message": "nope"}),
            raw_body: None,
            url: "https://api.example.com/items".to_string(),
        })
    }

    #[test]
    fn test_status_code_extraction() {
        let server = Error::Server {
            status: 503,
            headers: ResponseHeaders::default(),
            body: None,
        };
        assert_eq!(server.status_code(), Some(503));
        assert_eq!(client_error(404).status_code(), Some(404));
        assert_eq!(
            Error::Custom {
                code: Some(299),
                message: None
            }
            .status_code(),
            Some(299)
        );
        assert_eq!(Error::Canceled.status_code(), None);
        assert_eq!(Error::CircuitBreakerOpen.status_code(), None);
    }

    #[test]
    fn test_unauthorised_and_server_failure() {
        assert!(client_error(401).is_unauthorised());
        assert!(!client_error(403).is_unauthorised());
        assert!(!client_error(401).is_server_failure());
        let server = Error::Server {
            status: 500,
            headers: ResponseHeaders::default(),
            body: None,
        };
        assert!(server.is_server_failure());
    }

    #[test]
    fn test_retryability() {
        assert!(Error::Network { cause: None }.is_retryable());
        assert!(Error::DataMissing.is_retryable());
        assert!(!Error::Canceled.is_retryable());
        assert!(!client_error(401).is_retryable());
        assert!(!Error::CircuitBreakerOpen.is_retryable());
        assert!(!Error::invalid_url("::").is_retryable());
    }

    #[test]
    fn test_conflict_equality_uses_payload() {
        let mut a = Map::new();
        a.insert("reason".into(), json!("dup"));
        let mut b = Map::new();
        b.insert("reason".into(), json!("other"));
        assert_eq!(Error::Conflict { payload: a.clone() }, Error::Conflict { payload: a.clone() });
        assert_ne!(Error::Conflict { payload: a }, Error::Conflict { payload: b });
        assert_eq!(client_error(404), client_error(404));
        assert_ne!(client_error(404), client_error(400));
    }

    #[test]
    fn test_display_messages() {
        let server = Error::Server {
            status: 502,
            headers: ResponseHeaders::default(),
            body: Some(Bytes::from_static(br#"{"error":"bad gateway"}"#)),
        };
        let text = server.to_string();
        assert!(text.contains("502"));
        assert!(text.contains("bad gateway"));
        assert_eq!(
            Error::InvalidUrl { url: None }.to_string(),
            "Invalid URL provided: No URL"
        );
        assert_eq!(
            Error::Custom {
                code: None,
                message: None
            }
            .to_string(),
            "No message provided"
        );
    }
}
