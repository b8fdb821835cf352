//! Pluggable pieces of the response pipeline and their stock implementations.

use crate::error::Cause;
use crate::request::{Endpoint, ParsedBody};
use crate::status_code::StatusCode;
use crate::transport::{ResponseHead, TransportError};
use crate::{Error, Result};
use bytes::Bytes;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Stage 1: turns a transport failure into a typed error.
pub trait ErrorInterceptor: Send + Sync {
    fn intercept(&self, error: Option<&TransportError>, endpoint: &Endpoint) -> Result<()>;
}

/// Cancellation → `Canceled`, timeout or lost connectivity → `Network`,
/// anything else → `Unknown`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorInterceptor;

impl ErrorInterceptor for DefaultErrorInterceptor {
    fn intercept(&self, error: Option<&TransportError>, _endpoint: &Endpoint) -> Result<()> {
        let Some(error) = error else {
            return Ok(());
        };
        let cause: Cause = Arc::new(error.clone());
        Err(match error {
            TransportError::Cancelled => Error::Canceled,
            TransportError::TimedOut | TransportError::NotConnected => {
                Error::Network { cause: Some(cause) }
            }
            TransportError::Other(_) => Error::Unknown { cause: Some(cause) },
        })
    }
}

/// Stage 2 classifier.
pub trait StatusInterceptor: Send + Sync {
    fn classify(&self, head: &ResponseHead) -> StatusCode;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultStatusInterceptor;

impl StatusInterceptor for DefaultStatusInterceptor {
    fn classify(&self, head: &ResponseHead) -> StatusCode {
        StatusCode::from_code(head.status)
    }
}

/// Interprets the body of a 409 response.
pub trait ConflictJustifier: Send + Sync {
    fn justify(&self, body: Option<&Bytes>) -> Error;
}

/// A JSON object body becomes the conflict payload; anything else an empty one.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonConflictJustifier;

impl ConflictJustifier for JsonConflictJustifier {
    fn justify(&self, body: Option<&Bytes>) -> Error {
        let payload = body
            .and_then(|b| serde_json::from_slice::<Value>(b).ok())
            .and_then(|v| match v {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .unwrap_or_else(Map::new);
        Error::Conflict { payload }
    }
}

/// Best-effort view of a 4xx body for [`crate::error::ClientError::payload`].
pub trait ResponseErrorInspector: Send + Sync {
    fn inspect(&self, body: Option<&Bytes>) -> Value;
}

/// JSON when the body parses, the raw text otherwise, an empty array when
/// there is nothing usable.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorInspector;

impl ResponseErrorInspector for DefaultErrorInspector {
    fn inspect(&self, body: Option<&Bytes>) -> Value {
        let Some(body) = body.filter(|b| !b.is_empty()) else {
            return Value::Array(Vec::new());
        };
        if let Ok(json) = serde_json::from_slice::<Value>(body) {
            return json;
        }
        match std::str::from_utf8(body) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => Value::Array(Vec::new()),
        }
    }
}

/// Stage 3: parses a successful body.
pub trait ResponseParserInterceptor: Send + Sync {
    fn parse(&self, body: Option<&Bytes>, endpoint: &Endpoint) -> Result<ParsedBody>;
}

/// Missing body → `DataMissing`; otherwise the endpoint's own parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndpointParserInterceptor;

impl ResponseParserInterceptor for EndpointParserInterceptor {
    fn parse(&self, body: Option<&Bytes>, endpoint: &Endpoint) -> Result<ParsedBody> {
        let body = body.ok_or(Error::DataMissing)?;
        endpoint.parser().parse(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn endpoint() -> Endpoint {
        Endpoint::get("https://api.example.com/items").unwrap()
    }

    #[test]
    fn test_error_interceptor_classification() {
        let ic = DefaultErrorInterceptor;
        assert!(ic.intercept(None, &endpoint()).is_ok());
        assert_eq!(
            ic.intercept(Some(&TransportError::Cancelled), &endpoint()).unwrap_err(),
            Error::Canceled
        );
        assert!(matches!(
            ic.intercept(Some(&TransportError::TimedOut), &endpoint()),
            Err(Error::Network { cause: Some(_) })
        ));
        assert!(matches!(
            ic.intercept(Some(&TransportError::NotConnected), &endpoint()),
            Err(Error::Network { .. })
        ));
        assert!(matches!(
            ic.intercept(Some(&TransportError::Other("tls".into())), &endpoint()),
            Err(Error::Unknown { .. })
        ));
    }

    #[test]
    fn test_conflict_justifier() {
        let body = Bytes::from_static(br#"{"reason":"dup"}"#);
        match JsonConflictJustifier.justify(Some(&body)) {
            Error::Conflict { payload } => assert_eq!(payload.get("reason"), Some(&json!("dup"))),
            other => panic!("unexpected: {other:?}"),
        }
        match JsonConflictJustifier.justify(Some(&Bytes::from_static(b"[1]"))) {
            Error::Conflict { payload } => assert!(payload.is_empty()),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_error_inspector_fallbacks() {
        let inspector = DefaultErrorInspector;
        assert_eq!(
            inspector.inspect(Some(&Bytes::from_static(br#"{"message":"no"}"#))),
            json!({"message": "no"})
        );
        assert_eq!(
            inspector.inspect(Some(&Bytes::from_static(b"plain text"))),
            json!("plain text")
        );
        assert_eq!(inspector.inspect(Some(&Bytes::from_static(&[0xff]))), json!([]));
        assert_eq!(inspector.inspect(None), json!([]));
    }

    #[test]
    fn test_parser_interceptor_requires_body() {
        assert_eq!(
            EndpointParserInterceptor.parse(None, &endpoint()).unwrap_err(),
            Error::DataMissing
        );
        let parsed = EndpointParserInterceptor
            .parse(Some(&Bytes::from_static(b"[1,2]")), &endpoint())
            .unwrap();
        assert_eq!(parsed, ParsedBody::Json(json!([1, 2])));
    }
}
