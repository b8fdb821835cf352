//! Response body parsers.

use crate::{Error, Result};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::any::type_name;

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    Text(String),
    Raw(Bytes),
}

impl ParsedBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ParsedBody::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParsedBody::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ParsedBody::Raw(b) => Some(b),
            _ => None,
        }
    }

    /// Deserializes the body into `T`, whatever form it was parsed into.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let decoded = match self {
            ParsedBody::Json(v) => T::deserialize(v),
            ParsedBody::Text(s) => serde_json::from_str(s),
            ParsedBody::Raw(b) => serde_json::from_slice(b),
        };
        decoded.map_err(|e| Error::decoding_failed(type_name::<T>(), e))
    }
}

/// Per-endpoint body parsing capability.
pub trait ResponseParser: Send + Sync {
    fn parse(&self, body: &Bytes) -> Result<ParsedBody>;

    fn name(&self) -> &'static str {
        "custom"
    }
}

/// Parses the body as JSON. An empty body parses to `null`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonParser;

impl ResponseParser for JsonParser {
    fn parse(&self, body: &Bytes) -> Result<ParsedBody> {
        if body.is_empty() {
            return Ok(ParsedBody::Json(Value::Null));
        }
        serde_json::from_slice(body)
            .map(ParsedBody::Json)
            .map_err(|e| Error::decoding_failed(type_name::<Value>(), e))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

/// UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextParser;

impl ResponseParser for TextParser {
    fn parse(&self, body: &Bytes) -> Result<ParsedBody> {
        String::from_utf8(body.to_vec())
            .map(ParsedBody::Text)
            .map_err(|e| Error::decoding_failed(type_name::<String>(), e))
    }

    fn name(&self) -> &'static str {
        "text"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RawParser;

impl ResponseParser for RawParser {
    fn parse(&self, body: &Bytes) -> Result<ParsedBody> {
        Ok(ParsedBody::Raw(body.clone()))
    }

    fn name(&self) -> &'static str {
        "raw"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        id: u32,
        name: String,
    }

    #[test]
    fn test_json_parser() {
        let parsed = JsonParser
            .parse(&Bytes::from_static(br#"{"id":1,"name":"ada"}"#))
            .unwrap();
        assert_eq!(parsed.as_json(), Some(&json!({"id": 1, "name": "ada"})));
        let user: User = parsed.decode().unwrap();
        assert_eq!(user, User { id: 1, name: "ada".into() });
    }

    #[test]
    fn test_json_parser_empty_body_is_null() {
        let parsed = JsonParser.parse(&Bytes::new()).unwrap();
        assert_eq!(parsed, ParsedBody::Json(Value::Null));
    }

    #[test]
    fn test_json_parser_failure() {
        let err = JsonParser.parse(&Bytes::from_static(b"<html>")).unwrap_err();
        match err {
            Error::DecodingFailed { target_type, .. } => {
                assert_eq!(target_type, "serde_json::value::Value")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_decode_type_mismatch_names_target() {
        let parsed = ParsedBody::Json(json!({"id": "x"}));
        let err = parsed.decode::<User>().unwrap_err();
        match err {
            Error::DecodingFailed { target_type, .. } => assert!(target_type.ends_with("User")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_text_and_raw() {
        let body = Bytes::from_static(b"hello");
        assert_eq!(TextParser.parse(&body).unwrap().as_text(), Some("hello"));
        assert_eq!(RawParser.parse(&body).unwrap().as_bytes(), Some(&body));
        assert!(TextParser.parse(&Bytes::from_static(&[0xff, 0xfe])).is_err());
    }
}
