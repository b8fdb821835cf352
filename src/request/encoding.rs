//! Parameter encoders.
//!
//! Both stock encoders put parameters in the URL for GET and in the body for
//! every other method; they differ only in the body format.

use crate::request::{BodyEncoding, Endpoint};
use crate::transport::HttpRequest;
use crate::{Error, Result};
use bytes::Bytes;
use serde_json::Value;
use std::sync::Arc;
use url::form_urlencoded::byte_serialize;

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Serializes an endpoint's parameters into a request.
///
/// URL construction failures map to [`Error::InvalidUrl`]; anything else to
/// [`Error::EncodeBodyFailed`].
pub trait RequestEncoder: Send + Sync {
    fn encode(&self, endpoint: &Endpoint, request: &mut HttpRequest) -> Result<()> {
        if endpoint.method().encodes_parameters_in_url() {
            encode_in_url(endpoint, request)
        } else {
            self.encode_body(endpoint, request)
        }
    }

    fn encode_body(&self, endpoint: &Endpoint, request: &mut HttpRequest) -> Result<()>;
}

/// Encoder for an endpoint's encoding mode.
pub fn encoder_for(encoding: &BodyEncoding) -> Arc<dyn RequestEncoder> {
    match encoding {
        BodyEncoding::Json => Arc::new(JsonEncoded),
        BodyEncoding::UrlEncoded => Arc::new(UrlEncoded),
        BodyEncoding::Custom(encoder) => encoder.clone(),
    }
}

/// Appends the query map to the request URL, keys sorted, arrays repeated.
pub fn encode_in_url(endpoint: &Endpoint, request: &mut HttpRequest) -> Result<()> {
    if endpoint.query().is_empty() {
        return Ok(());
    }
    if request.url.cannot_be_a_base() {
        return Err(Error::invalid_url(request.url.as_str()));
    }
    let mut pairs = request.url.query_pairs_mut();
    for (key, value) in endpoint.query() {
        match value {
            Value::Array(items) => {
                for item in items {
                    pairs.append_pair(key, &scalar_text(item));
                }
            }
            other => {
                pairs.append_pair(key, &scalar_text(other));
            }
        }
    }
    drop(pairs);
    Ok(())
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// JSON object body.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonEncoded;

impl RequestEncoder for JsonEncoded {
    fn encode_body(&self, endpoint: &Endpoint, request: &mut HttpRequest) -> Result<()> {
        let body = serde_json::to_vec(endpoint.query()).map_err(Error::encode_body_failed)?;
        request.set_header_if_absent("content-type", JSON_CONTENT_TYPE)?;
        request.body = Some(Bytes::from(body));
        Ok(())
    }
}

/// `application/x-www-form-urlencoded` body.
///
/// Nested objects become `key[sub]`, arrays `key[]`, booleans `1`/`0`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UrlEncoded;

impl RequestEncoder for UrlEncoded {
    fn encode_body(&self, endpoint: &Endpoint, request: &mut HttpRequest) -> Result<()> {
        let mut components = Vec::new();
        for (key, value) in endpoint.query() {
            form_components(key, value, &mut components);
        }
        let body = components
            .iter()
            .map(|(k, v)| format!("{}={}", escape(k), escape(v)))
            .collect::<Vec<_>>()
            .join("&");
        request.set_header_if_absent("content-type", FORM_CONTENT_TYPE)?;
        request.body = Some(Bytes::from(body));
        Ok(())
    }
}

fn form_components(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (nested_key, nested) in map {
                form_components(&format!("{key}[{nested_key}]"), nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                form_components(&format!("{key}[]"), item, out);
            }
        }
        Value::Bool(b) => out.push((key.to_string(), if *b { "1" } else { "0" }.to_string())),
        other => out.push((key.to_string(), scalar_text(other))),
    }
}

fn escape(s: &str) -> String {
    byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn build(endpoint: &Endpoint) -> HttpRequest {
        HttpRequest::from_endpoint(endpoint).unwrap()
    }

    #[test]
    fn test_get_puts_parameters_in_url() {
        let endpoint = Endpoint::get("https://api.example.com/items?fixed=1")
            .unwrap()
            .with_query("tag", json!(["a", "b"]))
            .with_query("page", 2)
            .with_encoding(BodyEncoding::UrlEncoded);
        let request = build(&endpoint);
        assert_eq!(
            request.url.as_str(),
            "https://api.example.com/items?fixed=1&page=2&tag=a&tag=b"
        );
        assert!(request.body.is_none());
    }

    #[test]
    fn test_json_body() {
        let endpoint = Endpoint::post("https://api.example.com/items")
            .unwrap()
            .with_query("name", "widget")
            .with_query("count", 3);
        let request = build(&endpoint);
        let body: Value = serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "widget", "count": 3}));
        assert_eq!(request.headers["content-type"], JSON_CONTENT_TYPE);
        assert_eq!(request.url.as_str(), "https://api.example.com/items");
    }

    #[test]
    fn test_json_keeps_caller_content_type() {
        let endpoint = Endpoint::put("https://api.example.com/items/1")
            .unwrap()
            .with_header("Content-Type", "application/vnd.api+json");
        let request = build(&endpoint);
        assert_eq!(request.headers["content-type"], "application/vnd.api+json");
    }

    #[test]
    fn test_form_body_nesting_and_booleans() {
        let endpoint = Endpoint::post("https://api.example.com/login")
            .unwrap()
            .with_encoding(BodyEncoding::UrlEncoded)
            .with_query("user", json!({"name": "a b", "admin": false}))
            .with_query("ids", json!([1, 2]))
            .with_query("remember", true);
        let request = build(&endpoint);
        let body = std::str::from_utf8(request.body.as_ref().unwrap()).unwrap();
        assert_eq!(
            body,
            "ids%5B%5D=1&ids%5B%5D=2&remember=1&user%5Badmin%5D=0&user%5Bname%5D=a+b"
        );
        assert_eq!(request.headers["content-type"], FORM_CONTENT_TYPE);
    }

    struct FixedBody;

    impl RequestEncoder for FixedBody {
        fn encode_body(&self, _endpoint: &Endpoint, request: &mut HttpRequest) -> Result<()> {
            request.body = Some(Bytes::from_static(b"fixed"));
            Ok(())
        }
    }

    #[test]
    fn test_custom_encoder_delegates() {
        let endpoint = Endpoint::post("https://api.example.com/raw")
            .unwrap()
            .with_encoding(BodyEncoding::Custom(Arc::new(FixedBody)));
        let request = build(&endpoint);
        assert_eq!(request.body.as_deref(), Some(&b"fixed"[..]));
    }

    #[test]
    fn test_query_on_non_base_url_is_invalid() {
        let endpoint = Endpoint::get("mailto:someone@example.com")
            .unwrap()
            .with_query("subject", "hi");
        let err = HttpRequest::from_endpoint(&endpoint).unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { .. }));
    }
}
