//! Endpoint descriptor: one remote operation, immutable for the lifetime of a call.

use crate::request::encoding::RequestEncoder;
use crate::request::parser::{JsonParser, ResponseParser};
use crate::{Error, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_PRIORITY: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// GET carries its parameters in the URL; every other method in the body.
    pub fn encodes_parameters_in_url(&self) -> bool {
        matches!(self, HttpMethod::Get)
    }

    pub fn parse(method: &str) -> Option<Self> {
        match method.to_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "PATCH" => Some(HttpMethod::Patch),
            _ => None,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the endpoint's parameters are serialized into the request.
#[derive(Clone, Default)]
pub enum BodyEncoding {
    #[default]
    Json,
    UrlEncoded,
    Custom(Arc<dyn RequestEncoder>),
}

impl fmt::Debug for BodyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyEncoding::Json => f.write_str("Json"),
            BodyEncoding::UrlEncoded => f.write_str("UrlEncoded"),
            BodyEncoding::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Cache behaviour requested for the call, sent as a `Cache-Control` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CachePolicy {
    #[default]
    UseProtocolDefault,
    NoCache,
    NoStore,
}

impl CachePolicy {
    pub fn header_value(&self) -> Option<&'static str> {
        match self {
            CachePolicy::UseProtocolDefault => None,
            CachePolicy::NoCache => Some("no-cache"),
            CachePolicy::NoStore => Some("no-store"),
        }
    }
}

/// Descriptor of one remote operation.
///
/// Equality and hashing cover URL, method, headers and query only; priority,
/// timeout, cache policy and parser do not participate.
#[derive(Clone)]
pub struct Endpoint {
    url: Url,
    method: HttpMethod,
    query: BTreeMap<String, Value>,
    headers: BTreeMap<String, String>,
    encoding: BodyEncoding,
    priority: f32,
    timeout: Duration,
    cache_policy: CachePolicy,
    parser: Arc<dyn ResponseParser>,
    refresh_token_endpoint: bool,
}

impl Endpoint {
    pub fn new(method: HttpMethod, url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|_| Error::invalid_url(url))?;
        Ok(Self::from_url(method, url))
    }

    pub fn from_url(method: HttpMethod, url: Url) -> Self {
        Self {
            url,
            method,
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            encoding: BodyEncoding::default(),
            priority: DEFAULT_PRIORITY,
            timeout: DEFAULT_TIMEOUT,
            cache_policy: CachePolicy::default(),
            parser: Arc::new(JsonParser),
            refresh_token_endpoint: false,
        }
    }

    pub fn get(url: &str) -> Result<Self> {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: &str) -> Result<Self> {
        Self::new(HttpMethod::Post, url)
    }

    pub fn put(url: &str) -> Result<Self> {
        Self::new(HttpMethod::Put, url)
    }

    pub fn delete(url: &str) -> Result<Self> {
        Self::new(HttpMethod::Delete, url)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_encoding(mut self, encoding: BodyEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = priority.clamp(0.0, 1.0);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn with_parser(mut self, parser: Arc<dyn ResponseParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Marks this endpoint as the one that obtains new credentials.
    ///
    /// Such requests are never queued behind, nor trigger, a token refresh.
    pub fn as_refresh_token_endpoint(mut self) -> Self {
        self.refresh_token_endpoint = true;
        self
    }

    /// Tracing and dedup key: `"{METHOD}-{url}"`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.method, self.url)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    pub fn query(&self) -> &BTreeMap<String, Value> {
        &self.query
    }

    pub fn query_mut(&mut self) -> &mut BTreeMap<String, Value> {
        &mut self.query
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.headers
    }

    pub fn encoding(&self) -> &BodyEncoding {
        &self.encoding
    }

    pub fn priority(&self) -> f32 {
        self.priority
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.cache_policy
    }

    pub fn parser(&self) -> &Arc<dyn ResponseParser> {
        &self.parser
    }

    pub fn is_refresh_token_endpoint(&self) -> bool {
        self.refresh_token_endpoint
    }
}

impl PartialEq for Endpoint {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
            && self.method == other.method
            && self.headers == other.headers
            && self.query == other.query
    }
}

impl Eq for Endpoint {}

impl Hash for Endpoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
        self.method.hash(state);
        self.headers.hash(state);
        // serde_json::Value has no Hash impl; its canonical text does.
        for (key, value) in &self.query {
            key.hash(state);
            value.to_string().hash(state);
        }
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("url", &self.url.as_str())
            .field("method", &self.method)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("encoding", &self.encoding)
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .field("cache_policy", &self.cache_policy)
            .field("parser", &self.parser.name())
            .field("refresh_token_endpoint", &self.refresh_token_endpoint)
            .finish()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::parser::TextParser;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(endpoint: &Endpoint) -> u64 {
        let mut hasher = DefaultHasher::new();
        endpoint.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_id_format() {
        let endpoint = Endpoint::get("https://api.example.com/users/1").unwrap();
        assert_eq!(endpoint.id(), "GET-https://api.example.com/users/1");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = Endpoint::get("not a url").unwrap_err();
        assert!(matches!(err, Error::InvalidUrl { url: Some(ref u) } if u == "not a url"));
    }

    #[test]
    fn test_equality_ignores_non_identity_fields() {
        let a = Endpoint::post("https://api.example.com/items")
            .unwrap()
            .with_query("name", "widget")
            .with_header("X-Tenant", "acme");
        let b = a
            .clone()
            .with_priority(0.9)
            .with_timeout(Duration::from_secs(5))
            .with_cache_policy(CachePolicy::NoStore)
            .with_parser(Arc::new(TextParser));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_equality_covers_identity_fields() {
        let a = Endpoint::get("https://api.example.com/items").unwrap();
        assert_ne!(a, a.clone().with_query("page", 2));
        assert_ne!(a, a.clone().with_header("Authorization", "Bearer x"));
        assert_ne!(a, Endpoint::delete("https://api.example.com/items").unwrap());
    }

    #[test]
    fn test_defaults() {
        let endpoint = Endpoint::get("https://api.example.com").unwrap();
        assert_eq!(endpoint.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(endpoint.priority(), DEFAULT_PRIORITY);
        assert_eq!(endpoint.cache_policy(), CachePolicy::UseProtocolDefault);
        assert!(matches!(endpoint.encoding(), BodyEncoding::Json));
        assert!(!endpoint.is_refresh_token_endpoint());
        assert!(endpoint.clone().as_refresh_token_endpoint().is_refresh_token_endpoint());
    }

    #[test]
    fn test_method_parse() {
        assert_eq!(HttpMethod::parse("patch"), Some(HttpMethod::Patch));
        assert_eq!(HttpMethod::parse("TRACE"), None);
        assert!(HttpMethod::Get.encodes_parameters_in_url());
        assert!(!HttpMethod::Post.encodes_parameters_in_url());
    }
}
