//! Injectable hooks around a call.
//!
//! - [`RequestInterceptor`]: rewrites the endpoint once, before the first attempt
//! - [`AdvancedRetryInterceptor`]: picks a retry policy for a failure, if any
//! - [`TokenRefresher`]: obtains a new credential after a 401

use crate::request::Endpoint;
use crate::resilience::retry::RetryPolicy;
use crate::{Error, Result};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Endpoint rewrite applied once per call (headers, query).
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn modify(&self, endpoint: Endpoint) -> Endpoint;
}

/// Runs request interceptors in registration order.
#[derive(Clone, Default)]
pub struct InterceptorPipeline {
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl InterceptorPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<I: RequestInterceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    pub fn with_arc(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub async fn apply(&self, mut endpoint: Endpoint) -> Endpoint {
        for ic in &self.interceptors {
            endpoint = ic.modify(endpoint).await;
        }
        endpoint
    }
}

/// Adds `X-Request-ID: <uuid v4>` unless the endpoint already carries one.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdInterceptor;

#[async_trait]
impl RequestInterceptor for RequestIdInterceptor {
    async fn modify(&self, mut endpoint: Endpoint) -> Endpoint {
        let present = endpoint
            .headers()
            .keys()
            .any(|k| k.eq_ignore_ascii_case(REQUEST_ID_HEADER));
        if !present {
            endpoint
                .headers_mut()
                .insert(REQUEST_ID_HEADER.to_string(), Uuid::new_v4().to_string());
        }
        endpoint
    }
}

/// Sets `Authorization: Bearer <token>` from a shared, swappable token.
///
/// Clones share the same token, so a [`TokenRefresher`] can hold one clone and
/// publish fresh credentials that every later call picks up.
#[derive(Clone, Default)]
pub struct BearerTokenInterceptor {
    token: Arc<ArcSwapOption<String>>,
}

impl BearerTokenInterceptor {
    pub fn new(token: impl Into<String>) -> Self {
        let interceptor = Self::default();
        interceptor.set_token(token);
        interceptor
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.token.store(Some(Arc::new(token.into())));
    }

    pub fn clear(&self) {
        self.token.store(None);
    }

    pub fn token(&self) -> Option<String> {
        self.token.load_full().map(|t| t.as_ref().clone())
    }
}

#[async_trait]
impl RequestInterceptor for BearerTokenInterceptor {
    async fn modify(&self, mut endpoint: Endpoint) -> Endpoint {
        if let Some(token) = self.token.load_full() {
            endpoint.headers_mut().retain(|k, _| !k.eq_ignore_ascii_case("authorization"));
            endpoint
                .headers_mut()
                .insert("Authorization".to_string(), format!("Bearer {token}"));
        }
        endpoint
    }
}

/// Chooses an override retry policy for a failed call.
///
/// Returning `None` leaves the failure untouched.
pub trait AdvancedRetryInterceptor: Send + Sync {
    fn retry_policy(&self, error: &Error, endpoint: &Endpoint) -> Option<RetryPolicy>;
}

/// Retries with a fixed policy when the failure carries one of the listed statuses.
#[derive(Debug, Clone)]
pub struct StatusRetryInterceptor {
    statuses: BTreeSet<u16>,
    policy: RetryPolicy,
}

impl StatusRetryInterceptor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            statuses: BTreeSet::new(),
            policy,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.statuses.insert(status);
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.statuses.extend(statuses);
        self
    }
}

impl Default for StatusRetryInterceptor {
    /// 503 and 504 retried five times, five seconds apart.
    fn default() -> Self {
        Self::new(RetryPolicy::constant(5, Duration::from_secs(5))).with_statuses([503, 504])
    }
}

impl AdvancedRetryInterceptor for StatusRetryInterceptor {
    fn retry_policy(&self, error: &Error, _endpoint: &Endpoint) -> Option<RetryPolicy> {
        error
            .status_code()
            .filter(|code| self.statuses.contains(code))
            .map(|_| self.policy)
    }
}

/// Obtains a new access token. Invoked at most once concurrently.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh_access_token(&self) -> Result<()>;
}
