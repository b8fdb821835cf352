//! The stock decorator layers.
//!
//! | Layer | Hook | Effect |
//! |-------|------|--------|
//! | [`AdvancedRetryLayer`] | `post_failure` | Re-sends once with an injected policy |
//! | [`CircuitBreakerLayer`] | `pre_send` / `post_*` | Fails fast while open, counts 5xx |
//! | [`TokenRefreshLayer`] | `pre_send` / `post_failure` | Queues during refresh, refreshes on 401 |

use crate::interceptors::AdvancedRetryInterceptor;
use crate::request::Endpoint;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::retry::RetryPolicy;
use crate::resilience::token_refresh::TokenRefreshCoordinator;
use crate::telemetry::{noop_inspector, now_ms, NetworkRequestRecord, TraceInspector};
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use super::core::{NetworkKit, NetworkResponse};
use super::decorator::Decorator;

/// Consults an [`AdvancedRetryInterceptor`] on every failure it sees.
pub struct AdvancedRetryLayer {
    interceptor: Arc<dyn AdvancedRetryInterceptor>,
}

impl AdvancedRetryLayer {
    pub fn new(interceptor: Arc<dyn AdvancedRetryInterceptor>) -> Self {
        Self { interceptor }
    }
}

#[async_trait]
impl Decorator for AdvancedRetryLayer {
    async fn post_failure(
        &self,
        endpoint: &Endpoint,
        error: Error,
        _retry: RetryPolicy,
        next: &Arc<dyn NetworkKit>,
    ) -> Result<NetworkResponse> {
        match self.interceptor.retry_policy(&error, endpoint) {
            Some(policy) => {
                info!(
                    endpoint = %endpoint.id(),
                    error = %error,
                    retry_count = policy.retry_count(),
                    "applying advanced retry policy"
                );
                next.send(endpoint.clone(), policy).await
            }
            None => Err(error),
        }
    }
}

pub struct CircuitBreakerLayer {
    breaker: Arc<CircuitBreaker>,
    inspector: Arc<dyn TraceInspector>,
}

impl CircuitBreakerLayer {
    pub fn new(breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            breaker,
            inspector: noop_inspector(),
        }
    }

    pub fn with_trace_inspector(mut self, inspector: Arc<dyn TraceInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }
}

#[async_trait]
impl Decorator for CircuitBreakerLayer {
    async fn pre_send(
        &self,
        endpoint: &Endpoint,
        _retry: &RetryPolicy,
        _next: &Arc<dyn NetworkKit>,
    ) -> Option<Result<NetworkResponse>> {
        if self.breaker.should_allow_request() {
            return None;
        }
        error!(endpoint = %endpoint.id(), "circuit breaker open, rejecting request");
        let record = NetworkRequestRecord::finished(endpoint, now_ms()).with_error(Error::CircuitBreakerOpen);
        self.inspector.update(record).await;
        Some(Err(Error::CircuitBreakerOpen))
    }

    async fn post_success(&self, _endpoint: &Endpoint, _response: &NetworkResponse) {
        self.breaker.report_success();
    }

    async fn post_failure(
        &self,
        _endpoint: &Endpoint,
        error: Error,
        _retry: RetryPolicy,
        _next: &Arc<dyn NetworkKit>,
    ) -> Result<NetworkResponse> {
        self.breaker.report_failure(&error);
        Err(error)
    }
}

pub struct TokenRefreshLayer {
    coordinator: TokenRefreshCoordinator,
}

impl TokenRefreshLayer {
    pub fn new(coordinator: TokenRefreshCoordinator) -> Self {
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &TokenRefreshCoordinator {
        &self.coordinator
    }
}

#[async_trait]
impl Decorator for TokenRefreshLayer {
    async fn pre_send(
        &self,
        endpoint: &Endpoint,
        retry: &RetryPolicy,
        _next: &Arc<dyn NetworkKit>,
    ) -> Option<Result<NetworkResponse>> {
        if endpoint.is_refresh_token_endpoint() {
            return None;
        }
        let rx = self.coordinator.try_enqueue_if_refreshing(endpoint, *retry)?;
        info!(endpoint = %endpoint.id(), "token refresh in progress, request queued");
        Some(rx.await.unwrap_or(Err(Error::Canceled)))
    }

    async fn post_failure(
        &self,
        endpoint: &Endpoint,
        error: Error,
        retry: RetryPolicy,
        next: &Arc<dyn NetworkKit>,
    ) -> Result<NetworkResponse> {
        self.coordinator
            .handle_failure(error, endpoint, retry, next)
            .await
    }

    /// Parked requests are failed with `Canceled`, not left to the refresh.
    async fn on_cancel_all(&self) {
        self.coordinator.cancel_pending().await;
    }
}
