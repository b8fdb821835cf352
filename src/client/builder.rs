use crate::config::NetKitConfig;
use crate::interceptors::{AdvancedRetryInterceptor, InterceptorPipeline, RequestInterceptor, TokenRefresher};
use crate::pipeline::ResponsePipeline;
use crate::request::Endpoint;
use crate::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot};
use crate::resilience::retry::RetryPolicy;
use crate::resilience::token_refresh::TokenRefreshCoordinator;
use crate::telemetry::{noop_inspector, TraceInspector};
use crate::transport::http::{HttpTransport, HttpTransportConfig};
use crate::transport::Transport;
use crate::Result;
use async_trait::async_trait;
use std::sync::Arc;

use super::core::{BaseNetworkKit, NetworkKit, NetworkResponse};
use super::decorator::Decorated;
use super::layers::{AdvancedRetryLayer, CircuitBreakerLayer, TokenRefreshLayer};

/// Composes the decorator chain.
///
/// The order is fixed, innermost first:
/// `BaseNetworkKit → AdvancedRetryLayer → CircuitBreakerLayer → TokenRefreshLayer`.
/// Every layer is optional.
pub struct NetworkKitBuilder {
    transport: Option<Arc<dyn Transport>>,
    transport_config: Option<HttpTransportConfig>,
    pipeline: ResponsePipeline,
    interceptors: InterceptorPipeline,
    inspector: Arc<dyn TraceInspector>,
    advanced_retry: Option<Arc<dyn AdvancedRetryInterceptor>>,
    breaker: Option<Arc<CircuitBreaker>>,
    token_refresher: Option<Arc<dyn TokenRefresher>>,
}

impl NetworkKitBuilder {
    pub fn new() -> Self {
        Self {
            transport: None,
            transport_config: None,
            pipeline: ResponsePipeline::default(),
            interceptors: InterceptorPipeline::new(),
            inspector: noop_inspector(),
            advanced_retry: None,
            breaker: None,
            token_refresher: None,
        }
    }

    /// Use a custom transport. Default is a reqwest [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn transport_config(mut self, config: HttpTransportConfig) -> Self {
        self.transport_config = Some(config);
        self
    }

    pub fn response_pipeline(mut self, pipeline: ResponsePipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Appends a request interceptor; interceptors run in registration order.
    pub fn request_interceptor<I: RequestInterceptor + 'static>(mut self, interceptor: I) -> Self {
        self.interceptors = self.interceptors.with(interceptor);
        self
    }

    /// Inject a trace inspector. Default is a no-op inspector.
    pub fn trace_inspector(mut self, inspector: Arc<dyn TraceInspector>) -> Self {
        self.inspector = inspector;
        self
    }

    pub fn advanced_retry(mut self, interceptor: Arc<dyn AdvancedRetryInterceptor>) -> Self {
        self.advanced_retry = Some(interceptor);
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.breaker = Some(Arc::new(CircuitBreaker::new(config)));
        self
    }

    /// Enable the circuit breaker with defaults, overridable via env:
    /// - `NETKIT_BREAKER_FAILURE_THRESHOLD` (default 8)
    /// - `NETKIT_BREAKER_OPEN_TIMEOUT_MS` (default 15000)
    /// - `NETKIT_BREAKER_HALF_OPEN_MAX_REQUESTS` (default 3)
    pub fn circuit_breaker_default(self) -> Self {
        self.circuit_breaker(CircuitBreakerConfig::from_env())
    }

    /// Use a breaker the caller keeps a handle to.
    pub fn shared_circuit_breaker(mut self, breaker: Arc<CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    pub fn token_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.token_refresher = Some(refresher);
        self
    }

    /// Applies the sections present in `config`.
    pub fn with_config(mut self, config: &NetKitConfig) -> Self {
        if let Some(breaker) = &config.circuit_breaker {
            self = self.circuit_breaker(breaker.clone());
        }
        if let Some(transport) = &config.transport {
            self.transport_config = Some(transport.clone());
        }
        self
    }

    pub fn build(self) -> Result<ResilientNetworkKit> {
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => match &self.transport_config {
                Some(config) => Arc::new(HttpTransport::with_config(config)?),
                None => Arc::new(HttpTransport::new()?),
            },
        };

        let base = BaseNetworkKit::new(transport)
            .with_pipeline(self.pipeline)
            .with_interceptors(self.interceptors)
            .with_trace_inspector(self.inspector.clone());
        let mut chain: Arc<dyn NetworkKit> = Arc::new(base);

        if let Some(interceptor) = self.advanced_retry {
            chain = Arc::new(Decorated::new(chain, AdvancedRetryLayer::new(interceptor)));
        }

        if let Some(breaker) = &self.breaker {
            let layer = CircuitBreakerLayer::new(breaker.clone()).with_trace_inspector(self.inspector.clone());
            chain = Arc::new(Decorated::new(chain, layer));
        }

        let coordinator = self
            .token_refresher
            .map(|refresher| TokenRefreshCoordinator::with_trace_inspector(refresher, self.inspector.clone()));
        if let Some(coordinator) = &coordinator {
            chain = Arc::new(Decorated::new(chain, TokenRefreshLayer::new(coordinator.clone())));
        }

        Ok(ResilientNetworkKit {
            chain,
            breaker: self.breaker,
            coordinator,
        })
    }
}

impl Default for NetworkKitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The composed client, plus handles for diagnostics.
#[derive(Clone)]
pub struct ResilientNetworkKit {
    chain: Arc<dyn NetworkKit>,
    breaker: Option<Arc<CircuitBreaker>>,
    coordinator: Option<TokenRefreshCoordinator>,
}

impl ResilientNetworkKit {
    pub fn builder() -> NetworkKitBuilder {
        NetworkKitBuilder::new()
    }

    /// The outermost layer of the chain.
    pub fn chain(&self) -> Arc<dyn NetworkKit> {
        self.chain.clone()
    }

    pub fn circuit_breaker(&self) -> Option<&Arc<CircuitBreaker>> {
        self.breaker.as_ref()
    }

    pub fn breaker_snapshot(&self) -> Option<CircuitBreakerSnapshot> {
        self.breaker.as_ref().map(|b| b.snapshot())
    }

    pub fn is_refreshing(&self) -> bool {
        self.coordinator
            .as_ref()
            .map(TokenRefreshCoordinator::is_refreshing)
            .unwrap_or(false)
    }
}

#[async_trait]
impl NetworkKit for ResilientNetworkKit {
    async fn send(&self, endpoint: Endpoint, retry: RetryPolicy) -> Result<NetworkResponse> {
        self.chain.send(endpoint, retry).await
    }

    async fn cancel_all(&self) {
        self.chain.cancel_all().await;
    }
}
