//! # resilient-netkit
//!
//! 一个具备弹性能力的 HTTP 客户端核心：重试、熔断、单飞令牌刷新与类型化响应拦截。
//!
//! Resilient HTTP client core - a composable request-execution engine that wraps
//! a bare transport with layered failure-handling policies.
//!
//! ## Overview
//!
//! Callers issue `send(endpoint, retry_policy)` on the outermost layer of a
//! decorator chain. Each layer may short-circuit before delegating, observe a
//! success, or intercept a failure to apply extra policy. The innermost
//! [`BaseNetworkKit`] runs the attempt loop against the [`transport`] and the
//! response [`pipeline`].
//!
//! ```text
//! TokenRefreshLayer → CircuitBreakerLayer → AdvancedRetryLayer → BaseNetworkKit → Transport
//! ```
//!
//! ## Key Features
//!
//! - **Retry policies**: none / constant / exponential, see [`RetryPolicy`]
//! - **Circuit breaking**: three-state breaker counting server errors only
//! - **Token refresh**: single-flight refresh on 401 with FIFO replay of queued requests
//! - **Typed responses**: three-stage interception pipeline into [`NetworkResponse`] or [`Error`]
//! - **Tracing**: structured `tracing` events plus an optional [`telemetry::TraceInspector`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resilient_netkit::interceptors::{RequestIdInterceptor, StatusRetryInterceptor};
//! use resilient_netkit::{Endpoint, NetworkKit, NetworkKitBuilder, RetryPolicy};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> resilient_netkit::Result<()> {
//!     let client = NetworkKitBuilder::new()
//!         .request_interceptor(RequestIdInterceptor)
//!         .advanced_retry(Arc::new(StatusRetryInterceptor::default()))
//!         .circuit_breaker_default()
//!         .build()?;
//!
//!     let endpoint = Endpoint::get("https://httpbin.org/json")?;
//!     let response = client.send(endpoint, RetryPolicy::exponential_default(3)).await?;
//!     println!("{} {:?}", response.status, response.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | `NetworkKit` surface, base client, decorator layers, builder |
//! | [`request`] | Endpoint descriptor, encoders, response parsers |
//! | [`transport`] | Transport trait and the reqwest implementation |
//! | [`pipeline`] | Response interception pipeline |
//! | [`resilience`] | Retry policy, circuit breaker, token refresh coordinator |
//! | [`interceptors`] | Request interceptors and injectable policies |
//! | [`telemetry`] | Request trace records and inspectors |
//! | [`status_code`] | HTTP status taxonomy |
//! | [`config`] | YAML/JSON configuration |

pub mod client;
pub mod config;
pub mod interceptors;
pub mod pipeline;
pub mod request;
pub mod resilience;
pub mod status_code;
pub mod telemetry;
pub mod transport;

// Re-export main types for convenience
pub use client::{
    BaseNetworkKit, NetworkKit, NetworkKitBuilder, NetworkKitExt, NetworkResponse,
    ResilientNetworkKit,
};
pub use config::NetKitConfig;
pub use request::{BodyEncoding, CachePolicy, Endpoint, HttpMethod, ParsedBody};
pub use resilience::{CircuitBreakerConfig, RetryPolicy};
pub use status_code::StatusCode;
pub use transport::{HttpTransport, ResponseHeaders, Transport};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{ClientError, Error};
