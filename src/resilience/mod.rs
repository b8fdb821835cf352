//! 弹性模式模块：提供重试策略、熔断器与令牌刷新协调器等可靠性保障机制。
//!
//! # Resilience Primitives Module
//!
//! The stateful and arithmetic pieces behind the decorator layers in
//! [`crate::client::layers`].
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`retry`] | Retry policy arithmetic (`attempt_plan`) |
//! | [`circuit_breaker`] | Closed / open / half-open breaker counting 5xx failures |
//! | [`token_refresh`] | Single-flight token refresh with FIFO replay |
//!
//! ## Circuit Breaker
//!
//! - **Closed**: requests pass; server errors are counted
//! - **Open**: requests fail fast until `open_timeout` elapses
//! - **Half-Open**: a bounded number of probes are let through
//!
//! ```rust
//! use resilient_netkit::resilience::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Duration;
//!
//! let config = CircuitBreakerConfig::new()
//!     .with_failure_threshold(5)
//!     .with_open_timeout(Duration::from_secs(30));
//! let breaker = CircuitBreaker::new(config);
//!
//! if breaker.should_allow_request() {
//!     // Make the call, then report_success / report_failure.
//! }
//! ```
//!
//! ## Retry Policy
//!
//! ```rust
//! use resilient_netkit::resilience::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::exponential(4, Duration::from_millis(200), 2.0, Duration::from_secs(1));
//! assert_eq!(policy.attempt_plan(3).delay, Duration::from_millis(800));
//! assert!(!policy.attempt_plan(5).should_retry);
//! ```

pub mod circuit_breaker;
pub mod retry;
pub mod token_refresh;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState};
pub use retry::{AttemptPlan, RetryPolicy};
pub use token_refresh::{PendingRequest, TokenRefreshCoordinator};
