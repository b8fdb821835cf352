use crate::Error;
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open { opened_at: Instant },
    HalfOpen,
}

impl CircuitState {
    pub fn name(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open { .. } => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerSnapshot {
    pub state: &'static str,
    pub failure_threshold: u32,
    pub open_timeout_ms: u64,
    pub failure_count: u32,
    pub half_open_requests: u32,
    /// Remaining open time in ms, if currently open.
    pub open_remaining_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    #[serde(rename = "open_timeout_ms", with = "open_timeout_ms")]
    pub open_timeout: Duration,
    pub half_open_max_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 8,
            open_timeout: Duration::from_secs(15),
            half_open_max_requests: 3,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `NETKIT_BREAKER_*` environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Some(v) = env_u64("NETKIT_BREAKER_FAILURE_THRESHOLD") {
            cfg.failure_threshold = v.min(u32::MAX as u64) as u32;
        }
        if let Some(v) = env_u64("NETKIT_BREAKER_OPEN_TIMEOUT_MS") {
            cfg.open_timeout = Duration::from_millis(v);
        }
        if let Some(v) = env_u64("NETKIT_BREAKER_HALF_OPEN_MAX_REQUESTS") {
            cfg.half_open_max_requests = v.min(u32::MAX as u64) as u32;
        }
        cfg
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    pub fn with_half_open_max_requests(mut self, max: u32) -> Self {
        self.half_open_max_requests = max;
        self
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|s| s.parse::<u64>().ok())
}

mod open_timeout_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[derive(Debug)]
struct State {
    circuit: CircuitState,
    failure_count: u32,
    half_open_requests: u32,
}

impl State {
    fn closed() -> Self {
        Self {
            circuit: CircuitState::Closed,
            failure_count: 0,
            half_open_requests: 0,
        }
    }
}

/// Three-state circuit breaker.
///
/// - Only server errors (5xx) count as failures
/// - Opens once `failure_threshold` is reached
/// - After `open_timeout`, lets `half_open_max_requests` probes through
/// - A probe success closes the circuit again
///
/// A half-open failure only counts toward `failure_threshold`; it does not
/// reopen the circuit on its own. Once `half_open_max_requests` is spent
/// without a success or enough failures to reopen, every request is rejected
/// until a success is reported or [`CircuitBreaker::reset`] is called.
pub struct CircuitBreaker {
    cfg: CircuitBreakerConfig,
    state: Mutex<State>,
}

impl CircuitBreaker {
    pub fn new(cfg: CircuitBreakerConfig) -> Self {
        Self {
            cfg,
            state: Mutex::new(State::closed()),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.cfg
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn should_allow_request(&self) -> bool {
        self.should_allow_request_at(Instant::now())
    }

    fn should_allow_request_at(&self, now: Instant) -> bool {
        let mut st = self.lock();
        match st.circuit {
            CircuitState::Closed => true,
            CircuitState::Open { opened_at } => {
                if now.saturating_duration_since(opened_at) > self.cfg.open_timeout {
                    st.circuit = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if st.half_open_requests < self.cfg.half_open_max_requests {
                    st.half_open_requests += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Closes a half-open circuit. No-op in any other state.
    pub fn report_success(&self) {
        let mut st = self.lock();
        if st.circuit == CircuitState::HalfOpen {
            *st = State::closed();
        }
    }

    /// Counts server errors toward the threshold; other errors are ignored.
    pub fn report_failure(&self, error: &Error) {
        if !error.is_server_failure() {
            return;
        }
        let mut st = self.lock();
        st.failure_count = st.failure_count.saturating_add(1);
        if st.failure_count >= self.cfg.failure_threshold {
            st.circuit = CircuitState::Open {
                opened_at: Instant::now(),
            };
            st.failure_count = 0;
        }
    }

    pub fn state(&self) -> CircuitState {
        self.lock().circuit
    }

    /// Forces the breaker back to `Closed` with zeroed counters.
    pub fn reset(&self) {
        *self.lock() = State::closed();
    }

    pub fn snapshot(&self) -> CircuitBreakerSnapshot {
        let now = Instant::now();
        let st = self.lock();
        let open_remaining_ms = match st.circuit {
            CircuitState::Open { opened_at } => {
                let until = opened_at + self.cfg.open_timeout;
                (until > now).then(|| (until - now).as_millis() as u64)
            }
            _ => None,
        };
        CircuitBreakerSnapshot {
            state: st.circuit.name(),
            failure_threshold: self.cfg.failure_threshold,
            open_timeout_ms: self.cfg.open_timeout.as_millis() as u64,
            failure_count: st.failure_count,
            half_open_requests: st.half_open_requests,
            open_remaining_ms,
        }
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ResponseHeaders;
    use std::sync::Arc;
    use std::thread;

    fn server_error() -> Error {
        Error::Server {
            status: 500,
            headers: ResponseHeaders::default(),
            body: None,
        }
    }

    fn breaker(threshold: u32, timeout: Duration, probes: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            CircuitBreakerConfig::new()
                .with_failure_threshold(threshold)
                .with_open_timeout(timeout)
                .with_half_open_max_requests(probes),
        )
    }

    #[test]
    fn test_config_defaults() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.failure_threshold, 8);
        assert_eq!(config.open_timeout, Duration::from_secs(15));
        assert_eq!(config.half_open_max_requests, 3);
    }

    #[test]
    fn test_config_deserialize() {
        let config: CircuitBreakerConfig =
            serde_json::from_str(r#"{"failure_threshold":2,"open_timeout_ms":500}"#).unwrap();
        assert_eq!(config.failure_threshold, 2);
        assert_eq!(config.open_timeout, Duration::from_millis(500));
        assert_eq!(config.half_open_max_requests, 3);
    }

    #[test]
    fn test_initial_state() {
        let cb = CircuitBreaker::default();
        assert!(cb.should_allow_request());
        assert_eq!(cb.state(), CircuitState::Closed);
        let snapshot = cb.snapshot();
        assert_eq!(snapshot.state, "closed");
        assert_eq!(snapshot.failure_count, 0);
        assert!(snapshot.open_remaining_ms.is_none());
    }

    #[test]
    fn test_opens_at_threshold() {
        let cb = breaker(3, Duration::from_secs(30), 1);
        cb.report_failure(&server_error());
        cb.report_failure(&server_error());
        assert!(cb.should_allow_request());

        cb.report_failure(&server_error());
        assert!(matches!(cb.state(), CircuitState::Open { .. }));
        assert!(!cb.should_allow_request());
        let snapshot = cb.snapshot();
        assert_eq!(snapshot.failure_count, 0);
        assert!(snapshot.open_remaining_ms.is_some());
    }

    #[test]
    fn test_non_server_errors_do_not_count() {
        let cb = breaker(1, Duration::from_secs(30), 1);
        cb.report_failure(&Error::Canceled);
        cb.report_failure(&Error::DataMissing);
        cb.report_failure(&Error::Custom {
            code: Some(401),
            message: None,
        });
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.snapshot().failure_count, 0);
    }

    #[test]
    fn test_half_open_probe_budget() {
        let cb = breaker(1, Duration::from_millis(20), 2);
        cb.report_failure(&server_error());
        assert!(!cb.should_allow_request());

        let later = Instant::now() + Duration::from_millis(50);
        // The transition itself is not counted as a probe.
        assert!(cb.should_allow_request_at(later));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.should_allow_request_at(later));
        assert!(cb.should_allow_request_at(later));
        assert!(!cb.should_allow_request_at(later));
        assert_eq!(cb.snapshot().half_open_requests, 2);
    }

    #[test]
    fn test_spent_half_open_budget_rejects_until_reset() {
        let cb = breaker(2, Duration::from_millis(20), 1);
        cb.report_failure(&server_error());
        cb.report_failure(&server_error());
        assert!(!cb.should_allow_request());

        let later = Instant::now() + Duration::from_millis(50);
        assert!(cb.should_allow_request_at(later));
        assert!(cb.should_allow_request_at(later));
        cb.report_failure(&server_error());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.snapshot().failure_count, 1);

        let much_later = later + Duration::from_secs(60);
        for _ in 0..3 {
            assert!(!cb.should_allow_request_at(much_later));
        }
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.should_allow_request());
    }

    #[test]
    fn test_success_in_half_open_closes() {
        let cb = breaker(1, Duration::from_millis(10), 1);
        cb.report_failure(&server_error());
        thread::sleep(Duration::from_millis(20));
        assert!(cb.should_allow_request());
        assert!(cb.should_allow_request());

        cb.report_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        let snapshot = cb.snapshot();
        assert_eq!(snapshot.failure_count, 0);
        assert_eq!(snapshot.half_open_requests, 0);
    }

    #[test]
    fn test_success_outside_half_open_is_noop() {
        let cb = breaker(3, Duration::from_secs(30), 1);
        cb.report_failure(&server_error());
        cb.report_success();
        assert_eq!(cb.snapshot().failure_count, 1);
    }

    #[test]
    fn test_reset() {
        let cb = breaker(1, Duration::from_secs(30), 1);
        cb.report_failure(&server_error());
        assert!(!cb.should_allow_request());
        cb.reset();
        assert!(cb.should_allow_request());
    }

    #[test]
    fn test_thread_safe_counting() {
        let cb = Arc::new(breaker(1000, Duration::from_secs(30), 1));
        let mut handles = vec![];
        for _ in 0..10 {
            let cb = Arc::clone(&cb);
            handles.push(thread::spawn(move || {
                for _ in 0..5 {
                    cb.report_failure(&server_error());
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(cb.snapshot().failure_count, 50);
    }
}
