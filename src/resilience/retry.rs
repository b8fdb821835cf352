use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONSTANT_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_MULTIPLIER: f64 = 1.5;
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Decision for one attempt number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptPlan {
    pub should_retry: bool,
    pub delay: Duration,
}

impl AttemptPlan {
    pub const STOP: AttemptPlan = AttemptPlan {
        should_retry: false,
        delay: Duration::ZERO,
    };

    fn retry_after(delay: Duration) -> Self {
        Self {
            should_retry: true,
            delay,
        }
    }
}

/// How many times, and how far apart, a failed request is re-attempted.
///
/// Attempt 0 is the first try; `attempt_plan(n)` answers whether attempt `n`
/// (n ≥ 1) should happen and after what delay.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RetryPolicy {
    #[default]
    None,
    Constant {
        count: u32,
        #[serde(with = "duration_ms")]
        delay: Duration,
    },
    Exponential {
        count: u32,
        #[serde(with = "duration_ms")]
        initial_delay: Duration,
        multiplier: f64,
        #[serde(with = "duration_ms")]
        max_delay: Duration,
    },
}

impl RetryPolicy {
    pub fn constant(count: u32, delay: Duration) -> Self {
        RetryPolicy::Constant { count, delay }
    }

    /// Constant policy with the default 3s delay.
    pub fn constant_default(count: u32) -> Self {
        Self::constant(count, DEFAULT_CONSTANT_DELAY)
    }

    pub fn exponential(
        count: u32,
        initial_delay: Duration,
        multiplier: f64,
        max_delay: Duration,
    ) -> Self {
        RetryPolicy::Exponential {
            count,
            initial_delay,
            multiplier,
            max_delay,
        }
    }

    /// Exponential policy with 1s initial delay, ×1.5, capped at 30s.
    pub fn exponential_default(count: u32) -> Self {
        Self::exponential(count, DEFAULT_INITIAL_DELAY, DEFAULT_MULTIPLIER, DEFAULT_MAX_DELAY)
    }

    pub fn retry_count(&self) -> u32 {
        match self {
            RetryPolicy::None => 0,
            RetryPolicy::Constant { count, .. } | RetryPolicy::Exponential { count, .. } => *count,
        }
    }

    /// Pure and total; never panics.
    pub fn attempt_plan(&self, attempt: u32) -> AttemptPlan {
        if attempt > self.retry_count() {
            return AttemptPlan::STOP;
        }
        match *self {
            RetryPolicy::None => AttemptPlan::STOP,
            RetryPolicy::Constant { delay, .. } => AttemptPlan::retry_after(delay),
            RetryPolicy::Exponential {
                initial_delay,
                multiplier,
                max_delay,
                ..
            } => {
                // Exponential delays are only defined from the first retry on.
                if attempt == 0 {
                    return AttemptPlan::STOP;
                }
                let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
                let secs = initial_delay.as_secs_f64() * multiplier.powi(exponent);
                let capped = secs.min(max_delay.as_secs_f64());
                match Duration::try_from_secs_f64(capped) {
                    Ok(delay) => AttemptPlan::retry_after(delay),
                    // Negative or NaN: refuse rather than clamp.
                    Err(_) => AttemptPlan::STOP,
                }
            }
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
