//! Executor configuration with type-safe validation.
//!
//! Bounded parameters use `nutype` so an out-of-range configuration cannot
//! be constructed, whether it is built in code or deserialized.

use std::time::Duration;

use nutype::nutype;
use serde::{Deserialize, Serialize};

/// Invocations slower than this are logged as warnings.
///
/// Validated to be between 1ms and 1 hour.
#[nutype(
    validate(greater_or_equal = 1, less_or_equal = 3_600_000),
    default = 1_000,
    derive(
        Debug,
        Clone,
        Copy,
        PartialEq,
        Eq,
        PartialOrd,
        Ord,
        Into,
        Default,
        Serialize,
        Deserialize
    )
)]
pub struct SlowInvocationThresholdMs(u64);

impl SlowInvocationThresholdMs {
    /// Convert to Duration for comparison with elapsed time.
    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.into())
    }
}

/// Tunables for a [`CommandExecutor`](super::CommandExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Threshold above which an invocation is logged at `WARN`.
    pub slow_invocation_threshold: SlowInvocationThresholdMs,
    /// Whether invocation counters are updated.
    pub record_metrics: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            slow_invocation_threshold: SlowInvocationThresholdMs::default(),
            record_metrics: true,
        }
    }
}

impl ExecutorConfig {
    /// Sets the slow invocation threshold.
    #[must_use]
    pub const fn with_slow_invocation_threshold(mut self, threshold: SlowInvocationThresholdMs) -> Self {
        self.slow_invocation_threshold = threshold;
        self
    }

    /// Enables or disables invocation counters.
    #[must_use]
    pub const fn with_metrics(mut self, enabled: bool) -> Self {
        self.record_metrics = enabled;
        self
    }
}
