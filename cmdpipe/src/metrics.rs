//! Invocation counters for observability.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counter metric for incrementing values
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    /// Creates a counter at zero.
    pub const fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    /// Adds one.
    pub fn increment(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    /// Current value.
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Resets to zero.
    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

/// Counters maintained by a [`CommandExecutor`](crate::executor::CommandExecutor).
///
/// Every started invocation ends in exactly one of `completed`, `failed` or
/// `short_circuited` unless its future is dropped first.
#[derive(Debug, Default)]
pub struct ExecutorMetrics {
    invocations: Counter,
    completed: Counter,
    failed: Counter,
    short_circuited: Counter,
}

impl ExecutorMetrics {
    /// Creates zeroed counters.
    pub const fn new() -> Self {
        Self {
            invocations: Counter::new(),
            completed: Counter::new(),
            failed: Counter::new(),
            short_circuited: Counter::new(),
        }
    }

    pub(crate) fn record_started(&self) {
        self.invocations.increment();
    }

    pub(crate) fn record_completed(&self) {
        self.completed.increment();
    }

    pub(crate) fn record_failed(&self) {
        self.failed.increment();
    }

    pub(crate) fn record_short_circuited(&self) {
        self.short_circuited.increment();
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            invocations: self.invocations.get(),
            completed: self.completed.get(),
            failed: self.failed.get(),
            short_circuited: self.short_circuited.get(),
        }
    }

    /// Resets every counter to zero.
    pub fn reset(&self) {
        self.invocations.reset();
        self.completed.reset();
        self.failed.reset();
        self.short_circuited.reset();
    }
}

/// Values of [`ExecutorMetrics`] at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Invocations started.
    pub invocations: u64,
    /// Invocations where the command ran and no error escaped the pipeline.
    pub completed: u64,
    /// Invocations that returned an error.
    pub failed: u64,
    /// Invocations where a middleware skipped the command without an error.
    pub short_circuited: u64,
}
