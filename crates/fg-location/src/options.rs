use std::time::Duration;

/// Per-call acquisition options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquireOptions {
    /// Upper bound on the whole call, cache lookup included.
    pub timeout: Duration,
    /// A cached fix younger than this satisfies the call without a device
    /// read. `Duration::ZERO` disables the cache.
    pub max_cached_age: Duration,
    /// Ask the source for its most accurate (slower, costlier) mode.
    pub high_accuracy: bool,
}

impl AcquireOptions {
    pub fn from_millis(timeout_ms: u64, max_cached_age_ms: u64, high_accuracy: bool) -> Self {
        Self {
            timeout: Duration::from_millis(timeout_ms),
            max_cached_age: Duration::from_millis(max_cached_age_ms),
            high_accuracy,
        }
    }
}

impl Default for AcquireOptions {
    /// 10 s timeout, 60 s cache, high accuracy.
    fn default() -> Self {
        Self::from_millis(10_000, 60_000, true)
    }
}
