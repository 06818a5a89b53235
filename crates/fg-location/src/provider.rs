use std::sync::{Mutex, MutexGuard};

use fg_schemas::PositionSample;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::{AcquireOptions, LocationError};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Contract the verification session depends on.
///
/// # Guarantees an implementation must give
///
/// - Exactly one resolution per call, success or failure, never both.
/// - Resolution within `options.timeout` (plus scheduling slack).
/// - At most one underlying device read per call.
/// - Dropping the returned future cancels the read.
#[async_trait::async_trait]
pub trait LocationProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn acquire_position(
        &self,
        options: &AcquireOptions,
    ) -> Result<PositionSample, LocationError>;
}

/// A raw position capability (device GPS, browser relay, fixed test fix).
///
/// Sources make no timing promises; wrap them in [`BoundedProvider`].
#[async_trait::async_trait]
pub trait PositionSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn read(&self, high_accuracy: bool) -> Result<PositionSample, LocationError>;
}

// ---------------------------------------------------------------------------
// BoundedProvider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CachedFix {
    sample: PositionSample,
    obtained_at: Instant,
}

/// Adds the timeout and the cached-fix policy on top of a raw source.
///
/// Only successful reads are cached. Failures always go back to the caller
/// and leave any earlier cached fix untouched.
#[derive(Debug)]
pub struct BoundedProvider<S> {
    source: S,
    cache: Mutex<Option<CachedFix>>,
}

impl<S: PositionSource> BoundedProvider<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Forget any cached fix so the next call always reads the source.
    pub fn clear_cache(&self) {
        *self.lock_cache() = None;
    }

    fn cached(&self, max_age: std::time::Duration) -> Option<PositionSample> {
        if max_age.is_zero() {
            return None;
        }
        let cache = self.lock_cache();
        let fix = cache.as_ref()?;
        if fix.obtained_at.elapsed() < max_age {
            Some(fix.sample.clone())
        } else {
            None
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, Option<CachedFix>> {
        // The cache is a plain value; a poisoned lock still holds a usable one.
        match self.cache.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait::async_trait]
impl<S: PositionSource> LocationProvider for BoundedProvider<S> {
    fn name(&self) -> &'static str {
        self.source.name()
    }

    async fn acquire_position(
        &self,
        options: &AcquireOptions,
    ) -> Result<PositionSample, LocationError> {
        if let Some(sample) = self.cached(options.max_cached_age) {
            debug!(source = self.source.name(), "location served from cache");
            return Ok(sample);
        }

        let read = self.source.read(options.high_accuracy);
        match tokio::time::timeout(options.timeout, read).await {
            Ok(Ok(sample)) => {
                debug!(
                    source = self.source.name(),
                    lat = sample.coordinate.latitude,
                    lon = sample.coordinate.longitude,
                    accuracy_m = sample.accuracy_meters,
                    "location acquired"
                );
                *self.lock_cache() = Some(CachedFix {
                    sample: sample.clone(),
                    obtained_at: Instant::now(),
                });
                Ok(sample)
            }
            Ok(Err(err)) => {
                warn!(source = self.source.name(), error = err.as_str(), "location read failed");
                Err(err)
            }
            Err(_elapsed) => {
                warn!(
                    source = self.source.name(),
                    timeout_ms = options.timeout.as_millis() as u64,
                    "location read timed out"
                );
                Err(LocationError::Timeout)
            }
        }
    }
}
