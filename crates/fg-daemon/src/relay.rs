//! Device-fix relay.
//!
//! The daemon has no GPS. The client (browser / phone) owns the device
//! geolocation and posts each fix, or the error it got, to the session. A
//! [`RelaySource`] turns those posts into a `PositionSource` so the normal
//! `BoundedProvider` timeout and cache apply unchanged.
//!
//! # Hand-off rules
//!
//! - A post while a read is waiting resolves that read.
//! - A post with no read waiting is staged; the next read takes it.
//!   Only the latest staged post is kept.
//! - A staged post older than the relay's `max_staged_age` is discarded by
//!   the read instead of being served. Daemon sessions set it to the read
//!   timeout and clear the stage whenever a check starts, so only a post
//!   made during the current attempt can satisfy it.
//! - A read abandoned by the provider (timeout, supersede) leaves nothing
//!   behind; a later post is staged for the next read.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use fg_location::{LocationError, PositionSource};
use fg_schemas::PositionSample;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

type Reading = Result<PositionSample, LocationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayDelivery {
    /// Handed to a read that was waiting.
    Delivered,
    /// Held for the next read.
    Staged,
}

#[derive(Debug)]
struct StagedPost {
    reading: Reading,
    posted_at: Instant,
}

#[derive(Debug, Default)]
struct RelayInner {
    waiting: Option<oneshot::Sender<Reading>>,
    staged: Option<StagedPost>,
}

/// Cloneable; clones share one relay slot.
#[derive(Debug, Clone)]
pub struct RelaySource {
    inner: Arc<Mutex<RelayInner>>,
    max_staged_age: Duration,
}

impl RelaySource {
    /// A relay whose staged posts stay servable for `max_staged_age`.
    pub fn new(max_staged_age: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RelayInner::default())),
            max_staged_age,
        }
    }

    fn lock(&self) -> MutexGuard<'_, RelayInner> {
        // A poisoned relay only ever holds plain data; keep serving it.
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn post(&self, reading: Reading) -> RelayDelivery {
        let mut inner = self.lock();
        let reading = match inner.waiting.take() {
            Some(tx) => match tx.send(reading) {
                Ok(()) => return RelayDelivery::Delivered,
                // The read was abandoned; keep the post for the next one.
                Err(returned) => returned,
            },
            None => reading,
        };
        inner.staged = Some(StagedPost {
            reading,
            posted_at: Instant::now(),
        });
        RelayDelivery::Staged
    }

    /// Drop any staged post.
    pub fn clear(&self) {
        self.lock().staged = None;
    }
}

#[async_trait]
impl PositionSource for RelaySource {
    fn name(&self) -> &'static str {
        "client-relay"
    }

    async fn read(&self, high_accuracy: bool) -> Result<PositionSample, LocationError> {
        let rx = {
            let mut inner = self.lock();
            if let Some(staged) = inner.staged.take() {
                let age = staged.posted_at.elapsed();
                if age <= self.max_staged_age {
                    debug!(high_accuracy, "relay read served from staged post");
                    return staged.reading;
                }
                debug!(
                    age_ms = age.as_millis() as u64,
                    max_age_ms = self.max_staged_age.as_millis() as u64,
                    "discarding expired staged post"
                );
            }
            let (tx, rx) = oneshot::channel();
            inner.waiting = Some(tx);
            rx
        };
        // Sender dropped without a post: nothing will ever arrive.
        rx.await.unwrap_or(Err(LocationError::PositionUnavailable))
    }
}
