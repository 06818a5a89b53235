//! Async driver for a [`Session`].
//!
//! One tokio task per attempt. The session lives behind a `std` mutex that
//! is never held across an `.await`; the provider call is the only
//! suspension point and runs outside the lock.

use std::sync::{Arc, Mutex, MutexGuard};

use fg_location::{AcquireOptions, LocationProvider};
use fg_schemas::{Actor, ActorId, Zone};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::{ApplyResult, AttemptId, Session, SessionSnapshot, SessionState, VerificationOutcome};

struct Inner {
    session: Session,
    inflight: Option<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    zones: Arc<[Zone]>,
    provider: Arc<dyn LocationProvider>,
    options: AcquireOptions,
    updates: watch::Sender<SessionSnapshot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn finish(&self, attempt: AttemptId, outcome: VerificationOutcome) {
        let mut inner = self.lock();
        if inner.session.apply(attempt, outcome) == ApplyResult::Stale {
            return;
        }
        inner.inflight = None;
        let snap = inner.session.snapshot();
        info!(
            actor = %snap.actor_id,
            attempt = attempt.0,
            state = snap.state.as_str(),
            zone = snap.matched_zone.as_ref().map(|z| z.id.as_str()),
            error = snap.error_kind.map(|e| e.as_str()),
            "verification settled"
        );
        self.updates.send_replace(snap);
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        let inner = match self.inner.get_mut() {
            Ok(i) => i,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(task) = inner.inflight.take() {
            task.abort();
        }
    }
}

/// Cloneable handle to one verification session.
///
/// Dropping the last clone aborts any in-flight attempt.
#[derive(Clone)]
pub struct VerificationHandle {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for VerificationHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationHandle")
            .field("provider", &self.shared.provider.name())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}

/// Create a session for `actor` and start its first attempt immediately.
///
/// `zones` is the actor's authorized zone set in precedence order; the
/// first zone containing the fix wins.
///
/// Must be called from within a tokio runtime.
pub fn start_verification(
    actor: &Actor,
    zones: Vec<Zone>,
    provider: Arc<dyn LocationProvider>,
    options: AcquireOptions,
) -> VerificationHandle {
    let handle = VerificationHandle::new(Session::new(actor), zones, provider, options);
    handle.verify();
    handle
}

impl VerificationHandle {
    /// Wrap an (idle) session without starting a check.
    pub fn new(
        session: Session,
        zones: Vec<Zone>,
        provider: Arc<dyn LocationProvider>,
        options: AcquireOptions,
    ) -> Self {
        let (updates, _rx) = watch::channel(session.snapshot());
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    session,
                    inflight: None,
                }),
                zones: zones.into(),
                provider,
                options,
                updates,
            }),
        }
    }

    /// Start a check, superseding any attempt still in flight.
    ///
    /// Must be called from within a tokio runtime.
    pub fn verify(&self) -> AttemptId {
        let mut inner = self.shared.lock();
        let superseded = inner.session.state() == SessionState::Checking;
        let attempt = inner.session.begin_attempt();

        if let Some(stale) = inner.inflight.take() {
            stale.abort();
        }

        let weak = Arc::downgrade(&self.shared);
        let provider = Arc::clone(&self.shared.provider);
        let zones = Arc::clone(&self.shared.zones);
        let options = self.shared.options;
        inner.inflight = Some(tokio::spawn(async move {
            let acquired = provider.acquire_position(&options).await;
            let outcome = VerificationOutcome::from_acquisition(acquired, &zones);
            if let Some(shared) = weak.upgrade() {
                shared.finish(attempt, outcome);
            }
        }));

        info!(
            actor = %inner.session.actor_id(),
            attempt = attempt.0,
            provider = self.shared.provider.name(),
            superseded,
            "verification started"
        );
        self.shared.updates.send_replace(inner.session.snapshot());
        attempt
    }

    /// Manual retry. Same as [`verify`](Self::verify); there is no retry cap
    /// at this layer.
    pub fn retry(&self) -> AttemptId {
        self.verify()
    }

    /// Abort any in-flight attempt and return to `Idle` (logout).
    pub fn reset(&self) {
        let mut inner = self.shared.lock();
        if let Some(task) = inner.inflight.take() {
            task.abort();
        }
        inner.session.reset();
        info!(actor = %inner.session.actor_id(), "verification reset");
        self.shared.updates.send_replace(inner.session.snapshot());
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.shared.lock().session.snapshot()
    }

    pub fn actor_id(&self) -> ActorId {
        self.shared.lock().session.actor_id().clone()
    }

    pub fn zones(&self) -> &[Zone] {
        &self.shared.zones
    }

    /// Receive every published snapshot (start, settle, reset).
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Wait until the session is not `Checking` and return that snapshot.
    ///
    /// Returns immediately for an `Idle` session.
    pub async fn settled(&self) -> SessionSnapshot {
        let mut rx = self.subscribe();
        loop {
            {
                let snap = rx.borrow_and_update();
                if snap.state != SessionState::Checking {
                    return snap.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.snapshot();
            }
        }
    }
}
