//! Verification session state machine.
//!
//! # Invariants
//!
//! - **State mirrors the last outcome**: whenever the state is `Verified`,
//!   `Denied` or `Failed`, it equals `last_outcome.status`.
//!
//! - **Matched zones are authorized zones**: a `Verified` outcome whose zone
//!   is not in the session's authorized set (by default the actor's assigned
//!   zones) is downgraded to `Denied` on apply.
//!
//! - **Last attempt started wins**: every `begin_attempt` issues a fresh
//!   [`AttemptId`]. `apply` only accepts the current id while `Checking`;
//!   anything else is reported `Stale` and leaves the session untouched.
//!
//! - **Attempt ids are never reused**: ids come from a counter that `reset`
//!   does not clear, so an outcome from before a logout can never match an
//!   attempt started after it. `attempt_count` is the user-facing tally and
//!   does restart at zero.
//!
//! All logic is pure deterministic: no IO, no clock, no async.

use fg_location::LocationError;
use fg_schemas::{Actor, ActorId, PositionSample, Zone, ZoneId};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{VerificationOutcome, VerificationStatus};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No check has been started since creation or the last reset.
    Idle,
    /// An attempt is in flight.
    Checking,
    Verified,
    Denied,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Checking => "checking",
            SessionState::Verified => "verified",
            SessionState::Denied => "denied",
            SessionState::Failed => "failed",
        }
    }

    /// `true` for the three states an attempt can end in.
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            SessionState::Verified | SessionState::Denied | SessionState::Failed
        )
    }
}

impl From<VerificationStatus> for SessionState {
    fn from(s: VerificationStatus) -> Self {
        match s {
            VerificationStatus::Verified => SessionState::Verified,
            VerificationStatus::Denied => SessionState::Denied,
            VerificationStatus::Failed => SessionState::Failed,
        }
    }
}

/// Identifies one attempt within one session. Strictly increasing for the
/// life of the session, including across `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    Applied,
    /// The attempt was superseded or already resolved; nothing changed.
    Stale,
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Read-only view for rendering and for the authorization gate.
///
/// `matched_zone`, `error_kind` and `sample` are only populated once the
/// session has settled; while `Checking` they are `None` even if an earlier
/// attempt produced values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub actor_id: ActorId,
    pub state: SessionState,
    pub matched_zone: Option<Zone>,
    pub error_kind: Option<LocationError>,
    pub sample: Option<PositionSample>,
    pub attempt_count: u64,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    actor_id: ActorId,
    authorized_zone_ids: Vec<ZoneId>,
    state: SessionState,
    last_outcome: Option<VerificationOutcome>,
    attempt_count: u64,
    next_attempt: u64,
    current_attempt: Option<AttemptId>,
}

impl Session {
    /// A fresh `Idle` session authorizing the actor's assigned zones.
    pub fn new(actor: &Actor) -> Self {
        Self::with_authorized(actor.id.clone(), actor.assigned_zone_ids.clone())
    }

    /// A fresh `Idle` session with an explicit authorized zone set (the
    /// time-in flow authorizes assigned children's home zones instead).
    pub fn with_authorized(actor_id: ActorId, authorized_zone_ids: Vec<ZoneId>) -> Self {
        Self {
            actor_id,
            authorized_zone_ids,
            state: SessionState::Idle,
            last_outcome: None,
            attempt_count: 0,
            next_attempt: 0,
            current_attempt: None,
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// Start a check (from `Idle`) or retry (from any settled state).
    ///
    /// Called while already `Checking`, this supersedes the in-flight attempt:
    /// its id stops being current and its eventual resolution is discarded.
    pub fn begin_attempt(&mut self) -> AttemptId {
        if self.state == SessionState::Checking {
            debug!(
                actor = %self.actor_id,
                superseded = ?self.current_attempt,
                "superseding in-flight verification attempt"
            );
        }
        self.attempt_count += 1;
        self.next_attempt += 1;
        let id = AttemptId(self.next_attempt);
        self.current_attempt = Some(id);
        self.state = SessionState::Checking;
        id
    }

    /// Apply the outcome of `attempt`.
    pub fn apply(&mut self, attempt: AttemptId, outcome: VerificationOutcome) -> ApplyResult {
        if self.state != SessionState::Checking || self.current_attempt != Some(attempt) {
            debug!(
                actor = %self.actor_id,
                attempt = attempt.0,
                current = ?self.current_attempt,
                state = self.state.as_str(),
                "discarding stale verification outcome"
            );
            return ApplyResult::Stale;
        }

        let outcome = self.enforce_assignment(outcome);
        self.state = outcome.status.into();
        self.last_outcome = Some(outcome);
        ApplyResult::Applied
    }

    /// Back to `Idle` (logout). Any in-flight attempt becomes stale; the
    /// attempt tally restarts but attempt ids keep increasing.
    pub fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.last_outcome = None;
        self.attempt_count = 0;
        self.current_attempt = None;
    }

    fn enforce_assignment(&self, outcome: VerificationOutcome) -> VerificationOutcome {
        match (&outcome.matched_zone, &outcome.sample) {
            (Some(zone), Some(sample)) if !self.authorized_zone_ids.contains(&zone.id) => {
                warn!(
                    actor = %self.actor_id,
                    zone = %zone.id,
                    "matched zone is not authorized for actor; treating as denied"
                );
                VerificationOutcome::denied(sample.clone())
            }
            _ => outcome,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn last_outcome(&self) -> Option<&VerificationOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn attempt_count(&self) -> u64 {
        self.attempt_count
    }

    pub fn current_attempt(&self) -> Option<AttemptId> {
        self.current_attempt
    }

    pub fn is_verified(&self) -> bool {
        self.state == SessionState::Verified
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let settled = if self.state.is_settled() {
            self.last_outcome.as_ref()
        } else {
            None
        };
        SessionSnapshot {
            actor_id: self.actor_id.clone(),
            state: self.state,
            matched_zone: settled.and_then(|o| o.matched_zone.clone()),
            error_kind: settled.and_then(|o| o.error_kind),
            sample: settled.and_then(|o| o.sample.clone()),
            attempt_count: self.attempt_count,
        }
    }
}
