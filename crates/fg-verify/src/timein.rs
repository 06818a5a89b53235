//! Time-in: record that a field worker arrived at an assigned child's home.
//!
//! The core only decides and emits; persisting attendance belongs to the
//! attendance subsystem behind [`AttendanceSink`].

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use fg_location::{AcquireOptions, LocationProvider};
use fg_schemas::{Actor, ActorId, Child, ChildId, Zone, ZoneId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{Session, SessionSnapshot, SessionState, VerificationHandle};

// ---------------------------------------------------------------------------
// Event + sink
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeInEvent {
    pub actor_id: ActorId,
    pub child_id: ChildId,
    pub zone_id: ZoneId,
    pub recorded_at: DateTime<Utc>,
}

/// Receiver of successful time-in events (owned by the attendance subsystem).
pub trait AttendanceSink: Send + Sync {
    fn record_time_in(&self, event: &TimeInEvent) -> anyhow::Result<()>;
}

/// Keeps events in memory. Used by the daemon and tests.
#[derive(Debug, Default)]
pub struct MemoryAttendanceSink {
    events: Mutex<Vec<TimeInEvent>>,
}

impl MemoryAttendanceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TimeInEvent> {
        match self.events.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AttendanceSink for MemoryAttendanceSink {
    fn record_time_in(&self, event: &TimeInEvent) -> anyhow::Result<()> {
        let mut events = self
            .events
            .lock()
            .map_err(|_| anyhow::anyhow!("attendance sink lock poisoned"))?;
        events.push(event.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum TimeInError {
    /// The session belongs to someone else.
    SessionMismatch { session: ActorId, actor: ActorId },
    /// Time-in needs a `Verified` session.
    NotVerified(SessionState),
    ChildNotAssigned(ChildId),
    /// The verified zone is not this child's home.
    ChildNotAtZone { child_id: ChildId, zone_id: ZoneId },
    /// No assigned child lives at the verified zone.
    NoChildAtZone(ZoneId),
    Sink(String),
}

impl fmt::Display for TimeInError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeInError::SessionMismatch { session, actor } => {
                write!(f, "session belongs to {session}, not {actor}")
            }
            TimeInError::NotVerified(state) => {
                write!(f, "location not verified (session is {})", state.as_str())
            }
            TimeInError::ChildNotAssigned(c) => write!(f, "child {c} is not assigned to actor"),
            TimeInError::ChildNotAtZone { child_id, zone_id } => {
                write!(f, "child {child_id} does not live at zone {zone_id}")
            }
            TimeInError::NoChildAtZone(z) => write!(f, "no assigned child lives at zone {z}"),
            TimeInError::Sink(msg) => write!(f, "failed to record time-in: {msg}"),
        }
    }
}

impl std::error::Error for TimeInError {}

// ---------------------------------------------------------------------------
// Zone set
// ---------------------------------------------------------------------------

/// Home zones of the actor's assigned children, in assignment order.
///
/// Children without a home zone, or whose zone is missing from `directory`,
/// contribute nothing.
pub fn time_in_zones(actor: &Actor, children: &[Child], directory: &[Zone]) -> Vec<Zone> {
    let ids: Vec<ZoneId> = actor
        .assigned_child_ids
        .iter()
        .filter_map(|cid| children.iter().find(|c| &c.id == cid))
        .filter_map(|c| c.home_zone_id.clone())
        .collect();
    fg_geo::resolve_zones(&ids, directory)
}

impl VerificationHandle {
    /// An idle session whose authorized set is the assigned children's home
    /// zones rather than the actor's own zone assignments.
    pub fn for_time_in(
        actor: &Actor,
        children: &[Child],
        directory: &[Zone],
        provider: Arc<dyn LocationProvider>,
        options: AcquireOptions,
    ) -> Self {
        let zones = time_in_zones(actor, children, directory);
        let authorized = zones.iter().map(|z| z.id.clone()).collect();
        let session = Session::with_authorized(actor.id.clone(), authorized);
        VerificationHandle::new(session, zones, provider, options)
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Emit a time-in event for a verified session.
///
/// With `child_id = None` the first assigned child (assignment order) whose
/// home is the matched zone is chosen.
pub fn record_time_in(
    actor: &Actor,
    snapshot: &SessionSnapshot,
    children: &[Child],
    child_id: Option<&ChildId>,
    sink: &dyn AttendanceSink,
    now: DateTime<Utc>,
) -> Result<TimeInEvent, TimeInError> {
    if snapshot.actor_id != actor.id {
        return Err(TimeInError::SessionMismatch {
            session: snapshot.actor_id.clone(),
            actor: actor.id.clone(),
        });
    }
    let zone = match (&snapshot.state, &snapshot.matched_zone) {
        (SessionState::Verified, Some(zone)) => zone,
        (state, _) => return Err(TimeInError::NotVerified(*state)),
    };

    let mut at_zone = actor
        .assigned_child_ids
        .iter()
        .filter_map(|cid| children.iter().find(|c| &c.id == cid))
        .filter(|c| c.home_zone_id.as_ref() == Some(&zone.id));

    let child = match child_id {
        Some(wanted) => {
            if !actor.is_assigned_child(wanted) {
                return Err(TimeInError::ChildNotAssigned(wanted.clone()));
            }
            at_zone
                .find(|c| &c.id == wanted)
                .ok_or_else(|| TimeInError::ChildNotAtZone {
                    child_id: wanted.clone(),
                    zone_id: zone.id.clone(),
                })?
        }
        None => at_zone
            .next()
            .ok_or_else(|| TimeInError::NoChildAtZone(zone.id.clone()))?,
    };

    let event = TimeInEvent {
        actor_id: actor.id.clone(),
        child_id: child.id.clone(),
        zone_id: zone.id.clone(),
        recorded_at: now,
    };
    sink.record_time_in(&event)
        .map_err(|e| TimeInError::Sink(format!("{e:#}")))?;

    info!(
        actor = %event.actor_id,
        child = %event.child_id,
        zone = %event.zone_id,
        "time-in recorded"
    );
    Ok(event)
}
