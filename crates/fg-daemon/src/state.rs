//! Shared runtime state for fg-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. Each verification
//! session owns its handle, its relay and a forwarder task that republishes
//! snapshot changes on the SSE bus.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use fg_config::{FieldGateConfig, LoadedConfig};
use fg_location::BoundedProvider;
use fg_schemas::{Actor, ActorId};
use fg_verify::{
    AttemptId, MemoryAttendanceSink, Session, SessionSnapshot, TimeInEvent, VerificationHandle,
};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch, RwLock};
use tracing::info;
use uuid::Uuid;

use crate::relay::RelaySource;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    Session {
        session_id: Uuid,
        snapshot: SessionSnapshot,
    },
    TimeIn(TimeInEvent),
    LogLine {
        level: String,
        msg: String,
    },
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// What a session is verifying for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPurpose {
    /// Gate access to the dashboard; zones are the actor's assignments.
    #[default]
    Access,
    /// Time in a child; zones are the assigned children's homes.
    TimeIn,
}

impl SessionPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionPurpose::Access => "access",
            SessionPurpose::TimeIn => "time_in",
        }
    }
}

pub struct SessionEntry {
    pub id: Uuid,
    pub actor: Actor,
    pub purpose: SessionPurpose,
    pub handle: VerificationHandle,
    pub relay: RelaySource,
}

impl SessionEntry {
    /// Start (or restart) the check. Posts staged before this point belong
    /// to an earlier attempt and are dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn begin_check(&self) -> AttemptId {
        self.relay.clear();
        self.handle.verify()
    }
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Shared across all Axum handlers behind an `Arc`.
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub config: Arc<FieldGateConfig>,
    pub config_hash: String,
    pub sessions: RwLock<HashMap<Uuid, Arc<SessionEntry>>>,
    /// In-memory attendance store; persistence is out of scope.
    pub attendance: MemoryAttendanceSink,
}

impl AppState {
    pub fn new(config: FieldGateConfig, config_hash: String) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "fg-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config: Arc::new(config),
            config_hash,
            sessions: RwLock::new(HashMap::new()),
            attendance: MemoryAttendanceSink::new(),
        }
    }

    pub fn from_loaded(loaded: &LoadedConfig) -> anyhow::Result<Self> {
        let config = FieldGateConfig::from_loaded(loaded)?;
        Ok(Self::new(config, loaded.config_hash.clone()))
    }

    pub fn actor(&self, id: &ActorId) -> Option<&Actor> {
        self.config.actor(id)
    }

    /// Register an idle session for `actor`. The caller decides whether to
    /// start the first check.
    ///
    /// An actor holds at most one session per purpose: a new login replaces
    /// (resets and forgets) the actor's earlier session of the same purpose.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn open_session(
        &self,
        actor: &Actor,
        purpose: SessionPurpose,
    ) -> Arc<SessionEntry> {
        let options = self.config.location;
        let relay = RelaySource::new(options.timeout);
        let provider = Arc::new(BoundedProvider::new(relay.clone()));

        let handle = match purpose {
            SessionPurpose::Access => VerificationHandle::new(
                Session::new(actor),
                self.config.zones_for(actor),
                provider,
                options,
            ),
            SessionPurpose::TimeIn => VerificationHandle::for_time_in(
                actor,
                &self.config.children,
                &self.config.zones,
                provider,
                options,
            ),
        };

        let entry = Arc::new(SessionEntry {
            id: Uuid::new_v4(),
            actor: actor.clone(),
            purpose,
            handle,
            relay,
        });
        spawn_session_forwarder(self.bus.clone(), entry.id, entry.handle.subscribe());

        let replaced: Vec<Arc<SessionEntry>> = {
            let mut sessions = self.sessions.write().await;
            let stale: Vec<Uuid> = sessions
                .values()
                .filter(|e| e.actor.id == actor.id && e.purpose == purpose)
                .map(|e| e.id)
                .collect();
            let replaced = stale.iter().filter_map(|id| sessions.remove(id)).collect();
            sessions.insert(entry.id, Arc::clone(&entry));
            replaced
        };
        for old in replaced {
            old.handle.reset();
            old.relay.clear();
            info!(
                session = %old.id,
                replaced_by = %entry.id,
                actor = %actor.id,
                "session replaced by new login"
            );
        }
        info!(
            session = %entry.id,
            actor = %actor.id,
            purpose = purpose.as_str(),
            zones = entry.handle.zones().len(),
            "session opened"
        );
        entry
    }

    pub async fn session(&self, id: Uuid) -> Option<Arc<SessionEntry>> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Logout: reset and forget the session. `None` if it did not exist.
    pub async fn close_session(&self, id: Uuid) -> Option<Arc<SessionEntry>> {
        let entry = self.sessions.write().await.remove(&id)?;
        entry.handle.reset();
        entry.relay.clear();
        info!(session = %id, actor = %entry.actor.id, "session closed");
        Some(entry)
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

/// Republish every snapshot change of one session on the bus.
///
/// Ends by itself once the session's handle is gone.
fn spawn_session_forwarder(
    bus: broadcast::Sender<BusMsg>,
    session_id: Uuid,
    mut updates: watch::Receiver<SessionSnapshot>,
) {
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let snapshot = updates.borrow_and_update().clone();
            let _ = bus.send(BusMsg::Session {
                session_id,
                snapshot,
            });
        }
    });
}
