//! Request and response types for all fg-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests. No business logic lives here.

use fg_gate::{GateReason, Remediation};
use fg_location::LocationError;
use fg_schemas::{ActorId, Role, Zone, ZoneId};
use fg_verify::{SessionSnapshot, TimeInEvent};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::relay::RelayDelivery;
use crate::state::SessionPurpose;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable code, e.g. "UNKNOWN_SESSION".
    pub code: String,
}

// ---------------------------------------------------------------------------
// /v1/health  /v1/zones
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub config_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonesResponse {
    pub zones: Vec<Zone>,
}

// ---------------------------------------------------------------------------
// /v1/sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub actor_id: String,
    #[serde(default)]
    pub purpose: SessionPurpose,
}

/// Flattened snapshot plus the user-facing error text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub purpose: SessionPurpose,
    #[serde(flatten)]
    pub snapshot: SessionSnapshot,
    pub error_message: Option<String>,
}

impl SessionView {
    pub fn new(session_id: Uuid, purpose: SessionPurpose, snapshot: SessionSnapshot) -> Self {
        let error_message = snapshot.error_kind.map(|e| e.user_message().to_string());
        Self {
            session_id,
            purpose,
            snapshot,
            error_message,
        }
    }
}

/// `session` is `None` for actors whose role needs no verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub actor_id: ActorId,
    pub requires_verification: bool,
    pub started: bool,
    pub session: Option<SessionView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub accuracy_meters: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixErrorRequest {
    pub kind: LocationError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayResponse {
    pub session_id: Uuid,
    pub delivery: RelayDelivery,
}

/// Closest authorized zone to a fix that matched none of them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearestZone {
    pub zone_id: ZoneId,
    pub display_name: String,
    pub distance_meters: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessResponse {
    pub session_id: Uuid,
    pub actor_id: ActorId,
    pub role: Role,
    pub permitted: bool,
    pub reason: GateReason,
    pub message: String,
    pub remediation: Remediation,
    /// Set only for Denied sessions.
    pub nearest: Option<NearestZone>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClosedResponse {
    pub session_id: Uuid,
    pub closed: bool,
}

// ---------------------------------------------------------------------------
// /v1/time-in  /v1/attendance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeInRequest {
    pub session_id: Uuid,
    /// Omit to time in the first assigned child whose home matched.
    #[serde(default)]
    pub child_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub events: Vec<TimeInEvent>,
}
