//! fg-gate
//!
//! Authorization gate: may this actor use the system right now?
//!
//! # Rules
//!
//! - Roles outside `GatePolicy::verification_roles` are always permitted.
//!   The gate never asks for a session for them.
//! - Roles inside the set are permitted iff their session is `Verified`.
//! - A session belonging to a different actor never permits anything.
//!
//! Pure decision logic. No IO, no clock, no async.

use std::collections::BTreeSet;

use fg_location::LocationError;
use fg_schemas::{Actor, ActorId, Role, ZoneId};
use fg_verify::{SessionSnapshot, SessionState};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Roles that must pass location verification.
    pub verification_roles: BTreeSet<Role>,
    /// Start a check as soon as a gated actor logs in, rather than waiting
    /// for an explicit request.
    pub auto_start: bool,
}

impl Default for GatePolicy {
    /// Field workers only; auto-start on.
    fn default() -> Self {
        Self {
            verification_roles: BTreeSet::from([Role::FieldWorker]),
            auto_start: true,
        }
    }
}

impl GatePolicy {
    pub fn requires_verification(&self, role: Role) -> bool {
        self.verification_roles.contains(&role)
    }

    /// `true` if the application should start a check at login.
    pub fn should_auto_start(&self, actor: &Actor) -> bool {
        self.auto_start && self.requires_verification(actor.role)
    }
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// What the user should do about a refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Remediation {
    None,
    /// Start (or restart) verification.
    Verify,
    /// A check is running; wait for it.
    Wait,
    /// Position is fine but outside every authorized zone.
    Relocate,
    /// Location could not be obtained this time; trying again may work.
    Retry,
    /// Location cannot be obtained until device settings change.
    FixDevice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GateReason {
    ExemptRole { role: Role },
    Verified { zone_id: Option<ZoneId> },
    NotStarted,
    InProgress,
    OutsideAuthorizedZones,
    LocationUnavailable { error: Option<LocationError> },
    SessionMismatch { session_actor: ActorId },
}

impl GateReason {
    /// Human-readable text for the person being gated.
    pub fn message(&self) -> String {
        match self {
            GateReason::ExemptRole { role } => {
                format!("Role {role} does not require location verification.")
            }
            GateReason::Verified { .. } => "Location verified.".to_string(),
            GateReason::NotStarted => {
                "Location verification required. Verify your location to continue.".to_string()
            }
            GateReason::InProgress => "Checking your location...".to_string(),
            GateReason::OutsideAuthorizedZones => {
                "You are not at an authorized location for field work.".to_string()
            }
            GateReason::LocationUnavailable { error: Some(e) } => e.user_message().to_string(),
            GateReason::LocationUnavailable { error: None } => {
                "Unable to retrieve location.".to_string()
            }
            GateReason::SessionMismatch { .. } => {
                "Verification session belongs to another user.".to_string()
            }
        }
    }

    pub fn remediation(&self) -> Remediation {
        match self {
            GateReason::ExemptRole { .. } | GateReason::Verified { .. } => Remediation::None,
            GateReason::NotStarted | GateReason::SessionMismatch { .. } => Remediation::Verify,
            GateReason::InProgress => Remediation::Wait,
            GateReason::OutsideAuthorizedZones => Remediation::Relocate,
            GateReason::LocationUnavailable { error: Some(e) } if e.needs_device_settings() => {
                Remediation::FixDevice
            }
            GateReason::LocationUnavailable { .. } => Remediation::Retry,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateDecision {
    pub permitted: bool,
    pub reason: GateReason,
}

impl GateDecision {
    fn allow(reason: GateReason) -> Self {
        Self {
            permitted: true,
            reason,
        }
    }

    fn deny(reason: GateReason) -> Self {
        Self {
            permitted: false,
            reason,
        }
    }
}

/// Full decision with the reason attached.
pub fn evaluate(
    policy: &GatePolicy,
    actor: &Actor,
    session: Option<&SessionSnapshot>,
) -> GateDecision {
    if !policy.requires_verification(actor.role) {
        return GateDecision::allow(GateReason::ExemptRole { role: actor.role });
    }

    let Some(snap) = session else {
        return GateDecision::deny(GateReason::NotStarted);
    };
    if snap.actor_id != actor.id {
        return GateDecision::deny(GateReason::SessionMismatch {
            session_actor: snap.actor_id.clone(),
        });
    }

    match snap.state {
        SessionState::Verified => GateDecision::allow(GateReason::Verified {
            zone_id: snap.matched_zone.as_ref().map(|z| z.id.clone()),
        }),
        SessionState::Idle => GateDecision::deny(GateReason::NotStarted),
        SessionState::Checking => GateDecision::deny(GateReason::InProgress),
        SessionState::Denied => GateDecision::deny(GateReason::OutsideAuthorizedZones),
        SessionState::Failed => GateDecision::deny(GateReason::LocationUnavailable {
            error: snap.error_kind,
        }),
    }
}

/// `true` if `actor` may perform a gated action given `session`.
pub fn is_action_permitted(
    policy: &GatePolicy,
    actor: &Actor,
    session: Option<&SessionSnapshot>,
) -> bool {
    evaluate(policy, actor, session).permitted
}
