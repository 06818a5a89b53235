//! Typed view of the merged config tree.
//!
//! ```yaml
//! gate:
//!   verification_roles: [field_worker]
//!   auto_start: true
//! location:
//!   timeout_ms: 10000
//!   max_cached_age_ms: 60000
//!   high_accuracy: true
//! daemon:
//!   heartbeat_secs: 5
//! zones:
//!   - { id: johnson-home, name: Johnson Home, address: "...",
//!       latitude: 40.7128, longitude: -74.0060, radius_meters: 100 }
//! actors:
//!   - { id: fw-1, role: field_worker, zones: [johnson-home], children: [emma] }
//! children:
//!   - { id: emma, name: Emma, home_zone: johnson-home }
//! ```
//!
//! Every section is optional; missing sections take their defaults. List
//! order is significant for `zones` inside an actor (matcher precedence).

use std::collections::HashSet;

use anyhow::{bail, Context, Result};
use fg_gate::GatePolicy;
use fg_location::AcquireOptions;
use fg_schemas::{Actor, ActorId, Child, ChildId, Coordinate, Role, Zone, ZoneId};
use serde::Deserialize;
use serde_json::Value;

use crate::LoadedConfig;

// ---------------------------------------------------------------------------
// Raw (serde) shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    gate: RawGate,
    location: RawLocation,
    daemon: DaemonSettings,
    zones: Vec<RawZone>,
    actors: Vec<RawActor>,
    children: Vec<RawChild>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawGate {
    verification_roles: Vec<Role>,
    auto_start: bool,
}

impl Default for RawGate {
    fn default() -> Self {
        let policy = GatePolicy::default();
        Self {
            verification_roles: policy.verification_roles.into_iter().collect(),
            auto_start: policy.auto_start,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawLocation {
    timeout_ms: u64,
    max_cached_age_ms: u64,
    high_accuracy: bool,
}

impl Default for RawLocation {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            max_cached_age_ms: 60_000,
            high_accuracy: true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawZone {
    id: String,
    name: Option<String>,
    #[serde(default)]
    address: String,
    latitude: f64,
    longitude: f64,
    radius_meters: f64,
}

#[derive(Debug, Deserialize)]
struct RawActor {
    id: String,
    role: Role,
    #[serde(default)]
    zones: Vec<String>,
    #[serde(default)]
    children: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawChild {
    id: String,
    name: Option<String>,
    home_zone: Option<String>,
}

// ---------------------------------------------------------------------------
// Typed config
// ---------------------------------------------------------------------------

/// Daemon-only knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// SSE heartbeat period.
    pub heartbeat_secs: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self { heartbeat_secs: 5 }
    }
}

/// Validated directory + policy.
///
/// # Invariants
///
/// - zone, actor and child ids are unique within their lists;
/// - every zone has a valid center and a finite radius > 0;
/// - every zone id an actor or child refers to exists in `zones`;
/// - every child id an actor refers to exists in `children`;
/// - `location.timeout` is non-zero.
#[derive(Debug, Clone)]
pub struct FieldGateConfig {
    pub gate: GatePolicy,
    pub location: AcquireOptions,
    pub daemon: DaemonSettings,
    pub zones: Vec<Zone>,
    pub actors: Vec<Actor>,
    pub children: Vec<Child>,
}

impl FieldGateConfig {
    pub fn from_loaded(loaded: &LoadedConfig) -> Result<Self> {
        Self::from_json(&loaded.config_json)
    }

    pub fn from_json(config_json: &Value) -> Result<Self> {
        let raw: RawConfig = serde_json::from_value(config_json.clone())
            .context("CONFIG_INVALID: config does not match the expected shape")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        if raw.location.timeout_ms == 0 {
            bail!("CONFIG_INVALID: /location/timeout_ms must be > 0");
        }

        let mut zones = Vec::with_capacity(raw.zones.len());
        let mut zone_ids = HashSet::new();
        for (i, z) in raw.zones.into_iter().enumerate() {
            let center = Coordinate::validated(z.latitude, z.longitude)
                .with_context(|| format!("CONFIG_INVALID: zone {} ({}) center", i, z.id))?;
            if !z.radius_meters.is_finite() || z.radius_meters <= 0.0 {
                bail!(
                    "CONFIG_INVALID: zone {} radius_meters must be > 0 (got {})",
                    z.id,
                    z.radius_meters
                );
            }
            if !zone_ids.insert(z.id.clone()) {
                bail!("CONFIG_INVALID: duplicate zone id {}", z.id);
            }
            let name = z.name.unwrap_or_else(|| z.id.clone());
            zones.push(
                Zone::new(ZoneId::new(z.id), name, center, z.radius_meters)
                    .with_address(z.address),
            );
        }

        let mut children = Vec::with_capacity(raw.children.len());
        let mut child_ids = HashSet::new();
        for c in raw.children {
            if !child_ids.insert(c.id.clone()) {
                bail!("CONFIG_INVALID: duplicate child id {}", c.id);
            }
            if let Some(home) = &c.home_zone {
                if !zone_ids.contains(home) {
                    bail!(
                        "CONFIG_INVALID: child {} home_zone {} is not a known zone",
                        c.id,
                        home
                    );
                }
            }
            children.push(Child {
                display_name: c.name.unwrap_or_else(|| c.id.clone()),
                id: ChildId::new(c.id),
                home_zone_id: c.home_zone.map(ZoneId::new),
            });
        }

        let mut actors = Vec::with_capacity(raw.actors.len());
        let mut actor_ids = HashSet::new();
        for a in raw.actors {
            if !actor_ids.insert(a.id.clone()) {
                bail!("CONFIG_INVALID: duplicate actor id {}", a.id);
            }
            if let Some(unknown) = a.zones.iter().find(|z| !zone_ids.contains(*z)) {
                bail!(
                    "CONFIG_INVALID: actor {} refers to unknown zone {}",
                    a.id,
                    unknown
                );
            }
            if let Some(unknown) = a.children.iter().find(|c| !child_ids.contains(*c)) {
                bail!(
                    "CONFIG_INVALID: actor {} refers to unknown child {}",
                    a.id,
                    unknown
                );
            }
            actors.push(
                Actor::new(ActorId::new(a.id), a.role)
                    .with_zones(a.zones.into_iter().map(ZoneId::new))
                    .with_children(a.children.into_iter().map(ChildId::new)),
            );
        }

        Ok(Self {
            gate: GatePolicy {
                verification_roles: raw.gate.verification_roles.into_iter().collect(),
                auto_start: raw.gate.auto_start,
            },
            location: AcquireOptions::from_millis(
                raw.location.timeout_ms,
                raw.location.max_cached_age_ms,
                raw.location.high_accuracy,
            ),
            daemon: raw.daemon,
            zones,
            actors,
            children,
        })
    }

    pub fn actor(&self, id: &ActorId) -> Option<&Actor> {
        self.actors.iter().find(|a| &a.id == id)
    }

    pub fn zone(&self, id: &ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| &z.id == id)
    }

    /// The actor's authorized zones, in the actor's assignment order.
    pub fn zones_for(&self, actor: &Actor) -> Vec<Zone> {
        fg_geo::resolve_zones(&actor.assigned_zone_ids, &self.zones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_takes_defaults() {
        let cfg = FieldGateConfig::from_json(&serde_json::json!({})).unwrap();
        assert_eq!(cfg.gate, GatePolicy::default());
        assert_eq!(cfg.location, AcquireOptions::default());
        assert_eq!(cfg.daemon.heartbeat_secs, 5);
        assert!(cfg.zones.is_empty());
    }

    #[test]
    fn zone_name_defaults_to_id() {
        let cfg = FieldGateConfig::from_json(&serde_json::json!({
            "zones": [{"id": "z1", "latitude": 1.0, "longitude": 2.0, "radius_meters": 5.0}]
        }))
        .unwrap();
        assert_eq!(cfg.zones[0].display_name, "z1");
        assert_eq!(cfg.zones[0].address, "");
    }

    #[test]
    fn zero_timeout_rejected() {
        let err = FieldGateConfig::from_json(&serde_json::json!({
            "location": {"timeout_ms": 0}
        }))
        .unwrap_err();
        assert!(err.to_string().contains("timeout_ms"));
    }
}
