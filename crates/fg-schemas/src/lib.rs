//! fg-schemas
//!
//! Shared value types for the geofence verification core: coordinates,
//! zones, actors, children and position samples.
//!
//! Everything here is plain data. No geodesy, no I/O, no clock reads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Coordinate
// ---------------------------------------------------------------------------

/// A WGS-84 position in decimal degrees.
///
/// `Coordinate::new` does not validate; geodesy treats out-of-range input as
/// the caller's problem. Use [`Coordinate::validated`] at trust boundaries
/// (config files, HTTP bodies, CLI args).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Construct a coordinate, rejecting non-finite or out-of-range values.
    pub fn validated(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self::new(latitude, longitude))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoordinateError {
    NonFinite,
    LatitudeOutOfRange(f64),
    LongitudeOutOfRange(f64),
}

impl fmt::Display for CoordinateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordinateError::NonFinite => write!(f, "coordinate is not a finite number"),
            CoordinateError::LatitudeOutOfRange(v) => {
                write!(f, "latitude {v} outside [-90, 90]")
            }
            CoordinateError::LongitudeOutOfRange(v) => {
                write!(f, "longitude {v} outside [-180, 180]")
            }
        }
    }
}

impl std::error::Error for CoordinateError {}

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new<S: Into<String>>(s: S) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifies a geofence zone.
    ZoneId
);
string_id!(
    /// Identifies an actor (a logged-in user).
    ActorId
);
string_id!(
    /// Identifies a child record owned by the records subsystem.
    ChildId
);

// ---------------------------------------------------------------------------
// Zone
// ---------------------------------------------------------------------------

/// A named circular geofence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub display_name: String,
    /// Display only; never geocoded.
    pub address: String,
    pub center: Coordinate,
    /// Always > 0 for zones that came through config validation.
    pub radius_meters: f64,
}

impl Zone {
    pub fn new<S: Into<String>>(
        id: ZoneId,
        display_name: S,
        center: Coordinate,
        radius_meters: f64,
    ) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            address: String::new(),
            center,
            radius_meters,
        }
    }

    pub fn with_address<S: Into<String>>(mut self, address: S) -> Self {
        self.address = address.into();
        self
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

/// Dashboard roles. Which of these require location verification is a gate
/// policy decision, not a property of the role itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Caregiver,
    Accountant,
    FieldWorker,
    Parent,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Caregiver => "caregiver",
            Role::Accountant => "accountant",
            Role::FieldWorker => "field_worker",
            Role::Parent => "parent",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An authenticated user as supplied by the identity collaborator.
///
/// `assigned_zone_ids` is ordered: matcher precedence follows this order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub role: Role,
    #[serde(default)]
    pub assigned_zone_ids: Vec<ZoneId>,
    #[serde(default)]
    pub assigned_child_ids: Vec<ChildId>,
}

impl Actor {
    pub fn new(id: ActorId, role: Role) -> Self {
        Self {
            id,
            role,
            assigned_zone_ids: Vec::new(),
            assigned_child_ids: Vec::new(),
        }
    }

    /// Append zone ids, skipping duplicates while keeping first-seen order.
    pub fn with_zones<I: IntoIterator<Item = ZoneId>>(mut self, zones: I) -> Self {
        for z in zones {
            if !self.assigned_zone_ids.contains(&z) {
                self.assigned_zone_ids.push(z);
            }
        }
        self
    }

    pub fn with_children<I: IntoIterator<Item = ChildId>>(mut self, children: I) -> Self {
        for c in children {
            if !self.assigned_child_ids.contains(&c) {
                self.assigned_child_ids.push(c);
            }
        }
        self
    }

    pub fn is_assigned_zone(&self, zone_id: &ZoneId) -> bool {
        self.assigned_zone_ids.contains(zone_id)
    }

    pub fn is_assigned_child(&self, child_id: &ChildId) -> bool {
        self.assigned_child_ids.contains(child_id)
    }
}

// ---------------------------------------------------------------------------
// Child
// ---------------------------------------------------------------------------

/// The slice of a child record the time-in flow needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Child {
    pub id: ChildId,
    pub display_name: String,
    /// Zone at the child's home. Children without one cannot be timed in.
    pub home_zone_id: Option<ZoneId>,
}

// ---------------------------------------------------------------------------
// Position sample
// ---------------------------------------------------------------------------

/// One successful fix from a location provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub coordinate: Coordinate,
    /// Reported horizontal accuracy radius, in meters.
    pub accuracy_meters: f64,
    pub captured_at: DateTime<Utc>,
}

impl PositionSample {
    pub fn new(coordinate: Coordinate, accuracy_meters: f64, captured_at: DateTime<Utc>) -> Self {
        Self {
            coordinate,
            accuracy_meters: accuracy_meters.max(0.0),
            captured_at,
        }
    }
}
