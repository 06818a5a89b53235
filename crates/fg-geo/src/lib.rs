//! fg-geo
//!
//! Geodesy and geofence matching.
//!
//! Pure deterministic logic. No IO, no wall-clock, no randomness. Both
//! entry points are safe to call concurrently from any number of sessions.

mod geodesy;
mod matcher;

pub use geodesy::{distance_meters, offset_east, offset_north, EARTH_RADIUS_METERS};
pub use matcher::{contains, match_zone, nearest_zone, resolve_zones};
