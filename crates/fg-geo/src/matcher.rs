//! First-match geofence containment.
//!
//! # Policy
//!
//! [`match_zone`] returns the **first** zone in the order supplied whose
//! circle contains the sample, not the closest one. Overlapping zones are
//! therefore resolved by the caller: put the zone that should win first.
//! The boundary is inclusive (`distance <= radius`).

use std::collections::BTreeMap;

use fg_schemas::{Coordinate, PositionSample, Zone, ZoneId};

use crate::distance_meters;

/// `true` if `point` lies within `zone` (boundary inclusive).
pub fn contains(zone: &Zone, point: Coordinate) -> bool {
    distance_meters(point, zone.center) <= zone.radius_meters
}

/// Return the first zone in `zones` that contains the sample, or `None`.
pub fn match_zone<'a>(sample: &PositionSample, zones: &'a [Zone]) -> Option<&'a Zone> {
    zones.iter().find(|z| contains(z, sample.coordinate))
}

/// Closest zone center to `point` with its distance in meters.
///
/// Diagnostic only (denial detail). Never used to decide access.
pub fn nearest_zone(point: Coordinate, zones: &[Zone]) -> Option<(&Zone, f64)> {
    zones
        .iter()
        .map(|z| (z, distance_meters(point, z.center)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Resolve `ids` against a zone directory, preserving the order of `ids`.
///
/// Unknown ids are skipped and duplicates collapse to their first position,
/// so every returned zone is one of `ids`.
pub fn resolve_zones(ids: &[ZoneId], directory: &[Zone]) -> Vec<Zone> {
    let by_id: BTreeMap<&ZoneId, &Zone> = directory.iter().map(|z| (&z.id, z)).collect();

    let mut out: Vec<Zone> = Vec::with_capacity(ids.len());
    for id in ids {
        if out.iter().any(|z| &z.id == id) {
            continue;
        }
        if let Some(z) = by_id.get(id) {
            out.push((*z).clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn zone(id: &str, lat: f64, lon: f64, radius: f64) -> Zone {
        Zone::new(ZoneId::new(id), id, Coordinate::new(lat, lon), radius)
    }

    fn sample(lat: f64, lon: f64) -> PositionSample {
        PositionSample::new(Coordinate::new(lat, lon), 5.0, Utc::now())
    }

    #[test]
    fn nearest_zone_picks_smallest_distance() {
        let zones = vec![zone("far", 41.0, -74.0, 10.0), zone("near", 40.001, -74.0, 10.0)];
        let (z, d) = nearest_zone(Coordinate::new(40.0, -74.0), &zones).unwrap();
        assert_eq!(z.id.as_str(), "near");
        assert!(d > 100.0 && d < 120.0);
    }

    #[test]
    fn nearest_zone_empty_is_none() {
        assert!(nearest_zone(Coordinate::new(0.0, 0.0), &[]).is_none());
    }

    #[test]
    fn resolve_keeps_id_order_and_skips_unknown() {
        let dir = vec![zone("a", 0.0, 0.0, 1.0), zone("b", 1.0, 1.0, 1.0)];
        let ids = vec![
            ZoneId::new("b"),
            ZoneId::new("missing"),
            ZoneId::new("a"),
            ZoneId::new("b"),
        ];
        let got: Vec<String> = resolve_zones(&ids, &dir)
            .into_iter()
            .map(|z| z.id.0)
            .collect();
        assert_eq!(got, vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn boundary_is_inclusive() {
        let z = zone("z", 0.0, 0.0, 1000.0);
        let edge = crate::offset_north(z.center, 999.999);
        assert!(contains(&z, edge));
        assert!(match_zone(&sample(edge.latitude, edge.longitude), &[z]).is_some());
    }
}
