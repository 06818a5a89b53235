//! Zones and actors modelled on the demo data: three family homes in
//! Manhattan, each with a 100 m radius.

use fg_schemas::{Actor, ActorId, Child, ChildId, Coordinate, Role, Zone, ZoneId};

pub const JOHNSON_HOME: Coordinate = Coordinate::new(40.7128, -74.0060);
pub const SMITH_HOME: Coordinate = Coordinate::new(40.7589, -73.9851);
pub const BROWN_HOME: Coordinate = Coordinate::new(40.7505, -73.9934);

pub fn zone(id: &str, center: Coordinate, radius_meters: f64) -> Zone {
    Zone::new(ZoneId::new(id), id, center, radius_meters)
}

pub fn family_homes() -> Vec<Zone> {
    vec![
        zone("johnson-home", JOHNSON_HOME, 100.0)
            .with_address("123 Main St, Anytown, ST 12345"),
        zone("smith-home", SMITH_HOME, 100.0).with_address("456 Oak Ave, Anytown, ST 12345"),
        zone("brown-home", BROWN_HOME, 100.0).with_address("789 Pine Rd, Anytown, ST 12345"),
    ]
}

pub fn field_worker(id: &str, zone_ids: &[&str]) -> Actor {
    Actor::new(ActorId::new(id), Role::FieldWorker)
        .with_zones(zone_ids.iter().map(|z| ZoneId::new(*z)))
}

pub fn actor(id: &str, role: Role) -> Actor {
    Actor::new(ActorId::new(id), role)
}

pub fn child(id: &str, home_zone: Option<&str>) -> Child {
    Child {
        id: ChildId::new(id),
        display_name: id.to_string(),
        home_zone_id: home_zone.map(ZoneId::new),
    }
}

/// A point `meters` due north of `from`.
pub fn north_of(from: Coordinate, meters: f64) -> Coordinate {
    fg_geo::offset_north(from, meters)
}

/// A point `meters` due east of `from`.
pub fn east_of(from: Coordinate, meters: f64) -> Coordinate {
    fg_geo::offset_east(from, meters)
}
