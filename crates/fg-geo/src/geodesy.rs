use fg_schemas::Coordinate;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates, in meters (haversine).
///
/// No range validation: out-of-range inputs produce a number, just not a
/// meaningful one. Symmetric in its arguments and exactly `0.0` for equal
/// inputs.
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.latitude.to_radians();
    let phi2 = b.latitude.to_radians();
    let d_phi = (b.latitude - a.latitude).to_radians();
    let d_lambda = (b.longitude - a.longitude).to_radians();

    let h = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    // Rounding can push h a hair past 1.0 for antipodal points.
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}

/// Move `from` due north by `meters` (negative moves south).
pub fn offset_north(from: Coordinate, meters: f64) -> Coordinate {
    let d_lat = (meters / EARTH_RADIUS_METERS).to_degrees();
    Coordinate::new(from.latitude + d_lat, from.longitude)
}

/// Move `from` due east by `meters` (negative moves west).
///
/// Small-distance approximation; degenerate at the poles.
pub fn offset_east(from: Coordinate, meters: f64) -> Coordinate {
    let d_lon = (meters / (EARTH_RADIUS_METERS * from.latitude.to_radians().cos())).to_degrees();
    Coordinate::new(from.latitude, from.longitude + d_lon)
}
