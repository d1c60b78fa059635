use crate::fleet::Position;

/// Mean earth radius used by all spherical calculations, in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Kilometres in one nautical mile
pub const KM_PER_NAUTICAL_MILE: f64 = 1.852;

/// Knots to metres per second
pub const KN_TO_MS: f64 = 1852.0 / 3600.0;

/// Compute the position reached after travelling at `speed_knots` on a
/// constant initial `heading` (degrees true) for `duration_secs` seconds.
///
/// Uses the spherical destination-point formula. Longitude is wrapped to
/// [-180, 180) so vessels crossing the antimeridian stay on the chart.
pub fn next_position(
    from: Position,
    speed_knots: f64,
    heading: f64,
    duration_secs: f64,
) -> Position {
    let distance_km = speed_knots * KM_PER_NAUTICAL_MILE / 3600.0 * duration_secs;
    if distance_km == 0.0 {
        return from;
    }
    let angular = distance_km / EARTH_RADIUS_KM;

    let lat1 = from.latitude.to_radians();
    let lon1 = from.longitude.to_radians();
    let bearing = heading.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon2 = lon1
        + (bearing.sin() * angular.sin() * lat1.cos())
            .atan2(angular.cos() - lat1.sin() * lat2.sin());

    Position::new(lat2.to_degrees(), wrap_longitude(lon2.to_degrees()))
}

/// Great-circle (haversine) distance between two positions in kilometres
pub fn distance_km(a: Position, b: Position) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Great-circle distance between two positions in metres
pub fn distance_m(a: Position, b: Position) -> f64 {
    distance_km(a, b) * 1000.0
}

/// Whether `b` lies within `radius_km` of `a`
pub fn within_radius(a: Position, b: Position, radius_km: f64) -> bool {
    distance_km(a, b) <= radius_km
}

/// Wrap a longitude in degrees into [-180, 180)
pub fn wrap_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}
