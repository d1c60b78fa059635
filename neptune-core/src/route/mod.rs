//! Route Progress Interpolation
//!
//! A route is an immutable path geometry with a derived total length. Vessels
//! sailing a route carry only a fractional progress in `[0.0, 1.0]`; the
//! absolute position is resolved here by walking the path by cumulative
//! great-circle distance and interpolating inside the segment that contains
//! the target distance.
//!
//! # Features
//!
//! - GeoJSON `LineString` geometry on the wire (`[lon, lat]` order)
//! - Fractional point lookup (`point_at`)
//! - Fixed-increment progress stepping, capped at 1.0
//! - ETA from remaining path length and speed
//!
//! # Example
//!
//! ```rust,ignore
//! use neptune_core::route::{advance_progress, Route};
//!
//! let route = Route::new("r-1", "Split - Ancona", path)?;
//! let progress = advance_progress(vessel.route_progress, 0.002);
//! let position = route.point_at(progress);
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::fleet::{PortId, Position, RouteId};
use crate::navigation::{distance_m, wrap_longitude, KN_TO_MS};

mod geometry;

pub use geometry::LineString;

/// Lower bound for the speed used in ETA computation, in m/s
pub const MIN_ETA_SPEED_MS: f64 = 1.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteError {
    #[error("route {0} needs at least two points, got {1}")]
    TooFewPoints(RouteId, usize),
    #[error("route {0} has a non-finite coordinate at index {1}")]
    InvalidCoordinate(RouteId, usize),
    #[error("expected a LineString geometry, got {0}")]
    NotALineString(String),
}

/// An immutable route geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RouteRecord", into = "RouteRecord")]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub origin_port_id: Option<PortId>,
    pub destination_port_id: Option<PortId>,
    path: Vec<Position>,
    /// Distance from the first point to each point, in metres
    cumulative_m: Vec<f64>,
}

impl Route {
    pub fn new(
        id: impl Into<RouteId>,
        name: &str,
        path: Vec<Position>,
    ) -> Result<Self, RouteError> {
        let id = id.into();
        if path.len() < 2 {
            return Err(RouteError::TooFewPoints(id, path.len()));
        }
        if let Some(i) = path
            .iter()
            .position(|p| !p.latitude.is_finite() || !p.longitude.is_finite())
        {
            return Err(RouteError::InvalidCoordinate(id, i));
        }

        let mut cumulative_m = Vec::with_capacity(path.len());
        let mut total = 0.0;
        cumulative_m.push(0.0);
        for pair in path.windows(2) {
            total += distance_m(pair[0], pair[1]);
            cumulative_m.push(total);
        }

        Ok(Route {
            id,
            name: name.to_string(),
            origin_port_id: None,
            destination_port_id: None,
            path,
            cumulative_m,
        })
    }

    pub fn between(mut self, origin: impl Into<PortId>, destination: impl Into<PortId>) -> Self {
        self.origin_port_id = Some(origin.into());
        self.destination_port_id = Some(destination.into());
        self
    }

    pub fn path(&self) -> &[Position] {
        &self.path
    }

    /// Total path length in metres
    pub fn length_m(&self) -> f64 {
        self.cumulative_m.last().copied().unwrap_or(0.0)
    }

    pub fn start(&self) -> Position {
        self.path[0]
    }

    pub fn end(&self) -> Position {
        self.path[self.path.len() - 1]
    }

    /// Point at `fraction` of the path length
    ///
    /// Fractions outside `[0, 1]` are clamped. A degenerate route whose
    /// points all coincide resolves to its first point.
    pub fn point_at(&self, fraction: f64) -> Position {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let total = self.length_m();
        if total <= 0.0 {
            return self.start();
        }
        if fraction >= 1.0 {
            return self.end();
        }

        let target = fraction * total;
        // First index whose cumulative distance reaches the target
        let upper = self
            .cumulative_m
            .partition_point(|d| *d < target)
            .clamp(1, self.path.len() - 1);
        let lower = upper - 1;

        let segment = self.cumulative_m[upper] - self.cumulative_m[lower];
        if segment <= 0.0 {
            return self.path[lower];
        }
        let t = (target - self.cumulative_m[lower]) / segment;
        interpolate(self.path[lower], self.path[upper], t)
    }

    /// Path length still ahead at `progress`, in metres
    pub fn remaining_m(&self, progress: f64) -> f64 {
        self.length_m() * (1.0 - progress.clamp(0.0, 1.0))
    }

    /// Estimated arrival for a vessel at `progress` sailing at `speed_knots`
    ///
    /// Speeds below 1 m/s count as 1 m/s so a stopped vessel still gets a
    /// finite estimate.
    pub fn eta(&self, progress: f64, speed_knots: f64, now: DateTime<Utc>) -> DateTime<Utc> {
        let speed_ms = (speed_knots * KN_TO_MS).max(MIN_ETA_SPEED_MS);
        let seconds = self.remaining_m(progress) / speed_ms;
        now + Duration::milliseconds((seconds * 1000.0).round() as i64)
    }
}

/// Linear interpolation between two points, taking the short way across the
/// antimeridian
fn interpolate(a: Position, b: Position, t: f64) -> Position {
    let dlon = wrap_longitude(b.longitude - a.longitude);
    Position::new(
        a.latitude + (b.latitude - a.latitude) * t,
        wrap_longitude(a.longitude + dlon * t),
    )
}

/// Advance route progress by a fixed increment, never past 1.0
pub fn advance_progress(current: f64, increment: f64) -> f64 {
    (current + increment).clamp(0.0, 1.0)
}

/// Wire form of a route
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RouteRecord {
    id: RouteId,
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    origin_port_id: Option<PortId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    destination_port_id: Option<PortId>,
    geometry: LineString,
    #[serde(default)]
    length_m: f64,
}

impl TryFrom<RouteRecord> for Route {
    type Error = RouteError;

    fn try_from(record: RouteRecord) -> Result<Self, Self::Error> {
        let mut route = Route::new(record.id, &record.name, record.geometry.into_positions())?;
        route.origin_port_id = record.origin_port_id;
        route.destination_port_id = record.destination_port_id;
        Ok(route)
    }
}

impl From<Route> for RouteRecord {
    fn from(route: Route) -> Self {
        let length_m = route.length_m();
        RouteRecord {
            id: route.id,
            name: route.name,
            origin_port_id: route.origin_port_id,
            destination_port_id: route.destination_port_id,
            geometry: LineString::from_positions(&route.path),
            length_m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight_east() -> Route {
        // Two equal legs along the equator
        Route::new(
            "r-1",
            "Equator",
            vec![
                Position::new(0.0, 0.0),
                Position::new(0.0, 1.0),
                Position::new(0.0, 2.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_short_path() {
        let err = Route::new("r-x", "Bad", vec![Position::new(0.0, 0.0)]).unwrap_err();
        assert_eq!(err, RouteError::TooFewPoints(RouteId::new("r-x"), 1));

        let err = Route::new(
            "r-y",
            "Nan",
            vec![Position::new(0.0, 0.0), Position::new(f64::NAN, 0.0)],
        )
        .unwrap_err();
        assert_eq!(err, RouteError::InvalidCoordinate(RouteId::new("r-y"), 1));
    }

    #[test]
    fn test_length_is_sum_of_legs() {
        let route = straight_east();
        let leg = distance_m(Position::new(0.0, 0.0), Position::new(0.0, 1.0));
        assert!((route.length_m() - 2.0 * leg).abs() < 1e-6);
    }

    #[test]
    fn test_point_at_endpoints_and_middle() {
        let route = straight_east();
        assert_eq!(route.point_at(0.0), Position::new(0.0, 0.0));
        assert_eq!(route.point_at(1.0), Position::new(0.0, 2.0));
        assert_eq!(route.point_at(1.5), Position::new(0.0, 2.0));
        assert_eq!(route.point_at(-0.5), Position::new(0.0, 0.0));

        let mid = route.point_at(0.5);
        assert!((mid.longitude - 1.0).abs() < 1e-9);
        let quarter = route.point_at(0.25);
        assert!((quarter.longitude - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_point_at_follows_distance_not_index() {
        // A short first leg and a long second leg
        let route = Route::new(
            "r-2",
            "Uneven",
            vec![
                Position::new(0.0, 0.0),
                Position::new(0.0, 1.0),
                Position::new(0.0, 4.0),
            ],
        )
        .unwrap();
        let p = route.point_at(0.5);
        assert!((p.longitude - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_route() {
        let p = Position::new(10.0, 10.0);
        let route = Route::new("r-3", "Still", vec![p, p]).unwrap();
        assert_eq!(route.length_m(), 0.0);
        assert_eq!(route.point_at(0.7), p);
    }

    #[test]
    fn test_interpolation_crosses_antimeridian() {
        let route = Route::new(
            "r-4",
            "Dateline",
            vec![Position::new(0.0, 179.0), Position::new(0.0, -179.0)],
        )
        .unwrap();
        let mid = route.point_at(0.5);
        assert!(mid.longitude.abs() > 179.9);
    }

    #[test]
    fn test_advance_progress_caps_at_one() {
        assert_eq!(advance_progress(0.999, 0.002), 1.0);
        assert_eq!(advance_progress(1.0, 0.002), 1.0);
        assert!((advance_progress(0.5, 0.002) - 0.502).abs() < 1e-12);
    }

    #[test]
    fn test_eta_from_remaining_length() {
        let route = straight_east();
        let now = Utc::now();
        let speed_kn = 10.0;
        let expected_s = route.length_m() * 0.5 / (speed_kn * KN_TO_MS);
        let eta = route.eta(0.5, speed_kn, now);
        let got_s = (eta - now).num_milliseconds() as f64 / 1000.0;
        assert!((got_s - expected_s).abs() < 0.01);

        // Stopped vessels use the 1 m/s floor
        let eta = route.eta(0.0, 0.0, now);
        let got_s = (eta - now).num_milliseconds() as f64 / 1000.0;
        assert!((got_s - route.length_m()).abs() < 0.01);

        assert_eq!(route.eta(1.0, 12.0, now), now);
    }

    #[test]
    fn test_geojson_roundtrip() {
        let json = r#"{
            "id": "r-5",
            "name": "Split - Ancona",
            "origin_port_id": "p-split",
            "destination_port_id": "p-ancona",
            "geometry": {"type": "LineString", "coordinates": [[16.44, 43.50], [13.50, 43.62]]}
        }"#;
        let route: Route = serde_json::from_str(json).unwrap();
        assert_eq!(route.start(), Position::new(43.50, 16.44));
        assert_eq!(route.end(), Position::new(43.62, 13.50));
        assert_eq!(route.destination_port_id, Some(PortId::new("p-ancona")));
        assert!(route.length_m() > 200_000.0);

        let value = serde_json::to_value(&route).unwrap();
        assert_eq!(value["geometry"]["type"], "LineString");
        assert_eq!(value["geometry"]["coordinates"][0][0], 16.44);
        assert!(value["length_m"].as_f64().unwrap() > 200_000.0);
    }

    #[test]
    fn test_geojson_rejects_single_point() {
        let json = r#"{"id":"r-6","geometry":{"type":"LineString","coordinates":[[1.0,2.0]]}}"#;
        assert!(serde_json::from_str::<Route>(json).is_err());
    }
}
