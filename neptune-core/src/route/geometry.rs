use serde::{Deserialize, Serialize};

use super::RouteError;
use crate::fleet::Position;

/// GeoJSON `LineString` geometry
///
/// Coordinates are `[longitude, latitude]` pairs as GeoJSON requires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawGeometry", into = "RawGeometry")]
pub struct LineString {
    pub coordinates: Vec<[f64; 2]>,
}

impl LineString {
    pub fn from_positions(path: &[Position]) -> Self {
        LineString {
            coordinates: path.iter().map(|p| p.to_lon_lat()).collect(),
        }
    }

    pub fn into_positions(self) -> Vec<Position> {
        self.coordinates
            .into_iter()
            .map(Position::from_lon_lat)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawGeometry {
    #[serde(rename = "type")]
    kind: String,
    coordinates: Vec<[f64; 2]>,
}

impl TryFrom<RawGeometry> for LineString {
    type Error = RouteError;

    fn try_from(raw: RawGeometry) -> Result<Self, Self::Error> {
        if raw.kind != "LineString" {
            return Err(RouteError::NotALineString(raw.kind));
        }
        Ok(LineString {
            coordinates: raw.coordinates,
        })
    }
}

impl From<LineString> for RawGeometry {
    fn from(line: LineString) -> Self {
        RawGeometry {
            kind: "LineString".to_string(),
            coordinates: line.coordinates,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_other_geometry_types() {
        let json = r#"{"type":"Point","coordinates":[[1.0,2.0]]}"#;
        let err = serde_json::from_str::<LineString>(json).unwrap_err();
        assert!(err.to_string().contains("Point"));
    }

    #[test]
    fn test_positions_keep_order() {
        let line: LineString = serde_json::from_str(
            r#"{"type":"LineString","coordinates":[[16.0,43.0],[14.0,44.0]]}"#,
        )
        .unwrap();
        let path = line.into_positions();
        assert_eq!(path[0], Position::new(43.0, 16.0));
        assert_eq!(path[1], Position::new(44.0, 14.0));
    }
}
