use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{BerthId, Position, RouteId, VesselId};

/// Operating status of a vessel
///
/// | From            | Trigger                              | To       |
/// |-----------------|--------------------------------------|----------|
/// | AT_SEA          | fuel reaches 0                       | DISTRESS |
/// | AT_SEA          | component reaches CRITICAL           | DISTRESS |
/// | AT_SEA          | route progress reaches 1.0           | DOCKED   |
/// | AT_SEA          | within radius of allocation's port   | DOCKED   |
/// | DISTRESS        | fuel > 0 and no CRITICAL component   | ANCHORED |
/// | DOCKED/ANCHORED | route assignment                     | AT_SEA   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VesselStatus {
    AtSea,
    Docked,
    Anchored,
    Distress,
}

impl Default for VesselStatus {
    fn default() -> Self {
        VesselStatus::Docked
    }
}

impl VesselStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VesselStatus::AtSea => "AT_SEA",
            VesselStatus::Docked => "DOCKED",
            VesselStatus::Anchored => "ANCHORED",
            VesselStatus::Distress => "DISTRESS",
        }
    }

    /// Whether an external route assignment may put the vessel back to sea.
    ///
    /// A vessel in distress has to recover (refuel, repair) first.
    pub fn accepts_route_assignment(&self) -> bool {
        match self {
            VesselStatus::Docked | VesselStatus::Anchored | VesselStatus::AtSea => true,
            VesselStatus::Distress => false,
        }
    }
}

impl fmt::Display for VesselStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A vessel as stored in the data store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vessel {
    pub id: VesselId,
    pub name: String,
    #[serde(default)]
    pub imo_number: String,
    #[serde(rename = "type", default = "default_vessel_type")]
    pub vessel_type: String,
    #[serde(default)]
    pub status: VesselStatus,
    #[serde(flatten)]
    pub position: Position,
    /// Degrees true
    #[serde(default)]
    pub heading: f64,
    #[serde(default)]
    pub speed_knots: f64,
    /// Tonnes, always within [0, fuel_capacity]
    #[serde(default)]
    pub fuel_level: f64,
    #[serde(default)]
    pub fuel_capacity: f64,
    #[serde(default)]
    pub current_route_id: Option<RouteId>,
    /// Fraction of the current route covered, always within [0.0, 1.0]
    #[serde(default)]
    pub route_progress: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_berth_id: Option<BerthId>,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

fn default_vessel_type() -> String {
    "CONTAINER".to_string()
}

impl Vessel {
    pub fn new(id: impl Into<VesselId>, name: &str, position: Position) -> Self {
        Vessel {
            id: id.into(),
            name: name.to_string(),
            imo_number: String::new(),
            vessel_type: default_vessel_type(),
            status: VesselStatus::Docked,
            position,
            heading: 0.0,
            speed_knots: 0.0,
            fuel_level: 0.0,
            fuel_capacity: 0.0,
            current_route_id: None,
            route_progress: 0.0,
            current_berth_id: None,
            last_updated: Utc::now(),
        }
    }

    /// Under way: at sea with a nonzero speed
    pub fn is_under_way(&self) -> bool {
        self.status == VesselStatus::AtSea && self.speed_knots > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&VesselStatus::AtSea).unwrap(),
            "\"AT_SEA\""
        );
        let s: VesselStatus = serde_json::from_str("\"DISTRESS\"").unwrap();
        assert_eq!(s, VesselStatus::Distress);
        assert!(serde_json::from_str::<VesselStatus>("\"SINKING\"").is_err());
    }

    #[test]
    fn test_vessel_json_is_flat() {
        let mut v = Vessel::new("v-1", "Neptune Star", Position::new(43.5, 16.4));
        v.status = VesselStatus::AtSea;
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["latitude"], 43.5);
        assert_eq!(json["longitude"], 16.4);
        assert_eq!(json["status"], "AT_SEA");
        assert_eq!(json["type"], "CONTAINER");
        assert!(json["current_route_id"].is_null());
        assert!(json.get("current_berth_id").is_none());
    }

    #[test]
    fn test_vessel_from_minimal_json() {
        let v: Vessel = serde_json::from_str(
            r#"{"id":"v-9","name":"Minimal","latitude":1.0,"longitude":2.0}"#,
        )
        .unwrap();
        assert_eq!(v.status, VesselStatus::Docked);
        assert_eq!(v.position, Position::new(1.0, 2.0));
        assert_eq!(v.route_progress, 0.0);
    }

    #[test]
    fn test_under_way() {
        let mut v = Vessel::new("v-1", "A", Position::default());
        assert!(!v.is_under_way());
        v.status = VesselStatus::AtSea;
        assert!(!v.is_under_way());
        v.speed_knots = 12.0;
        assert!(v.is_under_way());
    }

    #[test]
    fn test_distress_blocks_route_assignment() {
        assert!(!VesselStatus::Distress.accepts_route_assignment());
        assert!(VesselStatus::Docked.accepts_route_assignment());
        assert!(VesselStatus::Anchored.accepts_route_assignment());
    }
}
