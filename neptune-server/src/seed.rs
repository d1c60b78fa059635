//! Fleet seed documents
//!
//! A fleet seed is a single JSON document holding the initial contents of
//! the data store:
//!
//! ```json
//! {
//!   "ports": [...], "berths": [...], "routes": [...],
//!   "vessels": [...], "components": [...], "shipments": [...],
//!   "allocations": [...]
//! }
//! ```
//!
//! Every section is optional. Route geometries are validated while parsing
//! and cross references (berth to port, component to vessel, ...) are
//! checked by [`FleetSeed::validate`].

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

use neptune_core::berth::{find_overlap, validate_interval, IntervalError};
use neptune_core::{
    AllocationConflict, Berth, BerthAllocation, Component, Port, Route, Shipment, Vessel,
};

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("cannot read fleet seed {0}: {1}")]
    Io(PathBuf, #[source] io::Error),
    #[error("invalid fleet seed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{kind} {id} refers to unknown {target} {target_id}")]
    UnknownReference {
        kind: &'static str,
        id: String,
        target: &'static str,
        target_id: String,
    },
    #[error("duplicate {kind} id {id}")]
    Duplicate { kind: &'static str, id: String },
    #[error("vessel {vessel} has fuel {fuel_level} outside 0..={fuel_capacity}")]
    FuelOutOfRange {
        vessel: String,
        fuel_level: f64,
        fuel_capacity: f64,
    },
    #[error("vessel {vessel} has route progress {progress} outside 0..=1")]
    ProgressOutOfRange { vessel: String, progress: f64 },
    #[error("allocation {allocation}: {source}")]
    InvalidInterval {
        allocation: String,
        #[source]
        source: IntervalError,
    },
    #[error("allocation {allocation} overlaps: {source}")]
    Overlap {
        allocation: String,
        #[source]
        source: AllocationConflict,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetSeed {
    pub ports: Vec<Port>,
    pub berths: Vec<Berth>,
    pub routes: Vec<Route>,
    pub vessels: Vec<Vessel>,
    pub components: Vec<Component>,
    pub shipments: Vec<Shipment>,
    pub allocations: Vec<BerthAllocation>,
}

impl FleetSeed {
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let text = fs::read_to_string(path).map_err(|e| SeedError::Io(path.to_path_buf(), e))?;
        let seed = Self::from_json(&text)?;
        log::info!(
            "{}: {} vessels, {} ports, {} berths, {} routes",
            path.display(),
            seed.vessels.len(),
            seed.ports.len(),
            seed.berths.len(),
            seed.routes.len()
        );
        Ok(seed)
    }

    pub fn from_json(text: &str) -> Result<Self, SeedError> {
        let seed: FleetSeed = serde_json::from_str(text)?;
        seed.validate()?;
        Ok(seed)
    }

    /// Check ids are unique, every reference resolves and the state a
    /// running store maintains already holds
    ///
    /// Fuel must lie within `[0, capacity]`, route progress within
    /// `[0, 1]`, and blocking allocations must be non-empty intervals that
    /// never overlap on the same berth.
    pub fn validate(&self) -> Result<(), SeedError> {
        let ports = unique("port", self.ports.iter().map(|p| p.id.as_str()))?;
        let berths = unique("berth", self.berths.iter().map(|b| b.id.as_str()))?;
        let routes = unique("route", self.routes.iter().map(|r| r.id.as_str()))?;
        let vessels = unique("vessel", self.vessels.iter().map(|v| v.id.as_str()))?;
        unique("component", self.components.iter().map(|c| c.id.as_str()))?;
        unique("shipment", self.shipments.iter().map(|s| s.id.as_str()))?;
        unique("allocation", self.allocations.iter().map(|a| a.id.as_str()))?;

        for b in &self.berths {
            check("berth", b.id.as_str(), "port", b.port_id.as_str(), &ports)?;
        }
        for r in &self.routes {
            for port in r.origin_port_id.iter().chain(r.destination_port_id.iter()) {
                check("route", r.id.as_str(), "port", port.as_str(), &ports)?;
            }
        }
        for v in &self.vessels {
            if let Some(route) = &v.current_route_id {
                check("vessel", v.id.as_str(), "route", route.as_str(), &routes)?;
            }
            if let Some(berth) = &v.current_berth_id {
                check("vessel", v.id.as_str(), "berth", berth.as_str(), &berths)?;
            }
        }
        for c in &self.components {
            check("component", c.id.as_str(), "vessel", c.vessel_id.as_str(), &vessels)?;
        }
        for s in &self.shipments {
            if let Some(vessel) = &s.vessel_id {
                check("shipment", s.id.as_str(), "vessel", vessel.as_str(), &vessels)?;
            }
        }
        for a in &self.allocations {
            check("allocation", a.id.as_str(), "vessel", a.vessel_id.as_str(), &vessels)?;
            check("allocation", a.id.as_str(), "berth", a.berth_id.as_str(), &berths)?;
        }

        for v in &self.vessels {
            let fuel_ok =
                v.fuel_capacity >= 0.0 && v.fuel_level >= 0.0 && v.fuel_level <= v.fuel_capacity;
            if !fuel_ok {
                return Err(SeedError::FuelOutOfRange {
                    vessel: v.id.to_string(),
                    fuel_level: v.fuel_level,
                    fuel_capacity: v.fuel_capacity,
                });
            }
            if !(0.0..=1.0).contains(&v.route_progress) {
                return Err(SeedError::ProgressOutOfRange {
                    vessel: v.id.to_string(),
                    progress: v.route_progress,
                });
            }
        }

        let mut accepted: Vec<&BerthAllocation> = Vec::new();
        for a in &self.allocations {
            validate_interval(a.start_time, a.end_time).map_err(|source| {
                SeedError::InvalidInterval {
                    allocation: a.id.to_string(),
                    source,
                }
            })?;
            if !a.status.is_blocking() {
                continue;
            }
            let overlap = find_overlap(accepted.iter().copied(), &a.berth_id, a.start_time, a.end_time);
            if let Some(blocking) = overlap {
                return Err(SeedError::Overlap {
                    allocation: a.id.to_string(),
                    source: AllocationConflict::from_blocking(blocking),
                });
            }
            accepted.push(a);
        }
        Ok(())
    }
}

fn unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashSet<&'a str>, SeedError> {
    let mut set = HashSet::new();
    for id in ids {
        if !set.insert(id) {
            return Err(SeedError::Duplicate {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(set)
}

fn check(
    kind: &'static str,
    id: &str,
    target: &'static str,
    target_id: &str,
    known: &HashSet<&str>,
) -> Result<(), SeedError> {
    if known.contains(target_id) {
        Ok(())
    } else {
        Err(SeedError::UnknownReference {
            kind,
            id: id.to_string(),
            target,
            target_id: target_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SEED: &str = r#"{
        "ports": [
            {"id": "p-split", "name": "Split", "latitude": 43.5081, "longitude": 16.4402}
        ],
        "berths": [
            {"id": "b-1", "port_id": "p-split", "name": "Gat Sv. Duje 1"}
        ],
        "routes": [
            {"id": "r-1", "name": "Split - Ancona",
             "geometry": {"type": "LineString", "coordinates": [[16.4402, 43.5081], [13.5189, 43.6158]]}}
        ],
        "vessels": [
            {"id": "v-1", "name": "Neptune Star", "status": "AT_SEA",
             "latitude": 43.5, "longitude": 16.4, "speed_knots": 14.0,
             "fuel_level": 800.0, "fuel_capacity": 1000.0, "current_route_id": "r-1"}
        ],
        "components": [
            {"id": "c-1", "vessel_id": "v-1", "name": "Main engine", "type": "PROPULSION",
             "health_percentage": 90.0}
        ]
    }"#;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SEED.as_bytes()).unwrap();

        let seed = FleetSeed::load(file.path()).unwrap();
        assert_eq!(seed.vessels.len(), 1);
        assert_eq!(seed.routes[0].path().len(), 2);
        assert!(seed.allocations.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FleetSeed::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SeedError::Io(..)));
    }

    #[test]
    fn test_unknown_reference() {
        let text = SEED.replace("\"port_id\": \"p-split\"", "\"port_id\": \"p-nowhere\"");
        match FleetSeed::from_json(&text) {
            Err(SeedError::UnknownReference {
                kind, target_id, ..
            }) => {
                assert_eq!(kind, "berth");
                assert_eq!(target_id, "p-nowhere");
            }
            other => panic!("expected UnknownReference, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_route_rejected() {
        let text = SEED.replace("[[16.4402, 43.5081], [13.5189, 43.6158]]", "[[16.4402, 43.5081]]");
        assert!(matches!(
            FleetSeed::from_json(&text),
            Err(SeedError::Json(_))
        ));
    }

    #[test]
    fn test_duplicate_ids() {
        let seed = FleetSeed {
            ports: vec![
                serde_json::from_str(r#"{"id":"p","name":"A","latitude":0,"longitude":0}"#)
                    .unwrap(),
                serde_json::from_str(r#"{"id":"p","name":"B","latitude":1,"longitude":1}"#)
                    .unwrap(),
            ],
            ..Default::default()
        };
        assert!(matches!(
            seed.validate(),
            Err(SeedError::Duplicate { kind: "port", .. })
        ));
    }

    fn with_allocations(allocations: &str) -> String {
        let berths = r#"{"id": "b-1", "port_id": "p-split", "name": "Gat Sv. Duje 1"},
            {"id": "b-2", "port_id": "p-split", "name": "Gat Sv. Duje 2"}"#;
        let text = SEED.replace(
            r#"{"id": "b-1", "port_id": "p-split", "name": "Gat Sv. Duje 1"}"#,
            berths,
        );
        let tail = text.trim_end().trim_end_matches('}');
        format!("{}, \"allocations\": [{}]}}", tail, allocations)
    }

    fn allocation(id: &str, berth: &str, start: &str, end: &str, status: &str) -> String {
        format!(
            r#"{{"id": "{}", "vessel_id": "v-1", "berth_id": "{}",
                "start_time": "2026-03-14T{}:00:00Z", "end_time": "2026-03-14T{}:00:00Z",
                "status": "{}"}}"#,
            id, berth, start, end, status
        )
    }

    #[test]
    fn test_fuel_outside_capacity_rejected() {
        let text = SEED.replace("\"fuel_level\": 800.0", "\"fuel_level\": 1800.0");
        match FleetSeed::from_json(&text) {
            Err(SeedError::FuelOutOfRange {
                vessel,
                fuel_level,
                fuel_capacity,
            }) => {
                assert_eq!(vessel, "v-1");
                assert_eq!(fuel_level, 1800.0);
                assert_eq!(fuel_capacity, 1000.0);
            }
            other => panic!("expected FuelOutOfRange, got {:?}", other),
        }

        let text = SEED.replace("\"fuel_level\": 800.0", "\"fuel_level\": -1.0");
        assert!(matches!(
            FleetSeed::from_json(&text),
            Err(SeedError::FuelOutOfRange { .. })
        ));

        // A full tank is fine
        let text = SEED.replace("\"fuel_level\": 800.0", "\"fuel_level\": 1000.0");
        assert!(FleetSeed::from_json(&text).is_ok());
    }

    #[test]
    fn test_progress_outside_unit_range_rejected() {
        let text = SEED.replace(
            "\"current_route_id\": \"r-1\"",
            "\"current_route_id\": \"r-1\", \"route_progress\": 1.7",
        );
        match FleetSeed::from_json(&text) {
            Err(SeedError::ProgressOutOfRange { vessel, progress }) => {
                assert_eq!(vessel, "v-1");
                assert_eq!(progress, 1.7);
            }
            other => panic!("expected ProgressOutOfRange, got {:?}", other),
        }

        let text = SEED.replace(
            "\"current_route_id\": \"r-1\"",
            "\"current_route_id\": \"r-1\", \"route_progress\": 1.0",
        );
        assert!(FleetSeed::from_json(&text).is_ok());
    }

    #[test]
    fn test_inverted_allocation_rejected() {
        let text = with_allocations(&allocation("a-3", "b-1", "18", "17", "SCHEDULED"));
        match FleetSeed::from_json(&text) {
            Err(SeedError::InvalidInterval { allocation, source }) => {
                assert_eq!(allocation, "a-3");
                assert!(matches!(source, IntervalError::NotPositive { .. }));
            }
            other => panic!("expected InvalidInterval, got {:?}", other),
        }

        // Empty intervals are refused too, whatever the status
        let text = with_allocations(&allocation("a-3", "b-1", "18", "18", "COMPLETED"));
        assert!(matches!(
            FleetSeed::from_json(&text),
            Err(SeedError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_overlapping_allocations_rejected() {
        let text = with_allocations(&format!(
            "{}, {}",
            allocation("a-1", "b-1", "10", "14", "SCHEDULED"),
            allocation("a-2", "b-1", "12", "16", "ACTIVE")
        ));
        match FleetSeed::from_json(&text) {
            Err(SeedError::Overlap { allocation, source }) => {
                assert_eq!(allocation, "a-2");
                assert_eq!(source.blocking_allocation.as_str(), "a-1");
                assert_eq!(source.berth_id.as_str(), "b-1");
            }
            other => panic!("expected Overlap, got {:?}", other),
        }
    }

    #[test]
    fn test_non_overlapping_allocations_accepted() {
        // Back to back on one berth, the same slot on another, and a
        // cancelled reservation under a live one
        let text = with_allocations(&format!(
            "{}, {}, {}, {}",
            allocation("a-1", "b-1", "10", "14", "SCHEDULED"),
            allocation("a-2", "b-1", "14", "16", "SCHEDULED"),
            allocation("a-3", "b-2", "10", "14", "ACTIVE"),
            allocation("a-4", "b-1", "11", "13", "CANCELLED")
        ));
        let seed = FleetSeed::from_json(&text).unwrap();
        assert_eq!(seed.allocations.len(), 4);
    }

    #[test]
    fn test_bundled_fleet_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../data/fleet.json");
        let seed = FleetSeed::load(&path).unwrap();
        assert_eq!(seed.ports.len(), 4);
        assert_eq!(seed.vessels.len(), 5);
        assert!(seed.routes.iter().all(|r| r.length_m() > 100_000.0));
    }
}
