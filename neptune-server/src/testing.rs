//! Shared fixtures for the server tests

use chrono::{DateTime, TimeZone, Utc};

use neptune_core::{
    Berth, BerthAllocation, Component, ComponentType, Port, Position, Route, RouteId, Shipment,
    ShipmentStatus, Vessel, VesselId, VesselStatus,
};

use crate::seed::FleetSeed;
use crate::store::MemoryStore;

pub const SPLIT: Position = Position {
    latitude: 43.5081,
    longitude: 16.4402,
};

pub const ANCONA: Position = Position {
    latitude: 43.6158,
    longitude: 13.5189,
};

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
}

pub fn vessel(id: &str, status: VesselStatus, position: Position) -> Vessel {
    let mut v = Vessel::new(id, &format!("MV {}", id), position);
    v.status = status;
    v.fuel_level = 500.0;
    v.fuel_capacity = 1000.0;
    v
}

pub fn under_way(id: &str, position: Position, speed_knots: f64) -> Vessel {
    let mut v = vessel(id, VesselStatus::AtSea, position);
    v.speed_knots = speed_knots;
    v
}

pub fn routed(id: &str, progress: f64) -> Vessel {
    let mut v = under_way(id, SPLIT, 20.0);
    v.current_route_id = Some(RouteId::new("r-split-ancona"));
    v.route_progress = progress;
    v
}

pub fn component(id: &str, vessel: &str, health: f64) -> Component {
    Component::new(id, vessel, "Main engine", ComponentType::Propulsion, health)
}

pub fn shipment(id: &str, vessel: &str, status: ShipmentStatus) -> Shipment {
    Shipment::new(id, &format!("NEP-{}", id), Some(VesselId::new(vessel)), status)
}

/// Two Adriatic ports with one berth each and a route between them
pub fn adriatic() -> FleetSeed {
    let route = Route::new(
        "r-split-ancona",
        "Split - Ancona",
        vec![SPLIT, Position::new(43.56, 15.0), ANCONA],
    )
    .unwrap()
    .between("p-split", "p-ancona");

    FleetSeed {
        ports: vec![
            Port::new("p-split", "Split", SPLIT),
            Port::new("p-ancona", "Ancona", ANCONA),
        ],
        berths: vec![
            Berth::new("b-split-1", "p-split", "Split 1"),
            Berth::new("b-ancona-1", "p-ancona", "Ancona 1"),
        ],
        routes: vec![route],
        ..Default::default()
    }
}

pub fn allocation(id: &str, vessel: &str, berth: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> BerthAllocation {
    BerthAllocation::new(id, vessel, berth, start, end).unwrap()
}

pub fn store(seed: FleetSeed) -> MemoryStore {
    MemoryStore::from_seed(seed).unwrap()
}
