//! Neptune Core - platform-independent fleet simulation model
//!
//! This crate holds everything about the simulated fleet that does not need
//! I/O: the data model, the navigation maths, fuel and wear rules, route
//! interpolation, berth reservation overlap rules, the per-vessel lifecycle
//! decisions and the alert deduplicator.
//!
//! The server crate drives these from a periodic tick against its data store
//! and fans the results out to observers.
//!
//! # Modules
//!
//! - [`fleet`]: vessels, ports, berths, components, shipments and their ids
//! - [`navigation`]: great-circle stepping and distances
//! - [`degradation`]: fuel burn and component wear
//! - [`route`]: route geometry, progress interpolation and ETA
//! - [`berth`]: berth allocations and interval overlap detection
//! - [`lifecycle`]: what a vessel does on a tick
//! - [`alerts`]: alert payloads and per-vessel deduplication
//! - [`protocol`]: the JSON envelope streamed to observers

pub mod alerts;
pub mod berth;
pub mod degradation;
pub mod fleet;
pub mod lifecycle;
pub mod navigation;
pub mod protocol;
pub mod route;

pub use alerts::{Alert, AlertDeduplicator, AlertLevel};
pub use berth::{AllocationConflict, AllocationStatus, BerthAllocation};
pub use fleet::{
    AllocationId, Berth, BerthId, Component, ComponentId, ComponentStatus, ComponentType, Port,
    PortId, Position, RouteId, Shipment, ShipmentId, ShipmentStatus, Vessel, VesselId,
    VesselStatus,
};
pub use lifecycle::{LifecycleParams, MovementPlan};
pub use protocol::StreamMessage;
pub use route::{Route, RouteError};
