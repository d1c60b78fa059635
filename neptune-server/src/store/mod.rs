//! Fleet Data Store
//!
//! The data store is the single source of truth for vessel, route,
//! component, shipment and allocation state. The simulation keeps no
//! authoritative copy between ticks; every tick re-reads a snapshot.
//!
//! Every method on [`FleetStore`] is atomic on its own. The multi-entity
//! docking operations ([`FleetStore::dock_at_route_end`] and
//! [`FleetStore::dock_at_berth`]) either apply all their updates or none.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use neptune_core::{
    AllocationId, Berth, BerthAllocation, BerthId, Component, ComponentId, Port, PortId,
    Position, Route, RouteId, Vessel, VesselId, VesselStatus,
};

mod memory;

pub use memory::MemoryStore;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("vessel {0} not found")]
    VesselNotFound(VesselId),
    #[error("route {0} not found")]
    RouteNotFound(RouteId),
    #[error("port {0} not found")]
    PortNotFound(PortId),
    #[error("berth {0} not found")]
    BerthNotFound(BerthId),
    #[error("component {0} not found")]
    ComponentNotFound(ComponentId),
    #[error("allocation {0} not found")]
    AllocationNotFound(AllocationId),
    #[error("vessel {vessel} cannot go from {from} to {to}")]
    InvalidTransition {
        vessel: VesselId,
        from: VesselStatus,
        to: VesselStatus,
    },
    #[error("berth {berth} is occupied by vessel {occupant}")]
    BerthOccupied { berth: BerthId, occupant: VesselId },
    #[error("{0}")]
    Invalid(String),
}

/// Result of docking at the end of a route
#[derive(Debug, Clone, PartialEq)]
pub struct RouteArrival {
    pub vessel: Vessel,
    /// Allocation at the destination port activated by the arrival
    pub allocation: Option<AllocationId>,
    pub delivered_shipments: usize,
}

/// Result of docking at a reserved berth
#[derive(Debug, Clone, PartialEq)]
pub struct BerthDocking {
    pub vessel: Vessel,
    pub port: Port,
    pub berth: Berth,
    pub delivered_shipments: usize,
}

#[async_trait]
pub trait FleetStore: Send + Sync {
    /// All vessels with full state
    async fn vessels(&self) -> Result<Vec<Vessel>, StoreError>;

    async fn vessel(&self, id: &VesselId) -> Result<Vessel, StoreError>;

    /// Persist a free-roam step
    async fn update_position(
        &self,
        id: &VesselId,
        position: Position,
        fuel_level: f64,
    ) -> Result<(), StoreError>;

    /// Persist a step along the assigned route
    async fn update_route_progress(
        &self,
        id: &VesselId,
        route_progress: f64,
        fuel_level: f64,
        position: Position,
    ) -> Result<(), StoreError>;

    /// Zero speed, store `fuel_level`, mark DISTRESS
    async fn set_distress(&self, id: &VesselId, fuel_level: f64) -> Result<(), StoreError>;

    /// DISTRESS to ANCHORED with zero speed
    async fn recover(&self, id: &VesselId) -> Result<(), StoreError>;

    /// Put the vessel on `route` at `speed_knots`
    ///
    /// Progress resets to 0, fuel fills to capacity, the position snaps to
    /// the first point of the route and any berth binding is released.
    async fn assign_route(
        &self,
        id: &VesselId,
        route: &RouteId,
        speed_knots: f64,
    ) -> Result<Vessel, StoreError>;

    /// Fill fuel to capacity
    async fn refuel(&self, id: &VesselId) -> Result<Vessel, StoreError>;

    /// Dock at the terminal point of the assigned route
    ///
    /// Marks the vessel DOCKED with zero speed and full progress, delivers
    /// in-transit cargo, stamps arrived ETAs, and activates a SCHEDULED
    /// allocation at a berth of the destination port if one exists.
    async fn dock_at_route_end(
        &self,
        id: &VesselId,
        fuel_level: f64,
    ) -> Result<RouteArrival, StoreError>;

    /// Dock at the berth of a SCHEDULED allocation
    ///
    /// Snaps the vessel to the port, binds vessel and berth, activates the
    /// allocation and delivers in-transit cargo.
    async fn dock_at_berth(
        &self,
        id: &VesselId,
        allocation: &AllocationId,
    ) -> Result<BerthDocking, StoreError>;

    async fn route(&self, id: &RouteId) -> Result<Route, StoreError>;

    async fn port(&self, id: &PortId) -> Result<Port, StoreError>;

    async fn berth(&self, id: &BerthId) -> Result<Berth, StoreError>;

    /// Ports within `radius_km` of `position`, nearest first
    async fn ports_near(&self, position: Position, radius_km: f64)
        -> Result<Vec<Port>, StoreError>;

    async fn components(&self, vessel: &VesselId) -> Result<Vec<Component>, StoreError>;

    /// Wear every component of `vessel` and return the updated set
    async fn degrade_components(
        &self,
        vessel: &VesselId,
        amount: f64,
        hours: f64,
    ) -> Result<Vec<Component>, StoreError>;

    async fn has_critical_failure(&self, vessel: &VesselId) -> Result<bool, StoreError>;

    /// Restore a component to full health
    async fn maintain_component(&self, id: &ComponentId) -> Result<Component, StoreError>;

    /// Set the ETA of the PENDING and IN_TRANSIT shipments on `vessel`
    async fn update_shipment_etas(
        &self,
        vessel: &VesselId,
        eta: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    /// Earliest SCHEDULED allocation of `vessel`
    async fn scheduled_allocation(
        &self,
        vessel: &VesselId,
    ) -> Result<Option<BerthAllocation>, StoreError>;

    async fn allocations_for_berth(
        &self,
        berth: &BerthId,
    ) -> Result<Vec<BerthAllocation>, StoreError>;

    /// SCHEDULED and ACTIVE allocations at any berth of `port` intersecting
    /// the window, ordered by start
    async fn allocations_for_port(
        &self,
        port: &PortId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BerthAllocation>, StoreError>;

    /// Insert without any overlap check. Use the scheduler instead.
    async fn insert_allocation(&self, allocation: BerthAllocation) -> Result<(), StoreError>;

    /// Vessels holding no SCHEDULED or ACTIVE allocation that ends after `now`
    async fn unassigned_vessels(&self, now: DateTime<Utc>) -> Result<Vec<Vessel>, StoreError>;
}
