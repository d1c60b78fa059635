use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

use neptune_core::degradation::{degrade_component, is_critically_failing, service_component};
use neptune_core::navigation::{distance_km, within_radius};
use neptune_core::{
    AllocationId, AllocationStatus, Berth, BerthAllocation, BerthId, Component, ComponentId,
    Port, PortId, Position, Route, RouteId, Shipment, ShipmentId, ShipmentStatus, Vessel,
    VesselId, VesselStatus,
};

use super::{BerthDocking, FleetStore, RouteArrival, StoreError};
use crate::seed::{FleetSeed, SeedError};

#[derive(Debug, Default)]
struct FleetState {
    vessels: BTreeMap<VesselId, Vessel>,
    routes: BTreeMap<RouteId, Route>,
    ports: BTreeMap<PortId, Port>,
    berths: BTreeMap<BerthId, Berth>,
    components: BTreeMap<ComponentId, Component>,
    shipments: BTreeMap<ShipmentId, Shipment>,
    allocations: BTreeMap<AllocationId, BerthAllocation>,
}

impl FleetState {
    fn vessel(&self, id: &VesselId) -> Result<&Vessel, StoreError> {
        self.vessels
            .get(id)
            .ok_or_else(|| StoreError::VesselNotFound(id.clone()))
    }

    fn vessel_mut(&mut self, id: &VesselId) -> Result<&mut Vessel, StoreError> {
        self.vessels
            .get_mut(id)
            .ok_or_else(|| StoreError::VesselNotFound(id.clone()))
    }

    fn route(&self, id: &RouteId) -> Result<&Route, StoreError> {
        self.routes
            .get(id)
            .ok_or_else(|| StoreError::RouteNotFound(id.clone()))
    }

    fn port(&self, id: &PortId) -> Result<&Port, StoreError> {
        self.ports
            .get(id)
            .ok_or_else(|| StoreError::PortNotFound(id.clone()))
    }

    fn berth(&self, id: &BerthId) -> Result<&Berth, StoreError> {
        self.berths
            .get(id)
            .ok_or_else(|| StoreError::BerthNotFound(id.clone()))
    }

    fn allocation(&self, id: &AllocationId) -> Result<&BerthAllocation, StoreError> {
        self.allocations
            .get(id)
            .ok_or_else(|| StoreError::AllocationNotFound(id.clone()))
    }

    fn scheduled_allocations<'a>(
        &'a self,
        vessel: &'a VesselId,
    ) -> impl Iterator<Item = &'a BerthAllocation> + 'a {
        self.allocations
            .values()
            .filter(move |a| &a.vessel_id == vessel && a.status == AllocationStatus::Scheduled)
    }

    /// Mark carried IN_TRANSIT cargo delivered and stamp the arrival as ETA
    fn deliver_shipments(&mut self, vessel: &VesselId, now: DateTime<Utc>) -> usize {
        let mut delivered = 0;
        for s in self.shipments.values_mut().filter(|s| s.is_carried_by(vessel)) {
            if s.status.tracks_eta() {
                s.eta = Some(now);
            }
            if s.status == ShipmentStatus::InTransit {
                s.status = ShipmentStatus::Delivered;
                delivered += 1;
            }
        }
        delivered
    }

    fn require_status(
        vessel: &Vessel,
        allowed: &[VesselStatus],
        to: VesselStatus,
    ) -> Result<(), StoreError> {
        if allowed.contains(&vessel.status) {
            Ok(())
        } else {
            Err(StoreError::InvalidTransition {
                vessel: vessel.id.clone(),
                from: vessel.status,
                to,
            })
        }
    }
}

/// In-memory [`FleetStore`]
///
/// A single async read-write lock guards the whole state, so every store
/// operation, including the multi-entity docking operations, is atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<FleetState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seed(seed: FleetSeed) -> Result<Self, SeedError> {
        seed.validate()?;
        let state = FleetState {
            vessels: seed.vessels.into_iter().map(|v| (v.id.clone(), v)).collect(),
            routes: seed.routes.into_iter().map(|r| (r.id.clone(), r)).collect(),
            ports: seed.ports.into_iter().map(|p| (p.id.clone(), p)).collect(),
            berths: seed.berths.into_iter().map(|b| (b.id.clone(), b)).collect(),
            components: seed
                .components
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
            shipments: seed
                .shipments
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect(),
            allocations: seed
                .allocations
                .into_iter()
                .map(|a| (a.id.clone(), a))
                .collect(),
        };
        Ok(MemoryStore {
            state: RwLock::new(state),
        })
    }

    pub async fn shipments(&self, vessel: &VesselId) -> Vec<Shipment> {
        let state = self.state.read().await;
        state
            .shipments
            .values()
            .filter(|s| s.is_carried_by(vessel))
            .cloned()
            .collect()
    }

    pub async fn allocation(&self, id: &AllocationId) -> Result<BerthAllocation, StoreError> {
        let state = self.state.read().await;
        state.allocation(id).cloned()
    }

    #[cfg(test)]
    pub(crate) async fn remove_route(&self, id: &RouteId) {
        self.state.write().await.routes.remove(id);
    }
}

#[async_trait]
impl FleetStore for MemoryStore {
    async fn vessels(&self) -> Result<Vec<Vessel>, StoreError> {
        let state = self.state.read().await;
        Ok(state.vessels.values().cloned().collect())
    }

    async fn vessel(&self, id: &VesselId) -> Result<Vessel, StoreError> {
        let state = self.state.read().await;
        state.vessel(id).cloned()
    }

    async fn update_position(
        &self,
        id: &VesselId,
        position: Position,
        fuel_level: f64,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let v = state.vessel_mut(id)?;
        v.position = position;
        v.fuel_level = fuel_level.clamp(0.0, v.fuel_capacity.max(0.0));
        v.last_updated = Utc::now();
        Ok(())
    }

    async fn update_route_progress(
        &self,
        id: &VesselId,
        route_progress: f64,
        fuel_level: f64,
        position: Position,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let v = state.vessel_mut(id)?;
        v.route_progress = route_progress.clamp(0.0, 1.0);
        v.fuel_level = fuel_level.clamp(0.0, v.fuel_capacity.max(0.0));
        v.position = position;
        v.last_updated = Utc::now();
        Ok(())
    }

    async fn set_distress(&self, id: &VesselId, fuel_level: f64) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let v = state.vessel_mut(id)?;
        v.status = VesselStatus::Distress;
        v.speed_knots = 0.0;
        v.fuel_level = fuel_level.clamp(0.0, v.fuel_capacity.max(0.0));
        v.last_updated = Utc::now();
        Ok(())
    }

    async fn recover(&self, id: &VesselId) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let v = state.vessel_mut(id)?;
        FleetState::require_status(v, &[VesselStatus::Distress], VesselStatus::Anchored)?;
        v.status = VesselStatus::Anchored;
        v.speed_knots = 0.0;
        v.last_updated = Utc::now();
        Ok(())
    }

    async fn assign_route(
        &self,
        id: &VesselId,
        route: &RouteId,
        speed_knots: f64,
    ) -> Result<Vessel, StoreError> {
        let mut state = self.state.write().await;
        let start = state.route(route)?.start();
        let vessel = state.vessel(id)?;
        if !vessel.status.accepts_route_assignment() {
            return Err(StoreError::InvalidTransition {
                vessel: id.clone(),
                from: vessel.status,
                to: VesselStatus::AtSea,
            });
        }
        if !(speed_knots.is_finite() && speed_knots > 0.0) {
            return Err(StoreError::Invalid(format!(
                "speed must be positive, got {}",
                speed_knots
            )));
        }

        // Leaving port frees the berth and finishes the stay
        if let Some(berth_id) = vessel.current_berth_id.clone() {
            if let Some(berth) = state.berths.get_mut(&berth_id) {
                if berth.current_vessel_id.as_ref() == Some(id) {
                    berth.release();
                }
            }
            for a in state.allocations.values_mut().filter(|a| {
                &a.vessel_id == id && a.berth_id == berth_id && a.status == AllocationStatus::Active
            }) {
                a.status = AllocationStatus::Completed;
            }
        }

        let v = state.vessel_mut(id)?;
        v.current_route_id = Some(route.clone());
        v.route_progress = 0.0;
        v.status = VesselStatus::AtSea;
        v.speed_knots = speed_knots;
        v.fuel_level = v.fuel_capacity;
        v.position = start;
        v.current_berth_id = None;
        v.last_updated = Utc::now();
        Ok(v.clone())
    }

    async fn refuel(&self, id: &VesselId) -> Result<Vessel, StoreError> {
        let mut state = self.state.write().await;
        let v = state.vessel_mut(id)?;
        v.fuel_level = v.fuel_capacity;
        v.last_updated = Utc::now();
        Ok(v.clone())
    }

    async fn dock_at_route_end(
        &self,
        id: &VesselId,
        fuel_level: f64,
    ) -> Result<RouteArrival, StoreError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        // Validate everything before touching anything
        let vessel = state.vessel(id)?;
        FleetState::require_status(vessel, &[VesselStatus::AtSea], VesselStatus::Docked)?;
        let route_id = vessel
            .current_route_id
            .clone()
            .ok_or_else(|| StoreError::Invalid(format!("vessel {} has no route", id)))?;
        let route = state.route(&route_id)?;
        let terminal = route.end();

        let mut activation = None;
        if let Some(port) = route.destination_port_id.clone() {
            for a in state.scheduled_allocations(id) {
                let berth = state.berth(&a.berth_id)?;
                if berth.port_id != port {
                    continue;
                }
                if let Some(occupant) = berth.held_by_other(id) {
                    log::warn!(
                        "{}: berth {} still held by {}, not activating {}",
                        id,
                        berth.id,
                        occupant,
                        a.id
                    );
                    continue;
                }
                let earlier = activation
                    .as_ref()
                    .map_or(true, |(_, start, _)| a.start_time < *start);
                if earlier {
                    activation = Some((a.id.clone(), a.start_time, a.berth_id.clone()));
                }
            }
        }

        if let Some((allocation_id, _, berth_id)) = &activation {
            if let Some(a) = state.allocations.get_mut(allocation_id) {
                a.status = AllocationStatus::Active;
            }
            if let Some(b) = state.berths.get_mut(berth_id) {
                b.occupy(id);
            }
        }
        let delivered_shipments = state.deliver_shipments(id, now);

        let v = state.vessel_mut(id)?;
        v.status = VesselStatus::Docked;
        v.speed_knots = 0.0;
        v.route_progress = 1.0;
        v.position = terminal;
        v.fuel_level = fuel_level.clamp(0.0, v.fuel_capacity.max(0.0));
        if let Some((_, _, berth_id)) = &activation {
            v.current_berth_id = Some(berth_id.clone());
        }
        v.last_updated = now;

        Ok(RouteArrival {
            vessel: v.clone(),
            allocation: activation.map(|(id, _, _)| id),
            delivered_shipments,
        })
    }

    async fn dock_at_berth(
        &self,
        id: &VesselId,
        allocation: &AllocationId,
    ) -> Result<BerthDocking, StoreError> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let vessel = state.vessel(id)?;
        FleetState::require_status(vessel, &[VesselStatus::AtSea], VesselStatus::Docked)?;
        let a = state.allocation(allocation)?;
        if &a.vessel_id != id {
            return Err(StoreError::Invalid(format!(
                "allocation {} belongs to vessel {}, not {}",
                allocation, a.vessel_id, id
            )));
        }
        if a.status != AllocationStatus::Scheduled {
            return Err(StoreError::Invalid(format!(
                "allocation {} is {}, not SCHEDULED",
                allocation, a.status
            )));
        }
        let berth_id = a.berth_id.clone();
        let held = state.berth(&berth_id)?;
        if let Some(occupant) = held.held_by_other(id) {
            return Err(StoreError::BerthOccupied {
                berth: berth_id,
                occupant: occupant.clone(),
            });
        }
        let port = state.port(&held.port_id)?.clone();

        if let Some(a) = state.allocations.get_mut(allocation) {
            a.status = AllocationStatus::Active;
        }
        let mut berth = state.berth(&berth_id)?.clone();
        berth.occupy(id);
        state.berths.insert(berth_id.clone(), berth.clone());
        let delivered_shipments = state.deliver_shipments(id, now);

        let v = state.vessel_mut(id)?;
        v.status = VesselStatus::Docked;
        v.speed_knots = 0.0;
        v.position = port.position;
        v.current_berth_id = Some(berth_id);
        v.last_updated = now;

        Ok(BerthDocking {
            vessel: v.clone(),
            port,
            berth,
            delivered_shipments,
        })
    }

    async fn route(&self, id: &RouteId) -> Result<Route, StoreError> {
        let state = self.state.read().await;
        state.route(id).cloned()
    }

    async fn port(&self, id: &PortId) -> Result<Port, StoreError> {
        let state = self.state.read().await;
        state.port(id).cloned()
    }

    async fn berth(&self, id: &BerthId) -> Result<Berth, StoreError> {
        let state = self.state.read().await;
        state.berth(id).cloned()
    }

    async fn ports_near(
        &self,
        position: Position,
        radius_km: f64,
    ) -> Result<Vec<Port>, StoreError> {
        let state = self.state.read().await;
        let mut near: Vec<(f64, Port)> = state
            .ports
            .values()
            .filter(|p| within_radius(position, p.position, radius_km))
            .map(|p| (distance_km(position, p.position), p.clone()))
            .collect();
        near.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(near.into_iter().map(|(_, p)| p).collect())
    }

    async fn components(&self, vessel: &VesselId) -> Result<Vec<Component>, StoreError> {
        let state = self.state.read().await;
        state.vessel(vessel)?;
        Ok(state
            .components
            .values()
            .filter(|c| &c.vessel_id == vessel)
            .cloned()
            .collect())
    }

    async fn degrade_components(
        &self,
        vessel: &VesselId,
        amount: f64,
        hours: f64,
    ) -> Result<Vec<Component>, StoreError> {
        let mut state = self.state.write().await;
        state.vessel(vessel)?;
        let mut updated = Vec::new();
        for c in state
            .components
            .values_mut()
            .filter(|c| &c.vessel_id == vessel)
        {
            degrade_component(c, amount, hours);
            updated.push(c.clone());
        }
        Ok(updated)
    }

    async fn has_critical_failure(&self, vessel: &VesselId) -> Result<bool, StoreError> {
        let state = self.state.read().await;
        state.vessel(vessel)?;
        Ok(is_critically_failing(
            state.components.values().filter(|c| &c.vessel_id == vessel),
        ))
    }

    async fn maintain_component(&self, id: &ComponentId) -> Result<Component, StoreError> {
        let mut state = self.state.write().await;
        let c = state
            .components
            .get_mut(id)
            .ok_or_else(|| StoreError::ComponentNotFound(id.clone()))?;
        service_component(c);
        c.last_maintenance = Some(Utc::now());
        Ok(c.clone())
    }

    async fn update_shipment_etas(
        &self,
        vessel: &VesselId,
        eta: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for s in state
            .shipments
            .values_mut()
            .filter(|s| s.is_carried_by(vessel) && s.status.tracks_eta())
        {
            s.eta = Some(eta);
            updated += 1;
        }
        Ok(updated)
    }

    async fn scheduled_allocation(
        &self,
        vessel: &VesselId,
    ) -> Result<Option<BerthAllocation>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .scheduled_allocations(vessel)
            .min_by_key(|a| a.start_time)
            .cloned())
    }

    async fn allocations_for_berth(
        &self,
        berth: &BerthId,
    ) -> Result<Vec<BerthAllocation>, StoreError> {
        let state = self.state.read().await;
        state.berth(berth)?;
        Ok(state
            .allocations
            .values()
            .filter(|a| &a.berth_id == berth)
            .cloned()
            .collect())
    }

    async fn allocations_for_port(
        &self,
        port: &PortId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<BerthAllocation>, StoreError> {
        let state = self.state.read().await;
        state.port(port)?;
        let berths: HashSet<&BerthId> = state
            .berths
            .values()
            .filter(|b| &b.port_id == port)
            .map(|b| &b.id)
            .collect();
        let mut list: Vec<BerthAllocation> = state
            .allocations
            .values()
            .filter(|a| {
                berths.contains(&a.berth_id)
                    && a.status.is_blocking()
                    && a.intersects_window(start, end)
            })
            .cloned()
            .collect();
        list.sort_by_key(|a| a.start_time);
        Ok(list)
    }

    async fn insert_allocation(&self, allocation: BerthAllocation) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        state.vessel(&allocation.vessel_id)?;
        state.berth(&allocation.berth_id)?;
        if state.allocations.contains_key(&allocation.id) {
            return Err(StoreError::Invalid(format!(
                "allocation {} already exists",
                allocation.id
            )));
        }
        state.allocations.insert(allocation.id.clone(), allocation);
        Ok(())
    }

    async fn unassigned_vessels(&self, now: DateTime<Utc>) -> Result<Vec<Vessel>, StoreError> {
        let state = self.state.read().await;
        let assigned: HashSet<&VesselId> = state
            .allocations
            .values()
            .filter(|a| a.status.is_blocking() && a.end_time > now)
            .map(|a| &a.vessel_id)
            .collect();
        let mut list: Vec<Vessel> = state
            .vessels
            .values()
            .filter(|v| !assigned.contains(&v.id))
            .cloned()
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }
}
