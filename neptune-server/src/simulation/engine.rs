use chrono::Utc;
use std::sync::Arc;

use neptune_core::degradation::is_critically_failing;
use neptune_core::lifecycle::{awaits_berth, can_recover, plan_movement};
use neptune_core::{
    Alert, AlertDeduplicator, LifecycleParams, MovementPlan, StreamMessage, Vessel, VesselStatus,
};

use crate::hub::{HubError, HubHandle};
use crate::store::{FleetStore, StoreError};

/// What one tick did
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub vessels: usize,
    /// Vessels abandoned this tick because of a store error
    pub failed: usize,
    /// Alerts that passed deduplication, in raise order
    pub alerts: Vec<Alert>,
}

/// Runs the per-vessel lifecycle against the data store
///
/// The engine owns the alert deduplicator; nothing else touches it.
pub struct Engine {
    store: Arc<dyn FleetStore>,
    params: LifecycleParams,
    dedup: AlertDeduplicator,
    hub: Option<HubHandle>,
}

impl Engine {
    pub fn new(store: Arc<dyn FleetStore>, params: LifecycleParams) -> Self {
        Engine {
            store,
            params,
            dedup: AlertDeduplicator::new(),
            hub: None,
        }
    }

    /// Publish alerts to observers through `hub`
    pub fn with_hub(mut self, hub: HubHandle) -> Self {
        self.hub = Some(hub);
        self
    }

    /// One simulation pass over a fresh fleet snapshot
    ///
    /// Fails only when the snapshot cannot be read. Store errors while
    /// processing a vessel abandon that vessel for this tick and are logged.
    pub async fn tick(&mut self) -> Result<TickReport, StoreError> {
        let fleet = self.store.vessels().await?;
        let mut report = TickReport {
            vessels: fleet.len(),
            ..TickReport::default()
        };

        for vessel in fleet {
            let name = vessel.name.clone();
            if let Err(e) = self.process(vessel, &mut report).await {
                log::warn!("{}: skipped this tick: {}", name, e);
                report.failed += 1;
            }
        }
        Ok(report)
    }

    /// Recovery, then movement, then berth arrival
    async fn process(&mut self, mut vessel: Vessel, report: &mut TickReport) -> Result<(), StoreError> {
        if vessel.status == VesselStatus::Distress {
            self.check_recovery(&mut vessel, report).await?;
        }
        if let Some(plan) = plan_movement(&vessel, &self.params) {
            self.apply_movement(&mut vessel, plan, report).await?;
        }
        if awaits_berth(&vessel) {
            self.check_berth_arrival(&vessel, report).await?;
        }
        Ok(())
    }

    async fn check_recovery(
        &mut self,
        vessel: &mut Vessel,
        report: &mut TickReport,
    ) -> Result<(), StoreError> {
        let critical = self.store.has_critical_failure(&vessel.id).await?;
        if !can_recover(vessel, critical) {
            log::trace!(
                "{}: still in distress (fuel {:.1}, critical component: {})",
                vessel.name,
                vessel.fuel_level,
                critical
            );
            return Ok(());
        }

        self.store.recover(&vessel.id).await?;
        vessel.status = VesselStatus::Anchored;
        vessel.speed_knots = 0.0;
        log::info!("{}: recovered, now anchored", vessel.name);

        self.dedup.clear(&vessel.id);
        self.raise(Alert::recovered(vessel), report);
        Ok(())
    }

    async fn apply_movement(
        &mut self,
        vessel: &mut Vessel,
        plan: MovementPlan,
        report: &mut TickReport,
    ) -> Result<(), StoreError> {
        match plan {
            MovementPlan::OutOfFuel => {
                self.store.set_distress(&vessel.id, 0.0).await?;
                vessel.status = VesselStatus::Distress;
                vessel.speed_knots = 0.0;
                vessel.fuel_level = 0.0;
                log::warn!("{}: out of fuel at {}", vessel.name, vessel.position);
                self.raise(Alert::out_of_fuel(vessel), report);
            }
            MovementPlan::Arrive { fuel_level } => {
                let arrival = self.store.dock_at_route_end(&vessel.id, fuel_level).await?;
                log::info!(
                    "{}: arrived at {}, {} shipments delivered",
                    vessel.name,
                    arrival.vessel.position,
                    arrival.delivered_shipments
                );
                if let Some(allocation) = &arrival.allocation {
                    log::info!("{}: allocation {} now active", vessel.name, allocation);
                }
                *vessel = arrival.vessel;
                self.raise(Alert::arrived(vessel), report);
            }
            MovementPlan::Advance {
                route_progress,
                fuel_level,
            } => {
                let route_id = match &vessel.current_route_id {
                    Some(id) => id.clone(),
                    None => return Ok(()),
                };
                let route = self.store.route(&route_id).await?;
                let position = route.point_at(route_progress);
                self.store
                    .update_route_progress(&vessel.id, route_progress, fuel_level, position)
                    .await?;
                vessel.route_progress = route_progress;
                vessel.fuel_level = fuel_level;
                vessel.position = position;

                let eta = route.eta(route_progress, vessel.speed_knots, Utc::now());
                let updated = self.store.update_shipment_etas(&vessel.id, eta).await?;
                log::trace!(
                    "{}: {:.1}% of {}, eta {} for {} shipments",
                    vessel.name,
                    route_progress * 100.0,
                    route.name,
                    eta,
                    updated
                );
            }
            MovementPlan::FreeRoam {
                position,
                fuel_level,
            } => {
                self.store
                    .update_position(&vessel.id, position, fuel_level)
                    .await?;
                vessel.position = position;
                vessel.fuel_level = fuel_level;

                let components = self
                    .store
                    .degrade_components(
                        &vessel.id,
                        self.params.component_decay,
                        self.params.operating_hours_per_tick,
                    )
                    .await?;
                if is_critically_failing(&components) {
                    self.store.set_distress(&vessel.id, fuel_level).await?;
                    vessel.status = VesselStatus::Distress;
                    vessel.speed_knots = 0.0;
                    log::warn!("{}: critical mechanical failure at {}", vessel.name, vessel.position);
                    self.raise(Alert::mechanical_failure(vessel), report);
                }
            }
        }
        Ok(())
    }

    async fn check_berth_arrival(
        &mut self,
        vessel: &Vessel,
        report: &mut TickReport,
    ) -> Result<(), StoreError> {
        let allocation = match self.store.scheduled_allocation(&vessel.id).await? {
            Some(a) => a,
            None => return Ok(()),
        };
        let berth = self.store.berth(&allocation.berth_id).await?;
        let nearby = self
            .store
            .ports_near(vessel.position, self.params.docking_radius_km)
            .await?;
        if !nearby.iter().any(|p| p.id == berth.port_id) {
            return Ok(());
        }
        if let Some(occupant) = berth.held_by_other(&vessel.id) {
            log::debug!("{}: waiting for {} to leave berth {}", vessel.name, occupant, berth.name);
            return Ok(());
        }

        let docking = self.store.dock_at_berth(&vessel.id, &allocation.id).await?;
        log::info!(
            "{}: docked at {} berth {}, {} shipments delivered",
            vessel.name,
            docking.port.name,
            docking.berth.name,
            docking.delivered_shipments
        );
        let alert = Alert::docked(&docking.vessel, &docking.port.name, &docking.berth.name);
        self.raise(alert, report);
        Ok(())
    }

    /// Deduplicate and publish without ever waiting on the hub
    fn raise(&mut self, alert: Alert, report: &mut TickReport) {
        let key = alert.key();
        let Some(alert) = self.dedup.raise(alert) else {
            log::debug!("{}: {} alert already sent, suppressed", key.1, key.0);
            return;
        };

        log::info!("{}: [{}] {}", alert.vessel_name, alert.level, alert.message);
        if let Some(hub) = &self.hub {
            match hub.try_broadcast(&StreamMessage::Alert(alert.clone())) {
                Ok(()) => {}
                Err(HubError::Full) => {
                    log::warn!("{}: hub busy, alert dropped", alert.vessel_name)
                }
                Err(e) => log::warn!("{}: alert not published: {}", alert.vessel_name, e),
            }
        }
        report.alerts.push(alert);
    }
}
