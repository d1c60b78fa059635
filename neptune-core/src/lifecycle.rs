//! Vessel Lifecycle Decisions
//!
//! Pure per-vessel decisions for one simulation tick. The server's engine
//! asks this module *what* happens to a vessel and then applies the outcome
//! against its data store.
//!
//! Per tick and per vessel the order is fixed: recovery check, movement,
//! berth-arrival check. Movement for an under-way vessel resolves to exactly
//! one [`MovementPlan`]:
//!
//! 1. Burn fuel. Empty tanks end the tick in distress.
//! 2. With a route, step progress by a fixed increment. Reaching 1.0 docks
//!    the vessel on the same tick.
//! 3. Without a route, free-roam along the current heading.

use crate::degradation::{
    fuel_burn, remaining_fuel, BASE_BURN_RATE, COMPONENT_DECAY_PER_TICK,
    OPERATING_HOURS_PER_TICK, REFERENCE_SPEED_KN,
};
use crate::fleet::{Position, Vessel, VesselStatus};
use crate::navigation::next_position;
use crate::route::advance_progress;

/// Tunables of the lifecycle rules
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleParams {
    /// Seconds of simulated time per tick
    pub tick_secs: f64,
    pub base_burn_rate: f64,
    pub reference_speed_kn: f64,
    /// Route progress added per tick
    pub route_increment: f64,
    pub component_decay: f64,
    pub operating_hours_per_tick: f64,
    /// Distance from a port at which a vessel with a reservation docks
    pub docking_radius_km: f64,
    /// Speed given to a vessel when a route is assigned
    pub assigned_route_speed_kn: f64,
}

impl Default for LifecycleParams {
    fn default() -> Self {
        LifecycleParams {
            tick_secs: 5.0,
            base_burn_rate: BASE_BURN_RATE,
            reference_speed_kn: REFERENCE_SPEED_KN,
            route_increment: 0.002,
            component_decay: COMPONENT_DECAY_PER_TICK,
            operating_hours_per_tick: OPERATING_HOURS_PER_TICK,
            docking_radius_km: 10.0,
            assigned_route_speed_kn: 1500.0,
        }
    }
}

/// Outcome of the movement step for an under-way vessel
#[derive(Debug, Clone, PartialEq)]
pub enum MovementPlan {
    /// Tanks ran dry this tick: go to DISTRESS, stop
    OutOfFuel,
    /// The route is complete: dock at its terminal point
    Arrive { fuel_level: f64 },
    /// Still en route: persist the new progress and fuel
    Advance { route_progress: f64, fuel_level: f64 },
    /// No route: persist the stepped position and fuel, then apply wear
    FreeRoam { position: Position, fuel_level: f64 },
}

/// Decide the movement step for `vessel`
///
/// Returns `None` for vessels that are not under way (not AT_SEA, or AT_SEA
/// with zero speed).
pub fn plan_movement(vessel: &Vessel, params: &LifecycleParams) -> Option<MovementPlan> {
    if !vessel.is_under_way() {
        return None;
    }

    let burn = fuel_burn(
        params.base_burn_rate,
        vessel.speed_knots,
        params.reference_speed_kn,
    );
    let fuel_level = remaining_fuel(vessel.fuel_level, burn).min(vessel.fuel_capacity.max(0.0));
    if fuel_level <= 0.0 {
        return Some(MovementPlan::OutOfFuel);
    }

    if vessel.current_route_id.is_some() {
        if vessel.route_progress >= 1.0 {
            return Some(MovementPlan::Arrive { fuel_level });
        }
        let route_progress = advance_progress(vessel.route_progress, params.route_increment);
        if route_progress >= 1.0 {
            return Some(MovementPlan::Arrive { fuel_level });
        }
        return Some(MovementPlan::Advance {
            route_progress,
            fuel_level,
        });
    }

    let position = next_position(
        vessel.position,
        vessel.speed_knots,
        vessel.heading,
        params.tick_secs,
    );
    Some(MovementPlan::FreeRoam {
        position,
        fuel_level,
    })
}

/// Whether a vessel in distress may recover this tick
///
/// Needs fuel in the tanks and no component at or below the critical
/// threshold.
pub fn can_recover(vessel: &Vessel, has_critical_component: bool) -> bool {
    vessel.status == VesselStatus::Distress && vessel.fuel_level > 0.0 && !has_critical_component
}

/// Whether the berth-arrival check applies to `vessel`
pub fn awaits_berth(vessel: &Vessel) -> bool {
    vessel.status == VesselStatus::AtSea
}
