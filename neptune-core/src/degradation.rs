//! Fuel and Component Degradation
//!
//! Deterministic wear rules applied to under-way vessels each tick.
//! Burn is linear in speed; component wear is a fixed decrement per
//! free-roam tick. Nothing here is stochastic.

use crate::fleet::{Component, ComponentStatus};

/// Fuel burned per tick at the reference speed, in tonnes
pub const BASE_BURN_RATE: f64 = 0.5;

/// Speed at which a vessel burns exactly [`BASE_BURN_RATE`] per tick
pub const REFERENCE_SPEED_KN: f64 = 20.0;

/// Health percentage lost by every component per free-roam tick
pub const COMPONENT_DECAY_PER_TICK: f64 = 0.1;

/// Operating hours credited to every component per free-roam tick
pub const OPERATING_HOURS_PER_TICK: f64 = 5.0;

/// Fuel burned in one tick at `speed_knots`
///
/// `burn = base_rate * (speed / reference_speed)`
pub fn fuel_burn(base_rate: f64, speed_knots: f64, reference_speed: f64) -> f64 {
    if reference_speed <= 0.0 || speed_knots <= 0.0 {
        return 0.0;
    }
    base_rate * (speed_knots / reference_speed)
}

/// Remaining fuel after burning `burn`, never below zero
pub fn remaining_fuel(fuel_level: f64, burn: f64) -> f64 {
    (fuel_level - burn).max(0.0)
}

/// Apply one tick of wear to a component
///
/// Health never drops below zero and the status is recomputed from the
/// remaining health.
pub fn degrade_component(component: &mut Component, amount: f64, hours: f64) {
    component.health_percentage = (component.health_percentage - amount).clamp(0.0, 100.0);
    component.total_operating_hours += hours;
    component.refresh_status();
}

/// Restore a component to full health
pub fn service_component(component: &mut Component) {
    component.health_percentage = 100.0;
    component.status = ComponentStatus::Operational;
}

/// A vessel is critically failing iff at least one component is at or below
/// the critical threshold
pub fn is_critically_failing<'a>(components: impl IntoIterator<Item = &'a Component>) -> bool {
    components.into_iter().any(Component::is_critical)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::ComponentType;

    #[test]
    fn test_burn_is_linear_in_speed() {
        assert_eq!(fuel_burn(BASE_BURN_RATE, 20.0, REFERENCE_SPEED_KN), 0.5);
        assert_eq!(fuel_burn(BASE_BURN_RATE, 40.0, REFERENCE_SPEED_KN), 1.0);
        assert_eq!(fuel_burn(BASE_BURN_RATE, 10.0, REFERENCE_SPEED_KN), 0.25);
        assert_eq!(fuel_burn(BASE_BURN_RATE, 0.0, REFERENCE_SPEED_KN), 0.0);
    }

    #[test]
    fn test_remaining_fuel_floors_at_zero() {
        assert_eq!(remaining_fuel(10.0, 0.5), 9.5);
        assert_eq!(remaining_fuel(0.3, 0.5), 0.0);
        assert_eq!(remaining_fuel(0.0, 0.5), 0.0);
    }

    #[test]
    fn test_degrade_crosses_thresholds() {
        let mut c = Component::new("c-1", "v-1", "Engine", ComponentType::Propulsion, 50.05);
        assert_eq!(c.status, ComponentStatus::Operational);

        degrade_component(&mut c, COMPONENT_DECAY_PER_TICK, OPERATING_HOURS_PER_TICK);
        assert_eq!(c.status, ComponentStatus::Warning);
        assert_eq!(c.total_operating_hours, 5.0);

        let mut c = Component::new("c-2", "v-1", "Generator", ComponentType::Electrical, 10.05);
        degrade_component(&mut c, COMPONENT_DECAY_PER_TICK, OPERATING_HOURS_PER_TICK);
        assert_eq!(c.status, ComponentStatus::Critical);
    }

    #[test]
    fn test_degrade_never_negative() {
        let mut c = Component::new("c-1", "v-1", "Hull", ComponentType::Hull, 0.05);
        degrade_component(&mut c, 1.0, 5.0);
        assert_eq!(c.health_percentage, 0.0);
    }

    #[test]
    fn test_critical_failure_predicate() {
        let healthy = Component::new("c-1", "v-1", "Engine", ComponentType::Propulsion, 80.0);
        let worn = Component::new("c-2", "v-1", "Radar", ComponentType::Navigation, 30.0);
        let broken = Component::new("c-3", "v-1", "Rudder", ComponentType::Hull, 10.0);

        assert!(!is_critically_failing([&healthy, &worn]));
        assert!(is_critically_failing([&healthy, &broken]));
        assert!(!is_critically_failing(std::iter::empty::<&Component>()));
    }

    #[test]
    fn test_service_restores() {
        let mut c = Component::new("c-1", "v-1", "Engine", ComponentType::Propulsion, 3.0);
        service_component(&mut c);
        assert_eq!(c.health_percentage, 100.0);
        assert_eq!(c.status, ComponentStatus::Operational);
    }
}
