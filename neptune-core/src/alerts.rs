//! Alerts and Alert Deduplication
//!
//! Alerts are ephemeral notifications raised on lifecycle transitions. Each
//! (level, vessel) pair is delivered at most once until it is cleared, which
//! happens when the vessel recovers from distress.
//!
//! The deduplicator is plain owned state with no interior locking. It
//! belongs to whoever runs the tick.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::fleet::{Vessel, VesselId};

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertLevel {
    Info,
    Critical,
}

impl AlertLevel {
    pub const ALL: [AlertLevel; 2] = [AlertLevel::Info, AlertLevel::Critical];
}

impl fmt::Display for AlertLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertLevel::Info => f.write_str("INFO"),
            AlertLevel::Critical => f.write_str("CRITICAL"),
        }
    }
}

/// Alert payload as streamed to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
    pub vessel_id: VesselId,
    pub vessel_name: String,
    pub timestamp: DateTime<Utc>,
}

impl Alert {
    pub fn new(level: AlertLevel, vessel: &Vessel, message: impl Into<String>) -> Self {
        Alert {
            level,
            message: message.into(),
            vessel_id: vessel.id.clone(),
            vessel_name: vessel.name.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn out_of_fuel(vessel: &Vessel) -> Self {
        Alert::new(
            AlertLevel::Critical,
            vessel,
            format!("{} has run out of fuel and is stranded at sea!", vessel.name),
        )
    }

    pub fn mechanical_failure(vessel: &Vessel) -> Self {
        Alert::new(
            AlertLevel::Critical,
            vessel,
            format!("{} has experienced a critical mechanical failure!", vessel.name),
        )
    }

    pub fn arrived(vessel: &Vessel) -> Self {
        Alert::new(
            AlertLevel::Info,
            vessel,
            format!("{} has successfully arrived at the destination port.", vessel.name),
        )
    }

    pub fn docked(vessel: &Vessel, port_name: &str, berth_name: &str) -> Self {
        Alert::new(
            AlertLevel::Info,
            vessel,
            format!(
                "{} has arrived at {} and docked at {}",
                vessel.name, port_name, berth_name
            ),
        )
    }

    pub fn recovered(vessel: &Vessel) -> Self {
        Alert::new(
            AlertLevel::Info,
            vessel,
            format!("{} has been recovered and is now anchored.", vessel.name),
        )
    }

    pub fn key(&self) -> (AlertLevel, VesselId) {
        (self.level, self.vessel_id.clone())
    }
}

/// Suppresses repeated alerts per (level, vessel) until cleared
#[derive(Debug, Default)]
pub struct AlertDeduplicator {
    delivered: HashSet<(AlertLevel, VesselId)>,
}

impl AlertDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass the alert through if its key has not been delivered yet
    ///
    /// Returns `None` for a suppressed duplicate.
    pub fn raise(&mut self, alert: Alert) -> Option<Alert> {
        if self.delivered.insert(alert.key()) {
            Some(alert)
        } else {
            None
        }
    }

    /// Forget both levels for `vessel`
    pub fn clear(&mut self, vessel: &VesselId) {
        for level in AlertLevel::ALL {
            self.delivered.remove(&(level, vessel.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::Position;

    fn vessel(id: &str) -> Vessel {
        Vessel::new(id, "Adriatic Queen", Position::default())
    }

    #[test]
    fn test_duplicate_suppressed_until_clear() {
        let mut dedup = AlertDeduplicator::new();
        let v = vessel("v-1");

        assert!(dedup.raise(Alert::out_of_fuel(&v)).is_some());
        assert!(dedup.raise(Alert::out_of_fuel(&v)).is_none());
        assert!(dedup.raise(Alert::mechanical_failure(&v)).is_none());

        dedup.clear(&v.id);
        assert!(dedup.raise(Alert::out_of_fuel(&v)).is_some());
    }

    #[test]
    fn test_levels_and_vessels_are_independent() {
        let mut dedup = AlertDeduplicator::new();
        let a = vessel("v-1");
        let b = vessel("v-2");

        assert!(dedup.raise(Alert::out_of_fuel(&a)).is_some());
        assert!(dedup.raise(Alert::arrived(&a)).is_some());
        assert!(dedup.raise(Alert::out_of_fuel(&b)).is_some());

        dedup.clear(&a.id);
        assert!(dedup.raise(Alert::arrived(&a)).is_some());
        assert!(dedup.raise(Alert::out_of_fuel(&a)).is_some());
        assert!(dedup.raise(Alert::out_of_fuel(&b)).is_none());
    }

    #[test]
    fn test_alert_wire_format() {
        let v = vessel("v-7");
        let json = serde_json::to_value(Alert::recovered(&v)).unwrap();
        assert_eq!(json["level"], "INFO");
        assert_eq!(json["vessel_id"], "v-7");
        assert_eq!(json["vessel_name"], "Adriatic Queen");
        assert!(json["message"].as_str().unwrap().contains("anchored"));
        assert!(json["timestamp"].is_string());
    }
}
