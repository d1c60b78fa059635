use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ComponentId, VesselId};

/// Health at or below which a component is CRITICAL
pub const CRITICAL_HEALTH: f64 = 10.0;

/// Health at or below which a component is WARNING
pub const WARNING_HEALTH: f64 = 50.0;

/// Derived condition of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentStatus {
    Operational,
    Warning,
    Critical,
}

impl ComponentStatus {
    pub fn from_health(health: f64) -> Self {
        if health <= CRITICAL_HEALTH {
            ComponentStatus::Critical
        } else if health <= WARNING_HEALTH {
            ComponentStatus::Warning
        } else {
            ComponentStatus::Operational
        }
    }
}

impl Default for ComponentStatus {
    fn default() -> Self {
        ComponentStatus::Operational
    }
}

/// Ship system a component belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComponentType {
    Propulsion,
    Electrical,
    Navigation,
    Hull,
}

/// A wearing part of a vessel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: ComponentId,
    pub vessel_id: VesselId,
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    /// Percentage within [0, 100]
    pub health_percentage: f64,
    #[serde(default)]
    pub status: ComponentStatus,
    #[serde(default)]
    pub total_operating_hours: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_maintenance: Option<DateTime<Utc>>,
}

impl Component {
    pub fn new(
        id: impl Into<ComponentId>,
        vessel_id: impl Into<VesselId>,
        name: &str,
        component_type: ComponentType,
        health_percentage: f64,
    ) -> Self {
        let health_percentage = health_percentage.clamp(0.0, 100.0);
        Component {
            id: id.into(),
            vessel_id: vessel_id.into(),
            name: name.to_string(),
            component_type,
            health_percentage,
            status: ComponentStatus::from_health(health_percentage),
            total_operating_hours: 0.0,
            last_maintenance: None,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.health_percentage <= CRITICAL_HEALTH
    }

    /// Recompute `status` from `health_percentage`
    pub fn refresh_status(&mut self) {
        self.status = ComponentStatus::from_health(self.health_percentage);
    }
}
