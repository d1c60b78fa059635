use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PortId, ShipmentId, VesselId};

/// Delivery status of a shipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShipmentStatus {
    Pending,
    InTransit,
    Delivered,
}

impl ShipmentStatus {
    /// Shipments whose ETA follows the carrying vessel
    pub fn tracks_eta(&self) -> bool {
        matches!(self, ShipmentStatus::Pending | ShipmentStatus::InTransit)
    }
}

/// Cargo carried by a vessel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shipment {
    pub id: ShipmentId,
    pub tracking_number: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_port_id: Option<PortId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_port_id: Option<PortId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel_id: Option<VesselId>,
    #[serde(default)]
    pub weight_kg: f64,
    pub status: ShipmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<DateTime<Utc>>,
}

impl Shipment {
    pub fn new(
        id: impl Into<ShipmentId>,
        tracking_number: &str,
        vessel_id: Option<VesselId>,
        status: ShipmentStatus,
    ) -> Self {
        Shipment {
            id: id.into(),
            tracking_number: tracking_number.to_string(),
            customer_name: String::new(),
            origin_port_id: None,
            destination_port_id: None,
            vessel_id,
            weight_kg: 0.0,
            status,
            eta: None,
        }
    }

    pub fn is_carried_by(&self, vessel: &VesselId) -> bool {
        self.vessel_id.as_ref() == Some(vessel)
    }
}
