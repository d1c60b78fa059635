use serde::{Deserialize, Serialize};

use super::{BerthId, PortId, Position, VesselId};

/// A port vessels can dock at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub id: PortId,
    pub name: String,
    #[serde(default)]
    pub un_locode: String,
    #[serde(default)]
    pub country: String,
    #[serde(flatten)]
    pub position: Position,
}

impl Port {
    pub fn new(id: impl Into<PortId>, name: &str, position: Position) -> Self {
        Port {
            id: id.into(),
            name: name.to_string(),
            un_locode: String::new(),
            country: String::new(),
            position,
        }
    }
}

/// A docking position at a port terminal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Berth {
    pub id: BerthId,
    pub port_id: PortId,
    pub name: String,
    #[serde(default)]
    pub terminal: String,
    #[serde(default)]
    pub length_meters: f64,
    #[serde(default)]
    pub is_occupied: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_vessel_id: Option<VesselId>,
}

impl Berth {
    pub fn new(id: impl Into<BerthId>, port_id: impl Into<PortId>, name: &str) -> Self {
        Berth {
            id: id.into(),
            port_id: port_id.into(),
            name: name.to_string(),
            terminal: String::new(),
            length_meters: 0.0,
            is_occupied: false,
            current_vessel_id: None,
        }
    }

    pub fn occupy(&mut self, vessel: &VesselId) {
        self.is_occupied = true;
        self.current_vessel_id = Some(vessel.clone());
    }

    pub fn release(&mut self) {
        self.is_occupied = false;
        self.current_vessel_id = None;
    }

    /// The vessel holding this berth, when it is not `vessel`
    pub fn held_by_other(&self, vessel: &VesselId) -> Option<&VesselId> {
        if !self.is_occupied {
            return None;
        }
        self.current_vessel_id.as_ref().filter(|v| *v != vessel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_held_by_other() {
        let mut berth = Berth::new("b-1", "p-split", "Gat Sv. Duje 1");
        let a = VesselId::new("v-1");
        let b = VesselId::new("v-2");
        assert_eq!(berth.held_by_other(&a), None);

        berth.occupy(&a);
        assert_eq!(berth.held_by_other(&a), None);
        assert_eq!(berth.held_by_other(&b), Some(&a));

        berth.release();
        assert_eq!(berth.held_by_other(&b), None);
    }
}
