//! Observer Stream Protocol
//!
//! Every message on the observer stream is a JSON envelope
//! `{"type": ..., "payload": ...}`:
//!
//! | type           | payload                                              |
//! |----------------|------------------------------------------------------|
//! | `FLEET_UPDATE` | the full vessel list, sent once on connect           |
//! | `ALERT`        | `{level, message, vessel_id, vessel_name, timestamp}` |

use serde::{Deserialize, Serialize};

use crate::alerts::Alert;
use crate::fleet::Vessel;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StreamMessage {
    FleetUpdate(Vec<Vessel>),
    Alert(Alert),
}

impl StreamMessage {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
