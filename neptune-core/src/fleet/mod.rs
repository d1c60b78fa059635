//! Fleet Data Model
//!
//! Plain data types for everything the simulation reads from and writes to
//! the data store: vessels, ports and their berths, vessel components and
//! the shipments carried as cargo.
//!
//! All types serialize with the field names used on the observer stream and
//! in the fleet seed file (snake_case fields, SCREAMING_SNAKE_CASE statuses).

use serde::{Deserialize, Serialize};
use std::fmt;

mod component;
mod port;
mod shipment;
mod vessel;

pub use component::*;
pub use port::*;
pub use shipment::*;
pub use vessel::*;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

string_id!(
    /// Vessel identity
    VesselId
);
string_id!(
    /// Route identity
    RouteId
);
string_id!(
    /// Port identity
    PortId
);
string_id!(
    /// Berth identity
    BerthId
);
string_id!(
    /// Vessel component identity
    ComponentId
);
string_id!(
    /// Berth allocation identity
    AllocationId
);
string_id!(
    /// Shipment identity
    ShipmentId
);

/// Geographic position in decimal degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Position {
            latitude,
            longitude,
        }
    }

    /// Build from a GeoJSON coordinate pair, which is ordered `[lon, lat]`
    pub fn from_lon_lat(coord: [f64; 2]) -> Self {
        Position::new(coord[1], coord[0])
    }

    pub fn to_lon_lat(self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_transparently() {
        let id = VesselId::new("v-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"v-1\"");
        let back: VesselId = serde_json::from_str("\"v-1\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_lon_lat_order() {
        let p = Position::from_lon_lat([16.44, 43.5]);
        assert_eq!(p.latitude, 43.5);
        assert_eq!(p.longitude, 16.44);
        assert_eq!(p.to_lon_lat(), [16.44, 43.5]);
    }
}
