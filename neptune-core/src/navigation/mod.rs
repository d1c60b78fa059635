//! Great-circle Navigation
//!
//! Spherical-earth helpers used by the simulation: stepping a position
//! forward along a heading for a given time, and measuring distances
//! between positions.
//!
//! # Example
//!
//! ```rust
//! use neptune_core::fleet::Position;
//! use neptune_core::navigation::{next_position, distance_km};
//!
//! let start = Position::new(51.5, -0.1);
//! // 12 knots due east for one hour
//! let end = next_position(start, 12.0, 90.0, 3600.0);
//! assert!((distance_km(start, end) - 22.224).abs() < 0.01);
//! ```

mod great_circle;

pub use great_circle::*;
