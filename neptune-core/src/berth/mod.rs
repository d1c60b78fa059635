//! Berth Allocation Rules
//!
//! Time-bounded reservations binding a vessel to a berth, and the overlap
//! predicate the scheduler uses to refuse double bookings.
//!
//! Intervals are half-open `[start, end)`: an allocation ending at 14:00 does
//! not collide with one starting at 14:00. Only SCHEDULED and ACTIVE
//! allocations block a berth.
//!
//! # Example
//!
//! ```rust,ignore
//! use neptune_core::berth::find_overlap;
//!
//! if let Some(blocking) = find_overlap(&existing, &berth_id, start, end) {
//!     return Err(AllocationConflict::from_blocking(blocking));
//! }
//! ```

mod allocation;

pub use allocation::*;
