use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::fleet::{AllocationId, BerthId, VesselId};

/// Shortest reservation accepted, in hours
pub const MIN_ALLOCATION_HOURS: i64 = 1;

/// Longest reservation accepted, in hours (one week)
pub const MAX_ALLOCATION_HOURS: i64 = 168;

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationStatus {
    Scheduled,
    Active,
    Completed,
    Cancelled,
}

impl Default for AllocationStatus {
    fn default() -> Self {
        AllocationStatus::Scheduled
    }
}

impl AllocationStatus {
    /// Whether an allocation in this status holds the berth
    pub fn is_blocking(&self) -> bool {
        match self {
            AllocationStatus::Scheduled | AllocationStatus::Active => true,
            AllocationStatus::Completed | AllocationStatus::Cancelled => false,
        }
    }
}

impl fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AllocationStatus::Scheduled => "SCHEDULED",
            AllocationStatus::Active => "ACTIVE",
            AllocationStatus::Completed => "COMPLETED",
            AllocationStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntervalError {
    #[error("allocation end {end} is not after start {start}")]
    NotPositive {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("duration must be between 1 and 168 hours, got {0}")]
    DurationOutOfRange(i64),
}

/// Check that `[start, end)` is a non-empty interval
pub fn validate_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<(), IntervalError> {
    if end <= start {
        return Err(IntervalError::NotPositive { start, end });
    }
    Ok(())
}

/// End time for a reservation of `hours` starting at `start`
pub fn interval_from_hours(
    start: DateTime<Utc>,
    hours: i64,
) -> Result<DateTime<Utc>, IntervalError> {
    if !(MIN_ALLOCATION_HOURS..=MAX_ALLOCATION_HOURS).contains(&hours) {
        return Err(IntervalError::DurationOutOfRange(hours));
    }
    Ok(start + Duration::hours(hours))
}

/// A berth reservation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BerthAllocation {
    pub id: AllocationId,
    pub vessel_id: VesselId,
    pub berth_id: BerthId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default)]
    pub status: AllocationStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

impl BerthAllocation {
    pub fn new(
        id: impl Into<AllocationId>,
        vessel_id: impl Into<VesselId>,
        berth_id: impl Into<BerthId>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Result<Self, IntervalError> {
        validate_interval(start_time, end_time)?;
        Ok(BerthAllocation {
            id: id.into(),
            vessel_id: vessel_id.into(),
            berth_id: berth_id.into(),
            start_time,
            end_time,
            status: AllocationStatus::Scheduled,
            notes: String::new(),
        })
    }

    /// Whether this allocation blocks a new reservation of `[start, end)`
    ///
    /// Collides when the new start falls inside this interval, the new end
    /// falls inside it, or the new interval swallows it whole. Non-blocking
    /// statuses never collide.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if !self.status.is_blocking() {
            return false;
        }
        let (s, e) = (self.start_time, self.end_time);
        (s <= start && e > start) || (s < end && e >= end) || (s >= start && e <= end)
    }

    /// Whether this allocation touches the closed window `[start, end]`
    pub fn intersects_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.start_time <= end && self.end_time >= start
    }
}

/// First blocking allocation on `berth` that collides with `[start, end)`
pub fn find_overlap<'a>(
    existing: impl IntoIterator<Item = &'a BerthAllocation>,
    berth: &BerthId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Option<&'a BerthAllocation> {
    existing
        .into_iter()
        .filter(|a| &a.berth_id == berth)
        .find(|a| a.overlaps(start, end))
}

/// A refused reservation, naming what holds the berth
#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "berth {berth_id} is already allocated to vessel {blocking_vessel} \
     from {blocking_start} to {blocking_end} (allocation {blocking_allocation})"
)]
pub struct AllocationConflict {
    pub berth_id: BerthId,
    pub blocking_allocation: AllocationId,
    pub blocking_vessel: VesselId,
    pub blocking_start: DateTime<Utc>,
    pub blocking_end: DateTime<Utc>,
}

impl AllocationConflict {
    pub fn from_blocking(blocking: &BerthAllocation) -> Self {
        AllocationConflict {
            berth_id: blocking.berth_id.clone(),
            blocking_allocation: blocking.id.clone(),
            blocking_vessel: blocking.vessel_id.clone(),
            blocking_start: blocking.start_time,
            blocking_end: blocking.end_time,
        }
    }
}
