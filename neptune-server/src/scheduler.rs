//! Berth allocation scheduler
//!
//! Creating an allocation is check-then-insert. Both steps run while holding
//! a lock scoped to the berth, so two concurrent requests for overlapping
//! slots on the same berth can never both succeed. Requests for different
//! berths do not contend.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};

use neptune_core::berth::{find_overlap, validate_interval, IntervalError};
use neptune_core::{AllocationConflict, AllocationId, BerthAllocation, BerthId, VesselId};

use crate::store::{FleetStore, StoreError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScheduleError {
    #[error(transparent)]
    Interval(#[from] IntervalError),
    #[error(transparent)]
    Conflict(#[from] AllocationConflict),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A reservation request
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationRequest {
    pub vessel_id: VesselId,
    pub berth_id: BerthId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub notes: String,
}

pub struct BerthScheduler {
    store: Arc<dyn FleetStore>,
    locks: Mutex<HashMap<BerthId, Arc<Mutex<()>>>>,
    sequence: AtomicU64,
}

impl BerthScheduler {
    pub fn new(store: Arc<dyn FleetStore>) -> Self {
        BerthScheduler {
            store,
            locks: Mutex::new(HashMap::new()),
            sequence: AtomicU64::new(1),
        }
    }

    /// Exclusive access to `berth`, released when the guard drops
    async fn lock_berth(&self, berth: &BerthId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(berth.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }

    fn next_id(&self) -> AllocationId {
        let n = self.sequence.fetch_add(1, Ordering::Relaxed);
        AllocationId::new(format!("alloc-{}-{}", Utc::now().timestamp_millis(), n))
    }

    /// First SCHEDULED or ACTIVE allocation on `berth` colliding with
    /// `[start, end)`
    pub async fn check_overlap(
        &self,
        berth: &BerthId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Option<BerthAllocation>, ScheduleError> {
        let existing = self.store.allocations_for_berth(berth).await?;
        Ok(find_overlap(&existing, berth, start, end).cloned())
    }

    /// Validate and record a new SCHEDULED allocation
    ///
    /// A collision yields [`ScheduleError::Conflict`] naming the blocking
    /// vessel. Conflicts are never retried.
    pub async fn create(&self, request: AllocationRequest) -> Result<BerthAllocation, ScheduleError> {
        validate_interval(request.start_time, request.end_time)?;
        self.store.vessel(&request.vessel_id).await?;
        self.store.berth(&request.berth_id).await?;

        let _guard = self.lock_berth(&request.berth_id).await;

        if let Some(blocking) = self
            .check_overlap(&request.berth_id, request.start_time, request.end_time)
            .await?
        {
            log::info!(
                "{}: berth {} refused, held by {} until {}",
                request.vessel_id,
                request.berth_id,
                blocking.vessel_id,
                blocking.end_time
            );
            return Err(AllocationConflict::from_blocking(&blocking).into());
        }

        let mut allocation = BerthAllocation::new(
            self.next_id(),
            request.vessel_id,
            request.berth_id,
            request.start_time,
            request.end_time,
        )?;
        allocation.notes = request.notes;
        self.store.insert_allocation(allocation.clone()).await?;

        log::info!(
            "{}: allocated berth {} from {} to {} ({})",
            allocation.vessel_id,
            allocation.berth_id,
            allocation.start_time,
            allocation.end_time,
            allocation.id
        );
        Ok(allocation)
    }
}
