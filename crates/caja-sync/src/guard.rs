//! # Sync Slot
//!
//! At most one sync round runs at a time. A trigger that arrives while a
//! round is in flight is dropped rather than queued.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Single-Slot Guard                                    │
//! │                                                                         │
//! │   scheduler tick ──┐                                                   │
//! │                    ├──► try_acquire() ──► Some(permit) ──► run round   │
//! │   manual trigger ──┘                 └──► None          ──► Skipped    │
//! │                                                                         │
//! │   Dropping the permit (round finished, failed, or abandoned) frees     │
//! │   the slot.                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct SyncSlot {
    permits: Arc<Semaphore>,
}

/// Held for the duration of one round.
#[derive(Debug)]
pub struct SyncPermit {
    _permit: OwnedSemaphorePermit,
}

impl SyncSlot {
    pub fn new() -> Self {
        SyncSlot {
            permits: Arc::new(Semaphore::new(1)),
        }
    }

    /// Never waits.
    pub fn try_acquire(&self) -> Option<SyncPermit> {
        self.permits
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| SyncPermit { _permit: permit })
    }

    pub fn is_busy(&self) -> bool {
        self.permits.available_permits() == 0
    }
}

impl Default for SyncSlot {
    fn default() -> Self {
        Self::new()
    }
}
