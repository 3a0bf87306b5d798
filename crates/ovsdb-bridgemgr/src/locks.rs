//! Per-bridge-name mutual exclusion.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Async locks keyed by bridge name.
///
/// Operations on different bridges never wait on each other. Entries nobody
/// holds or waits on are dropped on the next acquisition.
#[derive(Debug, Default)]
pub struct BridgeLocks {
    locks: parking_lot::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl BridgeLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other caller holds the lock for `bridge_name`.
    pub async fn acquire(&self, bridge_name: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock();
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(bridge_name.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of bridge names with a live lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.lock().is_empty()
    }
}
