//! Datapath id allocation for new bridges.

use std::sync::atomic::{AtomicU64, Ordering};

use ovsdb_orch_common::{DatapathId, DeviceService};
use tracing::debug;

/// Hands out datapath ids that no device in the inventory currently uses.
///
/// Every call consumes at least one counter value, so concurrent callers
/// never receive the same id from this allocator. Uniqueness against the
/// inventory is best effort: a device may appear between the probe and the
/// bridge submission, in which case the switch rejects the bridge.
#[derive(Debug)]
pub struct DatapathIdAllocator {
    counter: AtomicU64,
}

impl DatapathIdAllocator {
    pub fn new(begin: u64) -> Self {
        Self {
            counter: AtomicU64::new(begin),
        }
    }

    /// Value the next allocation will try first.
    pub fn next_value(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Allocates an id not present in `devices`.
    pub fn allocate(&self, devices: &dyn DeviceService) -> DatapathId {
        loop {
            let candidate = DatapathId::new(self.counter.fetch_add(1, Ordering::SeqCst));
            if devices.get_device(&candidate.device_id()).is_none() {
                return candidate;
            }
            debug!(dpid = %candidate, "Datapath id already in use, trying next");
        }
    }
}

impl Default for DatapathIdAllocator {
    fn default() -> Self {
        Self::new(4)
    }
}
