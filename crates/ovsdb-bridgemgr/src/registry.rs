//! Local cache of bridge name to datapath device id.
//!
//! The registry is never authoritative. It is rebuilt from the switches on
//! every [`BridgeRegistry::refresh`] and otherwise only changed by the
//! manager after a switch confirmed a mutation.

use std::sync::Arc;

use ovsdb_orch_common::{DatapathId, DeviceId, DeviceService, DeviceType, SyncMap};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};

/// A bridge observed on a switch, or created by this manager.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BridgeRecord {
    pub name: String,
    pub device_id: DeviceId,
}

impl BridgeRecord {
    pub fn new(name: impl Into<String>, device_id: DeviceId) -> Self {
        Self {
            name: name.into(),
            device_id,
        }
    }

    /// Datapath id encoded in the device id, if it is an OpenFlow device.
    pub fn datapath_id(&self) -> Option<DatapathId> {
        self.device_id.as_str().parse().ok()
    }
}

/// Cached bridges plus a counter bumped by every change.
///
/// A refresh only installs its result if the counter it started from is
/// still current, so it never overwrites a later `put`, `remove` or refresh.
#[derive(Default)]
struct Cache {
    generation: u64,
    bridges: SyncMap<String, DeviceId>,
}

impl Cache {
    fn bump(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}

/// Bridge name to device id cache shared by all lifecycle operations.
pub struct BridgeRegistry {
    devices: Arc<dyn DeviceService>,
    cache: RwLock<Cache>,
}

impl BridgeRegistry {
    pub fn new(devices: Arc<dyn DeviceService>) -> Self {
        Self {
            devices,
            cache: RwLock::new(Cache::default()),
        }
    }

    /// Rebuilds the cache from every managed switch.
    ///
    /// Returns the number of bridges now cached. Switches without bridge
    /// management, switches whose listing fails and bridges without a
    /// datapath id are left out. If the cache changed while the switches
    /// were being listed, the listing is discarded.
    pub async fn refresh(&self) -> usize {
        let generation = self.cache.read().generation;
        let fresh = self.collect().await;
        self.install(generation, fresh);
        self.len()
    }

    async fn collect(&self) -> SyncMap<String, DeviceId> {
        let mut fresh = SyncMap::new();

        for device in self.devices.get_devices(DeviceType::Switch) {
            let Some(bridge_config) = device.bridge_config() else {
                debug!(device = %device.id(), "Switch has no bridge management, skipping");
                continue;
            };

            let bridges = match bridge_config.get_bridges().await {
                Ok(bridges) => bridges,
                Err(e) => {
                    warn!(
                        device = %device.id(),
                        error = %e,
                        "Failed to list bridges, skipping switch"
                    );
                    continue;
                }
            };

            for bridge in bridges {
                match bridge.device_id() {
                    Some(device_id) => {
                        if let Some(previous) = fresh.insert(bridge.name.clone(), device_id) {
                            debug!(
                                bridge = %bridge.name,
                                previous = %previous,
                                "Bridge name reported twice, keeping last"
                            );
                        }
                    }
                    None => {
                        warn!(
                            device = %device.id(),
                            bridge = %bridge.name,
                            "Bridge reported without datapath id, skipping"
                        );
                    }
                }
            }
        }

        fresh
    }

    /// Swaps in `fresh` unless the cache moved past `generation`.
    fn install(&self, generation: u64, fresh: SyncMap<String, DeviceId>) -> bool {
        let mut cache = self.cache.write();
        if cache.generation != generation {
            debug!(
                started = generation,
                current = cache.generation,
                "Bridge registry changed during refresh, discarding listing"
            );
            return false;
        }

        let count = fresh.len();
        let previous = cache.bridges.replace_all(fresh);
        cache.bump();
        debug!(bridges = count, previous = previous.len(), "Bridge registry refreshed");
        true
    }

    /// Returns true if `name` is cached and its device is known and available.
    pub fn exists(&self, name: &str) -> bool {
        let Some(device_id) = self.lookup(name) else {
            return false;
        };
        self.devices.get_device(&device_id).is_some() && self.devices.is_available(&device_id)
    }

    /// Returns the cached device id of `name`.
    pub fn lookup(&self, name: &str) -> Option<DeviceId> {
        self.cache.read().bridges.get(&name.to_string()).cloned()
    }

    pub fn put(&self, name: impl Into<String>, device_id: DeviceId) {
        let mut cache = self.cache.write();
        cache.bridges.insert(name.into(), device_id);
        cache.bump();
    }

    pub fn remove(&self, name: &str) -> Option<DeviceId> {
        let mut cache = self.cache.write();
        cache.bump();
        cache.bridges.remove(&name.to_string())
    }

    /// Copy of every cached bridge, sorted by name.
    pub fn snapshot(&self) -> Vec<BridgeRecord> {
        let mut records: Vec<_> = self
            .cache
            .read()
            .bridges
            .iter()
            .map(|(name, device_id)| BridgeRecord::new(name.clone(), device_id.clone()))
            .collect();
        records.sort();
        records
    }

    pub fn len(&self) -> usize {
        self.cache.read().bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().bridges.is_empty()
    }

    pub fn clear(&self) {
        let mut cache = self.cache.write();
        cache.bridges.clear();
        cache.bump();
    }
}

impl std::fmt::Debug for BridgeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeRegistry")
            .field("bridges", &self.len())
            .finish_non_exhaustive()
    }
}
