//! Common orchestration contracts for OVSDB-managed switches.
//!
//! This crate provides the traits and types shared between bridge
//! orchestration and the capability layer that drives the switches:
//!
//! - [`DeviceService`], [`DriverService`], [`ClusterService`]: external
//!   collaborators (device inventory, driver handles, cluster membership)
//! - [`Device`]: a device with runtime capability queries
//! - [`BridgeConfig`], [`InterfaceConfig`], [`ControllerConfig`]: capabilities
//! - [`OrchContext`]: the collaborator bundle injected into orchestrators
//! - [`SyncMap`]: map that never creates entries implicitly
//!
//! # Architecture
//!
//! 1. A front end turns a request into a call on an orchestrator
//! 2. The orchestrator consults the inventory for devices and availability
//! 3. It resolves the capability it needs on the target device
//! 4. The capability implementation talks to the switch
//! 5. The orchestrator updates its local cache on success
//!
//! # Example
//!
//! ```ignore
//! use ovsdb_orch_common::{Capability, DeviceService, OvsdbNode};
//!
//! fn bridge_capable(inventory: &dyn DeviceService, node: &OvsdbNode) -> bool {
//!     inventory
//!         .get_device(&node.ovsdb_id())
//!         .map(|device| device.supports(Capability::BridgeConfig))
//!         .unwrap_or(false)
//! }
//! ```

mod capability;
mod context;
mod sync_map;
mod types;

pub use capability::{
    BridgeConfig, Capability, CapabilityError, CapabilityResult, ClusterService, ControllerConfig,
    Device, DeviceService, DriverService, InterfaceConfig,
};
pub use context::OrchContext;
pub use sync_map::SyncMap;
pub use types::{
    BridgeDescription, ClusterNode, ControllerInfo, ControllerProtocol, DatapathId, DeviceId,
    DeviceType, OvsdbNode, ParseError, PatchDescription, TunnelDescription, TunnelKey,
    TunnelType, OPENFLOW_SCHEME, OVSDB_SCHEME,
};
