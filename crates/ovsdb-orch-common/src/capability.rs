//! Contracts of the external collaborators the orchestrator drives.
//!
//! Devices expose optional behaviours ("capabilities"). Whether a device
//! supports one is a runtime query returning present-or-absent, mirroring
//! how drivers are bound to devices at runtime rather than by type.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::types::{
    BridgeDescription, ClusterNode, ControllerInfo, DeviceId, DeviceType, PatchDescription,
    TunnelDescription,
};

/// Result type for capability-layer calls.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

/// Failure reported by the capability layer or the transport beneath it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    /// The switch could not be reached or the session dropped mid-call.
    #[error("transport error: {0}")]
    Transport(String),

    /// The switch refused the change because it conflicts with existing state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The switch rejected the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl CapabilityError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }
}

/// Optional device behaviours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
    /// Bridge and port management.
    BridgeConfig,
    /// Interface modes: patch and tunnel.
    InterfaceConfig,
    /// Controller registration of a datapath.
    ControllerConfig,
}

impl Capability {
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::BridgeConfig => "bridge-config",
            Capability::InterfaceConfig => "interface-config",
            Capability::ControllerConfig => "controller-config",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bridge management on a switch.
#[async_trait]
pub trait BridgeConfig: Send + Sync {
    async fn add_bridge(&self, description: &BridgeDescription) -> CapabilityResult<()>;

    async fn delete_bridge(&self, bridge_name: &str) -> CapabilityResult<()>;

    async fn add_port(&self, bridge_name: &str, port_name: &str) -> CapabilityResult<()>;

    async fn delete_port(&self, bridge_name: &str, port_name: &str) -> CapabilityResult<()>;

    /// Lists every bridge the switch currently knows about.
    async fn get_bridges(&self) -> CapabilityResult<Vec<BridgeDescription>>;
}

/// Interface mode management on a switch.
#[async_trait]
pub trait InterfaceConfig: Send + Sync {
    async fn add_patch_mode(
        &self,
        iface_name: &str,
        patch: &PatchDescription,
    ) -> CapabilityResult<()>;

    async fn add_tunnel_mode(
        &self,
        iface_name: &str,
        tunnel: &TunnelDescription,
    ) -> CapabilityResult<()>;
}

/// Controller registration of a bridge datapath.
#[async_trait]
pub trait ControllerConfig: Send + Sync {
    /// Replaces the controller list. An empty slice unregisters all controllers.
    async fn set_controllers(&self, controllers: &[ControllerInfo]) -> CapabilityResult<()>;
}

/// A device known to the inventory.
pub trait Device: Send + Sync {
    fn id(&self) -> &DeviceId;

    fn device_type(&self) -> DeviceType;

    fn bridge_config(&self) -> Option<&dyn BridgeConfig> {
        None
    }

    fn interface_config(&self) -> Option<&dyn InterfaceConfig> {
        None
    }

    /// Returns true if the device implements `capability`.
    ///
    /// Controller registration is reached through the driver service, not
    /// the device, so it is never reported here.
    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::BridgeConfig => self.bridge_config().is_some(),
            Capability::InterfaceConfig => self.interface_config().is_some(),
            Capability::ControllerConfig => false,
        }
    }
}

/// Authoritative device inventory.
pub trait DeviceService: Send + Sync {
    fn get_device(&self, device_id: &DeviceId) -> Option<Arc<dyn Device>>;

    fn get_devices(&self, device_type: DeviceType) -> Vec<Arc<dyn Device>>;

    /// Returns true if the device is currently reachable and healthy.
    fn is_available(&self, device_id: &DeviceId) -> bool;

    /// Removes a device from the administrative view of the inventory.
    fn remove_device(&self, device_id: &DeviceId) -> CapabilityResult<()>;
}

/// Driver handles bound to devices.
pub trait DriverService: Send + Sync {
    /// Controller capability of the driver bound to `device_id`, if any.
    fn controller_config(&self, device_id: &DeviceId) -> Option<Arc<dyn ControllerConfig>>;
}

/// Read-only view of cluster membership.
pub trait ClusterService: Send + Sync {
    fn get_nodes(&self) -> Vec<ClusterNode>;
}
