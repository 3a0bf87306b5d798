//! Error types for bridge lifecycle operations.
//!
//! Every failure surfaced to a caller is one of five kinds. Capability-layer
//! failures keep the driver message verbatim. [`ErrorKind`] is the stable
//! discriminant front ends map onto response codes.

use std::fmt;
use std::io;

use ovsdb_orch_common::{Capability, CapabilityError, DeviceId};
use serde::Serialize;
use thiserror::Error;

/// Result type alias for bridge lifecycle operations.
pub type OvsdbResult<T> = Result<T, OvsdbBridgeError>;

/// Capability call issued by the lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityOp {
    AddBridge,
    DeleteBridge,
    AddPort,
    DeletePort,
    AddPatchMode,
    AddTunnelMode,
    SetControllers,
    RemoveDevice,
}

impl CapabilityOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityOp::AddBridge => "add_bridge",
            CapabilityOp::DeleteBridge => "delete_bridge",
            CapabilityOp::AddPort => "add_port",
            CapabilityOp::DeletePort => "delete_port",
            CapabilityOp::AddPatchMode => "add_patch_mode",
            CapabilityOp::AddTunnelMode => "add_tunnel_mode",
            CapabilityOp::SetControllers => "set_controllers",
            CapabilityOp::RemoveDevice => "remove_device",
        }
    }
}

impl fmt::Display for CapabilityOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by bridge lifecycle operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OvsdbBridgeError {
    /// The operation needs an existing, available bridge and none was confirmed.
    #[error("Bridge '{bridge}' not found")]
    BridgeNotFound {
        /// The bridge name.
        bridge: String,
    },

    /// Create requested for a name already present and available.
    #[error("Bridge '{bridge}' already exists")]
    BridgeAlreadyExists {
        /// The bridge name.
        bridge: String,
    },

    /// No device is registered behind the management address.
    #[error("OVSDB device '{device}' not found or not connected")]
    OvsdbDeviceUnreachable {
        /// Device id derived from the management address.
        device: DeviceId,
    },

    /// The device does not implement the capability the operation needs.
    #[error("Device '{device}' does not support {capability}")]
    UnsupportedCapability {
        /// The resolved device.
        device: DeviceId,
        /// The missing capability.
        capability: Capability,
    },

    /// The capability call itself failed.
    #[error("{operation} failed on '{device}': {message}")]
    CapabilityOperationFailed {
        /// The failed call.
        operation: CapabilityOp,
        /// Device the call was issued against.
        device: DeviceId,
        /// Underlying capability-layer message.
        message: String,
    },
}

impl OvsdbBridgeError {
    /// Creates a bridge not found error.
    pub fn bridge_not_found(bridge: impl Into<String>) -> Self {
        Self::BridgeNotFound {
            bridge: bridge.into(),
        }
    }

    /// Creates a bridge already exists error.
    pub fn bridge_already_exists(bridge: impl Into<String>) -> Self {
        Self::BridgeAlreadyExists {
            bridge: bridge.into(),
        }
    }

    /// Creates a device unreachable error.
    pub fn device_unreachable(device: DeviceId) -> Self {
        Self::OvsdbDeviceUnreachable { device }
    }

    /// Creates an unsupported capability error.
    pub fn unsupported(device: DeviceId, capability: Capability) -> Self {
        Self::UnsupportedCapability { device, capability }
    }

    /// Wraps a capability-layer failure.
    pub fn capability_failed(
        operation: CapabilityOp,
        device: DeviceId,
        source: CapabilityError,
    ) -> Self {
        Self::CapabilityOperationFailed {
            operation,
            device,
            message: source.to_string(),
        }
    }

    /// Returns the stable classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            OvsdbBridgeError::BridgeNotFound { .. } => ErrorKind::BridgeNotFound,
            OvsdbBridgeError::BridgeAlreadyExists { .. } => ErrorKind::BridgeAlreadyExists,
            OvsdbBridgeError::OvsdbDeviceUnreachable { .. } => ErrorKind::OvsdbDeviceUnreachable,
            OvsdbBridgeError::UnsupportedCapability { .. } => ErrorKind::UnsupportedCapability,
            OvsdbBridgeError::CapabilityOperationFailed { .. } => {
                ErrorKind::CapabilityOperationFailed
            }
        }
    }
}

/// Caller-visible error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    BridgeNotFound,
    BridgeAlreadyExists,
    OvsdbDeviceUnreachable,
    UnsupportedCapability,
    CapabilityOperationFailed,
}

impl ErrorKind {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::BridgeNotFound => "BRIDGE_NOT_FOUND",
            ErrorKind::BridgeAlreadyExists => "BRIDGE_ALREADY_EXISTS",
            ErrorKind::OvsdbDeviceUnreachable => "OVSDB_DEVICE_UNREACHABLE",
            ErrorKind::UnsupportedCapability => "UNSUPPORTED_CAPABILITY",
            ErrorKind::CapabilityOperationFailed => "CAPABILITY_OPERATION_FAILED",
        }
    }

    /// HTTP status a front end should answer with. Distinct per kind.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::BridgeNotFound => 404,
            ErrorKind::BridgeAlreadyExists => 409,
            ErrorKind::OvsdbDeviceUnreachable => 503,
            ErrorKind::UnsupportedCapability => 501,
            ErrorKind::CapabilityOperationFailed => 502,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the configuration file failed.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config file {path}: {message}")]
    Parse {
        /// The file path.
        path: String,
        /// Parser message.
        message: String,
    },

    /// Serializing the configuration failed.
    #[error("Failed to serialize config: {0}")]
    Serialize(String),

    /// A value is out of range.
    #[error("Invalid configuration for {field}: {message}")]
    Invalid {
        /// The offending field.
        field: String,
        /// Error message.
        message: String,
    },
}

impl ConfigError {
    /// Creates an invalid configuration error.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}
