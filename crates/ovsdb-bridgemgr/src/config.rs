//! Configuration file support for the bridge manager
//!
//! Loads and validates configuration from TOML files.
//! Default location: /etc/ovsdb-bridgemgr/bridgemgr.toml

use crate::error::ConfigError;
use ovsdb_orch_common::ControllerProtocol;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::info;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ovsdb-bridgemgr/bridgemgr.toml";

/// Datapath id allocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatapathConfig {
    /// First counter value handed out; lower values are reserved
    #[serde(default = "default_dpid_begin")]
    pub begin: u64,
}

/// OVSDB management channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvsdbConfig {
    /// OVSDB server port on managed switches
    #[serde(default = "default_ovsdb_port")]
    pub port: u16,
}

/// Controllers new bridges are pointed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerEndpointConfig {
    /// OpenFlow port every cluster node listens on
    #[serde(default = "default_openflow_port")]
    pub openflow_port: u16,

    /// Transport between bridge and controller
    #[serde(default = "default_protocol")]
    pub protocol: ControllerProtocol,
}

/// Concurrency control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Serialize operations that target the same bridge name
    #[serde(default = "default_serialize_per_bridge")]
    pub serialize_per_bridge: bool,
}

/// Complete bridge manager configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeMgrConfig {
    #[serde(default)]
    pub datapath: DatapathConfig,

    #[serde(default)]
    pub ovsdb: OvsdbConfig,

    #[serde(default)]
    pub controller: ControllerEndpointConfig,

    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
}

// Default functions
fn default_dpid_begin() -> u64 {
    4
}

fn default_ovsdb_port() -> u16 {
    6640
}

fn default_openflow_port() -> u16 {
    6633
}

fn default_protocol() -> ControllerProtocol {
    ControllerProtocol::Tcp
}

fn default_serialize_per_bridge() -> bool {
    true
}

impl Default for DatapathConfig {
    fn default() -> Self {
        Self {
            begin: default_dpid_begin(),
        }
    }
}

impl Default for OvsdbConfig {
    fn default() -> Self {
        Self {
            port: default_ovsdb_port(),
        }
    }
}

impl Default for ControllerEndpointConfig {
    fn default() -> Self {
        Self {
            openflow_port: default_openflow_port(),
            protocol: default_protocol(),
        }
    }
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            serialize_per_bridge: default_serialize_per_bridge(),
        }
    }
}

impl BridgeMgrConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => {
                let config: Self = toml::from_str(&content).map_err(|e| ConfigError::Parse {
                    path: path.display().to_string(),
                    message: e.to_string(),
                })?;
                config.validate()?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Io(e)),
        }
    }

    /// Load from default location or defaults
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_or_default(DEFAULT_CONFIG_PATH)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.datapath.begin == 0 {
            return Err(ConfigError::invalid("datapath.begin", "must be > 0"));
        }

        if self.ovsdb.port == 0 {
            return Err(ConfigError::invalid("ovsdb.port", "must be > 0"));
        }

        if self.controller.openflow_port == 0 {
            return Err(ConfigError::invalid("controller.openflow_port", "must be > 0"));
        }

        Ok(())
    }
}
