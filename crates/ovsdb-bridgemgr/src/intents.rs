//! Operation intents as submitted by a front end.
//!
//! Intents are JSON objects tagged by `operation`:
//!
//! ```json
//! {"operation": "create-bridge", "ovsdb-ip": "10.0.0.1", "bridge-name": "br-int"}
//! ```

use std::fmt;
use std::net::IpAddr;

use ovsdb_orch_common::TunnelKey;
use serde::{Deserialize, Serialize};

/// Lifecycle operation, independent of its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    CreateBridge,
    DeleteBridge,
    AddPort,
    RemovePort,
    CreatePatchPeerPort,
    CreateVxlanTunnel,
    CreateGreTunnel,
    DeleteGreTunnel,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::CreateBridge => "create-bridge",
            OperationKind::DeleteBridge => "delete-bridge",
            OperationKind::AddPort => "add-port",
            OperationKind::RemovePort => "remove-port",
            OperationKind::CreatePatchPeerPort => "create-patch-peer-port",
            OperationKind::CreateVxlanTunnel => "create-vxlan-tunnel",
            OperationKind::CreateGreTunnel => "create-gre-tunnel",
            OperationKind::DeleteGreTunnel => "delete-gre-tunnel",
        }
    }

    /// Response field reporting whether the operation took effect.
    pub fn success_key(&self) -> &'static str {
        match self {
            OperationKind::CreateBridge => "bridge-created",
            OperationKind::DeleteBridge => "bridge-deleted",
            OperationKind::AddPort => "port-added",
            OperationKind::RemovePort => "port-deleted",
            OperationKind::CreatePatchPeerPort => "patch-peer-created",
            OperationKind::CreateVxlanTunnel => "vxlan-created",
            OperationKind::CreateGreTunnel => "gre-created",
            OperationKind::DeleteGreTunnel => "gre-deleted",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Switch and bridge an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BridgeTarget {
    pub ovsdb_ip: IpAddr,
    pub bridge_name: String,
}

/// A port on a bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PortTarget {
    pub ovsdb_ip: IpAddr,
    pub bridge_name: String,
    pub port_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PatchPeerRequest {
    pub ovsdb_ip: IpAddr,
    pub bridge_name: String,
    pub port_name: String,
    pub patch_peer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VxlanTunnelRequest {
    pub ovsdb_ip: IpAddr,
    pub bridge_name: String,
    pub port_name: String,
    pub remote_ip: IpAddr,
    pub key: TunnelKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct GreTunnelRequest {
    pub ovsdb_ip: IpAddr,
    pub bridge_name: String,
    pub port_name: String,
    pub local_ip: IpAddr,
    pub remote_ip: IpAddr,
    pub key: TunnelKey,
}

/// One lifecycle request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum BridgeIntent {
    CreateBridge(BridgeTarget),
    DeleteBridge(BridgeTarget),
    AddPort(PortTarget),
    RemovePort(PortTarget),
    CreatePatchPeerPort(PatchPeerRequest),
    CreateVxlanTunnel(VxlanTunnelRequest),
    CreateGreTunnel(GreTunnelRequest),
    DeleteGreTunnel(PortTarget),
}

impl BridgeIntent {
    /// Parses one intent from its JSON form.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            BridgeIntent::CreateBridge(_) => OperationKind::CreateBridge,
            BridgeIntent::DeleteBridge(_) => OperationKind::DeleteBridge,
            BridgeIntent::AddPort(_) => OperationKind::AddPort,
            BridgeIntent::RemovePort(_) => OperationKind::RemovePort,
            BridgeIntent::CreatePatchPeerPort(_) => OperationKind::CreatePatchPeerPort,
            BridgeIntent::CreateVxlanTunnel(_) => OperationKind::CreateVxlanTunnel,
            BridgeIntent::CreateGreTunnel(_) => OperationKind::CreateGreTunnel,
            BridgeIntent::DeleteGreTunnel(_) => OperationKind::DeleteGreTunnel,
        }
    }

    /// Name of the bridge the intent targets.
    pub fn bridge_name(&self) -> &str {
        match self {
            BridgeIntent::CreateBridge(t) | BridgeIntent::DeleteBridge(t) => &t.bridge_name,
            BridgeIntent::AddPort(t)
            | BridgeIntent::RemovePort(t)
            | BridgeIntent::DeleteGreTunnel(t) => &t.bridge_name,
            BridgeIntent::CreatePatchPeerPort(r) => &r.bridge_name,
            BridgeIntent::CreateVxlanTunnel(r) => &r.bridge_name,
            BridgeIntent::CreateGreTunnel(r) => &r.bridge_name,
        }
    }
}
