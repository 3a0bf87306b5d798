//! Public surface of the bridge lifecycle orchestrator.

use std::net::IpAddr;

use async_trait::async_trait;
use ovsdb_orch_common::TunnelKey;

use crate::error::OvsdbResult;
use crate::intents::{BridgeIntent, OperationKind};
use crate::registry::BridgeRecord;
use crate::response::OperationResponse;

/// Returned by operations that are declared but not implemented.
///
/// Such operations change nothing, neither locally nor on the switch.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotImplemented {
    pub operation: OperationKind,
}

/// Bridge lifecycle operations against OVSDB-managed switches.
///
/// `ovsdb_ip` is the management address of the switch hosting the bridge.
#[async_trait]
pub trait OvsdbBridgeService: Send + Sync {
    /// Creates `bridge_name` with a fresh datapath id, pointed at every
    /// cluster node as controller.
    async fn create_bridge(&self, ovsdb_ip: IpAddr, bridge_name: &str)
        -> OvsdbResult<BridgeRecord>;

    /// Unregisters controllers, removes the datapath device and deletes the bridge.
    async fn delete_bridge(&self, ovsdb_ip: IpAddr, bridge_name: &str) -> OvsdbResult<()>;

    async fn add_port(&self, ovsdb_ip: IpAddr, bridge_name: &str, port_name: &str)
        -> OvsdbResult<()>;

    async fn remove_port(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
        port_name: &str,
    ) -> OvsdbResult<()>;

    /// Turns `port_name` into a patch port peered with `patch_peer`.
    async fn create_patch_peer_port(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
        port_name: &str,
        patch_peer: &str,
    ) -> OvsdbResult<()>;

    async fn create_vxlan_tunnel(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
        port_name: &str,
        remote_ip: IpAddr,
        key: &TunnelKey,
    ) -> OvsdbResult<()>;

    async fn create_gre_tunnel(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
        port_name: &str,
        local_ip: IpAddr,
        remote_ip: IpAddr,
        key: &TunnelKey,
    ) -> NotImplemented;

    async fn delete_gre_tunnel(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
        port_name: &str,
    ) -> NotImplemented;

    /// Runs one intent and maps its outcome to a response.
    async fn execute(&self, intent: BridgeIntent) -> OperationResponse {
        let operation = intent.kind();
        match intent {
            BridgeIntent::CreateBridge(t) => {
                match self.create_bridge(t.ovsdb_ip, &t.bridge_name).await {
                    Ok(record) => OperationResponse::created(record),
                    Err(e) => OperationResponse::failed(operation, &e),
                }
            }
            BridgeIntent::DeleteBridge(t) => OperationResponse::from_result(
                operation,
                self.delete_bridge(t.ovsdb_ip, &t.bridge_name).await,
            ),
            BridgeIntent::AddPort(t) => OperationResponse::from_result(
                operation,
                self.add_port(t.ovsdb_ip, &t.bridge_name, &t.port_name).await,
            ),
            BridgeIntent::RemovePort(t) => OperationResponse::from_result(
                operation,
                self.remove_port(t.ovsdb_ip, &t.bridge_name, &t.port_name)
                    .await,
            ),
            BridgeIntent::CreatePatchPeerPort(r) => OperationResponse::from_result(
                operation,
                self.create_patch_peer_port(r.ovsdb_ip, &r.bridge_name, &r.port_name, &r.patch_peer)
                    .await,
            ),
            BridgeIntent::CreateVxlanTunnel(r) => OperationResponse::from_result(
                operation,
                self.create_vxlan_tunnel(
                    r.ovsdb_ip,
                    &r.bridge_name,
                    &r.port_name,
                    r.remote_ip,
                    &r.key,
                )
                .await,
            ),
            BridgeIntent::CreateGreTunnel(r) => OperationResponse::not_implemented(
                self.create_gre_tunnel(
                    r.ovsdb_ip,
                    &r.bridge_name,
                    &r.port_name,
                    r.local_ip,
                    r.remote_ip,
                    &r.key,
                )
                .await,
            ),
            BridgeIntent::DeleteGreTunnel(t) => OperationResponse::not_implemented(
                self.delete_gre_tunnel(t.ovsdb_ip, &t.bridge_name, &t.port_name)
                    .await,
            ),
        }
    }
}
