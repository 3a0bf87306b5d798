//! BridgeMgr - bridge lifecycle orchestration over OVSDB-managed switches

use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, instrument, warn};

use ovsdb_orch_common::{
    BridgeConfig, BridgeDescription, Capability, ControllerInfo, Device, DeviceId, InterfaceConfig,
    OrchContext, OvsdbNode, PatchDescription, TunnelDescription, TunnelKey, TunnelType,
};

use crate::config::BridgeMgrConfig;
use crate::dpid::DatapathIdAllocator;
use crate::error::{CapabilityOp, OvsdbBridgeError, OvsdbResult};
use crate::intents::OperationKind;
use crate::locks::BridgeLocks;
use crate::registry::{BridgeRecord, BridgeRegistry};
use crate::service::{NotImplemented, OvsdbBridgeService};

/// BridgeMgr manages bridges on OVSDB-managed switches
///
/// Every operation runs in the same order:
/// 1. Refresh the bridge registry from the switches
/// 2. Check preconditions against the registry
/// 3. Resolve the switch behind the management address
/// 4. Resolve the capability the operation needs
/// 5. Call the capability
/// 6. Update the registry once the switch confirmed the change
pub struct BridgeMgr {
    context: OrchContext,
    config: BridgeMgrConfig,
    registry: BridgeRegistry,
    allocator: DatapathIdAllocator,
    /// Per-bridge serialization, absent when disabled in config
    locks: Option<BridgeLocks>,
}

impl BridgeMgr {
    /// Creates a new BridgeMgr instance
    pub fn new(context: OrchContext, config: BridgeMgrConfig) -> Self {
        let registry = BridgeRegistry::new(context.devices.clone());
        let allocator = DatapathIdAllocator::new(config.datapath.begin);
        let locks = config
            .concurrency
            .serialize_per_bridge
            .then(BridgeLocks::new);

        info!(
            dpid_begin = config.datapath.begin,
            ovsdb_port = config.ovsdb.port,
            serialize_per_bridge = config.concurrency.serialize_per_bridge,
            "BridgeMgr started"
        );

        Self {
            context,
            config,
            registry,
            allocator,
            locks,
        }
    }

    /// Creates a BridgeMgr with default configuration
    pub fn with_defaults(context: OrchContext) -> Self {
        Self::new(context, BridgeMgrConfig::default())
    }

    pub fn config(&self) -> &BridgeMgrConfig {
        &self.config
    }

    pub fn registry(&self) -> &BridgeRegistry {
        &self.registry
    }

    /// Refreshes the registry and returns every known bridge.
    pub async fn list_bridges(&self) -> Vec<BridgeRecord> {
        self.registry.refresh().await;
        self.registry.snapshot()
    }

    /// Drops all cached state.
    pub fn shutdown(&self) {
        let dropped = self.registry.len();
        self.registry.clear();
        info!(bridges = dropped, "BridgeMgr stopped");
    }

    async fn lock(&self, bridge_name: &str) -> Option<OwnedMutexGuard<()>> {
        match &self.locks {
            Some(locks) => Some(locks.acquire(bridge_name).await),
            None => None,
        }
    }

    /// Refreshes and fails unless `bridge_name` exists and is available.
    async fn require_bridge(&self, bridge_name: &str) -> OvsdbResult<()> {
        self.registry.refresh().await;
        if !self.registry.exists(bridge_name) {
            return Err(OvsdbBridgeError::bridge_not_found(bridge_name));
        }
        Ok(())
    }

    fn resolve_switch(&self, ovsdb_ip: IpAddr) -> OvsdbResult<Arc<dyn Device>> {
        let device_id = OvsdbNode::new(ovsdb_ip, self.config.ovsdb.port).ovsdb_id();
        self.context
            .devices
            .get_device(&device_id)
            .ok_or_else(|| OvsdbBridgeError::device_unreachable(device_id))
    }

    /// One controller per distinct cluster node address, in address order.
    fn controllers(&self) -> Vec<ControllerInfo> {
        let ips: BTreeSet<IpAddr> = self
            .context
            .cluster
            .get_nodes()
            .into_iter()
            .map(|node| node.ip)
            .collect();

        ips.into_iter()
            .map(|ip| {
                ControllerInfo::new(
                    ip,
                    self.config.controller.openflow_port,
                    self.config.controller.protocol,
                )
            })
            .collect()
    }

    /// Unregisters controllers, removes the datapath device, then deletes
    /// the bridge on the switch. Stops at the first failing step.
    async fn teardown_bridge(
        &self,
        bridge_config: &dyn BridgeConfig,
        switch_id: &DeviceId,
        bridge_name: &str,
        bridge_id: &DeviceId,
    ) -> OvsdbResult<()> {
        match self.context.drivers.controller_config(bridge_id) {
            Some(controller_config) => {
                controller_config.set_controllers(&[]).await.map_err(|e| {
                    OvsdbBridgeError::capability_failed(
                        CapabilityOp::SetControllers,
                        bridge_id.clone(),
                        e,
                    )
                })?;
                debug!(bridge = bridge_name, device = %bridge_id, "Controllers unregistered");
            }
            None => {
                warn!(
                    bridge = bridge_name,
                    device = %bridge_id,
                    "No controller driver for bridge, skipping controller removal"
                );
            }
        }

        self.context
            .devices
            .remove_device(bridge_id)
            .map_err(|e| {
                OvsdbBridgeError::capability_failed(
                    CapabilityOp::RemoveDevice,
                    bridge_id.clone(),
                    e,
                )
            })?;

        bridge_config.delete_bridge(bridge_name).await.map_err(|e| {
            OvsdbBridgeError::capability_failed(CapabilityOp::DeleteBridge, switch_id.clone(), e)
        })
    }
}

fn bridge_config_of(device: &Arc<dyn Device>) -> OvsdbResult<&dyn BridgeConfig> {
    device
        .bridge_config()
        .ok_or_else(|| OvsdbBridgeError::unsupported(device.id().clone(), Capability::BridgeConfig))
}

fn interface_config_of(device: &Arc<dyn Device>) -> OvsdbResult<&dyn InterfaceConfig> {
    device.interface_config().ok_or_else(|| {
        OvsdbBridgeError::unsupported(device.id().clone(), Capability::InterfaceConfig)
    })
}

#[async_trait]
impl OvsdbBridgeService for BridgeMgr {
    #[instrument(skip(self))]
    async fn create_bridge(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
    ) -> OvsdbResult<BridgeRecord> {
        let _guard = self.lock(bridge_name).await;

        self.registry.refresh().await;
        if self.registry.exists(bridge_name) {
            return Err(OvsdbBridgeError::bridge_already_exists(bridge_name));
        }

        let dpid = self.allocator.allocate(self.context.devices.as_ref());
        let controllers = self.controllers();

        let switch = self.resolve_switch(ovsdb_ip)?;
        let bridge_config = bridge_config_of(&switch)?;

        let description = BridgeDescription::new(bridge_name)
            .with_datapath_id(dpid)
            .with_controllers(controllers);
        bridge_config.add_bridge(&description).await.map_err(|e| {
            OvsdbBridgeError::capability_failed(CapabilityOp::AddBridge, switch.id().clone(), e)
        })?;

        let record = BridgeRecord::new(bridge_name, dpid.device_id());
        self.registry.put(bridge_name, record.device_id.clone());

        info!(
            bridge = bridge_name,
            dpid = %dpid,
            switch = %switch.id(),
            controllers = description.controllers.len(),
            "Created bridge"
        );
        Ok(record)
    }

    #[instrument(skip(self))]
    async fn delete_bridge(&self, ovsdb_ip: IpAddr, bridge_name: &str) -> OvsdbResult<()> {
        let _guard = self.lock(bridge_name).await;

        self.registry.refresh().await;
        let bridge_id = self
            .registry
            .lookup(bridge_name)
            .ok_or_else(|| OvsdbBridgeError::bridge_not_found(bridge_name))?;

        let switch = self.resolve_switch(ovsdb_ip)?;
        let bridge_config = bridge_config_of(&switch)?;

        self.teardown_bridge(bridge_config, switch.id(), bridge_name, &bridge_id)
            .await?;

        self.registry.remove(bridge_name);
        info!(bridge = bridge_name, device = %bridge_id, "Deleted bridge");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn add_port(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
        port_name: &str,
    ) -> OvsdbResult<()> {
        let _guard = self.lock(bridge_name).await;

        self.require_bridge(bridge_name).await?;
        let switch = self.resolve_switch(ovsdb_ip)?;
        let bridge_config = bridge_config_of(&switch)?;

        bridge_config
            .add_port(bridge_name, port_name)
            .await
            .map_err(|e| {
                OvsdbBridgeError::capability_failed(CapabilityOp::AddPort, switch.id().clone(), e)
            })?;

        info!(bridge = bridge_name, port = port_name, "Added port");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove_port(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
        port_name: &str,
    ) -> OvsdbResult<()> {
        let _guard = self.lock(bridge_name).await;

        self.require_bridge(bridge_name).await?;
        let switch = self.resolve_switch(ovsdb_ip)?;
        let bridge_config = bridge_config_of(&switch)?;

        bridge_config
            .delete_port(bridge_name, port_name)
            .await
            .map_err(|e| {
                OvsdbBridgeError::capability_failed(
                    CapabilityOp::DeletePort,
                    switch.id().clone(),
                    e,
                )
            })?;

        info!(bridge = bridge_name, port = port_name, "Removed port");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_patch_peer_port(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
        port_name: &str,
        patch_peer: &str,
    ) -> OvsdbResult<()> {
        let _guard = self.lock(bridge_name).await;

        self.require_bridge(bridge_name).await?;
        let switch = self.resolve_switch(ovsdb_ip)?;
        let interface_config = interface_config_of(&switch)?;

        let patch = PatchDescription::new(bridge_name, port_name, patch_peer);
        interface_config
            .add_patch_mode(port_name, &patch)
            .await
            .map_err(|e| {
                OvsdbBridgeError::capability_failed(
                    CapabilityOp::AddPatchMode,
                    switch.id().clone(),
                    e,
                )
            })?;

        info!(
            bridge = bridge_name,
            port = port_name,
            peer = patch_peer,
            "Created patch port"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_vxlan_tunnel(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
        port_name: &str,
        remote_ip: IpAddr,
        key: &TunnelKey,
    ) -> OvsdbResult<()> {
        let _guard = self.lock(bridge_name).await;

        self.require_bridge(bridge_name).await?;
        let switch = self.resolve_switch(ovsdb_ip)?;
        let interface_config = interface_config_of(&switch)?;

        let tunnel = TunnelDescription::new(bridge_name, port_name, TunnelType::Vxlan, remote_ip)
            .with_key(key.clone());
        interface_config
            .add_tunnel_mode(port_name, &tunnel)
            .await
            .map_err(|e| {
                OvsdbBridgeError::capability_failed(
                    CapabilityOp::AddTunnelMode,
                    switch.id().clone(),
                    e,
                )
            })?;

        info!(
            bridge = bridge_name,
            port = port_name,
            remote = %remote_ip,
            key = %key,
            "Created VXLAN tunnel"
        );
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_gre_tunnel(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
        port_name: &str,
        local_ip: IpAddr,
        remote_ip: IpAddr,
        key: &TunnelKey,
    ) -> NotImplemented {
        warn!(
            switch = %ovsdb_ip,
            bridge = bridge_name,
            port = port_name,
            local = %local_ip,
            remote = %remote_ip,
            key = %key,
            "GRE tunnel creation is not implemented, ignoring"
        );
        NotImplemented {
            operation: OperationKind::CreateGreTunnel,
        }
    }

    #[instrument(skip(self))]
    async fn delete_gre_tunnel(
        &self,
        ovsdb_ip: IpAddr,
        bridge_name: &str,
        port_name: &str,
    ) -> NotImplemented {
        warn!(
            switch = %ovsdb_ip,
            bridge = bridge_name,
            port = port_name,
            "GRE tunnel deletion is not implemented, ignoring"
        );
        NotImplemented {
            operation: OperationKind::DeleteGreTunnel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ovsdb_bridgemgr_test::MockNetwork;
    use ovsdb_orch_common::DatapathId;
    use pretty_assertions::assert_eq;

    const SWITCH: &str = "10.0.0.1";

    fn setup() -> (Arc<MockNetwork>, BridgeMgr) {
        let network = Arc::new(MockNetwork::new());
        network.add_switch(SWITCH.parse().unwrap());
        network.add_cluster_node("node-b", "192.168.0.2".parse().unwrap());
        network.add_cluster_node("node-a", "192.168.0.1".parse().unwrap());
        let mgr = BridgeMgr::with_defaults(OrchContext::from_shared(network.clone()));
        (network, mgr)
    }

    #[tokio::test]
    async fn test_create_bridge_submits_description() {
        let (network, mgr) = setup();
        let switch = SWITCH.parse().unwrap();

        let record = mgr.create_bridge(switch, "br-int").await.unwrap();
        assert_eq!(record.datapath_id(), Some(DatapathId::new(4)));
        assert_eq!(mgr.registry().lookup("br-int"), Some(record.device_id.clone()));

        let targets: Vec<String> = network
            .controllers_of(&record.device_id)
            .iter()
            .map(ControllerInfo::target)
            .collect();
        assert_eq!(
            targets,
            vec!["tcp:192.168.0.1:6633".to_string(), "tcp:192.168.0.2:6633".to_string()]
        );
    }

    #[tokio::test]
    async fn test_controllers_are_deduplicated() {
        let (network, mgr) = setup();
        network.add_cluster_node("node-c", "192.168.0.1".parse().unwrap());

        assert_eq!(mgr.controllers().len(), 2);
    }

    #[tokio::test]
    async fn test_list_bridges_refreshes() {
        let (network, mgr) = setup();
        let switch_id = OvsdbNode::new(SWITCH.parse().unwrap(), 6640).ovsdb_id();
        network.seed_bridge(&switch_id, "br-ex", DatapathId::new(0x20));

        let bridges = mgr.list_bridges().await;
        assert_eq!(bridges.len(), 1);
        assert_eq!(bridges[0].name, "br-ex");
    }

    #[tokio::test]
    async fn test_shutdown_clears_registry() {
        let (_network, mgr) = setup();
        mgr.create_bridge(SWITCH.parse().unwrap(), "br0").await.unwrap();
        assert_eq!(mgr.registry().len(), 1);

        mgr.shutdown();
        assert!(mgr.registry().is_empty());
    }

    #[tokio::test]
    async fn test_locks_disabled_by_config() {
        let network = Arc::new(MockNetwork::new());
        let mut config = BridgeMgrConfig::default();
        config.concurrency.serialize_per_bridge = false;

        let mgr = BridgeMgr::new(OrchContext::from_shared(network), config);
        assert!(mgr.lock("br0").await.is_none());
    }
}
