//! In-memory switch network for testing bridge orchestration
//!
//! [`MockNetwork`] plays every external collaborator at once: the device
//! inventory, the driver service and the cluster membership view. Switches
//! added to it keep their bridges, ports and interface modes in a shared
//! state so tests can assert on what the orchestrator did to them.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use ovsdb_orch_common::{
    BridgeConfig, BridgeDescription, CapabilityError, CapabilityResult, ClusterNode,
    ClusterService, ControllerConfig, ControllerInfo, DatapathId, Device, DeviceId, DeviceService,
    DeviceType, DriverService, InterfaceConfig, OvsdbNode, PatchDescription, TunnelDescription,
};

/// Default OVSDB management port used by fixtures.
pub const OVSDB_PORT: u16 = 6640;

/// Capability-layer call observed by the mock network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    GetBridges,
    AddBridge,
    DeleteBridge,
    AddPort,
    DeletePort,
    AddPatchMode,
    AddTunnelMode,
    SetControllers,
    RemoveDevice,
}

impl MockOp {
    /// Returns true if the call changes switch or inventory state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, MockOp::GetBridges)
    }
}

/// A recorded capability call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub op: MockOp,
    /// Device the call was issued against
    pub device: DeviceId,
    /// Call argument summary, e.g. `br0` or `br0/eth1`
    pub target: String,
}

/// Capabilities a mock switch exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchCapabilities {
    pub bridge_config: bool,
    pub interface_config: bool,
}

impl SwitchCapabilities {
    pub fn full() -> Self {
        Self {
            bridge_config: true,
            interface_config: true,
        }
    }

    pub fn bridge_only() -> Self {
        Self {
            bridge_config: true,
            interface_config: false,
        }
    }

    pub fn none() -> Self {
        Self {
            bridge_config: false,
            interface_config: false,
        }
    }
}

impl Default for SwitchCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// Mode an interface was configured into
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceMode {
    Patch(PatchDescription),
    Tunnel(TunnelDescription),
}

struct DeviceEntry {
    device_type: DeviceType,
    available: bool,
    device: Arc<dyn Device>,
}

#[derive(Default)]
struct SwitchState {
    bridges: Vec<BridgeDescription>,
    ports: HashMap<String, Vec<String>>,
    interfaces: HashMap<(String, String), InterfaceMode>,
}

struct FailRule {
    op: MockOp,
    device: Option<DeviceId>,
    error: CapabilityError,
}

#[derive(Default)]
struct NetworkState {
    devices: BTreeMap<DeviceId, DeviceEntry>,
    switches: HashMap<DeviceId, SwitchState>,
    controllers: HashMap<DeviceId, Vec<ControllerInfo>>,
    detached_drivers: HashSet<DeviceId>,
    cluster: Vec<ClusterNode>,
    failures: Vec<FailRule>,
    calls: Vec<Call>,
}

impl NetworkState {
    /// Records the call and returns the injected failure for it, if any.
    fn enter(&mut self, op: MockOp, device: &DeviceId, target: String) -> CapabilityResult<()> {
        debug!(?op, device = %device, target = %target, "Mock capability call");
        self.calls.push(Call {
            op,
            device: device.clone(),
            target,
        });

        let rule = self.failures.iter().find(|rule| {
            rule.op == op && rule.device.as_ref().map_or(true, |d| d == device)
        });
        match rule {
            Some(rule) => Err(rule.error.clone()),
            None => Ok(()),
        }
    }

    fn switch_mut(&mut self, switch_id: &DeviceId) -> CapabilityResult<&mut SwitchState> {
        self.switches
            .get_mut(switch_id)
            .ok_or_else(|| CapabilityError::transport(format!("switch {} is gone", switch_id)))
    }

    fn register(&mut self, device: Arc<dyn Device>) {
        let device_type = device.device_type();
        self.devices.insert(
            device.id().clone(),
            DeviceEntry {
                device_type,
                available: true,
                device,
            },
        );
    }
}

/// Shared in-memory network of OVSDB switches
///
/// Clone the `Arc<MockNetwork>` into an `OrchContext` and keep a handle
/// for assertions.
#[derive(Default)]
pub struct MockNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a fully capable switch managed at `ip`.
    pub fn add_switch(&self, ip: IpAddr) -> DeviceId {
        self.add_switch_with(ip, SwitchCapabilities::full())
    }

    /// Adds a switch exposing only `capabilities`.
    pub fn add_switch_with(&self, ip: IpAddr, capabilities: SwitchCapabilities) -> DeviceId {
        let id = OvsdbNode::new(ip, OVSDB_PORT).ovsdb_id();
        let switch = MockOvsdbSwitch {
            id: id.clone(),
            capabilities,
            state: self.state.clone(),
        };

        let mut state = self.state.lock();
        state.register(Arc::new(switch));
        state.switches.insert(id.clone(), SwitchState::default());
        id
    }

    pub fn add_cluster_node(&self, id: &str, ip: IpAddr) {
        self.state.lock().cluster.push(ClusterNode::new(id, ip));
    }

    /// Registers a plain device, e.g. to occupy a datapath id.
    pub fn register_device(&self, id: DeviceId, device_type: DeviceType) {
        self.state.lock().register(Arc::new(MockDevice { id, device_type }));
    }

    pub fn set_available(&self, id: &DeviceId, available: bool) {
        if let Some(entry) = self.state.lock().devices.get_mut(id) {
            entry.available = available;
        }
    }

    pub fn has_device(&self, id: &DeviceId) -> bool {
        self.state.lock().devices.contains_key(id)
    }

    /// Puts a realized bridge on a switch without recording a call.
    ///
    /// Returns the datapath device id.
    pub fn seed_bridge(&self, switch_id: &DeviceId, name: &str, dpid: DatapathId) -> DeviceId {
        let device_id = dpid.device_id();
        let mut state = self.state.lock();
        if let Some(switch) = state.switches.get_mut(switch_id) {
            switch
                .bridges
                .push(BridgeDescription::new(name).with_datapath_id(dpid));
        }
        state.register(Arc::new(MockDevice {
            id: device_id.clone(),
            device_type: DeviceType::Datapath,
        }));
        device_id
    }

    /// Puts a raw bridge description on a switch, no device is registered.
    pub fn seed_description(&self, switch_id: &DeviceId, description: BridgeDescription) {
        if let Some(switch) = self.state.lock().switches.get_mut(switch_id) {
            switch.bridges.push(description);
        }
    }

    /// Makes every future `op` call fail with `error`.
    pub fn fail(&self, op: MockOp, error: CapabilityError) {
        self.state.lock().failures.push(FailRule {
            op,
            device: None,
            error,
        });
    }

    /// Makes future `op` calls against `device` fail with `error`.
    pub fn fail_on(&self, device: &DeviceId, op: MockOp, error: CapabilityError) {
        self.state.lock().failures.push(FailRule {
            op,
            device: Some(device.clone()),
            error,
        });
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Removes the controller driver bound to a datapath device.
    pub fn detach_controller_driver(&self, device: &DeviceId) {
        self.state.lock().detached_drivers.insert(device.clone());
    }

    /// Bridge names on a switch, in creation order.
    pub fn bridges_on(&self, switch_id: &DeviceId) -> Vec<String> {
        self.state
            .lock()
            .switches
            .get(switch_id)
            .map(|s| s.bridges.iter().map(|b| b.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn ports_on(&self, switch_id: &DeviceId, bridge: &str) -> Vec<String> {
        self.state
            .lock()
            .switches
            .get(switch_id)
            .and_then(|s| s.ports.get(bridge).cloned())
            .unwrap_or_default()
    }

    pub fn interface(
        &self,
        switch_id: &DeviceId,
        bridge: &str,
        iface: &str,
    ) -> Option<InterfaceMode> {
        self.state
            .lock()
            .switches
            .get(switch_id)
            .and_then(|s| s.interfaces.get(&(bridge.to_string(), iface.to_string())).cloned())
    }

    /// Controllers currently registered for a datapath device.
    pub fn controllers_of(&self, device: &DeviceId) -> Vec<ControllerInfo> {
        self.state
            .lock()
            .controllers
            .get(device)
            .cloned()
            .unwrap_or_default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

impl DeviceService for MockNetwork {
    fn get_device(&self, device_id: &DeviceId) -> Option<Arc<dyn Device>> {
        self.state
            .lock()
            .devices
            .get(device_id)
            .map(|entry| entry.device.clone())
    }

    fn get_devices(&self, device_type: DeviceType) -> Vec<Arc<dyn Device>> {
        self.state
            .lock()
            .devices
            .values()
            .filter(|entry| entry.device_type == device_type)
            .map(|entry| entry.device.clone())
            .collect()
    }

    fn is_available(&self, device_id: &DeviceId) -> bool {
        self.state
            .lock()
            .devices
            .get(device_id)
            .is_some_and(|entry| entry.available)
    }

    fn remove_device(&self, device_id: &DeviceId) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::RemoveDevice, device_id, device_id.to_string())?;
        state.devices.remove(device_id);
        Ok(())
    }
}

impl DriverService for MockNetwork {
    fn controller_config(&self, device_id: &DeviceId) -> Option<Arc<dyn ControllerConfig>> {
        let state = self.state.lock();
        let entry = state.devices.get(device_id)?;
        if entry.device_type != DeviceType::Datapath || state.detached_drivers.contains(device_id)
        {
            return None;
        }

        Some(Arc::new(MockControllerConfig {
            device: device_id.clone(),
            state: self.state.clone(),
        }))
    }
}

impl ClusterService for MockNetwork {
    fn get_nodes(&self) -> Vec<ClusterNode> {
        self.state.lock().cluster.clone()
    }
}

/// Device without capabilities (bridge datapaths, placeholders)
struct MockDevice {
    id: DeviceId,
    device_type: DeviceType,
}

impl Device for MockDevice {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    fn device_type(&self) -> DeviceType {
        self.device_type
    }
}

/// OVSDB-managed switch backed by the shared network state
pub struct MockOvsdbSwitch {
    id: DeviceId,
    capabilities: SwitchCapabilities,
    state: Arc<Mutex<NetworkState>>,
}

impl Device for MockOvsdbSwitch {
    fn id(&self) -> &DeviceId {
        &self.id
    }

    fn device_type(&self) -> DeviceType {
        DeviceType::Switch
    }

    fn bridge_config(&self) -> Option<&dyn BridgeConfig> {
        self.capabilities
            .bridge_config
            .then_some(self as &dyn BridgeConfig)
    }

    fn interface_config(&self) -> Option<&dyn InterfaceConfig> {
        self.capabilities
            .interface_config
            .then_some(self as &dyn InterfaceConfig)
    }
}

#[async_trait]
impl BridgeConfig for MockOvsdbSwitch {
    async fn add_bridge(&self, description: &BridgeDescription) -> CapabilityResult<()> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        state.enter(MockOp::AddBridge, &self.id, description.name.clone())?;

        let datapath = description.device_id();
        if let Some(device_id) = &datapath {
            if state.devices.contains_key(device_id) {
                return Err(CapabilityError::conflict(format!(
                    "datapath {} already in use",
                    device_id
                )));
            }
        }

        let switch = state.switch_mut(&self.id)?;
        if switch.bridges.iter().any(|b| b.name == description.name) {
            return Err(CapabilityError::conflict(format!(
                "bridge {} already exists",
                description.name
            )));
        }
        switch.bridges.push(description.clone());

        if let Some(device_id) = datapath {
            state.register(Arc::new(MockDevice {
                id: device_id.clone(),
                device_type: DeviceType::Datapath,
            }));
            state
                .controllers
                .insert(device_id, description.controllers.clone());
        }
        Ok(())
    }

    async fn delete_bridge(&self, bridge_name: &str) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::DeleteBridge, &self.id, bridge_name.to_string())?;

        let switch = state.switch_mut(&self.id)?;
        let position = switch
            .bridges
            .iter()
            .position(|b| b.name == bridge_name)
            .ok_or_else(|| CapabilityError::rejected(format!("no bridge named {}", bridge_name)))?;
        let removed = switch.bridges.remove(position);
        switch.ports.remove(bridge_name);
        switch.interfaces.retain(|(bridge, _), _| bridge != bridge_name);

        if let Some(device_id) = removed.device_id() {
            state.devices.remove(&device_id);
            state.controllers.remove(&device_id);
        }
        Ok(())
    }

    async fn add_port(&self, bridge_name: &str, port_name: &str) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::AddPort, &self.id, format!("{}/{}", bridge_name, port_name))?;

        let switch = state.switch_mut(&self.id)?;
        if !switch.bridges.iter().any(|b| b.name == bridge_name) {
            return Err(CapabilityError::rejected(format!("no bridge named {}", bridge_name)));
        }
        let ports = switch.ports.entry(bridge_name.to_string()).or_default();
        if ports.iter().any(|p| p == port_name) {
            return Err(CapabilityError::conflict(format!("port {} already exists", port_name)));
        }
        ports.push(port_name.to_string());
        Ok(())
    }

    async fn delete_port(&self, bridge_name: &str, port_name: &str) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        state.enter(MockOp::DeletePort, &self.id, format!("{}/{}", bridge_name, port_name))?;

        let switch = state.switch_mut(&self.id)?;
        let ports = switch
            .ports
            .get_mut(bridge_name)
            .ok_or_else(|| CapabilityError::rejected(format!("no ports on {}", bridge_name)))?;
        let position = ports
            .iter()
            .position(|p| p == port_name)
            .ok_or_else(|| CapabilityError::rejected(format!("no port named {}", port_name)))?;
        ports.remove(position);
        Ok(())
    }

    async fn get_bridges(&self) -> CapabilityResult<Vec<BridgeDescription>> {
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        state.enter(MockOp::GetBridges, &self.id, String::new())?;
        Ok(state.switch_mut(&self.id)?.bridges.clone())
    }
}

#[async_trait]
impl InterfaceConfig for MockOvsdbSwitch {
    async fn add_patch_mode(
        &self,
        iface_name: &str,
        patch: &PatchDescription,
    ) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        state.enter(
            MockOp::AddPatchMode,
            &self.id,
            format!("{}/{}", patch.device_id, iface_name),
        )?;

        state.switch_mut(&self.id)?.interfaces.insert(
            (patch.device_id.clone(), iface_name.to_string()),
            InterfaceMode::Patch(patch.clone()),
        );
        Ok(())
    }

    async fn add_tunnel_mode(
        &self,
        iface_name: &str,
        tunnel: &TunnelDescription,
    ) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        state.enter(
            MockOp::AddTunnelMode,
            &self.id,
            format!("{}/{}", tunnel.device_id, iface_name),
        )?;

        state.switch_mut(&self.id)?.interfaces.insert(
            (tunnel.device_id.clone(), iface_name.to_string()),
            InterfaceMode::Tunnel(tunnel.clone()),
        );
        Ok(())
    }
}

/// Controller driver handle of a bridge datapath
pub struct MockControllerConfig {
    device: DeviceId,
    state: Arc<Mutex<NetworkState>>,
}

#[async_trait]
impl ControllerConfig for MockControllerConfig {
    async fn set_controllers(&self, controllers: &[ControllerInfo]) -> CapabilityResult<()> {
        let mut state = self.state.lock();
        let targets: Vec<String> = controllers.iter().map(ControllerInfo::target).collect();
        state.enter(MockOp::SetControllers, &self.device, targets.join(","))?;

        state
            .controllers
            .insert(self.device.clone(), controllers.to_vec());
        Ok(())
    }
}

/// Common scenarios
pub mod scenarios {
    use super::*;

    /// Management address of the first fixture switch
    pub const SWITCH_A: &str = "10.0.0.1";
    /// Management address of the second fixture switch
    pub const SWITCH_B: &str = "10.0.0.2";

    pub fn ip(addr: &str) -> IpAddr {
        addr.parse()
            .unwrap_or_else(|e| panic!("invalid fixture address {}: {}", addr, e))
    }

    /// One full switch at [`SWITCH_A`] and a two-node cluster.
    pub fn single_switch() -> (Arc<MockNetwork>, DeviceId) {
        let network = Arc::new(MockNetwork::new());
        let switch = network.add_switch(ip(SWITCH_A));
        network.add_cluster_node("controller-1", ip("192.168.100.1"));
        network.add_cluster_node("controller-2", ip("192.168.100.2"));
        (network, switch)
    }

    /// Full switches at [`SWITCH_A`] and [`SWITCH_B`] and a one-node cluster.
    pub fn two_switches() -> (Arc<MockNetwork>, DeviceId, DeviceId) {
        let network = Arc::new(MockNetwork::new());
        let a = network.add_switch(ip(SWITCH_A));
        let b = network.add_switch(ip(SWITCH_B));
        network.add_cluster_node("controller-1", ip("192.168.100.1"));
        (network, a, b)
    }
}

#[cfg(test)]
mod tests {
    use super::scenarios::*;
    use super::*;

    #[tokio::test]
    async fn test_add_bridge_registers_datapath() {
        let (network, switch_id) = single_switch();
        let switch = network.get_device(&switch_id).unwrap();

        let description = BridgeDescription::new("br0").with_datapath_id(DatapathId::new(4));
        switch
            .bridge_config()
            .unwrap()
            .add_bridge(&description)
            .await
            .unwrap();

        let dp = DatapathId::new(4).device_id();
        assert!(network.has_device(&dp));
        assert!(network.is_available(&dp));
        assert_eq!(network.bridges_on(&switch_id), vec!["br0".to_string()]);
        assert!(network.controller_config(&dp).is_some());
    }

    #[tokio::test]
    async fn test_duplicate_bridge_conflicts() {
        let (network, switch_id) = single_switch();
        network.seed_bridge(&switch_id, "br0", DatapathId::new(4));
        let switch = network.get_device(&switch_id).unwrap();

        let err = switch
            .bridge_config()
            .unwrap()
            .add_bridge(&BridgeDescription::new("br0").with_datapath_id(DatapathId::new(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_injected_failure_is_scoped_to_device() {
        let (network, a, b) = two_switches();
        network.fail_on(&a, MockOp::GetBridges, CapabilityError::transport("session down"));

        let switch_a = network.get_device(&a).unwrap();
        let switch_b = network.get_device(&b).unwrap();
        assert!(switch_a.bridge_config().unwrap().get_bridges().await.is_err());
        assert!(switch_b.bridge_config().unwrap().get_bridges().await.is_ok());

        network.clear_failures();
        assert!(switch_a.bridge_config().unwrap().get_bridges().await.is_ok());
    }

    #[test]
    fn test_capabilities_follow_configuration() {
        let network = MockNetwork::new();
        let id = network.add_switch_with(ip(SWITCH_A), SwitchCapabilities::bridge_only());
        let switch = network.get_device(&id).unwrap();

        assert!(switch.bridge_config().is_some());
        assert!(switch.interface_config().is_none());
        assert_eq!(network.get_devices(DeviceType::Switch).len(), 1);
    }

    #[test]
    fn test_detached_driver() {
        let (network, switch_id) = single_switch();
        let dp = network.seed_bridge(&switch_id, "br0", DatapathId::new(9));

        assert!(network.controller_config(&dp).is_some());
        assert!(network.controller_config(&switch_id).is_none());

        network.detach_controller_driver(&dp);
        assert!(network.controller_config(&dp).is_none());
    }
}
