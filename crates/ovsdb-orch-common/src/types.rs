//! Identifier and description types shared by the bridge orchestrator and
//! the capability layer beneath it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

/// URI scheme used for OpenFlow datapath device identifiers.
pub const OPENFLOW_SCHEME: &str = "of";

/// URI scheme used for OVSDB management nodes.
pub const OVSDB_SCHEME: &str = "ovsdb";

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid datapath id: {0}")]
    InvalidDatapathId(String),

    #[error("invalid controller protocol: {0}")]
    InvalidProtocol(String),

    #[error("invalid tunnel type: {0}")]
    InvalidTunnelType(String),
}

/// Opaque device identifier as issued by the device inventory.
///
/// Managed switches use `ovsdb:<ip>`, bridges realized on them use
/// `of:<16 hex digits>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(uri: impl Into<String>) -> Self {
        DeviceId(uri.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the URI scheme (the part before the first `:`), if any.
    pub fn scheme(&self) -> Option<&str> {
        self.0.split_once(':').map(|(scheme, _)| scheme)
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<DatapathId> for DeviceId {
    fn from(dpid: DatapathId) -> Self {
        DeviceId(dpid.to_string())
    }
}

/// 64-bit OpenFlow datapath identifier.
///
/// Rendered as `of:` followed by 16 zero-padded upper-case hex digits.
///
/// # Examples
///
/// ```
/// use ovsdb_orch_common::DatapathId;
///
/// let dpid = DatapathId::new(4);
/// assert_eq!(dpid.to_string(), "of:0000000000000004");
/// assert_eq!("of:000000000000000A".parse::<DatapathId>().unwrap().as_u64(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DatapathId(u64);

impl DatapathId {
    /// Number of hex digits in the rendered form.
    pub const HEX_WIDTH: usize = 16;

    pub const fn new(value: u64) -> Self {
        DatapathId(value)
    }

    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Returns the device identifier the inventory uses for this datapath.
    pub fn device_id(&self) -> DeviceId {
        DeviceId::from(*self)
    }
}

impl fmt::Display for DatapathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:016X}", OPENFLOW_SCHEME, self.0)
    }
}

impl FromStr for DatapathId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix(OPENFLOW_SCHEME)
            .and_then(|rest| rest.strip_prefix(':'))
            .ok_or_else(|| ParseError::InvalidDatapathId(s.to_string()))?;

        if hex.len() != Self::HEX_WIDTH || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(ParseError::InvalidDatapathId(s.to_string()));
        }

        u64::from_str_radix(hex, 16)
            .map(DatapathId)
            .map_err(|_| ParseError::InvalidDatapathId(s.to_string()))
    }
}

impl TryFrom<String> for DatapathId {
    type Error = ParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DatapathId> for String {
    fn from(dpid: DatapathId) -> String {
        dpid.to_string()
    }
}

/// Device classification reported by the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Managed switch reachable over OVSDB; hosts bridges.
    Switch,
    /// OpenFlow datapath of a bridge realized on a switch.
    Datapath,
    Other,
}

/// OVSDB management endpoint of a switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OvsdbNode {
    pub ip: IpAddr,
    pub port: u16,
}

impl OvsdbNode {
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// Device identifier under which the inventory registers this node.
    ///
    /// The management port is not part of the identifier.
    pub fn ovsdb_id(&self) -> DeviceId {
        DeviceId(format!("{}:{}", OVSDB_SCHEME, self.ip))
    }
}

/// Transport a bridge uses to reach its controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControllerProtocol {
    Tcp,
    Ssl,
}

impl ControllerProtocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControllerProtocol::Tcp => "tcp",
            ControllerProtocol::Ssl => "ssl",
        }
    }
}

impl FromStr for ControllerProtocol {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(ControllerProtocol::Tcp),
            "ssl" => Ok(ControllerProtocol::Ssl),
            _ => Err(ParseError::InvalidProtocol(s.to_string())),
        }
    }
}

impl fmt::Display for ControllerProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controller endpoint a bridge is pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerInfo {
    pub ip: IpAddr,
    pub port: u16,
    pub protocol: ControllerProtocol,
}

impl ControllerInfo {
    pub fn new(ip: IpAddr, port: u16, protocol: ControllerProtocol) -> Self {
        Self { ip, port, protocol }
    }

    /// OVS controller target string, e.g. `tcp:10.0.0.1:6633`.
    pub fn target(&self) -> String {
        match self.ip {
            IpAddr::V4(ip) => format!("{}:{}:{}", self.protocol, ip, self.port),
            IpAddr::V6(ip) => format!("{}:[{}]:{}", self.protocol, ip, self.port),
        }
    }
}

/// Member of the controller cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterNode {
    pub id: String,
    pub ip: IpAddr,
}

impl ClusterNode {
    pub fn new(id: impl Into<String>, ip: IpAddr) -> Self {
        Self { id: id.into(), ip }
    }
}

/// Bridge as submitted to, or reported by, a switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeDescription {
    pub name: String,
    pub datapath_id: Option<DatapathId>,
    pub controllers: Vec<ControllerInfo>,
}

impl BridgeDescription {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datapath_id: None,
            controllers: Vec::new(),
        }
    }

    /// Set the datapath id (builder pattern)
    pub fn with_datapath_id(mut self, datapath_id: DatapathId) -> Self {
        self.datapath_id = Some(datapath_id);
        self
    }

    /// Set the controller list (builder pattern)
    pub fn with_controllers(mut self, controllers: Vec<ControllerInfo>) -> Self {
        self.controllers = controllers;
        self
    }

    /// Device id of the bridge datapath, once the switch has assigned one.
    pub fn device_id(&self) -> Option<DeviceId> {
        self.datapath_id.map(DeviceId::from)
    }
}

/// Patch port linking an interface to a peer interface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchDescription {
    /// Name of the bridge hosting the interface.
    pub device_id: String,
    pub iface_name: String,
    pub peer: String,
}

impl PatchDescription {
    pub fn new(
        device_id: impl Into<String>,
        iface_name: impl Into<String>,
        peer: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            iface_name: iface_name.into(),
            peer: peer.into(),
        }
    }
}

/// Overlay tunnel encapsulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelType {
    Vxlan,
    Gre,
}

impl TunnelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TunnelType::Vxlan => "vxlan",
            TunnelType::Gre => "gre",
        }
    }
}

impl FromStr for TunnelType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "vxlan" => Ok(TunnelType::Vxlan),
            "gre" => Ok(TunnelType::Gre),
            _ => Err(ParseError::InvalidTunnelType(s.to_string())),
        }
    }
}

impl fmt::Display for TunnelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunnel key (VNI for VXLAN), passed through to the switch unparsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TunnelKey(String);

impl TunnelKey {
    pub fn new(key: impl Into<String>) -> Self {
        TunnelKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TunnelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tunnel interface attached to a bridge port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelDescription {
    /// Name of the bridge hosting the interface.
    pub device_id: String,
    pub iface_name: String,
    pub tunnel_type: TunnelType,
    pub local: Option<IpAddr>,
    pub remote: IpAddr,
    pub key: Option<TunnelKey>,
}

impl TunnelDescription {
    pub fn new(
        device_id: impl Into<String>,
        iface_name: impl Into<String>,
        tunnel_type: TunnelType,
        remote: IpAddr,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            iface_name: iface_name.into(),
            tunnel_type,
            local: None,
            remote,
            key: None,
        }
    }

    /// Set the local endpoint (builder pattern)
    pub fn with_local(mut self, local: IpAddr) -> Self {
        self.local = Some(local);
        self
    }

    /// Set the tunnel key (builder pattern)
    pub fn with_key(mut self, key: TunnelKey) -> Self {
        self.key = Some(key);
        self
    }
}
