//! ovsdb-bridgemgr - bridge lifecycle orchestration for OVSDB-managed switches
//!
//! Turns bridge, port and tunnel intents into ordered capability calls
//! against the switches, keeping a refreshed cache of which bridges exist
//! and which datapath device each one owns.

mod bridge_mgr;
mod config;
mod dpid;
mod error;
mod intents;
mod locks;
mod registry;
mod response;
mod service;

pub use bridge_mgr::BridgeMgr;
pub use config::*;
pub use dpid::DatapathIdAllocator;
pub use error::*;
pub use intents::*;
pub use locks::BridgeLocks;
pub use registry::{BridgeRecord, BridgeRegistry};
pub use response::*;
pub use service::{NotImplemented, OvsdbBridgeService};
