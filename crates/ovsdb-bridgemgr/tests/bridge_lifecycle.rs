//! Bridge lifecycle tests against the in-memory switch network

use std::sync::Arc;

use ovsdb_bridgemgr::{
    BridgeMgr, BridgeMgrConfig, CapabilityOp, ErrorKind, OvsdbBridgeError, OvsdbBridgeService,
};
use ovsdb_bridgemgr_test::scenarios::{ip, single_switch, two_switches, SWITCH_A, SWITCH_B};
use ovsdb_bridgemgr_test::{
    init_test_logging, CallVerifier, InterfaceMode, MockNetwork, MockOp, SwitchCapabilities,
};
use ovsdb_orch_common::{
    BridgeDescription, CapabilityError, DatapathId, DeviceId, DeviceType, OrchContext,
    PatchDescription, TunnelDescription, TunnelKey, TunnelType,
};
use pretty_assertions::assert_eq;

fn manager(network: &Arc<MockNetwork>) -> BridgeMgr {
    init_test_logging();
    BridgeMgr::with_defaults(OrchContext::from_shared(network.clone()))
}

#[tokio::test]
async fn test_create_delete_round_trip() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);

    let record = mgr.create_bridge(ip(SWITCH_A), "br-int").await.unwrap();
    assert_eq!(record.name, "br-int");
    assert_eq!(record.device_id, DeviceId::new("of:0000000000000004"));
    assert!(mgr.registry().exists("br-int"));
    assert_eq!(network.bridges_on(&switch), vec!["br-int".to_string()]);

    mgr.delete_bridge(ip(SWITCH_A), "br-int").await.unwrap();
    assert_eq!(mgr.registry().lookup("br-int"), None);
    assert!(network.bridges_on(&switch).is_empty());
    assert!(!network.has_device(&record.device_id));

    let err = mgr.delete_bridge(ip(SWITCH_A), "br-int").await.unwrap_err();
    assert_eq!(err, OvsdbBridgeError::bridge_not_found("br-int"));
}

#[tokio::test]
async fn test_delete_runs_steps_in_order() {
    let (network, _switch) = single_switch();
    let mgr = manager(&network);
    let record = mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();
    network.clear_calls();

    mgr.delete_bridge(ip(SWITCH_A), "br0").await.unwrap();

    let verifier = CallVerifier::new(network.calls());
    verifier
        .assert_mutation_order(&[
            MockOp::SetControllers,
            MockOp::RemoveDevice,
            MockOp::DeleteBridge,
        ])
        .unwrap();
    verifier.assert_called(MockOp::SetControllers, "").unwrap();
    verifier
        .assert_called(MockOp::RemoveDevice, record.device_id.as_str())
        .unwrap();
    verifier.assert_called(MockOp::DeleteBridge, "br0").unwrap();
}

#[tokio::test]
async fn test_duplicate_create_is_rejected() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);

    mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();
    let err = mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BridgeAlreadyExists);
    assert_eq!(network.bridges_on(&switch).len(), 1);
}

#[tokio::test]
async fn test_create_on_unknown_switch() {
    let (network, _switch) = single_switch();
    let mgr = manager(&network);

    let err = mgr.create_bridge(ip("10.9.9.9"), "br0").await.unwrap_err();

    assert_eq!(
        err,
        OvsdbBridgeError::device_unreachable(DeviceId::new("ovsdb:10.9.9.9"))
    );
    assert!(mgr.registry().is_empty());
    CallVerifier::new(network.calls()).assert_no_mutations().unwrap();
}

#[tokio::test]
async fn test_operations_on_unknown_switch() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);
    mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();
    let before = mgr.registry().snapshot();
    network.clear_calls();

    let unknown = ip("10.9.9.9");
    let remote = ip("192.168.10.2");
    let key = TunnelKey::new("100");
    let results = [
        mgr.add_port(unknown, "br0", "eth0").await,
        mgr.remove_port(unknown, "br0", "eth0").await,
        mgr.create_patch_peer_port(unknown, "br0", "patch-tun", "patch-int").await,
        mgr.create_vxlan_tunnel(unknown, "br0", "vx0", remote, &key).await,
        mgr.delete_bridge(unknown, "br0").await,
    ];

    for result in results {
        assert_eq!(
            result.unwrap_err(),
            OvsdbBridgeError::device_unreachable(DeviceId::new("ovsdb:10.9.9.9"))
        );
    }

    assert_eq!(mgr.registry().snapshot(), before);
    assert_eq!(network.bridges_on(&switch), vec!["br0".to_string()]);
    assert!(network.ports_on(&switch, "br0").is_empty());
    CallVerifier::new(network.calls()).assert_no_mutations().unwrap();
}

#[tokio::test]
async fn test_create_without_bridge_capability() {
    let network = Arc::new(MockNetwork::new());
    network.add_switch_with(ip(SWITCH_A), SwitchCapabilities::none());
    let mgr = manager(&network);

    let err = mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedCapability);
    assert!(mgr.registry().is_empty());
}

#[tokio::test]
async fn test_create_failure_leaves_registry_untouched() {
    let (network, _switch) = single_switch();
    network.fail(MockOp::AddBridge, CapabilityError::transport("connection reset"));
    let mgr = manager(&network);

    let err = mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap_err();

    match err {
        OvsdbBridgeError::CapabilityOperationFailed {
            operation, message, ..
        } => {
            assert_eq!(operation, CapabilityOp::AddBridge);
            assert_eq!(message, "transport error: connection reset");
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(mgr.registry().lookup("br0"), None);
}

#[tokio::test]
async fn test_create_skips_datapath_ids_in_use() {
    let (network, _switch) = single_switch();
    network.register_device(DatapathId::new(4).device_id(), DeviceType::Datapath);
    network.register_device(DatapathId::new(5).device_id(), DeviceType::Datapath);
    let mgr = manager(&network);

    let record = mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();
    assert_eq!(record.datapath_id(), Some(DatapathId::new(6)));

    let second = mgr.create_bridge(ip(SWITCH_A), "br1").await.unwrap();
    assert_eq!(second.datapath_id(), Some(DatapathId::new(7)));
}

#[tokio::test]
async fn test_datapath_floor_from_config() {
    let (network, _switch) = single_switch();
    let mut config = BridgeMgrConfig::default();
    config.datapath.begin = 0x100;
    let mgr = BridgeMgr::new(OrchContext::from_shared(network.clone()), config);

    let record = mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();
    assert_eq!(record.device_id.as_str(), "of:0000000000000100");
}

#[tokio::test]
async fn test_add_and_remove_port() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);
    mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();

    mgr.add_port(ip(SWITCH_A), "br0", "eth1").await.unwrap();
    assert_eq!(network.ports_on(&switch, "br0"), vec!["eth1".to_string()]);

    mgr.remove_port(ip(SWITCH_A), "br0", "eth1").await.unwrap();
    assert!(network.ports_on(&switch, "br0").is_empty());

    let err = mgr.remove_port(ip(SWITCH_A), "br0", "eth1").await.unwrap_err();
    assert!(matches!(
        err,
        OvsdbBridgeError::CapabilityOperationFailed {
            operation: CapabilityOp::DeletePort,
            ..
        }
    ));
}

#[tokio::test]
async fn test_port_on_missing_bridge() {
    let (network, _switch) = single_switch();
    let mgr = manager(&network);

    let err = mgr.add_port(ip(SWITCH_A), "br9", "eth1").await.unwrap_err();
    assert_eq!(err, OvsdbBridgeError::bridge_not_found("br9"));

    let err = mgr.add_port(ip(SWITCH_A), "", "eth1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BridgeNotFound);
}

#[tokio::test]
async fn test_unavailable_bridge_is_not_found() {
    let (network, switch) = single_switch();
    let dp = network.seed_bridge(&switch, "br0", DatapathId::new(0x40));
    network.set_available(&dp, false);
    let mgr = manager(&network);

    let err = mgr.add_port(ip(SWITCH_A), "br0", "eth1").await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::BridgeNotFound);
    assert!(!mgr.registry().exists("br0"));
    assert_eq!(mgr.registry().lookup("br0"), Some(dp));
}

#[tokio::test]
async fn test_patch_peer_port() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);
    mgr.create_bridge(ip(SWITCH_A), "br-int").await.unwrap();

    mgr.create_patch_peer_port(ip(SWITCH_A), "br-int", "patch-tun", "patch-int")
        .await
        .unwrap();

    assert_eq!(
        network.interface(&switch, "br-int", "patch-tun"),
        Some(InterfaceMode::Patch(PatchDescription::new(
            "br-int",
            "patch-tun",
            "patch-int"
        )))
    );
}

#[tokio::test]
async fn test_patch_peer_without_interface_capability() {
    let network = Arc::new(MockNetwork::new());
    let switch = network.add_switch_with(ip(SWITCH_A), SwitchCapabilities::bridge_only());
    let mgr = manager(&network);
    mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();
    let before = mgr.registry().snapshot();

    let err = mgr
        .create_patch_peer_port(ip(SWITCH_A), "br0", "patch0", "patch1")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UnsupportedCapability);
    assert_eq!(mgr.registry().snapshot(), before);
    assert_eq!(network.interface(&switch, "br0", "patch0"), None);
}

#[tokio::test]
async fn test_vxlan_tunnel() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);
    mgr.create_bridge(ip(SWITCH_A), "br-tun").await.unwrap();

    mgr.create_vxlan_tunnel(
        ip(SWITCH_A),
        "br-tun",
        "vx0",
        ip("192.168.10.2"),
        &TunnelKey::new("5001"),
    )
    .await
    .unwrap();

    let expected = TunnelDescription::new("br-tun", "vx0", TunnelType::Vxlan, ip("192.168.10.2"))
        .with_key(TunnelKey::new("5001"));
    assert_eq!(
        network.interface(&switch, "br-tun", "vx0"),
        Some(InterfaceMode::Tunnel(expected))
    );
}

#[tokio::test]
async fn test_vxlan_failure_is_wrapped() {
    let (network, _switch) = single_switch();
    let mgr = manager(&network);
    mgr.create_bridge(ip(SWITCH_A), "br-tun").await.unwrap();
    network.fail(MockOp::AddTunnelMode, CapabilityError::rejected("bad key"));

    let err = mgr
        .create_vxlan_tunnel(
            ip(SWITCH_A),
            "br-tun",
            "vx0",
            ip("192.168.10.2"),
            &TunnelKey::new("x"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CapabilityOperationFailed);
    assert!(err.to_string().contains("rejected: bad key"));
}

#[tokio::test]
async fn test_gre_placeholders_do_nothing() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);
    mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();
    let before = mgr.registry().snapshot();
    network.clear_calls();

    let created = mgr
        .create_gre_tunnel(
            ip(SWITCH_A),
            "br0",
            "gre0",
            ip("10.0.0.1"),
            ip("10.0.0.2"),
            &TunnelKey::new("1"),
        )
        .await;
    let deleted = mgr.delete_gre_tunnel(ip(SWITCH_A), "br0", "gre0").await;

    assert_eq!(created.operation.as_str(), "create-gre-tunnel");
    assert_eq!(deleted.operation.as_str(), "delete-gre-tunnel");
    CallVerifier::new(network.calls()).assert_call_count(0).unwrap();
    assert_eq!(mgr.registry().snapshot(), before);
    assert_eq!(network.interface(&switch, "br0", "gre0"), None);
}

#[tokio::test]
async fn test_delete_aborts_when_controller_removal_fails() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);
    let record = mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();
    network.fail(MockOp::SetControllers, CapabilityError::transport("driver gone"));
    network.clear_calls();

    let err = mgr.delete_bridge(ip(SWITCH_A), "br0").await.unwrap_err();

    assert!(matches!(
        err,
        OvsdbBridgeError::CapabilityOperationFailed {
            operation: CapabilityOp::SetControllers,
            ..
        }
    ));
    let verifier = CallVerifier::new(network.calls());
    verifier.assert_not_called(MockOp::RemoveDevice).unwrap();
    verifier.assert_not_called(MockOp::DeleteBridge).unwrap();
    assert_eq!(mgr.registry().lookup("br0"), Some(record.device_id));
    assert_eq!(network.bridges_on(&switch), vec!["br0".to_string()]);
}

#[tokio::test]
async fn test_delete_aborts_when_device_removal_fails() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);
    let record = mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();
    network.fail(MockOp::RemoveDevice, CapabilityError::rejected("device locked"));

    let err = mgr.delete_bridge(ip(SWITCH_A), "br0").await.unwrap_err();

    assert!(matches!(
        err,
        OvsdbBridgeError::CapabilityOperationFailed {
            operation: CapabilityOp::RemoveDevice,
            ..
        }
    ));
    CallVerifier::new(network.calls())
        .assert_not_called(MockOp::DeleteBridge)
        .unwrap();
    assert_eq!(mgr.registry().lookup("br0"), Some(record.device_id));
    assert_eq!(network.bridges_on(&switch), vec!["br0".to_string()]);
}

#[tokio::test]
async fn test_delete_bridge_failure_keeps_registry_entry() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);
    let record = mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();
    network.fail(MockOp::DeleteBridge, CapabilityError::transport("timeout"));

    let err = mgr.delete_bridge(ip(SWITCH_A), "br0").await.unwrap_err();

    match &err {
        OvsdbBridgeError::CapabilityOperationFailed {
            operation, device, ..
        } => {
            assert_eq!(*operation, CapabilityOp::DeleteBridge);
            assert_eq!(*device, switch);
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(mgr.registry().lookup("br0"), Some(record.device_id.clone()));
    assert!(!network.has_device(&record.device_id));
}

#[tokio::test]
async fn test_delete_without_controller_driver() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);
    let record = mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();
    network.detach_controller_driver(&record.device_id);
    network.clear_calls();

    mgr.delete_bridge(ip(SWITCH_A), "br0").await.unwrap();

    let verifier = CallVerifier::new(network.calls());
    verifier.assert_not_called(MockOp::SetControllers).unwrap();
    verifier
        .assert_mutation_order(&[MockOp::RemoveDevice, MockOp::DeleteBridge])
        .unwrap();
    assert!(network.bridges_on(&switch).is_empty());
}

#[tokio::test]
async fn test_delete_of_unavailable_bridge() {
    let (network, switch) = single_switch();
    let dp = network.seed_bridge(&switch, "br0", DatapathId::new(0x30));
    network.set_available(&dp, false);
    let mgr = manager(&network);

    mgr.delete_bridge(ip(SWITCH_A), "br0").await.unwrap();
    assert!(network.bridges_on(&switch).is_empty());
}

#[tokio::test]
async fn test_refresh_skips_failing_switch() {
    let (network, a, b) = two_switches();
    network.seed_bridge(&a, "br-a", DatapathId::new(0x10));
    network.seed_bridge(&b, "br-b", DatapathId::new(0x11));
    network.seed_description(&b, BridgeDescription::new("br-pending"));
    network.fail_on(&a, MockOp::GetBridges, CapabilityError::transport("session down"));
    let mgr = manager(&network);

    let bridges = mgr.list_bridges().await;

    let names: Vec<_> = bridges.iter().map(|b| b.name.as_str()).collect();
    assert_eq!(names, vec!["br-b"]);

    let err = mgr.add_port(ip(SWITCH_A), "br-a", "eth1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BridgeNotFound);

    mgr.add_port(ip(SWITCH_B), "br-b", "eth1").await.unwrap();
}

#[tokio::test]
async fn test_refresh_sees_external_changes() {
    let (network, switch) = single_switch();
    let mgr = manager(&network);
    mgr.create_bridge(ip(SWITCH_A), "br0").await.unwrap();

    // Bridge added behind the manager's back
    network.seed_bridge(&switch, "br-ext", DatapathId::new(0x99));
    mgr.add_port(ip(SWITCH_A), "br-ext", "eth7").await.unwrap();

    assert_eq!(mgr.registry().len(), 2);
}
