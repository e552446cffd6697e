//! End-to-end lifecycle scenarios against the in-process fabric.
//!
//! These tests drive the target service the way a deployment does: enroll
//! targets, flip their state, restart, and watch what the collector fleet
//! receives.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use pollaris_fabric::{InProcessFabric, SentKind, ServiceId, Verb};
use pollaris_state::{
    Host, HostConfig, Protocol, Query, Target, TargetRequest, TargetState, TargetStore,
};
use pollaris_targets::{service_id, LinkBinding, LinkResolver, TargetService};

fn collectors() -> ServiceId {
    ServiceId::new("Col", 7)
}

fn fabric_with_collectors(nodes: &[&str]) -> Arc<InProcessFabric> {
    let fabric = InProcessFabric::new("node-1");
    fabric.add_member(service_id(), "node-1".into());
    fabric.set_leader(service_id(), "node-1".into());
    for node in nodes {
        fabric.add_member(collectors(), node.to_string());
    }
    Arc::new(fabric)
}

fn links() -> Arc<LinkResolver> {
    let resolver = LinkResolver::new();
    resolver.add_link(
        "L1",
        LinkBinding {
            collector: collectors(),
            parser: ServiceId::new("Parse", 7),
            cache: ServiceId::new("Cache", 7),
            persist: ServiceId::new("Persist", 7),
        },
    );
    Arc::new(resolver)
}

fn target(id: &str, addr: &str, state: TargetState) -> Target {
    let mut configs = HashMap::new();
    configs.insert(
        Protocol::Snmp,
        HostConfig {
            protocol: Protocol::Snmp,
            addr: addr.to_string(),
            port: 161,
            username: "poller".to_string(),
            password: "secret".to_string(),
            timeout_secs: 30,
        },
    );
    Target {
        target_id: id.to_string(),
        links_id: "L1".to_string(),
        inventory_type: "router".to_string(),
        state,
        hosts: vec![Host { configs }],
    }
}

#[tokio::test]
async fn activation_dispatches_to_one_live_collector() {
    let fabric = fabric_with_collectors(&["c1", "c2", "c3"]);
    let service = TargetService::new(TargetStore::open_in_memory().unwrap(), links(), fabric.clone());

    service
        .post(
            TargetRequest::Single(target("t1", "10.0.0.1", TargetState::Up)),
            false,
        )
        .await
        .unwrap();

    let sent = fabric.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].service, collectors());
    assert_eq!(sent[0].verb, Verb::Post);
    match &sent[0].kind {
        SentKind::RoundRobin(node) => {
            assert!(["c1", "c2", "c3"].contains(&node.as_str()));
        }
        other => panic!("expected round-robin dispatch, got {other:?}"),
    }
}

#[tokio::test]
async fn patch_down_then_up_cycles_ownership() {
    let fabric = fabric_with_collectors(&["c1", "c2"]);
    let service = TargetService::new(TargetStore::open_in_memory().unwrap(), links(), fabric.clone());

    service
        .post(
            TargetRequest::Single(target("t1", "10.0.0.1", TargetState::Up)),
            false,
        )
        .await
        .unwrap();
    fabric.clear_sent();

    // Down: every collector instance is told to drop the target.
    let down = Target {
        target_id: "t1".to_string(),
        state: TargetState::Down,
        links_id: String::new(),
        inventory_type: String::new(),
        hosts: Vec::new(),
    };
    service.patch(&down, false).await.unwrap();

    let sent = fabric.sent();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|s| matches!(s.kind, SentKind::Multicast(_))));
    fabric.clear_sent();

    // Up: exactly one collector takes ownership again.
    let up = Target {
        state: TargetState::Up,
        ..down
    };
    service.patch(&up, false).await.unwrap();

    let sent = fabric.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(sent[0].kind, SentKind::RoundRobin(_)));
}

#[tokio::test]
async fn boot_recovery_quiesces_then_reactivates() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("targets.redb");

    // First life: enroll three live targets, then drop everything.
    {
        let fabric = fabric_with_collectors(&["c1", "c2"]);
        let store = TargetStore::open(&db_path).unwrap();
        let service = TargetService::new(store, links(), fabric);
        for i in 1..=3 {
            service
                .post(
                    TargetRequest::Single(target(
                        &format!("t{i}"),
                        &format!("10.0.0.{i}"),
                        TargetState::Up,
                    )),
                    false,
                )
                .await
                .unwrap();
        }
    }

    // Restart: fresh fabric, fresh address index, same database.
    let fabric = fabric_with_collectors(&["c1", "c2"]);
    let store = TargetStore::open(&db_path).unwrap();
    let service = TargetService::new(store, links(), fabric.clone());

    service
        .spawn_recovery(Duration::from_millis(0))
        .await
        .unwrap();

    let sent = fabric.sent();
    // Quiesce: 3 targets × 2 collector instances, marked Down.
    let multicasts: Vec<_> = sent
        .iter()
        .filter(|s| matches!(s.kind, SentKind::Multicast(_)))
        .collect();
    assert_eq!(multicasts.len(), 6);
    for sent in &multicasts {
        let t: Target = serde_json::from_value(sent.body.clone()).unwrap();
        assert_eq!(t.state, TargetState::Down);
    }

    // Re-activate: one unicast per target, marked Up, spread round-robin.
    let unicasts: Vec<_> = sent
        .iter()
        .filter(|s| matches!(s.kind, SentKind::Unicast(_)))
        .collect();
    assert_eq!(unicasts.len(), 3);
    for sent in &unicasts {
        let t: Target = serde_json::from_value(sent.body.clone()).unwrap();
        assert_eq!(t.state, TargetState::Up);
    }
    // Quiesce completes before any re-activation.
    let first_unicast = sent
        .iter()
        .position(|s| matches!(s.kind, SentKind::Unicast(_)))
        .unwrap();
    assert!(sent[..first_unicast]
        .iter()
        .all(|s| matches!(s.kind, SentKind::Multicast(_))));

    // Persisted state is untouched and the address index is repopulated.
    for i in 1..=3 {
        let t = service
            .store()
            .get_target(&format!("t{i}"))
            .unwrap()
            .unwrap();
        assert_eq!(t.state, TargetState::Up);
        assert!(service
            .callback()
            .addresses()
            .contains(&format!("10.0.0.{i}")));
    }
}

#[tokio::test]
async fn boot_recovery_is_idempotent() {
    let fabric = fabric_with_collectors(&["c1", "c2"]);
    let store = TargetStore::open_in_memory().unwrap();
    let service = TargetService::new(store, links(), fabric.clone());

    for i in 1..=2 {
        service
            .post(
                TargetRequest::Single(target(
                    &format!("t{i}"),
                    &format!("10.0.0.{i}"),
                    TargetState::Up,
                )),
                false,
            )
            .await
            .unwrap();
    }
    fabric.clear_sent();

    service.callback().restore_targets(Duration::ZERO).await;
    let first_run = fabric.sent().len();
    fabric.clear_sent();

    service.callback().restore_targets(Duration::ZERO).await;
    let second_run = fabric.sent().len();

    // Same dispatch shape both times: 2 targets × 2 multicasts + 2 unicasts.
    assert_eq!(first_run, 6);
    assert_eq!(second_run, first_run);
    for i in 1..=2 {
        let t = service
            .store()
            .get_target(&format!("t{i}"))
            .unwrap()
            .unwrap();
        assert_eq!(t.state, TargetState::Up);
    }
}

#[tokio::test]
async fn recovery_skips_non_leaders() {
    let fabric = InProcessFabric::new("node-2");
    fabric.add_member(service_id(), "node-2".into());
    fabric.set_leader(service_id(), "node-1".into());
    fabric.add_member(collectors(), "c1".into());
    let fabric = Arc::new(fabric);

    let service = TargetService::new(TargetStore::open_in_memory().unwrap(), links(), fabric.clone());
    service
        .post(
            TargetRequest::Single(target("t1", "10.0.0.1", TargetState::Up)),
            false,
        )
        .await
        .unwrap();
    fabric.clear_sent();

    service.callback().restore_targets(Duration::ZERO).await;

    assert!(fabric.sent().is_empty());
}

#[tokio::test]
async fn deleted_target_frees_its_address_for_enrollment() {
    let fabric = fabric_with_collectors(&["c1"]);
    let service = TargetService::new(TargetStore::open_in_memory().unwrap(), links(), fabric);

    service
        .post(
            TargetRequest::Single(target("t1", "10.0.0.1", TargetState::Down)),
            false,
        )
        .await
        .unwrap();

    let query = Query {
        target_id: Some("t1".to_string()),
        ..Query::default()
    };
    assert_eq!(service.delete(&query).unwrap(), 1);
    assert!(service.get(&query).unwrap().list.is_empty());

    service
        .post(
            TargetRequest::Single(target("t2", "10.0.0.1", TargetState::Down)),
            false,
        )
        .await
        .unwrap();
}
