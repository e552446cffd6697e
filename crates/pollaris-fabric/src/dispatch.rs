//! Message dispatch over the service fabric.
//!
//! Services are addressed by `(name, area)`. Three delivery disciplines are
//! exposed: unicast to a chosen instance, multicast to every live instance,
//! and round-robin unicast via a rotating cursor. All sends are
//! fire-and-forget; the fabric owns retries and the wire format.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{FabricError, FabricResult};

/// Identifier of a node (process) participating in the fabric.
pub type NodeId = String;

/// A service identity: registered name plus area (partition).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId {
    pub name: String,
    pub area: u8,
}

impl ServiceId {
    pub fn new(name: impl Into<String>, area: u8) -> Self {
        Self {
            name: name.into(),
            area,
        }
    }
}

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.area)
    }
}

/// Operation verb carried by a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Post,
    Put,
    Patch,
    Delete,
    Get,
}

/// Serialize a payload into the JSON body handed to the fabric.
///
/// The wire format beyond this point belongs to the transport.
pub fn body<T: Serialize>(value: &T) -> FabricResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| FabricError::Serialize(e.to_string()))
}

/// The surface the core consumes from the service-registry fabric.
///
/// Leadership and membership queries are synchronous snapshots; sends are
/// async because real transports suspend.
#[async_trait]
pub trait ServiceFabric: Send + Sync {
    /// Node ID of the local process.
    fn local_node(&self) -> NodeId;

    /// Current leader of a service, if one is elected.
    fn leader_of(&self, service: &ServiceId) -> Option<NodeId>;

    /// Live instances of a service.
    fn members_of(&self, service: &ServiceId) -> Vec<NodeId>;

    /// Deliver to one specific instance.
    async fn unicast(
        &self,
        node: &NodeId,
        service: &ServiceId,
        verb: Verb,
        body: serde_json::Value,
    ) -> FabricResult<()>;

    /// Deliver to every live instance of a service.
    async fn multicast(
        &self,
        service: &ServiceId,
        verb: Verb,
        body: serde_json::Value,
    ) -> FabricResult<()>;

    /// Deliver to exactly one instance chosen by a per-service rotating cursor.
    async fn round_robin(
        &self,
        service: &ServiceId,
        verb: Verb,
        body: serde_json::Value,
    ) -> FabricResult<()>;
}

/// A round-robin cursor over a snapshot of live members.
///
/// Uses `AtomicUsize` for lock-free concurrent selection; the cursor wraps
/// around the member count.
pub struct RoundRobin {
    members: Vec<NodeId>,
    cursor: AtomicUsize,
}

impl RoundRobin {
    /// Create a cursor over the given member snapshot.
    pub fn new(members: Vec<NodeId>) -> Self {
        Self {
            members,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Select the next member, wrapping around. `None` if no members.
    pub fn next(&self) -> Option<&NodeId> {
        if self.members.is_empty() {
            return None;
        }
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(&self.members[idx % self.members.len()])
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ── In-process fabric ──────────────────────────────────────────────

/// How a journaled message was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentKind {
    /// Unicast to the named node.
    Unicast(NodeId),
    /// One multicast delivery to the named node.
    Multicast(NodeId),
    /// Round-robin selection landed on the named node.
    RoundRobin(NodeId),
}

/// A message recorded by [`InProcessFabric`].
#[derive(Debug, Clone)]
pub struct Sent {
    pub kind: SentKind,
    pub service: ServiceId,
    pub verb: Verb,
    pub body: serde_json::Value,
}

/// Single-process fabric: static membership and leadership tables plus a
/// journal of every send. Backs tests and standalone deployments.
pub struct InProcessFabric {
    local: NodeId,
    members: RwLock<HashMap<ServiceId, Vec<NodeId>>>,
    leaders: RwLock<HashMap<ServiceId, NodeId>>,
    cursors: Mutex<HashMap<ServiceId, usize>>,
    journal: Mutex<Vec<Sent>>,
}

impl InProcessFabric {
    pub fn new(local: impl Into<NodeId>) -> Self {
        Self {
            local: local.into(),
            members: RwLock::new(HashMap::new()),
            leaders: RwLock::new(HashMap::new()),
            cursors: Mutex::new(HashMap::new()),
            journal: Mutex::new(Vec::new()),
        }
    }

    /// Build a fabric where the local node is the sole member and leader of
    /// every given service (the standalone topology).
    pub fn single_node(local: impl Into<NodeId>, services: &[ServiceId]) -> Self {
        let fabric = Self::new(local);
        for service in services {
            fabric.add_member(service.clone(), fabric.local.clone());
            fabric.set_leader(service.clone(), fabric.local.clone());
        }
        fabric
    }

    /// Register a live instance of a service.
    pub fn add_member(&self, service: ServiceId, node: NodeId) {
        let mut members = self.members.write().unwrap();
        let entry = members.entry(service).or_default();
        if !entry.contains(&node) {
            entry.push(node);
        }
    }

    /// Record the elected leader of a service.
    pub fn set_leader(&self, service: ServiceId, node: NodeId) {
        self.leaders.write().unwrap().insert(service, node);
    }

    /// Snapshot of every message sent so far.
    pub fn sent(&self) -> Vec<Sent> {
        self.journal.lock().unwrap().clone()
    }

    /// Drop the send journal.
    pub fn clear_sent(&self) {
        self.journal.lock().unwrap().clear();
    }

    fn record(&self, kind: SentKind, service: &ServiceId, verb: Verb, body: serde_json::Value) {
        debug!(?kind, %service, ?verb, "message dispatched");
        self.journal.lock().unwrap().push(Sent {
            kind,
            service: service.clone(),
            verb,
            body,
        });
    }
}

#[async_trait]
impl ServiceFabric for InProcessFabric {
    fn local_node(&self) -> NodeId {
        self.local.clone()
    }

    fn leader_of(&self, service: &ServiceId) -> Option<NodeId> {
        self.leaders.read().unwrap().get(service).cloned()
    }

    fn members_of(&self, service: &ServiceId) -> Vec<NodeId> {
        self.members
            .read()
            .unwrap()
            .get(service)
            .cloned()
            .unwrap_or_default()
    }

    async fn unicast(
        &self,
        node: &NodeId,
        service: &ServiceId,
        verb: Verb,
        body: serde_json::Value,
    ) -> FabricResult<()> {
        self.record(SentKind::Unicast(node.clone()), service, verb, body);
        Ok(())
    }

    async fn multicast(
        &self,
        service: &ServiceId,
        verb: Verb,
        body: serde_json::Value,
    ) -> FabricResult<()> {
        // One journal entry per live instance; zero instances is a no-op.
        for node in self.members_of(service) {
            self.record(SentKind::Multicast(node), service, verb, body.clone());
        }
        Ok(())
    }

    async fn round_robin(
        &self,
        service: &ServiceId,
        verb: Verb,
        body: serde_json::Value,
    ) -> FabricResult<()> {
        let members = self.members_of(service);
        if members.is_empty() {
            return Err(FabricError::NoInstances(service.to_string()));
        }
        let node = {
            let mut cursors = self.cursors.lock().unwrap();
            let cursor = cursors.entry(service.clone()).or_insert(0);
            let node = members[*cursor % members.len()].clone();
            *cursor += 1;
            node
        };
        self.record(SentKind::RoundRobin(node), service, verb, body);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collectors() -> ServiceId {
        ServiceId::new("Col", 7)
    }

    #[test]
    fn round_robin_cycles_through_members() {
        let rr = RoundRobin::new(vec!["a".into(), "b".into(), "c".into()]);

        assert_eq!(rr.next(), Some(&"a".to_string()));
        assert_eq!(rr.next(), Some(&"b".to_string()));
        assert_eq!(rr.next(), Some(&"c".to_string()));
        assert_eq!(rr.next(), Some(&"a".to_string())); // wraps
    }

    #[test]
    fn round_robin_empty_returns_none() {
        let rr = RoundRobin::new(Vec::new());
        assert_eq!(rr.next(), None);
    }

    #[tokio::test]
    async fn fabric_round_robin_rotates() {
        let fabric = InProcessFabric::new("local");
        fabric.add_member(collectors(), "c1".into());
        fabric.add_member(collectors(), "c2".into());

        for _ in 0..3 {
            fabric
                .round_robin(&collectors(), Verb::Post, serde_json::json!({}))
                .await
                .unwrap();
        }

        let picks: Vec<SentKind> = fabric.sent().into_iter().map(|s| s.kind).collect();
        assert_eq!(
            picks,
            vec![
                SentKind::RoundRobin("c1".into()),
                SentKind::RoundRobin("c2".into()),
                SentKind::RoundRobin("c1".into()),
            ]
        );
    }

    #[tokio::test]
    async fn fabric_round_robin_without_members_fails() {
        let fabric = InProcessFabric::new("local");
        let err = fabric
            .round_robin(&collectors(), Verb::Post, serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, FabricError::NoInstances(_)));
    }

    #[tokio::test]
    async fn fabric_multicast_reaches_every_member() {
        let fabric = InProcessFabric::new("local");
        fabric.add_member(collectors(), "c1".into());
        fabric.add_member(collectors(), "c2".into());
        fabric.add_member(collectors(), "c3".into());

        fabric
            .multicast(&collectors(), Verb::Post, serde_json::json!({"id": 1}))
            .await
            .unwrap();

        let sent = fabric.sent();
        assert_eq!(sent.len(), 3);
        assert!(sent
            .iter()
            .all(|s| matches!(s.kind, SentKind::Multicast(_))));
    }

    #[test]
    fn single_node_is_member_and_leader() {
        let targets = ServiceId::new("Targets", 91);
        let fabric = InProcessFabric::single_node("n1", &[targets.clone()]);

        assert_eq!(fabric.leader_of(&targets), Some("n1".to_string()));
        assert_eq!(fabric.members_of(&targets), vec!["n1".to_string()]);
    }

    #[test]
    fn service_id_display() {
        assert_eq!(ServiceId::new("Targets", 91).to_string(), "Targets/91");
    }
}
