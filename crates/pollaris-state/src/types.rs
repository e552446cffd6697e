//! Domain types for polling targets.
//!
//! A `Target` names a device (or device cluster) enrolled for polling: one
//! or more hosts, each with per-protocol probe configs, a links identifier
//! selecting its processing pipeline, and a lifecycle state. All types are
//! serializable to/from JSON for storage and for the fabric wire.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for a target (externally supplied).
pub type TargetId = String;

/// Lifecycle state of a target.
///
/// `Unknown` is the unset value; bulk operations treat it as eligible for
/// either transition. Serialized as its integer discriminant, the form the
/// store and the collector wire carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(into = "u8", try_from = "u8")]
pub enum TargetState {
    #[default]
    Unknown = 0,
    Up = 1,
    Down = 2,
}

impl From<TargetState> for u8 {
    fn from(state: TargetState) -> Self {
        state as u8
    }
}

impl TryFrom<u8> for TargetState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TargetState::Unknown),
            1 => Ok(TargetState::Up),
            2 => Ok(TargetState::Down),
            other => Err(format!("invalid target state {other}")),
        }
    }
}

/// Probe protocol of a host config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Snmp,
    Ssh,
    Restconf,
    Netconf,
    Grpc,
    Kubernetes,
    Graphql,
}

/// Per-protocol probe configuration of a host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HostConfig {
    pub protocol: Protocol,
    /// Probe address, globally unique across all targets.
    pub addr: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_config_timeout")]
    pub timeout_secs: u64,
}

fn default_config_timeout() -> u64 {
    30
}

/// A pollable host: protocol-keyed probe configs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Host {
    #[serde(default)]
    pub configs: HashMap<Protocol, HostConfig>,
}

/// A device enrolled for polling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Target {
    pub target_id: TargetId,
    /// Selects the collector/parser/cache/persist pipeline.
    #[serde(default)]
    pub links_id: String,
    /// Inventory discriminator used by bulk start/stop.
    #[serde(default)]
    pub inventory_type: String,
    #[serde(default)]
    pub state: TargetState,
    #[serde(default)]
    pub hosts: Vec<Host>,
}

/// A batch of targets, as posted by bulk enrollment.
///
/// `list` is deliberately not defaulted: a batch body must carry the key,
/// otherwise the untagged [`TargetRequest`] decode would swallow single
/// targets as empty batches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TargetList {
    pub list: Vec<Target>,
}

/// A bulk start/stop request: drive every target of `action_type` to
/// `action_state`. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetAction {
    pub action_state: TargetState,
    pub action_type: String,
}

/// Payload of a targets write request.
///
/// The wire carries one of three shapes; decoding branches on which fields
/// are present, so `Action` (distinct field names) must be tried before the
/// wrappers that would also admit it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TargetRequest {
    Action(TargetAction),
    Batch(TargetList),
    Single(Target),
}

/// Filter for paged scans over the target table.
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    pub inventory_type: Option<String>,
    pub states: Option<Vec<TargetState>>,
}

impl ScanFilter {
    pub fn matches(&self, target: &Target) -> bool {
        if let Some(inventory_type) = &self.inventory_type {
            if &target.inventory_type != inventory_type {
                return false;
            }
        }
        if let Some(states) = &self.states {
            if !states.contains(&target.state) {
                return false;
            }
        }
        true
    }
}

/// Read/delete selector for the targets service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    #[serde(default)]
    pub target_id: Option<TargetId>,
    #[serde(default)]
    pub inventory_type: Option<String>,
    #[serde(default = "default_query_limit")]
    pub limit: u32,
    #[serde(default)]
    pub page: u32,
}

fn default_query_limit() -> u32 {
    500
}

impl Default for Query {
    fn default() -> Self {
        Self {
            target_id: None,
            inventory_type: None,
            limit: default_query_limit(),
            page: 0,
        }
    }
}
