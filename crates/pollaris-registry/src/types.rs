//! Template domain types.

use std::collections::HashMap;

use pollaris_fabric::Keyed;
use pollaris_state::Protocol;
use serde::{Deserialize, Serialize};

/// A polling template: probe definitions plus the inventory discriminators
/// that scope where it applies.
///
/// `name` is the identity key in the replicated cache. Any discriminator may
/// be empty; empty ones are skipped when composing the index key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pollaris {
    pub name: String,
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub software: String,
    #[serde(default)]
    pub hardware: String,
    #[serde(default)]
    pub version: String,
    /// Groups this template belongs to.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Polling jobs keyed by job name. At least one is required; every job
    /// needs a non-empty `what`.
    #[serde(default)]
    pub polling: HashMap<String, Poll>,
}

impl Keyed for Pollaris {
    fn key(&self) -> &str {
        &self.name
    }
}

/// A single polling job inside a template.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Poll {
    /// What to collect: OID list, command, resource path — protocol-shaped.
    pub what: String,
    pub protocol: Protocol,
    #[serde(default = "default_cadence")]
    pub cadence_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_cadence() -> u64 {
    300
}

fn default_timeout() -> u64 {
    30
}
