//! Link resolver — maps a target's links id to its pipeline services.
//!
//! Every target names a `links_id` selecting the four downstream services
//! that handle its data: collector, parser, cache, persist. Bindings are
//! written rarely and read on every dispatch, so the map sits behind a
//! reader/writer lock. The resolver is an explicit dependency of the
//! services that need it; there is no process-global instance.

use std::collections::HashMap;
use std::sync::RwLock;

use pollaris_fabric::ServiceId;
use serde::{Deserialize, Serialize};

/// The four downstream service endpoints of a pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkBinding {
    pub collector: ServiceId,
    pub parser: ServiceId,
    pub cache: ServiceId,
    pub persist: ServiceId,
}

/// Concurrent links-id → binding map.
#[derive(Default)]
pub struct LinkResolver {
    links: RwLock<HashMap<String, LinkBinding>>,
}

impl LinkResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the binding for a links id.
    pub fn add_link(&self, links_id: impl Into<String>, binding: LinkBinding) {
        self.links.write().unwrap().insert(links_id.into(), binding);
    }

    /// Collector endpoint for a links id, absent if unbound.
    pub fn collector(&self, links_id: &str) -> Option<ServiceId> {
        self.links
            .read()
            .unwrap()
            .get(links_id)
            .map(|b| b.collector.clone())
    }

    /// Parser endpoint for a links id.
    pub fn parser(&self, links_id: &str) -> Option<ServiceId> {
        self.links
            .read()
            .unwrap()
            .get(links_id)
            .map(|b| b.parser.clone())
    }

    /// Cache endpoint for a links id.
    pub fn cache(&self, links_id: &str) -> Option<ServiceId> {
        self.links
            .read()
            .unwrap()
            .get(links_id)
            .map(|b| b.cache.clone())
    }

    /// Persist endpoint for a links id.
    pub fn persist(&self, links_id: &str) -> Option<ServiceId> {
        self.links
            .read()
            .unwrap()
            .get(links_id)
            .map(|b| b.persist.clone())
    }
}
