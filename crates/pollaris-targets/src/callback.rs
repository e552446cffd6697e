//! Lifecycle hooks for target operations.
//!
//! `TargetCallback` is invoked around every store write. Before hooks
//! validate and reshape the request; After hooks notify the collector
//! fleet. Hooks are inert for notification writes: a peer node already ran
//! them when the write was applied authoritatively.

use std::sync::Arc;

use tracing::info;

use pollaris_fabric::{body, ServiceFabric, Verb};
use pollaris_state::{Target, TargetRequest, TargetState, TargetStore};

use crate::address::AddressIndex;
use crate::error::{TargetError, TargetResult};
use crate::links::LinkResolver;

/// Result of a Before hook.
pub enum BeforeOutcome {
    /// Proceed with persisting these targets.
    Continue(Vec<Target>),
    /// The request was fully handled; skip the store write.
    Skip,
}

/// Validation, reshaping, and collector notification around target writes.
pub struct TargetCallback {
    addresses: AddressIndex,
    store: TargetStore,
    links: Arc<LinkResolver>,
    fabric: Arc<dyn ServiceFabric>,
}

impl TargetCallback {
    pub fn new(store: TargetStore, links: Arc<LinkResolver>, fabric: Arc<dyn ServiceFabric>) -> Self {
        Self {
            addresses: AddressIndex::new(),
            store,
            links,
            fabric,
        }
    }

    /// Before a Post is persisted.
    ///
    /// Actions trigger the bulk engine and short-circuit persistence; lists
    /// are flattened into a target sequence; every target to be persisted
    /// has its addresses claimed first.
    pub async fn before_post(
        &self,
        request: TargetRequest,
        is_notification: bool,
    ) -> TargetResult<BeforeOutcome> {
        match request {
            TargetRequest::Action(action) => {
                if is_notification {
                    return Ok(BeforeOutcome::Skip);
                }
                info!(
                    state = ?action.action_state,
                    inventory_type = %action.action_type,
                    "performing bulk target action"
                );
                self.start_stop_all(action.action_state, &action.action_type)
                    .await;
                Ok(BeforeOutcome::Skip)
            }
            TargetRequest::Batch(list) => {
                let mut targets = Vec::with_capacity(list.list.len());
                for target in list.list {
                    if !is_notification {
                        self.addresses.claim(&target)?;
                    }
                    targets.push(target);
                }
                Ok(BeforeOutcome::Continue(targets))
            }
            TargetRequest::Single(target) => {
                if !is_notification {
                    self.addresses.claim(&target)?;
                }
                Ok(BeforeOutcome::Continue(vec![target]))
            }
        }
    }

    /// Before a Patch is persisted: the target must already exist.
    pub fn before_patch(&self, target: &Target, is_notification: bool) -> TargetResult<()> {
        if is_notification {
            return Ok(());
        }
        if self.store.get_target(&target.target_id)?.is_none() {
            return Err(TargetError::UnknownTarget(target.target_id.clone()));
        }
        Ok(())
    }

    /// After a Post is persisted: a target created Up is handed to exactly
    /// one collector instance via round-robin.
    pub async fn after_post(&self, target: &Target, is_notification: bool) -> TargetResult<()> {
        if is_notification || target.state != TargetState::Up {
            return Ok(());
        }
        let collector = self
            .links
            .collector(&target.links_id)
            .ok_or_else(|| TargetError::ServiceNotFound(target.links_id.clone()))?;
        info!(target_id = %target.target_id, %collector, "sending target to collector");
        self.fabric
            .round_robin(&collector, Verb::Post, body(target)?)
            .await?;
        Ok(())
    }

    /// After a Patch is persisted: re-read the authoritative record and
    /// notify collectors — multicast for Down (every instance drops local
    /// state), round-robin for Up (one instance takes ownership).
    pub async fn after_patch(&self, patch: &Target, is_notification: bool) -> TargetResult<()> {
        if is_notification {
            return Ok(());
        }
        let current = self
            .store
            .get_target(&patch.target_id)?
            .ok_or_else(|| TargetError::UnknownTarget(patch.target_id.clone()))?;
        let collector = self
            .links
            .collector(&current.links_id)
            .ok_or_else(|| TargetError::ServiceNotFound(current.links_id.clone()))?;

        match patch.state {
            TargetState::Down => {
                info!(target_id = %current.target_id, %collector, "sending stop target to collectors");
                self.fabric
                    .multicast(&collector, Verb::Post, body(&current)?)
                    .await?;
            }
            TargetState::Up => {
                info!(target_id = %current.target_id, %collector, "sending start target to collector");
                self.fabric
                    .round_robin(&collector, Verb::Post, body(&current)?)
                    .await?;
            }
            TargetState::Unknown => {}
        }
        Ok(())
    }

    /// The process-wide address uniqueness index.
    pub fn addresses(&self) -> &AddressIndex {
        &self.addresses
    }

    pub(crate) fn store(&self) -> &TargetStore {
        &self.store
    }

    pub(crate) fn links(&self) -> &LinkResolver {
        &self.links
    }

    pub(crate) fn fabric(&self) -> &Arc<dyn ServiceFabric> {
        &self.fabric
    }
}
