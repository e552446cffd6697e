//! TargetService — CRUD over targets with lifecycle hooks.
//!
//! Every write runs the Before hook, persists through the store, then runs
//! the After hook. Reads are plain paged scans. Boot recovery is spawned as
//! a background task at activation.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use pollaris_fabric::ServiceFabric;
use pollaris_state::{Query, ScanFilter, Target, TargetList, TargetRequest, TargetStore};

use crate::callback::{BeforeOutcome, TargetCallback};
use crate::error::{TargetError, TargetResult};
use crate::links::LinkResolver;

/// The Targets service: durable registry of polling targets plus collector
/// dispatch.
pub struct TargetService {
    store: TargetStore,
    callback: Arc<TargetCallback>,
}

impl TargetService {
    pub fn new(
        store: TargetStore,
        links: Arc<LinkResolver>,
        fabric: Arc<dyn ServiceFabric>,
    ) -> Self {
        let callback = Arc::new(TargetCallback::new(store.clone(), links, fabric));
        Self { store, callback }
    }

    /// Spawn the boot-recovery task (runs once, leader-gated).
    pub fn spawn_recovery(&self, stabilization_delay: Duration) -> JoinHandle<()> {
        let callback = self.callback.clone();
        info!(delay_secs = stabilization_delay.as_secs(), "scheduling target recovery");
        tokio::spawn(async move {
            callback.restore_targets(stabilization_delay).await;
        })
    }

    /// Create targets (single, batch, or bulk action).
    pub async fn post(&self, request: TargetRequest, is_notification: bool) -> TargetResult<()> {
        match self.callback.before_post(request, is_notification).await? {
            BeforeOutcome::Skip => Ok(()),
            BeforeOutcome::Continue(targets) => {
                for target in &targets {
                    self.store.put_target(target)?;
                }
                for target in &targets {
                    self.callback.after_post(target, is_notification).await?;
                }
                Ok(())
            }
        }
    }

    /// Fully replace a target. No collector notification: ownership changes
    /// ride on Post and Patch.
    pub fn put(&self, target: &Target, _is_notification: bool) -> TargetResult<()> {
        self.store.put_target(target)?;
        Ok(())
    }

    /// Partially update a target; state transitions are dispatched to the
    /// collector fleet after the write.
    pub async fn patch(&self, target: &Target, is_notification: bool) -> TargetResult<()> {
        self.callback.before_patch(target, is_notification)?;
        self.store.patch_target(target)?;
        self.callback.after_patch(target, is_notification).await?;
        Ok(())
    }

    /// Delete by query (target id selector). Released addresses become
    /// claimable again. Returns the number of targets removed.
    pub fn delete(&self, query: &Query) -> TargetResult<u32> {
        let Some(target_id) = &query.target_id else {
            return Ok(0);
        };
        match self.store.get_target(target_id)? {
            Some(target) => {
                self.store.delete_target(target_id)?;
                self.callback.addresses().release(&target);
                info!(%target_id, "target deleted");
                Ok(1)
            }
            None => Ok(0),
        }
    }

    /// Read targets by query: a target id selector or a paged scan.
    pub fn get(&self, query: &Query) -> TargetResult<TargetList> {
        if let Some(target_id) = &query.target_id {
            let list = self.store.get_target(target_id)?.into_iter().collect();
            return Ok(TargetList { list });
        }
        let filter = ScanFilter {
            inventory_type: query.inventory_type.clone(),
            states: None,
        };
        let list = self
            .store
            .scan_page(&filter, query.limit as usize, query.page as usize)?;
        Ok(TargetList { list })
    }

    /// Fetch a single target, failing if absent.
    pub fn get_by_id(&self, target_id: &str) -> TargetResult<Target> {
        self.store
            .get_target(target_id)?
            .ok_or_else(|| TargetError::UnknownTarget(target_id.to_string()))
    }

    /// The lifecycle callback (bulk engine, boot recovery, address index).
    pub fn callback(&self) -> &Arc<TargetCallback> {
        &self.callback
    }

    pub fn store(&self) -> &TargetStore {
        &self.store
    }
}
