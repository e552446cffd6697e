//! Boot recovery — re-assert live target ownership after a restart.
//!
//! After a crash or rolling restart, collectors may hold stale target
//! assignments and the in-memory address index is empty. The leader replays
//! persisted state: every target's addresses are reclaimed, then each live
//! target is multicast Down (every collector drops whatever it held) and
//! unicast back Up to one round-robin-selected collector. Persisted state
//! is never modified.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use pollaris_fabric::{body, RoundRobin, Verb};
use pollaris_state::{ScanFilter, Target, TargetState};

use crate::bulk::PAGE_SIZE;
use crate::callback::TargetCallback;
use crate::service_id;

/// Default wait before recovery, letting cluster membership settle so the
/// round-robin selection sees the full collector fleet.
pub const DEFAULT_STABILIZATION_DELAY: Duration = Duration::from_secs(30);

impl TargetCallback {
    /// Restore collector assignments for live targets.
    ///
    /// Sleeps for the stabilisation delay, then runs on the service leader
    /// only. Idempotent: a second run re-derives the same ownership (up to
    /// the round-robin cursor position).
    pub async fn restore_targets(&self, stabilization_delay: Duration) {
        tokio::time::sleep(stabilization_delay).await;

        let service = service_id();
        let leader = self.fabric().leader_of(&service);
        if leader.as_deref() != Some(self.fabric().local_node().as_str()) {
            info!(?leader, "not the leader of the targets service, skipping recovery");
            return;
        }

        let filter = ScanFilter::default();
        let mut up_targets: Vec<Target> = Vec::new();
        let mut page = 0;
        loop {
            let batch = match self.store().scan_page(&filter, PAGE_SIZE, page) {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, page, "recovery scan failed");
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }
            for target in batch {
                // Repopulate the uniqueness index from persisted state.
                if let Err(e) = self.addresses().claim(&target) {
                    debug!(target_id = %target.target_id, error = %e, "address reclaim skipped");
                }
                if target.state == TargetState::Up {
                    up_targets.push(target);
                }
            }
            page += 1;
        }

        if up_targets.is_empty() {
            info!("no live targets to restore");
            return;
        }

        let Some(collector) = self.links().collector(&up_targets[0].links_id) else {
            warn!(links_id = %up_targets[0].links_id, "no collector link, cannot restore targets");
            return;
        };

        // Quiesce: clear stale per-collector state left over from a prior run.
        for target in &mut up_targets {
            target.state = TargetState::Down;
            match body(&*target) {
                Ok(payload) => {
                    if let Err(e) = self
                        .fabric()
                        .multicast(&collector, Verb::Post, payload)
                        .await
                    {
                        warn!(target_id = %target.target_id, error = %e, "quiesce multicast failed");
                    }
                }
                Err(e) => warn!(target_id = %target.target_id, error = %e, "skipping target"),
            }
        }

        info!(count = up_targets.len(), %collector, "re-activating targets round robin");
        let round_robin = RoundRobin::new(self.fabric().members_of(&collector));
        for target in &mut up_targets {
            target.state = TargetState::Up;
            let Some(node) = round_robin.next() else {
                warn!(%collector, "no live collector instances for re-activation");
                break;
            };
            match body(&*target) {
                Ok(payload) => {
                    if let Err(e) = self
                        .fabric()
                        .unicast(node, &collector, Verb::Post, payload)
                        .await
                    {
                        warn!(target_id = %target.target_id, error = %e, "re-activation unicast failed");
                    }
                }
                Err(e) => warn!(target_id = %target.target_id, error = %e, "skipping target"),
            }
        }
    }
}
