//! Bulk start/stop engine.
//!
//! Drives every target of an inventory type to a desired state: a leader-
//! gated paged scan selects the targets still on the other side, state is
//! flipped in memory, persisted in batches, and the transitions fanned out
//! to the collector fleet with a small pacing delay between sends.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use pollaris_fabric::{body, RoundRobin, Verb};
use pollaris_state::{ScanFilter, Target, TargetState};

use crate::callback::TargetCallback;
use crate::service_id;

/// Page size for scans and persistence batches.
pub(crate) const PAGE_SIZE: usize = 500;

/// Delay between collector sends so a large transition does not overwhelm
/// the fleet.
const DISPATCH_PACING: Duration = Duration::from_micros(10);

/// The state a bulk transition selects *from*. `Unknown` targets are always
/// eligible.
fn opposite(state: TargetState) -> Option<TargetState> {
    match state {
        TargetState::Up => Some(TargetState::Down),
        TargetState::Down => Some(TargetState::Up),
        TargetState::Unknown => None,
    }
}

impl TargetCallback {
    /// Transition every target of `inventory_type` to `desired`.
    ///
    /// Runs only on the current leader of the Targets service; non-leaders
    /// return immediately. Store failures are logged and the operation
    /// continues — collectors tolerate replayed transitions.
    pub async fn start_stop_all(&self, desired: TargetState, inventory_type: &str) {
        let service = service_id();
        let leader = self.fabric().leader_of(&service);
        if leader.as_deref() != Some(self.fabric().local_node().as_str()) {
            debug!(?leader, "not the leader of the targets service, skipping bulk action");
            return;
        }

        let Some(from) = opposite(desired) else {
            error!(state = ?desired, "unsupported bulk target state");
            return;
        };

        let filter = ScanFilter {
            inventory_type: Some(inventory_type.to_string()),
            states: Some(vec![TargetState::Unknown, from]),
        };

        let mut targets: Vec<Target> = Vec::new();
        let mut collector = None;
        let mut page = 0;
        loop {
            let batch = match self.store().scan_page(&filter, PAGE_SIZE, page) {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, page, "bulk scan failed");
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }
            for mut target in batch {
                target.state = desired;
                // Pipelines are homogeneous per inventory type at this layer.
                if collector.is_none() {
                    collector = self.links().collector(&target.links_id);
                }
                targets.push(target);
            }
            page += 1;
        }

        info!(
            count = targets.len(),
            state = ?desired,
            %inventory_type,
            "bulk transition selected targets"
        );

        for chunk in targets.chunks(PAGE_SIZE) {
            if let Err(e) = self.store().patch_batch(chunk) {
                error!(error = %e, count = chunk.len(), "bulk patch failed");
            }
        }

        let Some(collector) = collector else {
            if !targets.is_empty() {
                warn!(%inventory_type, "no collector link for bulk dispatch");
            }
            return;
        };

        let round_robin = RoundRobin::new(self.fabric().members_of(&collector));
        for target in &targets {
            tokio::time::sleep(DISPATCH_PACING).await;
            let payload = match body(target) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(target_id = %target.target_id, error = %e, "skipping undispatchable target");
                    continue;
                }
            };
            let outcome = match target.state {
                TargetState::Up => match round_robin.next() {
                    Some(node) => {
                        self.fabric()
                            .unicast(node, &collector, Verb::Post, payload)
                            .await
                    }
                    None => {
                        warn!(%collector, "no live collector instances for activation");
                        continue;
                    }
                },
                TargetState::Down => self.fabric().multicast(&collector, Verb::Post, payload).await,
                TargetState::Unknown => continue,
            };
            if let Err(e) = outcome {
                warn!(target_id = %target.target_id, error = %e, "collector dispatch failed");
            }
        }
    }
}
