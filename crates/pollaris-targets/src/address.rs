//! Address uniqueness index.
//!
//! A process-wide set of every probe address claimed by an enrolled target.
//! The claim is all-or-nothing: every config of every host is checked under
//! one lock before any address is inserted, so a rejected target leaves the
//! index untouched.

use std::collections::HashSet;
use std::sync::Mutex;

use pollaris_state::Target;

use crate::error::{TargetError, TargetResult};

/// Process-wide set of claimed probe addresses.
#[derive(Default)]
pub struct AddressIndex {
    claimed: Mutex<HashSet<String>>,
}

impl AddressIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every address of a target.
    ///
    /// Fails with `NoHosts` / `NoConfigs` on a malformed target and
    /// `AddrInUse` if any address is already claimed; on failure nothing is
    /// inserted.
    pub fn claim(&self, target: &Target) -> TargetResult<()> {
        if target.hosts.is_empty() {
            return Err(TargetError::NoHosts(target.target_id.clone()));
        }

        let mut claimed = self.claimed.lock().unwrap();
        for host in &target.hosts {
            if host.configs.is_empty() {
                return Err(TargetError::NoConfigs(target.target_id.clone()));
            }
            for config in host.configs.values() {
                if claimed.contains(&config.addr) {
                    return Err(TargetError::AddrInUse(config.addr.clone()));
                }
            }
        }
        for host in &target.hosts {
            for config in host.configs.values() {
                claimed.insert(config.addr.clone());
            }
        }
        Ok(())
    }

    /// Release every address of a target (target deletion).
    pub fn release(&self, target: &Target) {
        let mut claimed = self.claimed.lock().unwrap();
        for host in &target.hosts {
            for config in host.configs.values() {
                claimed.remove(&config.addr);
            }
        }
    }

    /// Whether an address is currently claimed.
    pub fn contains(&self, addr: &str) -> bool {
        self.claimed.lock().unwrap().contains(addr)
    }

    pub fn len(&self) -> usize {
        self.claimed.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.claimed.lock().unwrap().is_empty()
    }
}
