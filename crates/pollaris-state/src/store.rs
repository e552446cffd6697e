//! TargetStore — redb-backed persistence for polling targets.
//!
//! Values are JSON-serialized into redb's `&[u8]` value column. The store
//! supports both on-disk and in-memory backends (the latter for testing),
//! paged scans with `offset = limit * page` semantics, and batched patch
//! writes used by the bulk start/stop engine.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::tables::TARGETS;
use crate::types::{ScanFilter, Target, TargetState};

/// Convert any `Display` error into a `StoreError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StoreError::$variant(e.to_string())
    };
}

/// Thread-safe target store backed by redb.
#[derive(Clone)]
pub struct TargetStore {
    db: Arc<Database>,
}

impl TargetStore {
    /// Open (or create) a persistent target store at the given path.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "target store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory target store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory target store opened");
        Ok(store)
    }

    /// Create the targets table if it doesn't exist yet.
    fn ensure_tables(&self) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(TARGETS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    /// Insert or fully replace a target.
    pub fn put_target(&self, target: &Target) -> StoreResult<()> {
        let value = serde_json::to_vec(target).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(TARGETS).map_err(map_err!(Table))?;
            table
                .insert(target.target_id.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(target_id = %target.target_id, "target stored");
        Ok(())
    }

    /// Get a target by ID.
    pub fn get_target(&self, target_id: &str) -> StoreResult<Option<Target>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TARGETS).map_err(map_err!(Table))?;
        match table.get(target_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let target: Target =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(target))
            }
            None => Ok(None),
        }
    }

    /// Apply a partial update and return the merged, authoritative record.
    ///
    /// Only set fields overwrite: a non-`Unknown` state, non-empty
    /// `links_id` / `inventory_type`, and a non-empty `hosts` set.
    pub fn patch_target(&self, patch: &Target) -> StoreResult<Target> {
        let mut current = self
            .get_target(&patch.target_id)?
            .ok_or_else(|| StoreError::NotFound(patch.target_id.clone()))?;
        merge_patch(&mut current, patch);
        self.put_target(&current)?;
        Ok(current)
    }

    /// Write a batch of authoritative records in a single transaction.
    ///
    /// Used by the bulk engine, which re-reads full records before flipping
    /// their state; absent keys are inserted.
    pub fn patch_batch(&self, targets: &[Target]) -> StoreResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(TARGETS).map_err(map_err!(Table))?;
            for target in targets {
                let value = serde_json::to_vec(target).map_err(map_err!(Serialize))?;
                table
                    .insert(target.target_id.as_str(), value.as_slice())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(count = targets.len(), "target batch patched");
        Ok(())
    }

    /// Delete a target by ID. Returns true if it existed.
    pub fn delete_target(&self, target_id: &str) -> StoreResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(TARGETS).map_err(map_err!(Table))?;
            existed = table.remove(target_id).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%target_id, existed, "target deleted");
        Ok(existed)
    }

    /// Paged scan in key order: skip `limit * page` matching rows, return up
    /// to `limit` more. An empty result means the scan is exhausted.
    pub fn scan_page(
        &self,
        filter: &ScanFilter,
        limit: usize,
        page: usize,
    ) -> StoreResult<Vec<Target>> {
        let skip = limit * page;
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TARGETS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        let mut skipped = 0usize;
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let target: Target =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if !filter.matches(&target) {
                continue;
            }
            if skipped < skip {
                skipped += 1;
                continue;
            }
            results.push(target);
            if results.len() >= limit {
                break;
            }
        }
        Ok(results)
    }

    /// Total number of stored targets.
    pub fn count(&self) -> StoreResult<usize> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(TARGETS).map_err(map_err!(Table))?;
        let mut count = 0usize;
        for entry in table.iter().map_err(map_err!(Read))? {
            entry.map_err(map_err!(Read))?;
            count += 1;
        }
        Ok(count)
    }
}

/// Merge set fields of `patch` onto `current`.
fn merge_patch(current: &mut Target, patch: &Target) {
    if patch.state != TargetState::Unknown {
        current.state = patch.state;
    }
    if !patch.links_id.is_empty() {
        current.links_id = patch.links_id.clone();
    }
    if !patch.inventory_type.is_empty() {
        current.inventory_type = patch.inventory_type.clone();
    }
    if !patch.hosts.is_empty() {
        current.hosts = patch.hosts.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Host, HostConfig, Protocol};
    use std::collections::HashMap;

    fn test_target(id: &str, inventory_type: &str, state: TargetState) -> Target {
        let mut configs = HashMap::new();
        configs.insert(
            Protocol::Snmp,
            HostConfig {
                protocol: Protocol::Snmp,
                addr: format!("10.0.0.{}", id.len()),
                port: 161,
                username: "poller".to_string(),
                password: "secret".to_string(),
                timeout_secs: 30,
            },
        );
        Target {
            target_id: id.to_string(),
            links_id: "L1".to_string(),
            inventory_type: inventory_type.to_string(),
            state,
            hosts: vec![Host { configs }],
        }
    }

    #[test]
    fn put_and_get() {
        let store = TargetStore::open_in_memory().unwrap();
        let target = test_target("t1", "router", TargetState::Up);

        store.put_target(&target).unwrap();
        let retrieved = store.get_target("t1").unwrap();

        assert_eq!(retrieved, Some(target));
    }

    #[test]
    fn get_nonexistent_returns_none() {
        let store = TargetStore::open_in_memory().unwrap();
        assert!(store.get_target("nope").unwrap().is_none());
    }

    #[test]
    fn patch_merges_state_only() {
        let store = TargetStore::open_in_memory().unwrap();
        let target = test_target("t1", "router", TargetState::Up);
        store.put_target(&target).unwrap();

        let patch = Target {
            target_id: "t1".to_string(),
            links_id: String::new(),
            inventory_type: String::new(),
            state: TargetState::Down,
            hosts: Vec::new(),
        };
        let merged = store.patch_target(&patch).unwrap();

        assert_eq!(merged.state, TargetState::Down);
        assert_eq!(merged.links_id, "L1");
        assert_eq!(merged.hosts, target.hosts);
    }

    #[test]
    fn patch_unknown_target_fails() {
        let store = TargetStore::open_in_memory().unwrap();
        let patch = test_target("ghost", "router", TargetState::Down);
        let err = store.patch_target(&patch).unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn patch_batch_writes_all() {
        let store = TargetStore::open_in_memory().unwrap();
        for i in 0..5 {
            store
                .put_target(&test_target(&format!("t{i}"), "router", TargetState::Up))
                .unwrap();
        }

        let batch: Vec<Target> = (0..5)
            .map(|i| test_target(&format!("t{i}"), "router", TargetState::Down))
            .collect();
        store.patch_batch(&batch).unwrap();

        for i in 0..5 {
            let t = store.get_target(&format!("t{i}")).unwrap().unwrap();
            assert_eq!(t.state, TargetState::Down);
        }
    }

    #[test]
    fn delete_target() {
        let store = TargetStore::open_in_memory().unwrap();
        store
            .put_target(&test_target("t1", "router", TargetState::Up))
            .unwrap();

        assert!(store.delete_target("t1").unwrap());
        assert!(!store.delete_target("t1").unwrap());
        assert!(store.get_target("t1").unwrap().is_none());
    }

    #[test]
    fn scan_pages_in_key_order() {
        let store = TargetStore::open_in_memory().unwrap();
        for i in 0..7 {
            store
                .put_target(&test_target(&format!("t{i}"), "router", TargetState::Up))
                .unwrap();
        }

        let filter = ScanFilter::default();
        let page0 = store.scan_page(&filter, 3, 0).unwrap();
        let page1 = store.scan_page(&filter, 3, 1).unwrap();
        let page2 = store.scan_page(&filter, 3, 2).unwrap();
        let page3 = store.scan_page(&filter, 3, 3).unwrap();

        assert_eq!(page0.len(), 3);
        assert_eq!(page1.len(), 3);
        assert_eq!(page2.len(), 1);
        assert!(page3.is_empty());

        let ids: Vec<String> = page0.iter().map(|t| t.target_id.clone()).collect();
        assert_eq!(ids, vec!["t0", "t1", "t2"]);
    }

    #[test]
    fn scan_filters_by_type_and_state() {
        let store = TargetStore::open_in_memory().unwrap();
        store
            .put_target(&test_target("r1", "router", TargetState::Down))
            .unwrap();
        store
            .put_target(&test_target("r2", "router", TargetState::Up))
            .unwrap();
        store
            .put_target(&test_target("s1", "switch", TargetState::Down))
            .unwrap();

        let filter = ScanFilter {
            inventory_type: Some("router".to_string()),
            states: Some(vec![TargetState::Unknown, TargetState::Down]),
        };
        let matched = store.scan_page(&filter, 500, 0).unwrap();

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].target_id, "r1");
    }

    #[test]
    fn count_tracks_inserts() {
        let store = TargetStore::open_in_memory().unwrap();
        assert_eq!(store.count().unwrap(), 0);
        store
            .put_target(&test_target("t1", "router", TargetState::Up))
            .unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("targets.redb");

        {
            let store = TargetStore::open(&db_path).unwrap();
            store
                .put_target(&test_target("t1", "router", TargetState::Up))
                .unwrap();
        }

        // Reopen the same database file.
        let store = TargetStore::open(&db_path).unwrap();
        let target = store.get_target("t1").unwrap();
        assert!(target.is_some());
        assert_eq!(target.unwrap().state, TargetState::Up);
    }
}
