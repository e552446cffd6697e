//! Replicated key/value cache abstraction.
//!
//! The fabric replicates writes across nodes and delivers them back to every
//! replica as *notifications*. A write with `is_notification == true`
//! originated from a peer that already applied it authoritatively: the local
//! map updates but must not re-emit. Implementations only guarantee eventual
//! per-key convergence.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use crate::dispatch::Verb;
use crate::error::FabricResult;

/// A value addressable by its primary key inside a [`ReplicatedMap`].
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Per-key convergent replicated map.
pub trait ReplicatedMap<T: Keyed>: Send + Sync {
    /// Create-or-replace under the value's key. `is_notification` suppresses
    /// re-emission to peers.
    fn post(&self, value: T, is_notification: bool) -> FabricResult<()>;

    /// Update under the value's key, same emission discipline as `post`.
    fn put(&self, value: T, is_notification: bool) -> FabricResult<()>;

    /// Local read; never suspends.
    fn get(&self, key: &str) -> Option<T>;
}

/// In-memory replicated map for tests and single-node deployments.
///
/// Non-notification writes are appended to an emission journal standing in
/// for replication to peers, so callers can assert the notification
/// discipline.
pub struct InMemoryReplicatedMap<T> {
    entries: RwLock<HashMap<String, T>>,
    emitted: Mutex<Vec<(Verb, String)>>,
}

impl<T> InMemoryReplicatedMap<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            emitted: Mutex::new(Vec::new()),
        }
    }

    /// Writes that would have been replicated to peers, as `(verb, key)`.
    pub fn emitted(&self) -> Vec<(Verb, String)> {
        self.emitted.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().unwrap().is_empty()
    }
}

impl<T> Default for InMemoryReplicatedMap<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> InMemoryReplicatedMap<T>
where
    T: Keyed,
{
    fn write(&self, value: T, verb: Verb, is_notification: bool) {
        let key = value.key().to_string();
        self.entries.write().unwrap().insert(key.clone(), value);
        if !is_notification {
            self.emitted.lock().unwrap().push((verb, key));
        }
    }
}

impl<T> ReplicatedMap<T> for InMemoryReplicatedMap<T>
where
    T: Keyed + Clone + Send + Sync,
{
    fn post(&self, value: T, is_notification: bool) -> FabricResult<()> {
        self.write(value, Verb::Post, is_notification);
        Ok(())
    }

    fn put(&self, value: T, is_notification: bool) -> FabricResult<()> {
        self.write(value, Verb::Put, is_notification);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<T> {
        self.entries.read().unwrap().get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        id: String,
        value: u32,
    }

    impl Keyed for Entry {
        fn key(&self) -> &str {
            &self.id
        }
    }

    fn entry(id: &str, value: u32) -> Entry {
        Entry {
            id: id.to_string(),
            value,
        }
    }

    #[test]
    fn post_then_get() {
        let map = InMemoryReplicatedMap::new();
        map.post(entry("a", 1), false).unwrap();

        assert_eq!(map.get("a"), Some(entry("a", 1)));
        assert_eq!(map.get("b"), None);
    }

    #[test]
    fn put_replaces_under_same_key() {
        let map = InMemoryReplicatedMap::new();
        map.post(entry("a", 1), false).unwrap();
        map.put(entry("a", 2), false).unwrap();

        assert_eq!(map.get("a"), Some(entry("a", 2)));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn local_writes_are_emitted() {
        let map = InMemoryReplicatedMap::new();
        map.post(entry("a", 1), false).unwrap();
        map.put(entry("a", 2), false).unwrap();

        assert_eq!(
            map.emitted(),
            vec![(Verb::Post, "a".to_string()), (Verb::Put, "a".to_string())]
        );
    }

    #[test]
    fn notification_writes_update_without_emission() {
        let map = InMemoryReplicatedMap::new();
        map.post(entry("a", 1), true).unwrap();

        assert_eq!(map.get("a"), Some(entry("a", 1)));
        assert!(map.emitted().is_empty());
    }
}
