//! PollarisRegistry — replicated catalogue of polling templates.
//!
//! Template records live in a [`ReplicatedMap`] keyed by name; the registry
//! keeps two local indexes on the side:
//!
//! - `key_to_name` — composite key → template name
//! - `groups` — group name → (composite key → template name)
//!
//! A single reader/writer lock protects both indexes. Validation and
//! replicated-cache writes happen outside the lock; index mutation takes
//! the exclusive mode once, so an upsert's unlink-and-install is never
//! observable half-done.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use pollaris_fabric::ReplicatedMap;

use crate::error::{RegistryError, RegistryResult};
use crate::keys::{composite_key, key_of};
use crate::types::{Poll, Pollaris};

#[derive(Default)]
struct Indexes {
    key_to_name: HashMap<String, String>,
    groups: HashMap<String, HashMap<String, String>>,
}

impl Indexes {
    /// Unlink a superseded record's bindings, then install the new ones.
    fn install(&mut self, previous: Option<&Pollaris>, key: &str, pollaris: &Pollaris) {
        if let Some(prev) = previous {
            for group in &prev.groups {
                if let Some(entry) = self.groups.get_mut(group) {
                    entry.remove(key);
                }
            }
            self.key_to_name.remove(key);
        }

        self.key_to_name
            .insert(key.to_string(), pollaris.name.clone());
        for group in &pollaris.groups {
            self.groups
                .entry(group.clone())
                .or_default()
                .insert(key.to_string(), pollaris.name.clone());
        }
    }
}

/// The central hub for polling templates.
pub struct PollarisRegistry {
    cache: Arc<dyn ReplicatedMap<Pollaris>>,
    indexes: RwLock<Indexes>,
}

impl PollarisRegistry {
    pub fn new(cache: Arc<dyn ReplicatedMap<Pollaris>>) -> Self {
        Self {
            cache,
            indexes: RwLock::new(Indexes::default()),
        }
    }

    /// Build a registry pre-populated with an initial template set.
    ///
    /// Seed records bypass the replication write path: indexes are built
    /// directly and the cache is loaded without emission.
    pub fn with_seed(
        cache: Arc<dyn ReplicatedMap<Pollaris>>,
        initial: Vec<Pollaris>,
    ) -> RegistryResult<Self> {
        let registry = Self::new(cache);
        info!(count = initial.len(), "seeding template registry");
        for pollaris in initial {
            let key = key_of(&pollaris);
            registry.cache.post(pollaris.clone(), true)?;
            let mut indexes = registry.indexes.write().unwrap();
            indexes.install(None, &key, &pollaris);
        }
        Ok(registry)
    }

    fn validate(pollaris: &Pollaris) -> RegistryResult<()> {
        if pollaris.name.is_empty() {
            return Err(RegistryError::InvalidName);
        }
        if pollaris.polling.is_empty() {
            return Err(RegistryError::NoPolls(pollaris.name.clone()));
        }
        for (job, poll) in &pollaris.polling {
            if poll.what.is_empty() {
                return Err(RegistryError::InvalidPoll {
                    template: pollaris.name.clone(),
                    job: job.clone(),
                });
            }
        }
        Ok(())
    }

    /// Create-or-replace a template. When `is_notification` is set, the
    /// write originated from a peer and is not re-emitted.
    pub fn post(&self, pollaris: Pollaris, is_notification: bool) -> RegistryResult<()> {
        self.upsert(pollaris, is_notification, false)
    }

    /// Update a template; same validation as `post`, replicated with the
    /// update verb.
    pub fn put(&self, pollaris: Pollaris, is_notification: bool) -> RegistryResult<()> {
        self.upsert(pollaris, is_notification, true)
    }

    fn upsert(&self, pollaris: Pollaris, is_notification: bool, is_update: bool) -> RegistryResult<()> {
        Self::validate(&pollaris)?;

        let key = key_of(&pollaris);
        // The record being superseded, read before the cache overwrites it.
        let previous = {
            let indexes = self.indexes.read().unwrap();
            indexes
                .key_to_name
                .get(&key)
                .and_then(|name| self.cache.get(name))
        };

        if is_update {
            self.cache.put(pollaris.clone(), is_notification)?;
        } else {
            self.cache.post(pollaris.clone(), is_notification)?;
        }

        let mut indexes = self.indexes.write().unwrap();
        indexes.install(previous.as_ref(), &key, &pollaris);
        Ok(())
    }

    /// Add a batch of templates; individual failures are logged and skipped.
    pub fn add_all(&self, templates: Vec<Pollaris>) {
        for pollaris in templates {
            let name = pollaris.name.clone();
            if let Err(e) = self.post(pollaris, false) {
                warn!(template = %name, error = %e, "skipping invalid template");
            }
        }
    }

    /// Retrieve a template by its name.
    pub fn by_name(&self, name: &str) -> Option<Pollaris> {
        self.cache.get(name)
    }

    /// Hierarchical key lookup.
    ///
    /// `args` is a prefix of (name, vendor, series, family, software,
    /// hardware, version). If the composed key has no mapping, the last
    /// argument is dropped and the lookup retried; a single argument is
    /// treated as a precomputed composite key.
    pub fn by_key(&self, args: &[&str]) -> Option<Pollaris> {
        if args.is_empty() {
            return None;
        }
        if args.len() == 1 {
            let name = {
                let indexes = self.indexes.read().unwrap();
                indexes.key_to_name.get(args[0]).cloned()
            }?;
            return self.cache.get(&name);
        }
        let key = composite_key(args[0], &args[1..]);
        let name = {
            let indexes = self.indexes.read().unwrap();
            indexes.key_to_name.get(&key).cloned()
        };
        match name {
            Some(name) => self.cache.get(&name),
            None => self.by_key(&args[..args.len() - 1]),
        }
    }

    /// Retrieve a single polling job from a named template.
    pub fn poll(&self, template_name: &str, job_name: &str) -> Option<Poll> {
        self.by_name(template_name)?.polling.get(job_name).cloned()
    }

    /// Names of the templates belonging to a group.
    pub fn names_in_group(&self, group: &str) -> Vec<String> {
        let indexes = self.indexes.read().unwrap();
        indexes
            .groups
            .get(group)
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot copy of a group's key → name mapping, so callers can iterate
    /// without holding the index lock. `None` if the group does not exist.
    pub fn group_snapshot(&self, group: &str) -> Option<HashMap<String, String>> {
        let indexes = self.indexes.read().unwrap();
        indexes.groups.get(group).cloned()
    }

    /// The templates of a group, each resolved through the hierarchical
    /// lookup so discriminator-specific variants win. Deduplicated by name;
    /// names with no key match are omitted.
    #[allow(clippy::too_many_arguments)]
    pub fn templates_in_group(
        &self,
        group: &str,
        vendor: &str,
        series: &str,
        family: &str,
        software: &str,
        hardware: &str,
        version: &str,
    ) -> Vec<Pollaris> {
        let names = self.names_in_group(group);
        let mut seen = HashSet::new();
        let mut result = Vec::new();
        for name in names {
            let found = self.by_key(&[&name, vendor, series, family, software, hardware, version]);
            if let Some(pollaris) = found {
                if seen.insert(pollaris.name.clone()) {
                    result.push(pollaris);
                }
            }
        }
        result
    }
}
