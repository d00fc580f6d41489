// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of active execution entries, keyed by entity
//!
//! The registry is the only structure shared between schedulers, workers,
//! the cleaner and status readers. Every mutation is a single atomic
//! operation on the key's shard: insert-if-empty, remove-by-id and
//! retain-non-empty. Callers never read, decide and write in separate steps.
//!
//! A key whose set becomes empty is left in place and dropped by the next
//! [`ExecutionRegistry::sweep`].

use crate::entry::ExecutionEntry;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rulerun_core::{Clock, EntityKey};
use std::collections::HashMap;
use std::sync::Arc;

/// Concurrent map from entity key to the entries running for it
pub struct ExecutionRegistry<C: Clock> {
    entries: DashMap<EntityKey, Vec<Arc<ExecutionEntry<C>>>>,
}

impl<C: Clock> ExecutionRegistry<C> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Register `entry` for `key` unless an entry is already active for it.
    ///
    /// This is the sole enforcement point for at most one running batch per
    /// entity. Returns false, leaving the registry untouched, when the key
    /// already has an active entry.
    pub fn register_if_absent(&self, key: &EntityKey, entry: Arc<ExecutionEntry<C>>) -> bool {
        match self.entries.entry(key.clone()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_empty() {
                    occupied.get_mut().push(entry);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(vacant) => {
                vacant.insert(vec![entry]);
                true
            }
        }
    }

    /// Remove the entry with `entry_id` from `key`'s set if present
    pub fn remove(&self, key: &EntityKey, entry_id: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(mut set) => {
                let before = set.len();
                set.retain(|e| e.id() != entry_id);
                set.len() != before
            }
            None => false,
        }
    }

    /// Entries active for `key`
    pub fn get(&self, key: &EntityKey) -> Vec<Arc<ExecutionEntry<C>>> {
        self.entries
            .get(key)
            .map(|set| set.value().clone())
            .unwrap_or_default()
    }

    /// Copy of every non-empty set
    pub fn snapshot(&self) -> HashMap<EntityKey, Vec<Arc<ExecutionEntry<C>>>> {
        self.entries
            .iter()
            .filter(|set| !set.value().is_empty())
            .map(|set| (set.key().clone(), set.value().clone()))
            .collect()
    }

    /// Drop every key whose set is empty. Returns how many keys were dropped.
    pub fn sweep(&self) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, set| {
            if set.is_empty() {
                removed += 1;
                false
            } else {
                true
            }
        });
        removed
    }

    /// Number of keys, including empty ones awaiting a sweep
    pub fn key_count(&self) -> usize {
        self.entries.len()
    }

    /// Number of registered entries across all keys
    pub fn active_count(&self) -> usize {
        self.entries.iter().map(|set| set.value().len()).sum()
    }
}

impl<C: Clock> Default for ExecutionRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
