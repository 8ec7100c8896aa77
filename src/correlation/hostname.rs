//! Hostname → in-flight correlation ids.
//!
//! Diagnostic bookkeeping only: nothing in the merge path reads it.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashSet};

use crate::correlation::id::CorrelationId;

#[derive(Debug, Default)]
pub struct HostnameIndex {
    by_host: DashMap<String, HashSet<CorrelationId>>,
    by_id: DashMap<CorrelationId, String>,
}

impl HostnameIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `id` is calling `hostname`. Re-indexing an id moves it.
    pub fn insert(&self, hostname: &str, id: &CorrelationId) {
        if let Some(previous) = self.by_id.insert(id.clone(), hostname.to_string()) {
            if previous != hostname {
                self.detach(&previous, id);
            }
        }
        self.by_host
            .entry(hostname.to_string())
            .or_default()
            .insert(id.clone());
    }

    /// Forget `id`; the hostname disappears with its last id.
    pub fn remove(&self, id: &CorrelationId) {
        if let Some((_, hostname)) = self.by_id.remove(id) {
            self.detach(&hostname, id);
        }
    }

    pub fn ids_for(&self, hostname: &str) -> Vec<CorrelationId> {
        self.by_host
            .get(hostname)
            .map(|ids| ids.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// In-flight count per hostname.
    pub fn snapshot(&self) -> BTreeMap<String, usize> {
        self.by_host
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().len()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.by_host.is_empty()
    }

    fn detach(&self, hostname: &str, id: &CorrelationId) {
        if let Entry::Occupied(mut entry) = self.by_host.entry(hostname.to_string()) {
            entry.get_mut().remove(id);
            if entry.get().is_empty() {
                entry.remove();
            }
        }
    }
}
