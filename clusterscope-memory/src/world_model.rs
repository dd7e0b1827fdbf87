//! World Model — the authoritative in-memory view of current cluster state.
//!
//! A primary map keyed by `ResourceId` plus two secondary indexes (kind and
//! namespace). One reader/writer lock guards everything, so any reader that
//! observes an update also observes all of its index mutations.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::debug;

use clusterscope_core::{Resource, ResourceId, ScopeError, ScopeResult, StateUpdate, UpdateType};

/// Statistics about the world model contents.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct WorldModelStats {
    pub bootstrapped: bool,
    pub last_sync: Option<DateTime<Utc>>,
    pub total_resources: usize,
    pub kind_counts: BTreeMap<String, usize>,
    pub namespace_counts: BTreeMap<String, usize>,
    pub total_kinds: usize,
    pub total_namespaces: usize,
}

#[derive(Default)]
struct State {
    resources: HashMap<ResourceId, Arc<Resource>>,
    kind_index: HashMap<String, HashMap<ResourceId, Arc<Resource>>>,
    namespace_index: HashMap<String, HashMap<ResourceId, Arc<Resource>>>,
    bootstrapped: bool,
    last_sync: Option<DateTime<Utc>>,
}

impl State {
    // Insert must be preceded by removal of any existing entry for the same
    // id; `add_or_update` takes care of that.
    fn add(&mut self, resource: Arc<Resource>) {
        let id = resource.id();

        self.kind_index
            .entry(resource.kind.clone())
            .or_default()
            .insert(id.clone(), Arc::clone(&resource));

        if !resource.namespace.is_empty() {
            self.namespace_index
                .entry(resource.namespace.clone())
                .or_default()
                .insert(id.clone(), Arc::clone(&resource));
        }

        self.resources.insert(id, resource);
    }

    fn add_or_update(&mut self, resource: Arc<Resource>) {
        let id = resource.id();
        if self.resources.contains_key(&id) {
            // Tear down index entries under the previously stored resource's
            // kind/namespace, which may differ from the incoming one.
            self.delete(&id);
        }
        self.add(resource);
    }

    fn delete(&mut self, id: &ResourceId) {
        let Some(resource) = self.resources.remove(id) else {
            return;
        };

        if let Some(kind_map) = self.kind_index.get_mut(&resource.kind) {
            kind_map.remove(id);
            if kind_map.is_empty() {
                self.kind_index.remove(&resource.kind);
            }
        }

        if !resource.namespace.is_empty() {
            if let Some(ns_map) = self.namespace_index.get_mut(&resource.namespace) {
                ns_map.remove(id);
                if ns_map.is_empty() {
                    self.namespace_index.remove(&resource.namespace);
                }
            }
        }
    }
}

/// Thread-safe current-state cache with indexed enumeration.
#[derive(Default)]
pub struct WorldModel {
    state: RwLock<State>,
}

impl WorldModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all state atomically with a fresh inventory.
    pub fn bootstrap(&self, resources: &[Arc<Resource>]) {
        let mut state = self.state.write();
        *state = State::default();
        for resource in resources {
            state.add(Arc::clone(resource));
        }
        state.bootstrapped = true;
        state.last_sync = Some(Utc::now());
        debug!(count = resources.len(), "World model bootstrapped");
    }

    /// Apply an incremental update. Fails if `bootstrap` never ran or the
    /// update type is unknown; deleting an absent resource is a no-op.
    pub fn apply_update(&self, update: &StateUpdate) -> ScopeResult<()> {
        let update_type = UpdateType::from_str(&update.update_type)?;
        let mut state = self.state.write();

        if !state.bootstrapped {
            return Err(ScopeError::NotBootstrapped);
        }

        match update_type {
            UpdateType::Added | UpdateType::Modified => {
                state.add_or_update(Arc::clone(&update.resource));
            }
            UpdateType::Deleted => {
                state.delete(&update.resource.id());
            }
        }

        state.last_sync = Some(Utc::now());
        Ok(())
    }

    /// Look up a single resource by its primary key.
    pub fn get_resource(&self, kind: &str, namespace: &str, name: &str) -> ScopeResult<Arc<Resource>> {
        let id = ResourceId::new(kind, namespace, name);
        self.state
            .read()
            .resources
            .get(&id)
            .cloned()
            .ok_or_else(|| ScopeError::NotFound(id.to_string()))
    }

    /// Enumerate resources. Both selectors empty returns everything; a kind
    /// or namespace alone scans the matching index; both given scans the
    /// smaller index and filters. No ordering is guaranteed.
    pub fn list_resources(&self, kind: &str, namespace: &str) -> Vec<Arc<Resource>> {
        let state = self.state.read();

        match (kind.is_empty(), namespace.is_empty()) {
            (true, true) => state.resources.values().cloned().collect(),
            (false, true) => state
                .kind_index
                .get(kind)
                .map(|m| m.values().cloned().collect())
                .unwrap_or_default(),
            (true, false) => state
                .namespace_index
                .get(namespace)
                .map(|m| m.values().cloned().collect())
                .unwrap_or_default(),
            (false, false) => {
                let by_kind = state.kind_index.get(kind);
                let by_ns = state.namespace_index.get(namespace);
                match (by_kind, by_ns) {
                    (Some(km), Some(nm)) if km.len() <= nm.len() => km
                        .values()
                        .filter(|r| r.namespace == namespace)
                        .cloned()
                        .collect(),
                    (Some(_), Some(nm)) => {
                        nm.values().filter(|r| r.kind == kind).cloned().collect()
                    }
                    _ => Vec::new(),
                }
            }
        }
    }

    /// Subset of `list_resources` where every selector entry matches the
    /// resource's labels. An empty selector matches all.
    pub fn list_resources_by_labels(
        &self,
        kind: &str,
        namespace: &str,
        selector: &BTreeMap<String, String>,
    ) -> Vec<Arc<Resource>> {
        self.list_resources(kind, namespace)
            .into_iter()
            .filter(|r| matches_labels(&r.labels, selector))
            .collect()
    }

    pub fn stats(&self) -> WorldModelStats {
        let state = self.state.read();

        let mut kind_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut namespace_counts: BTreeMap<String, usize> = BTreeMap::new();
        for resource in state.resources.values() {
            *kind_counts.entry(resource.kind.clone()).or_insert(0) += 1;
            if !resource.namespace.is_empty() {
                *namespace_counts.entry(resource.namespace.clone()).or_insert(0) += 1;
            }
        }

        WorldModelStats {
            bootstrapped: state.bootstrapped,
            last_sync: state.last_sync,
            total_resources: state.resources.len(),
            kind_counts,
            namespace_counts,
            total_kinds: state.kind_index.len(),
            total_namespaces: state.namespace_index.len(),
        }
    }

    pub fn is_bootstrapped(&self) -> bool {
        self.state.read().bootstrapped
    }

    pub fn resource_count(&self) -> usize {
        self.state.read().resources.len()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.state.read().last_sync
    }

    /// Reset to the post-construction state.
    pub fn clear(&self) {
        *self.state.write() = State::default();
    }
}

fn matches_labels(labels: &BTreeMap<String, String>, selector: &BTreeMap<String, String>) -> bool {
    selector
        .iter()
        .all(|(k, v)| labels.get(k).is_some_and(|found| found == v))
}
