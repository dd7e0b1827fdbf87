//! Temporal Store — bounded history of cluster snapshots and change events.
//!
//! A fixed-capacity ring of full snapshots answers point-in-time queries
//! with an at-or-before sweep; a bounded change log answers range and diff
//! queries between snapshots. A background task can feed the ring from an
//! installed snapshot source.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use clusterscope_core::config::TemporalConfig;
use clusterscope_core::{Resource, ResourceId, ScopeError, ScopeResult, UpdateType};

/// Callback producing the full current inventory for a background snapshot.
pub type SnapshotSource = Arc<dyn Fn() -> Vec<Arc<Resource>> + Send + Sync>;

/// A point-in-time input. Accepts a wall-clock instant, RFC-3339 text, or
/// integer/fractional seconds since the epoch.
#[derive(Debug, Clone)]
pub enum TimePoint {
    At(DateTime<Utc>),
    Text(String),
    EpochSecs(i64),
    EpochSecsF(f64),
}

impl TimePoint {
    pub fn resolve(&self) -> ScopeResult<DateTime<Utc>> {
        match self {
            TimePoint::At(t) => Ok(*t),
            TimePoint::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|_| ScopeError::BadTime(s.clone())),
            TimePoint::EpochSecs(secs) => Utc
                .timestamp_opt(*secs, 0)
                .single()
                .ok_or_else(|| ScopeError::BadTime(secs.to_string())),
            TimePoint::EpochSecsF(secs) => {
                let whole = secs.trunc() as i64;
                let nanos = (secs.fract() * 1e9) as u32;
                Utc.timestamp_opt(whole, nanos)
                    .single()
                    .ok_or_else(|| ScopeError::BadTime(secs.to_string()))
            }
        }
    }
}

impl From<DateTime<Utc>> for TimePoint {
    fn from(t: DateTime<Utc>) -> Self {
        TimePoint::At(t)
    }
}

impl From<&str> for TimePoint {
    fn from(s: &str) -> Self {
        TimePoint::Text(s.to_string())
    }
}

impl From<i64> for TimePoint {
    fn from(secs: i64) -> Self {
        TimePoint::EpochSecs(secs)
    }
}

impl From<f64> for TimePoint {
    fn from(secs: f64) -> Self {
        TimePoint::EpochSecsF(secs)
    }
}

/// A full point-in-time state of the synced cluster subset. Immutable once
/// inserted.
#[derive(Debug)]
pub struct Snapshot {
    pub timestamp: DateTime<Utc>,
    pub resources: HashMap<ResourceId, Arc<Resource>>,
}

/// An incremental change to one resource. `before` is absent for ADDED,
/// `after` is absent for DELETED.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub update_type: UpdateType,
    pub before: Option<Arc<Resource>>,
    pub after: Option<Arc<Resource>>,
}

/// Serializable digest of a resource within a change or snapshot report.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResourceSummary {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub resource_version: String,
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

impl ResourceSummary {
    fn of(resource: &Resource) -> Self {
        let phase = resource
            .data
            .get("status")
            .and_then(|s| s.get("phase"))
            .and_then(|p| p.as_str())
            .map(|p| p.to_string());
        Self {
            kind: resource.kind.clone(),
            namespace: resource.namespace.clone(),
            name: resource.name.clone(),
            uid: resource.uid.clone(),
            resource_version: resource.resource_version.clone(),
            labels: resource.labels.clone(),
            phase,
        }
    }

    fn field(&self, name: &str) -> Option<&str> {
        match name {
            "kind" => Some(&self.kind),
            "namespace" => Some(&self.namespace),
            "name" => Some(&self.name),
            "uid" => Some(&self.uid),
            "resource_version" => Some(&self.resource_version),
            "phase" => self.phase.as_deref(),
            _ => None,
        }
    }
}

/// One change event as reported by range queries.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChangeRecord {
    pub timestamp: DateTime<Utc>,
    pub update_type: UpdateType,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<ResourceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<ResourceSummary>,
}

/// Result of comparing one resource between two points in time.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StateDiff {
    pub changed: bool,
    pub before: Resource,
    pub after: Resource,
    pub before_raw: String,
    pub after_raw: String,
}

/// Summarized full-cluster state at a point in time.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClusterSnapshot {
    pub timestamp: DateTime<Utc>,
    pub resource_count: usize,
    pub resources: Vec<ResourceSummary>,
}

/// Outcome of searching the change log for a specific field transition.
#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldChange {
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<UpdateType>,
}

struct Inner {
    // Ring buffer: `head` is the oldest live slot, `size` grows to capacity
    // and stays there.
    snapshots: Vec<Option<Arc<Snapshot>>>,
    head: usize,
    size: usize,
    capacity: usize,

    changes: Vec<ChangeEvent>,
    max_changes: usize,
}

impl Inner {
    fn add_snapshot(&mut self, snapshot: Arc<Snapshot>) {
        let idx = (self.head + self.size) % self.capacity;
        self.snapshots[idx] = Some(snapshot);
        if self.size < self.capacity {
            self.size += 1;
        } else {
            // Overwrote the oldest: advance head.
            self.head = (self.head + 1) % self.capacity;
        }
    }

    fn at_or_before(&self, t: DateTime<Utc>) -> Option<Arc<Snapshot>> {
        let mut best: Option<Arc<Snapshot>> = None;
        for i in 0..self.size {
            let idx = (self.head + i) % self.capacity;
            if let Some(snap) = &self.snapshots[idx] {
                if snap.timestamp <= t {
                    best = Some(Arc::clone(snap));
                }
            }
        }
        best
    }

    fn oldest(&self) -> Option<&Arc<Snapshot>> {
        if self.size == 0 {
            return None;
        }
        self.snapshots[self.head].as_ref()
    }

    fn newest(&self) -> Option<&Arc<Snapshot>> {
        if self.size == 0 {
            return None;
        }
        self.snapshots[(self.head + self.size - 1) % self.capacity].as_ref()
    }
}

/// Ring-buffered history of snapshots plus a bounded change log.
pub struct TemporalStore {
    inner: RwLock<Inner>,
    source: RwLock<Option<SnapshotSource>>,
    snapshot_interval: std::time::Duration,

    running: AtomicBool,
    stop_signal: Notify,
    snapshotter: Mutex<Option<JoinHandle<()>>>,
}

impl TemporalStore {
    pub fn new() -> Self {
        Self::with_config(&TemporalConfig::default())
    }

    pub fn with_config(config: &TemporalConfig) -> Self {
        let capacity = config.snapshot_capacity.max(1);
        Self {
            inner: RwLock::new(Inner {
                snapshots: vec![None; capacity],
                head: 0,
                size: 0,
                capacity,
                changes: Vec::new(),
                max_changes: config.max_changes.max(10),
            }),
            source: RwLock::new(None),
            snapshot_interval: config.snapshot_interval(),
            running: AtomicBool::new(false),
            stop_signal: Notify::new(),
            snapshotter: Mutex::new(None),
        }
    }

    /// Install the callback the background snapshotter pulls inventories
    /// from. Without one, `snapshot_now` is a no-op.
    pub fn set_source(&self, source: SnapshotSource) {
        *self.source.write() = Some(source);
    }

    /// Take a snapshot from the installed source. No-op if none configured.
    pub fn snapshot_now(&self) {
        let source = self.source.read().clone();
        let Some(source) = source else {
            return;
        };
        let resources = source();
        self.add_snapshot_at(Utc::now(), &resources);
    }

    /// Injection path used by the synchronizer after a full re-sync.
    pub fn add_snapshot_direct(&self, resources: &[Arc<Resource>]) {
        self.add_snapshot_at(Utc::now(), resources);
    }

    fn add_snapshot_at(&self, timestamp: DateTime<Utc>, resources: &[Arc<Resource>]) {
        let snapshot = Arc::new(Snapshot {
            timestamp,
            resources: resources
                .iter()
                .map(|r| (r.id(), Arc::clone(r)))
                .collect(),
        });
        let mut inner = self.inner.write();
        inner.add_snapshot(snapshot);
        debug!(count = resources.len(), size = inner.size, "Snapshot recorded");
    }

    /// Append a change event. Identity comes from `after` if present, else
    /// `before`; with neither the call is silently dropped.
    pub fn record_change(
        &self,
        update_type: UpdateType,
        before: Option<Arc<Resource>>,
        after: Option<Arc<Resource>>,
    ) {
        let (kind, namespace, name) = match after.as_ref().or(before.as_ref()) {
            Some(subject) => (
                subject.kind.clone(),
                subject.namespace.clone(),
                subject.name.clone(),
            ),
            None => return,
        };
        let event = ChangeEvent {
            timestamp: Utc::now(),
            kind,
            namespace,
            name,
            update_type,
            before,
            after,
        };

        let mut inner = self.inner.write();
        if inner.changes.len() >= inner.max_changes {
            // Drop the oldest 10% so trimming stays amortized O(1).
            let trim = inner.max_changes / 10;
            inner.changes.drain(..trim);
        }
        inner.changes.push(event);
    }

    /// Resource state at the snapshot with the greatest timestamp ≤ `at`.
    pub fn get_resource_at(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        at: impl Into<TimePoint>,
    ) -> ScopeResult<Arc<Resource>> {
        let t = at.into().resolve()?;
        let inner = self.inner.read();

        let snap = inner.at_or_before(t).ok_or(ScopeError::NoSnapshot(t))?;
        let id = ResourceId::new(kind, namespace, name);
        snap.resources
            .get(&id)
            .cloned()
            .ok_or_else(|| ScopeError::NotFoundInSnapshot {
                key: id.to_string(),
                at: snap.timestamp,
            })
    }

    /// All changes to one resource with `start ≤ timestamp ≤ end`.
    pub fn get_changes_in_range(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        start: impl Into<TimePoint>,
        end: impl Into<TimePoint>,
    ) -> ScopeResult<Vec<ChangeRecord>> {
        let start = start.into().resolve()?;
        let end = end.into().resolve()?;
        let inner = self.inner.read();

        Ok(inner
            .changes
            .iter()
            .filter(|evt| evt.kind == kind && evt.namespace == namespace && evt.name == name)
            .filter(|evt| evt.timestamp >= start && evt.timestamp <= end)
            .map(|evt| ChangeRecord {
                timestamp: evt.timestamp,
                update_type: evt.update_type,
                kind: evt.kind.clone(),
                namespace: evt.namespace.clone(),
                name: evt.name.clone(),
                before: evt.before.as_deref().map(ResourceSummary::of),
                after: evt.after.as_deref().map(ResourceSummary::of),
            })
            .collect())
    }

    /// Alias for `get_changes_in_range`: creation, update and delete events
    /// affecting one resource.
    pub fn get_event_history(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        start: impl Into<TimePoint>,
        end: impl Into<TimePoint>,
    ) -> ScopeResult<Vec<ChangeRecord>> {
        self.get_changes_in_range(kind, namespace, name, start, end)
    }

    /// Compare a resource's state between two points in time. The diff is a
    /// JSON-canonical byte comparison.
    pub fn compare_resource_states(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        before_time: impl Into<TimePoint>,
        after_time: impl Into<TimePoint>,
    ) -> ScopeResult<StateDiff> {
        let before = self.get_resource_at(kind, namespace, name, before_time)?;
        let after = self.get_resource_at(kind, namespace, name, after_time)?;

        let before_raw = serde_json::to_string(&*before)?;
        let after_raw = serde_json::to_string(&*after)?;

        Ok(StateDiff {
            changed: before_raw != after_raw,
            before: (*before).clone(),
            after: (*after).clone(),
            before_raw,
            after_raw,
        })
    }

    /// Summarized full-cluster state at the at-or-before snapshot.
    pub fn get_cluster_snapshot_at(&self, at: impl Into<TimePoint>) -> ScopeResult<ClusterSnapshot> {
        let t = at.into().resolve()?;
        let inner = self.inner.read();

        let snap = inner.at_or_before(t).ok_or(ScopeError::NoSnapshot(t))?;
        Ok(ClusterSnapshot {
            timestamp: snap.timestamp,
            resource_count: snap.resources.len(),
            resources: snap.resources.values().map(|r| ResourceSummary::of(r)).collect(),
        })
    }

    /// Scan ADDED/MODIFIED events for the first one whose after-state field
    /// equals `new_value`.
    pub fn find_state_change(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
        field: &str,
        old_value: &str,
        new_value: &str,
    ) -> FieldChange {
        let inner = self.inner.read();

        for evt in &inner.changes {
            if evt.kind != kind || evt.namespace != namespace || evt.name != name {
                continue;
            }
            if !matches!(evt.update_type, UpdateType::Added | UpdateType::Modified) {
                continue;
            }
            if let Some(after) = &evt.after {
                let summary = ResourceSummary::of(after);
                if summary.field(field) == Some(new_value) {
                    return FieldChange {
                        found: true,
                        timestamp: Some(evt.timestamp),
                        field: field.to_string(),
                        old_value: old_value.to_string(),
                        new_value: new_value.to_string(),
                        event_type: Some(evt.update_type),
                    };
                }
            }
        }

        FieldChange {
            found: false,
            timestamp: None,
            field: field.to_string(),
            old_value: old_value.to_string(),
            new_value: new_value.to_string(),
            event_type: None,
        }
    }

    /// `(oldest, newest)` snapshot timestamps.
    pub fn get_retention_window(&self) -> ScopeResult<(DateTime<Utc>, DateTime<Utc>)> {
        let inner = self.inner.read();
        match (inner.oldest(), inner.newest()) {
            (Some(oldest), Some(newest)) => Ok((oldest.timestamp, newest.timestamp)),
            _ => Err(ScopeError::NoSnapshots),
        }
    }

    /// Discard change events older than the oldest snapshot; with no
    /// snapshots, clear all events.
    pub fn prune(&self) {
        let mut inner = self.inner.write();
        let oldest = inner.oldest().map(|s| s.timestamp);
        match oldest {
            Some(oldest) => inner.changes.retain(|evt| evt.timestamp >= oldest),
            None => inner.changes.clear(),
        }
    }

    pub fn snapshot_count(&self) -> usize {
        self.inner.read().size
    }

    pub fn change_count(&self) -> usize {
        self.inner.read().changes.len()
    }

    // ── Background snapshotter ──────────────────────────────────────────

    /// Start the periodic snapshotter. Ticks take a snapshot only while a
    /// source is installed.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let store = Arc::clone(self);
        let handle = tokio::spawn(async move {
            // The first tick completes immediately, so one snapshot lands at
            // startup and the rest follow the interval.
            let mut ticker = tokio::time::interval(store.snapshot_interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !store.running.load(Ordering::SeqCst) {
                            break;
                        }
                        store.snapshot_now();
                    }
                    _ = store.stop_signal.notified() => break,
                }
            }
        });
        *self.snapshotter.lock() = Some(handle);
        info!(interval_secs = self.snapshot_interval.as_secs(), "Temporal snapshotter started");
    }

    /// Stop the snapshotter and join its task. Idempotent.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_signal.notify_waiters();
        let handle = self.snapshotter.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Default for TemporalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn small_store(capacity: usize, max_changes: usize) -> TemporalStore {
        TemporalStore::with_config(&TemporalConfig {
            snapshot_capacity: capacity,
            snapshot_interval_secs: 3600,
            max_changes,
        })
    }

    fn pod(name: &str, version: &str) -> Arc<Resource> {
        Arc::new(Resource::new("Pod", "default", name).with_version(version))
    }

    #[test]
    fn test_at_or_before_selects_earlier_snapshot() {
        let ts = small_store(8, 100);
        let base = Utc::now();

        ts.add_snapshot_at(base, &[pod("pod-1", "1")]);
        ts.add_snapshot_at(base + Duration::seconds(10), &[pod("pod-1", "2")]);

        // Mid-point resolves to the earlier snapshot's version.
        let mid = base + Duration::seconds(5);
        let r = ts.get_resource_at("Pod", "default", "pod-1", mid).unwrap();
        assert_eq!(r.resource_version, "1");

        let late = base + Duration::seconds(15);
        let r = ts.get_resource_at("Pod", "default", "pod-1", late).unwrap();
        assert_eq!(r.resource_version, "2");
    }

    #[test]
    fn test_query_before_window_fails() {
        let ts = small_store(8, 100);
        let base = Utc::now();
        ts.add_snapshot_at(base, &[pod("pod-1", "1")]);

        let too_early = base - Duration::seconds(60);
        assert!(matches!(
            ts.get_resource_at("Pod", "default", "pod-1", too_early),
            Err(ScopeError::NoSnapshot(_))
        ));
    }

    #[test]
    fn test_resource_absent_from_snapshot() {
        let ts = small_store(8, 100);
        ts.add_snapshot_at(Utc::now(), &[pod("pod-1", "1")]);
        assert!(matches!(
            ts.get_resource_at("Pod", "default", "ghost", Utc::now()),
            Err(ScopeError::NotFoundInSnapshot { .. })
        ));
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let ts = small_store(4, 100);
        let base = Utc::now();
        // capacity + 2 inserts: survivors should start at the 3rd insert.
        for i in 0..6 {
            ts.add_snapshot_at(base + Duration::seconds(i), &[pod("pod-1", &i.to_string())]);
        }
        assert_eq!(ts.snapshot_count(), 4);

        let (oldest, newest) = ts.get_retention_window().unwrap();
        assert_eq!(oldest, base + Duration::seconds(2));
        assert_eq!(newest, base + Duration::seconds(5));
    }

    #[test]
    fn test_retention_window_empty() {
        let ts = small_store(4, 100);
        assert!(matches!(ts.get_retention_window(), Err(ScopeError::NoSnapshots)));
    }

    #[test]
    fn test_record_change_trims_oldest_tenth() {
        let ts = small_store(4, 100);
        for i in 0..100 {
            ts.record_change(UpdateType::Added, None, Some(pod(&format!("pod-{}", i), "1")));
        }
        assert_eq!(ts.change_count(), 100);

        // The next record crosses the cap: 10 oldest drop, one appends.
        ts.record_change(UpdateType::Added, None, Some(pod("pod-extra", "1")));
        assert_eq!(ts.change_count(), 91);
    }

    #[test]
    fn test_record_change_without_subject_is_dropped() {
        let ts = small_store(4, 100);
        ts.record_change(UpdateType::Deleted, None, None);
        assert_eq!(ts.change_count(), 0);
    }

    #[test]
    fn test_changes_in_range_filters_identity_and_time() {
        let ts = small_store(4, 100);
        ts.record_change(UpdateType::Added, None, Some(pod("pod-1", "1")));
        ts.record_change(
            UpdateType::Modified,
            Some(pod("pod-1", "1")),
            Some(pod("pod-1", "2")),
        );
        ts.record_change(UpdateType::Added, None, Some(pod("pod-2", "1")));

        let start = Utc::now() - Duration::seconds(60);
        let end = Utc::now() + Duration::seconds(60);
        let changes = ts
            .get_changes_in_range("Pod", "default", "pod-1", start, end)
            .unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].update_type, UpdateType::Added);
        assert!(changes[0].before.is_none());
        assert_eq!(changes[1].update_type, UpdateType::Modified);
        assert_eq!(changes[1].before.as_ref().unwrap().resource_version, "1");
        assert_eq!(changes[1].after.as_ref().unwrap().resource_version, "2");

        // Outside the window: nothing.
        let past_end = start - Duration::seconds(1);
        let none = ts
            .get_changes_in_range("Pod", "default", "pod-1", start - Duration::seconds(60), past_end)
            .unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_event_history_matches_change_range() {
        let ts = small_store(4, 100);
        ts.record_change(UpdateType::Added, None, Some(pod("pod-1", "1")));
        ts.record_change(
            UpdateType::Modified,
            Some(pod("pod-1", "1")),
            Some(pod("pod-1", "2")),
        );
        ts.record_change(UpdateType::Added, None, Some(pod("pod-2", "1")));

        let start = Utc::now() - Duration::seconds(60);
        let end = Utc::now() + Duration::seconds(60);
        let history = ts
            .get_event_history("Pod", "default", "pod-1", start, end)
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].update_type, UpdateType::Added);
        assert_eq!(history[1].update_type, UpdateType::Modified);

        // The alias reports exactly what the range query reports.
        let changes = ts
            .get_changes_in_range("Pod", "default", "pod-1", start, end)
            .unwrap();
        assert_eq!(history.len(), changes.len());
    }

    #[test]
    fn test_compare_same_time_is_unchanged() {
        let ts = small_store(4, 100);
        let base = Utc::now();
        ts.add_snapshot_at(base, &[pod("pod-1", "1")]);

        let diff = ts
            .compare_resource_states("Pod", "default", "pod-1", base, base)
            .unwrap();
        assert!(!diff.changed);
        assert_eq!(diff.before_raw, diff.after_raw);
    }

    #[test]
    fn test_compare_detects_change() {
        let ts = small_store(4, 100);
        let base = Utc::now();
        ts.add_snapshot_at(base, &[pod("pod-1", "1")]);
        ts.add_snapshot_at(base + Duration::seconds(10), &[pod("pod-1", "2")]);

        let diff = ts
            .compare_resource_states("Pod", "default", "pod-1", base, base + Duration::seconds(10))
            .unwrap();
        assert!(diff.changed);
        assert_eq!(diff.before.resource_version, "1");
        assert_eq!(diff.after.resource_version, "2");
    }

    #[test]
    fn test_cluster_snapshot_at() {
        let ts = small_store(4, 100);
        let base = Utc::now();
        ts.add_snapshot_at(base, &[pod("pod-1", "1"), pod("pod-2", "1")]);

        let snap = ts.get_cluster_snapshot_at(base + Duration::seconds(1)).unwrap();
        assert_eq!(snap.resource_count, 2);
        assert_eq!(snap.resources.len(), 2);
    }

    #[test]
    fn test_find_state_change_by_phase() {
        let ts = small_store(4, 100);
        let running = Arc::new(
            Resource::new("Pod", "default", "pod-1")
                .with_data(serde_json::json!({"status": {"phase": "Running"}})),
        );
        let failed = Arc::new(
            Resource::new("Pod", "default", "pod-1")
                .with_data(serde_json::json!({"status": {"phase": "Failed"}})),
        );
        ts.record_change(UpdateType::Added, None, Some(running.clone()));
        ts.record_change(UpdateType::Modified, Some(running), Some(failed));

        let found = ts.find_state_change("Pod", "default", "pod-1", "phase", "Running", "Failed");
        assert!(found.found);
        assert_eq!(found.event_type, Some(UpdateType::Modified));

        let missing = ts.find_state_change("Pod", "default", "pod-1", "phase", "Running", "Unknown");
        assert!(!missing.found);
        assert_eq!(missing.field, "phase");
    }

    #[test]
    fn test_prune_drops_events_older_than_oldest_snapshot() {
        let ts = small_store(2, 100);
        ts.record_change(UpdateType::Added, None, Some(pod("pod-1", "1")));

        // Snapshot taken after the event: the event predates the window.
        ts.add_snapshot_at(Utc::now() + Duration::seconds(5), &[pod("pod-1", "1")]);
        ts.prune();
        assert_eq!(ts.change_count(), 0);
    }

    #[test]
    fn test_prune_without_snapshots_clears_all() {
        let ts = small_store(2, 100);
        ts.record_change(UpdateType::Added, None, Some(pod("pod-1", "1")));
        ts.prune();
        assert_eq!(ts.change_count(), 0);
    }

    #[test]
    fn test_snapshot_now_without_source_is_noop() {
        let ts = small_store(4, 100);
        ts.snapshot_now();
        assert_eq!(ts.snapshot_count(), 0);
    }

    #[test]
    fn test_snapshot_now_pulls_from_source() {
        let ts = small_store(4, 100);
        ts.set_source(Arc::new(|| vec![pod("pod-1", "1")]));
        ts.snapshot_now();
        assert_eq!(ts.snapshot_count(), 1);
        let r = ts.get_resource_at("Pod", "default", "pod-1", Utc::now()).unwrap();
        assert_eq!(r.name, "pod-1");
    }

    #[test]
    fn test_bad_time_inputs() {
        let ts = small_store(4, 100);
        ts.add_snapshot_at(Utc::now(), &[pod("pod-1", "1")]);
        assert!(matches!(
            ts.get_resource_at("Pod", "default", "pod-1", "not-a-time"),
            Err(ScopeError::BadTime(_))
        ));

        // RFC-3339 text and epoch seconds both resolve.
        let stamp = (Utc::now() + Duration::seconds(1)).to_rfc3339();
        assert!(ts.get_resource_at("Pod", "default", "pod-1", stamp.as_str()).is_ok());
        let epoch = Utc::now().timestamp() + 1;
        assert!(ts.get_resource_at("Pod", "default", "pod-1", epoch).is_ok());
    }

    #[tokio::test]
    async fn test_snapshotter_stop_joins_promptly() {
        let ts = Arc::new(small_store(4, 100));
        ts.set_source(Arc::new(|| vec![pod("pod-1", "1")]));
        ts.start();
        // First tick fires immediately.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        ts.stop().await;
        assert!(ts.snapshot_count() >= 1);

        // Stop is idempotent.
        ts.stop().await;
    }
}
