//! Synchronizer — keeps the world model and temporal store aligned with the
//! fetcher's view of the cluster.
//!
//! Full syncs collect everything first and swap it in afterwards; neither
//! store ever calls the fetcher while holding its lock.

use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use clusterscope_core::config::SyncConfig;
use clusterscope_core::{Resource, ResourceFetcher, ScopeResult, StateUpdate, UpdateType};

use crate::query::QueryApi;
use crate::temporal::TemporalStore;
use crate::world_model::{WorldModel, WorldModelStats};

/// Synchronizer statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SyncStats {
    pub last_full_sync: Option<DateTime<Utc>>,
    pub total_syncs: u64,
    pub total_resources: u64,
    pub world_model: WorldModelStats,
}

/// Orchestrates periodic full syncs and the incremental update path.
pub struct Synchronizer {
    wm: Arc<WorldModel>,
    fetcher: Arc<dyn ResourceFetcher>,
    temporal: Option<Arc<TemporalStore>>,
    query: Option<Arc<QueryApi>>,
    config: SyncConfig,

    // Serializes full syncs so concurrent force_sync calls do not overlap.
    sync_guard: tokio::sync::Mutex<()>,

    last_full_sync: RwLock<Option<DateTime<Utc>>>,
    total_syncs: AtomicU64,
    total_resources: AtomicU64,

    running: AtomicBool,
    stop_signal: Notify,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Synchronizer {
    pub fn new(wm: Arc<WorldModel>, fetcher: Arc<dyn ResourceFetcher>, config: SyncConfig) -> Self {
        Self {
            wm,
            fetcher,
            temporal: None,
            query: None,
            config,
            sync_guard: tokio::sync::Mutex::new(()),
            last_full_sync: RwLock::new(None),
            total_syncs: AtomicU64::new(0),
            total_resources: AtomicU64::new(0),
            running: AtomicBool::new(false),
            stop_signal: Notify::new(),
            worker: Mutex::new(None),
        }
    }

    /// Attach a temporal store to receive snapshots and change events.
    pub fn with_temporal_store(mut self, temporal: Arc<TemporalStore>) -> Self {
        self.temporal = Some(temporal);
        self
    }

    /// Attach a query API to receive lightweight change records.
    pub fn with_query_api(mut self, query: Arc<QueryApi>) -> Self {
        self.query = Some(query);
        self
    }

    /// Perform an initial full sync, then run periodic full syncs until
    /// stopped.
    pub async fn start(self: &Arc<Self>) -> ScopeResult<()> {
        self.full_sync().await?;

        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let sync = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sync.config.full_sync_interval());
            ticker.tick().await; // the initial sync already happened
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !sync.running.load(Ordering::SeqCst) {
                            break;
                        }
                        if let Err(e) = sync.full_sync().await {
                            warn!(error = %e, "Periodic full sync failed");
                        }
                    }
                    _ = sync.stop_signal.notified() => break,
                }
            }
        });
        *self.worker.lock() = Some(handle);
        info!(
            interval_secs = self.config.full_sync_interval_secs,
            kinds = self.config.resource_kinds.len(),
            "Synchronizer started"
        );
        Ok(())
    }

    /// Stop the periodic loop and join the background task. Idempotent.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.stop_signal.notify_waiters();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// Trigger an immediate full sync.
    pub async fn force_sync(&self) -> ScopeResult<()> {
        self.full_sync().await
    }

    /// Apply an incremental update from a watch-style source: capture the
    /// pre-update resource, apply to the world model, then notify the
    /// temporal store and the query feed.
    pub fn apply_update(&self, update_type: &str, resource: Arc<Resource>) -> ScopeResult<()> {
        let parsed = UpdateType::from_str(update_type)?;

        // Read before without holding any world-model lock across the apply.
        let before = match parsed {
            UpdateType::Modified | UpdateType::Deleted => self
                .wm
                .get_resource(&resource.kind, &resource.namespace, &resource.name)
                .ok(),
            UpdateType::Added => None,
        };

        let update = StateUpdate::new(parsed, Arc::clone(&resource));
        self.wm.apply_update(&update)?;

        if let Some(temporal) = &self.temporal {
            let after = match parsed {
                UpdateType::Deleted => None,
                _ => Some(Arc::clone(&resource)),
            };
            temporal.record_change(parsed, before, after);
        }
        if let Some(query) = &self.query {
            query.record_change(parsed, resource);
        }
        Ok(())
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            last_full_sync: *self.last_full_sync.read(),
            total_syncs: self.total_syncs.load(Ordering::Relaxed),
            total_resources: self.total_resources.load(Ordering::Relaxed),
            world_model: self.wm.stats(),
        }
    }

    /// Fetch every configured kind, bootstrap the world model with the
    /// union, then inject a snapshot into the temporal store — in that
    /// order. Per-kind fetch errors are logged and skipped.
    async fn full_sync(&self) -> ScopeResult<()> {
        let _guard = self.sync_guard.lock().await;

        let namespaces = if self.config.namespaces.is_empty() {
            vec![String::new()] // empty string = all namespaces
        } else {
            self.config.namespaces.clone()
        };

        let mut all: Vec<Arc<Resource>> = Vec::new();
        for kind in &self.config.resource_kinds {
            for namespace in &namespaces {
                match self.fetcher.list_resources(kind, namespace).await {
                    Ok(resources) => all.extend(resources),
                    Err(e) => {
                        warn!(kind = %kind, namespace = %namespace, error = %e, "Fetch failed, skipping kind");
                    }
                }
            }
        }

        self.wm.bootstrap(&all);
        if let Some(temporal) = &self.temporal {
            temporal.add_snapshot_direct(&all);
        }

        *self.last_full_sync.write() = Some(Utc::now());
        self.total_syncs.fetch_add(1, Ordering::Relaxed);
        self.total_resources.store(all.len() as u64, Ordering::Relaxed);
        info!(resources = all.len(), "Full sync complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use clusterscope_core::config::TemporalConfig;
    use clusterscope_core::{ScopeError, StaticFetcher};

    fn config() -> SyncConfig {
        SyncConfig {
            full_sync_interval_secs: 3600,
            resource_kinds: vec!["Pod".into(), "Service".into()],
            namespaces: Vec::new(),
        }
    }

    fn fetcher() -> Arc<StaticFetcher> {
        Arc::new(StaticFetcher::with_inventory(vec![
            Resource::new("Pod", "default", "pod-1").with_version("1"),
            Resource::new("Pod", "kube-system", "pod-2"),
            Resource::new("Service", "default", "svc-1"),
            // Not in the configured kinds: never synced.
            Resource::new("ConfigMap", "default", "cm-1"),
        ]))
    }

    #[tokio::test]
    async fn test_full_sync_bootstraps_world_model() {
        let wm = Arc::new(WorldModel::new());
        let sync = Synchronizer::new(Arc::clone(&wm), fetcher(), config());

        sync.force_sync().await.unwrap();
        assert!(wm.is_bootstrapped());
        assert_eq!(wm.resource_count(), 3);
        assert!(wm.get_resource("ConfigMap", "default", "cm-1").is_err());

        let stats = sync.stats();
        assert_eq!(stats.total_syncs, 1);
        assert_eq!(stats.total_resources, 3);
        assert!(stats.last_full_sync.is_some());
    }

    #[tokio::test]
    async fn test_full_sync_injects_temporal_snapshot() {
        let wm = Arc::new(WorldModel::new());
        let temporal = Arc::new(TemporalStore::with_config(&TemporalConfig::default()));
        let sync = Synchronizer::new(Arc::clone(&wm), fetcher(), config())
            .with_temporal_store(Arc::clone(&temporal));

        sync.force_sync().await.unwrap();
        assert_eq!(temporal.snapshot_count(), 1);
        let r = temporal
            .get_resource_at("Pod", "default", "pod-1", Utc::now())
            .unwrap();
        assert_eq!(r.resource_version, "1");
    }

    struct FailingFetcher;

    #[async_trait]
    impl ResourceFetcher for FailingFetcher {
        async fn list_resources(
            &self,
            kind: &str,
            namespace: &str,
        ) -> ScopeResult<Vec<Arc<Resource>>> {
            if kind == "Pod" {
                return Err(ScopeError::Fetch {
                    kind: kind.into(),
                    namespace: namespace.into(),
                    message: "backend unavailable".into(),
                });
            }
            Ok(vec![Arc::new(Resource::new(kind, "default", "one"))])
        }
    }

    #[tokio::test]
    async fn test_per_kind_errors_are_non_fatal() {
        let wm = Arc::new(WorldModel::new());
        let sync = Synchronizer::new(Arc::clone(&wm), Arc::new(FailingFetcher), config());

        sync.force_sync().await.unwrap();
        // Pods failed; services made it through.
        assert_eq!(wm.resource_count(), 1);
        assert!(wm.get_resource("Service", "default", "one").is_ok());
    }

    #[tokio::test]
    async fn test_apply_update_records_before_state() {
        let wm = Arc::new(WorldModel::new());
        let temporal = Arc::new(TemporalStore::with_config(&TemporalConfig::default()));
        let query = Arc::new(QueryApi::new(Arc::clone(&wm)));
        let sync = Synchronizer::new(Arc::clone(&wm), fetcher(), config())
            .with_temporal_store(Arc::clone(&temporal))
            .with_query_api(Arc::clone(&query));

        sync.force_sync().await.unwrap();

        let modified = Arc::new(Resource::new("Pod", "default", "pod-1").with_version("2"));
        sync.apply_update("MODIFIED", modified).unwrap();

        let start = Utc::now() - chrono::Duration::seconds(60);
        let end = Utc::now() + chrono::Duration::seconds(60);
        let changes = temporal
            .get_changes_in_range("Pod", "default", "pod-1", start, end)
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].before.as_ref().unwrap().resource_version, "1");
        assert_eq!(changes[0].after.as_ref().unwrap().resource_version, "2");

        // The query feed got the lightweight record too.
        assert_eq!(query.change_feed_len(), 1);
    }

    #[tokio::test]
    async fn test_apply_update_deleted_has_no_after() {
        let wm = Arc::new(WorldModel::new());
        let temporal = Arc::new(TemporalStore::with_config(&TemporalConfig::default()));
        let sync = Synchronizer::new(Arc::clone(&wm), fetcher(), config())
            .with_temporal_store(Arc::clone(&temporal));

        sync.force_sync().await.unwrap();
        sync.apply_update("DELETED", Arc::new(Resource::new("Pod", "default", "pod-1")))
            .unwrap();

        assert!(wm.get_resource("Pod", "default", "pod-1").is_err());
        let start = Utc::now() - chrono::Duration::seconds(60);
        let end = Utc::now() + chrono::Duration::seconds(60);
        let changes = temporal
            .get_changes_in_range("Pod", "default", "pod-1", start, end)
            .unwrap();
        assert_eq!(changes.len(), 1);
        assert!(changes[0].after.is_none());
        assert_eq!(changes[0].before.as_ref().unwrap().resource_version, "1");
    }

    #[tokio::test]
    async fn test_apply_update_unknown_type() {
        let wm = Arc::new(WorldModel::new());
        let sync = Synchronizer::new(Arc::clone(&wm), fetcher(), config());
        sync.force_sync().await.unwrap();

        let err = sync
            .apply_update("REPLACED", Arc::new(Resource::new("Pod", "default", "pod-1")))
            .unwrap_err();
        assert!(matches!(err, ScopeError::UnknownUpdateType(_)));
    }

    #[tokio::test]
    async fn test_start_and_stop_join() {
        let wm = Arc::new(WorldModel::new());
        let sync = Arc::new(Synchronizer::new(Arc::clone(&wm), fetcher(), config()));

        sync.start().await.unwrap();
        assert!(wm.is_bootstrapped());

        sync.stop().await;
        // Idempotent from the caller's perspective.
        sync.stop().await;
    }
}
