//! Orchestrator — owns and wires the world model, temporal store, query
//! API, synchronizer and security engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::info;

use clusterscope_core::{ResourceFetcher, ScopeConfig, ScopeResult};
use clusterscope_memory::synchronizer::SyncStats;
use clusterscope_memory::{QueryApi, Synchronizer, TemporalStore, WorldModel};
use clusterscope_security::{ComplianceStandard, SecurityEngine, SecuritySnapshot};

/// Runtime status of the substrate.
#[derive(Debug, Clone, serde::Serialize)]
pub struct OrchestratorStatus {
    pub running: bool,
    pub uptime_secs: u64,
    pub sync: SyncStats,
    pub temporal_snapshots: usize,
    pub temporal_changes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_security_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_security_grade: Option<String>,
}

/// The clusterscope runtime: one of everything, started and stopped
/// together.
pub struct Orchestrator {
    wm: Arc<WorldModel>,
    temporal: Arc<TemporalStore>,
    query: Arc<QueryApi>,
    sync: Arc<Synchronizer>,
    security: Arc<SecurityEngine>,
    running: AtomicBool,
    started_at: RwLock<Option<std::time::Instant>>,
}

impl Orchestrator {
    pub fn new(config: &ScopeConfig, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        let wm = Arc::new(WorldModel::new());
        let temporal = Arc::new(TemporalStore::with_config(&config.temporal));
        let query = Arc::new(QueryApi::new(Arc::clone(&wm)));
        let sync = Arc::new(
            Synchronizer::new(Arc::clone(&wm), Arc::clone(&fetcher), config.sync.clone())
                .with_temporal_store(Arc::clone(&temporal))
                .with_query_api(Arc::clone(&query)),
        );

        let standard = config
            .security
            .standard
            .parse()
            .unwrap_or(ComplianceStandard::CisKubernetes);
        let security = Arc::new(SecurityEngine::new(Some(fetcher)).with_standard(standard));

        Self {
            wm,
            temporal,
            query,
            sync,
            security,
            running: AtomicBool::new(false),
            started_at: RwLock::new(None),
        }
    }

    /// Run the initial full sync and start the background loops.
    pub async fn start(&self) -> ScopeResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        // Periodic snapshots read the freshly synced world model.
        let wm = Arc::clone(&self.wm);
        self.temporal
            .set_source(Arc::new(move || wm.list_resources("", "")));

        self.sync.start().await?;
        self.temporal.start();
        *self.started_at.write() = Some(std::time::Instant::now());
        info!("clusterscope substrate started");
        Ok(())
    }

    /// Stop the background loops and join them. Idempotent.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.sync.stop().await;
        self.temporal.stop().await;
        info!("clusterscope substrate stopped");
    }

    /// Run a security analysis and return the committed snapshot.
    pub async fn analyze_security(&self) -> Arc<SecuritySnapshot> {
        self.security.analyze().await
    }

    pub fn status(&self) -> OrchestratorStatus {
        let uptime_secs = self
            .started_at
            .read()
            .map(|s| s.elapsed().as_secs())
            .unwrap_or(0);
        let last = self.security.last_snapshot();

        OrchestratorStatus {
            running: self.running.load(Ordering::SeqCst),
            uptime_secs,
            sync: self.sync.stats(),
            temporal_snapshots: self.temporal.snapshot_count(),
            temporal_changes: self.temporal.change_count(),
            retention_window: self.temporal.get_retention_window().ok(),
            last_security_score: last.as_ref().map(|s| s.score),
            last_security_grade: last.map(|s| s.grade.clone()),
        }
    }

    pub fn world_model(&self) -> &Arc<WorldModel> {
        &self.wm
    }

    pub fn temporal(&self) -> &Arc<TemporalStore> {
        &self.temporal
    }

    pub fn query(&self) -> &Arc<QueryApi> {
        &self.query
    }

    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.sync
    }

    pub fn security(&self) -> &Arc<SecurityEngine> {
        &self.security
    }
}
