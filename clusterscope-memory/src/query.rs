//! Query API — derived lookups over the world model plus a low-latency
//! recent-change feed.
//!
//! The feed is separate from the temporal store's change log on purpose:
//! the temporal store keeps full before/after resources for diffing, this
//! one keeps only lightweight summaries for "what just changed" queries.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde_json::Value;

use clusterscope_core::{OwnerReference, Resource, ScopeResult, UpdateType};

use crate::world_model::{WorldModel, WorldModelStats};

/// Most recent changes retained before the oldest 100 are dropped.
const MAX_RECENT_CHANGES: usize = 1000;
const RECENT_CHANGES_TRIM: usize = 100;

/// Default result cap for text search.
const DEFAULT_SEARCH_LIMIT: usize = 20;

struct FeedRecord {
    timestamp: DateTime<Utc>,
    update_type: UpdateType,
    resource: Arc<Resource>,
}

/// One entry of the recent-change feed.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ChangedResource {
    pub timestamp: DateTime<Utc>,
    pub update_type: UpdateType,
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub uid: String,
}

/// Human-readable digest of one resource, with `status` lifted out of the
/// opaque payload when present.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResourceDetail {
    pub kind: String,
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub resource_version: String,
    pub labels: BTreeMap<String, String>,
    pub owner_refs: Vec<OwnerReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Value>,
}

/// High-level cluster overview.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClusterOverview {
    pub cluster_stats: WorldModelStats,
    pub recent_changes: Vec<ChangedResource>,
    pub change_count_5m: usize,
}

/// Higher-level queries over the world model.
pub struct QueryApi {
    wm: Arc<WorldModel>,
    changes: RwLock<Vec<FeedRecord>>,
}

impl QueryApi {
    pub fn new(wm: Arc<WorldModel>) -> Self {
        Self {
            wm,
            changes: RwLock::new(Vec::with_capacity(MAX_RECENT_CHANGES)),
        }
    }

    /// Record a resource change (called by the synchronizer).
    pub fn record_change(&self, update_type: UpdateType, resource: Arc<Resource>) {
        let mut changes = self.changes.write();
        if changes.len() >= MAX_RECENT_CHANGES {
            changes.drain(..RECENT_CHANGES_TRIM);
        }
        changes.push(FeedRecord {
            timestamp: Utc::now(),
            update_type,
            resource,
        });
    }

    /// Resources that changed within the last `since`.
    pub fn changed_since(&self, since: Duration) -> Vec<ChangedResource> {
        let threshold = Utc::now() - since;
        self.changes
            .read()
            .iter()
            .filter(|rec| rec.timestamp >= threshold)
            .map(|rec| ChangedResource {
                timestamp: rec.timestamp,
                update_type: rec.update_type,
                kind: rec.resource.kind.clone(),
                namespace: rec.resource.namespace.clone(),
                name: rec.resource.name.clone(),
                uid: rec.resource.uid.clone(),
            })
            .collect()
    }

    /// Score every resource by how many whitespace-separated query terms its
    /// "kind namespace name k=v ..." search string contains, and return the
    /// top `limit` by descending score. `limit` 0 means the default of 20.
    pub fn find_resources_matching_text(&self, query: &str, limit: usize) -> Vec<Arc<Resource>> {
        let query = query.to_lowercase();
        let terms: Vec<&str> = query.split_whitespace().collect();
        if terms.is_empty() {
            return Vec::new();
        }
        let limit = if limit == 0 { DEFAULT_SEARCH_LIMIT } else { limit };

        let mut matches: Vec<(Arc<Resource>, usize)> = Vec::new();
        for resource in self.wm.list_resources("", "") {
            let mut search = format!(
                "{} {} {}",
                resource.kind.to_lowercase(),
                resource.namespace.to_lowercase(),
                resource.name.to_lowercase()
            );
            for (k, v) in &resource.labels {
                search.push(' ');
                search.push_str(&k.to_lowercase());
                search.push('=');
                search.push_str(&v.to_lowercase());
            }

            let score = terms.iter().filter(|term| search.contains(**term)).count();
            if score > 0 {
                matches.push((resource, score));
            }
        }

        // Stable sort: ties keep their encounter order.
        matches.sort_by(|a, b| b.1.cmp(&a.1));
        matches.truncate(limit);
        matches.into_iter().map(|(r, _)| r).collect()
    }

    /// Digest of one resource, with status lifted from the payload.
    pub fn resource_summary(
        &self,
        kind: &str,
        namespace: &str,
        name: &str,
    ) -> ScopeResult<ResourceDetail> {
        let resource = self.wm.get_resource(kind, namespace, name)?;
        let status = resource
            .data
            .get("status")
            .filter(|s| s.is_object())
            .cloned();

        Ok(ResourceDetail {
            kind: resource.kind.clone(),
            namespace: resource.namespace.clone(),
            name: resource.name.clone(),
            uid: resource.uid.clone(),
            resource_version: resource.resource_version.clone(),
            labels: resource.labels.clone(),
            owner_refs: resource.owner_refs.clone(),
            status,
        })
    }

    /// World-model stats plus a five-minute change digest.
    pub fn cluster_overview(&self) -> ClusterOverview {
        let recent_changes = self.changed_since(Duration::minutes(5));
        ClusterOverview {
            cluster_stats: self.wm.stats(),
            change_count_5m: recent_changes.len(),
            recent_changes,
        }
    }

    pub fn change_feed_len(&self) -> usize {
        self.changes.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Arc<WorldModel>, QueryApi) {
        let wm = Arc::new(WorldModel::new());
        wm.bootstrap(&[
            Arc::new(
                Resource::new("Pod", "default", "web-frontend-1")
                    .with_labels(&[("app", "web"), ("tier", "frontend")]),
            ),
            Arc::new(Resource::new("Pod", "default", "web-frontend-2").with_labels(&[("app", "web")])),
            Arc::new(Resource::new("Pod", "kube-system", "coredns-1").with_labels(&[("k8s-app", "kube-dns")])),
            Arc::new(Resource::new("Service", "default", "web")),
        ]);
        let query = QueryApi::new(Arc::clone(&wm));
        (wm, query)
    }

    #[test]
    fn test_text_search_scores_and_ranks() {
        let (_wm, query) = setup();

        let results = query.find_resources_matching_text("web frontend", 0);
        assert!(!results.is_empty());
        // Both terms match the frontend pods; the bare Service matches one.
        assert_eq!(results[0].kind, "Pod");
        assert!(results[0].name.starts_with("web-frontend"));
        assert!(results.iter().any(|r| r.kind == "Service"));
    }

    #[test]
    fn test_text_search_matches_labels() {
        let (_wm, query) = setup();
        let results = query.find_resources_matching_text("kube-dns", 0);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "coredns-1");
    }

    #[test]
    fn test_text_search_empty_query() {
        let (_wm, query) = setup();
        assert!(query.find_resources_matching_text("   ", 0).is_empty());
    }

    #[test]
    fn test_text_search_respects_limit() {
        let (_wm, query) = setup();
        let results = query.find_resources_matching_text("web", 1);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_changed_since_filters_by_age() {
        let (_wm, query) = setup();
        query.record_change(
            UpdateType::Added,
            Arc::new(Resource::new("Pod", "default", "web-frontend-1")),
        );

        assert_eq!(query.changed_since(Duration::minutes(1)).len(), 1);
        assert!(query.changed_since(Duration::zero()).len() <= 1);
    }

    #[test]
    fn test_change_feed_trims_oldest_hundred() {
        let (_wm, query) = setup();
        for i in 0..MAX_RECENT_CHANGES {
            query.record_change(
                UpdateType::Added,
                Arc::new(Resource::new("Pod", "default", &format!("pod-{}", i))),
            );
        }
        assert_eq!(query.change_feed_len(), MAX_RECENT_CHANGES);

        query.record_change(
            UpdateType::Added,
            Arc::new(Resource::new("Pod", "default", "pod-overflow")),
        );
        assert_eq!(query.change_feed_len(), MAX_RECENT_CHANGES - RECENT_CHANGES_TRIM + 1);
    }

    #[test]
    fn test_resource_summary_lifts_status() {
        let wm = Arc::new(WorldModel::new());
        wm.bootstrap(&[Arc::new(
            Resource::new("Pod", "default", "web-1")
                .with_version("7")
                .with_data(serde_json::json!({
                    "spec": {"containers": []},
                    "status": {"phase": "Running"}
                })),
        )]);
        let query = QueryApi::new(wm);

        let summary = query.resource_summary("Pod", "default", "web-1").unwrap();
        assert_eq!(summary.resource_version, "7");
        assert_eq!(summary.status.unwrap()["phase"], "Running");
    }

    #[test]
    fn test_cluster_overview() {
        let (_wm, query) = setup();
        query.record_change(
            UpdateType::Modified,
            Arc::new(Resource::new("Pod", "default", "web-frontend-1")),
        );

        let overview = query.cluster_overview();
        assert_eq!(overview.cluster_stats.total_resources, 4);
        assert_eq!(overview.change_count_5m, 1);
        assert_eq!(overview.recent_changes.len(), 1);
    }
}
