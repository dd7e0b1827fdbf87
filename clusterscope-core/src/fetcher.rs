//! The resource-fetcher seam between clusterscope and the cluster backend.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::ScopeResult;
use crate::types::Resource;

/// The only collaborator interface the substrate consumes. Implementations
/// wrap whatever actually talks to the cluster (a backend proxy, a recorded
/// inventory, a test fixture).
///
/// Namespace `""` means all namespaces.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn list_resources(
        &self,
        kind: &str,
        namespace: &str,
    ) -> ScopeResult<Vec<Arc<Resource>>>;
}

/// In-memory fetcher serving a fixed inventory. Backs the demo mode and the
/// test suites.
#[derive(Default)]
pub struct StaticFetcher {
    inventory: RwLock<Vec<Arc<Resource>>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inventory(resources: Vec<Resource>) -> Self {
        Self {
            inventory: RwLock::new(resources.into_iter().map(Arc::new).collect()),
        }
    }

    pub fn insert(&self, resource: Resource) {
        self.inventory.write().push(Arc::new(resource));
    }

    pub fn replace_inventory(&self, resources: Vec<Resource>) {
        *self.inventory.write() = resources.into_iter().map(Arc::new).collect();
    }

    pub fn len(&self) -> usize {
        self.inventory.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inventory.read().is_empty()
    }
}

#[async_trait]
impl ResourceFetcher for StaticFetcher {
    async fn list_resources(
        &self,
        kind: &str,
        namespace: &str,
    ) -> ScopeResult<Vec<Arc<Resource>>> {
        let inventory = self.inventory.read();
        Ok(inventory
            .iter()
            .filter(|r| kind.is_empty() || r.kind == kind)
            .filter(|r| namespace.is_empty() || r.namespace == namespace)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher() -> StaticFetcher {
        StaticFetcher::with_inventory(vec![
            Resource::new("Pod", "default", "web-1"),
            Resource::new("Pod", "kube-system", "dns-1"),
            Resource::new("Service", "default", "web"),
        ])
    }

    #[tokio::test]
    async fn test_list_by_kind() {
        let f = fetcher();
        let pods = f.list_resources("Pod", "").await.unwrap();
        assert_eq!(pods.len(), 2);
    }

    #[tokio::test]
    async fn test_list_by_kind_and_namespace() {
        let f = fetcher();
        let pods = f.list_resources("Pod", "default").await.unwrap();
        assert_eq!(pods.len(), 1);
        assert_eq!(pods[0].name, "web-1");
    }

    #[tokio::test]
    async fn test_empty_namespace_means_all() {
        let f = fetcher();
        let all = f.list_resources("", "").await.unwrap();
        assert_eq!(all.len(), 3);
    }
}
