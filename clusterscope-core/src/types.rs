//! The cluster resource model shared by every clusterscope layer.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::error::ScopeError;

/// A single Kubernetes object instance as fetched from the cluster.
///
/// Resources are shared as `Arc<Resource>` and treated as immutable once
/// stored; an update replaces the whole Arc, never mutates in place.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Resource {
    pub kind: String,
    #[serde(default)]
    pub namespace: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub resource_version: String,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub owner_refs: Vec<OwnerReference>,
    /// Opaque JSON payload carrying the full spec/status.
    #[serde(default)]
    pub data: Value,
}

impl Resource {
    pub fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, resource_version: &str) -> Self {
        self.resource_version = resource_version.into();
        self
    }

    pub fn with_labels(mut self, labels: &[(&str, &str)]) -> Self {
        self.labels = labels
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn id(&self) -> ResourceId {
        ResourceId {
            kind: self.kind.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

/// Reference to the owning controller of a resource.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
}

/// The primary key of a resource: `(kind, namespace, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ResourceId {
    pub kind: String,
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}/{}", self.kind, self.name)
        } else {
            write!(f, "{}/{}/{}", self.kind, self.namespace, self.name)
        }
    }
}

/// The three change kinds a watch stream or re-sync can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateType {
    Added,
    Modified,
    Deleted,
}

impl UpdateType {
    pub fn as_str(self) -> &'static str {
        match self {
            UpdateType::Added => "ADDED",
            UpdateType::Modified => "MODIFIED",
            UpdateType::Deleted => "DELETED",
        }
    }
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateType {
    type Err = ScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADDED" => Ok(UpdateType::Added),
            "MODIFIED" => Ok(UpdateType::Modified),
            "DELETED" => Ok(UpdateType::Deleted),
            other => Err(ScopeError::UnknownUpdateType(other.to_string())),
        }
    }
}

/// An incremental state update in wire form. The update type stays a string
/// until the world model validates it.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    pub update_type: String,
    pub resource: Arc<Resource>,
}

impl StateUpdate {
    pub fn new(update_type: UpdateType, resource: Arc<Resource>) -> Self {
        Self {
            update_type: update_type.as_str().to_string(),
            resource,
        }
    }
}
