//! Typed configuration with TOML round-trip.
//!
//! Reads `clusterscope.toml` (or a custom path) and deserializes into typed
//! config structs; every section has defaults so a partial file works.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ScopeError, ScopeResult};

/// Resource kinds synchronized on every full sync.
pub const DEFAULT_RESOURCE_KINDS: &[&str] = &[
    "Pod",
    "Deployment",
    "ReplicaSet",
    "StatefulSet",
    "DaemonSet",
    "Job",
    "CronJob",
    "Service",
    "Endpoints",
    "Ingress",
    "ConfigMap",
    "Secret",
    "PersistentVolumeClaim",
    "PersistentVolume",
    "Node",
    "Namespace",
    "ServiceAccount",
    "HorizontalPodAutoscaler",
    "NetworkPolicy",
];

/// Top-level clusterscope configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScopeConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub temporal: TemporalConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

impl ScopeConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ScopeResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ScopeError::Config(format!("read {}: {}", path.display(), e)))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|e| ScopeError::Config(format!("parse {}: {}", path.display(), e)))?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Write configuration to a TOML file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ScopeResult<()> {
        let raw = toml::to_string_pretty(self)
            .map_err(|e| ScopeError::Config(format!("serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), raw)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

/// Synchronizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// How often to do a complete re-sync from the backend, in seconds.
    pub full_sync_interval_secs: u64,
    /// Resource kinds to sync.
    pub resource_kinds: Vec<String>,
    /// Namespaces to sync; empty means all namespaces.
    pub namespaces: Vec<String>,
}

impl SyncConfig {
    pub fn full_sync_interval(&self) -> Duration {
        Duration::from_secs(self.full_sync_interval_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            full_sync_interval_secs: 300,
            resource_kinds: DEFAULT_RESOURCE_KINDS.iter().map(|s| s.to_string()).collect(),
            namespaces: Vec::new(),
        }
    }
}

/// Temporal store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalConfig {
    /// Snapshots retained in the ring buffer.
    pub snapshot_capacity: usize,
    /// Seconds between background snapshots.
    pub snapshot_interval_secs: u64,
    /// Change events retained before the oldest 10% are trimmed.
    pub max_changes: usize,
}

impl TemporalConfig {
    pub fn snapshot_interval(&self) -> Duration {
        Duration::from_secs(self.snapshot_interval_secs)
    }
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            snapshot_capacity: 48,
            snapshot_interval_secs: 3600,
            max_changes: 10_000,
        }
    }
}

/// Security posture engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Compliance standard identifier (cis_kubernetes, pod_security_standard,
    /// nist, soc2).
    pub standard: String,
    /// Security snapshots retained.
    pub snapshot_history: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            standard: "cis_kubernetes".into(),
            snapshot_history: 20,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ScopeConfig::default();
        assert_eq!(config.sync.full_sync_interval_secs, 300);
        assert_eq!(config.sync.resource_kinds.len(), 19);
        assert_eq!(config.temporal.snapshot_capacity, 48);
        assert_eq!(config.temporal.max_changes, 10_000);
        assert_eq!(config.security.snapshot_history, 20);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ScopeConfig = toml::from_str(
            r#"
            [temporal]
            snapshot_capacity = 24
            snapshot_interval_secs = 1800
            max_changes = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.temporal.snapshot_capacity, 24);
        // Untouched sections keep their defaults.
        assert_eq!(config.sync.full_sync_interval_secs, 300);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = ScopeConfig::default();
        let raw = toml::to_string_pretty(&config).unwrap();
        let back: ScopeConfig = toml::from_str(&raw).unwrap();
        assert_eq!(back.sync.resource_kinds, config.sync.resource_kinds);
        assert_eq!(back.security.standard, "cis_kubernetes");
    }
}
