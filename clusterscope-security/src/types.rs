//! Shared types for the security posture layer.

use chrono::{DateTime, Utc};

/// Severity scale shared by issues, compliance checks and vulnerabilities.
/// Variant order gives the rank: Critical > High > Medium > Low > Info.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn rank(self) -> u8 {
        match self {
            Severity::Info => 0,
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
            Severity::Critical => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

/// A single security configuration issue.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SecurityIssue {
    /// Category tag: "security_context", "rbac", "rbac_wildcard",
    /// "network_policy", "secret_exposure".
    #[serde(rename = "type")]
    pub issue_type: String,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub remediation: String,
    pub resource: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub timestamp: DateTime<Utc>,
}

/// Issue counts by severity. `total` covers every severity, including info.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct IssueSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl IssueSummary {
    pub fn from_issues(issues: &[SecurityIssue]) -> Self {
        let mut summary = Self {
            total: issues.len(),
            ..Default::default()
        };
        for issue in issues {
            match issue.severity {
                Severity::Critical => summary.critical += 1,
                Severity::High => summary.high += 1,
                Severity::Medium => summary.medium += 1,
                Severity::Low => summary.low += 1,
                Severity::Info => {}
            }
        }
        summary
    }
}

/// The extracted, typed view of a pod's security-relevant spec fields.
/// `None` means the field was absent from the manifest.
#[derive(Debug, Clone, Default)]
pub struct PodSecurityContext {
    pub name: String,
    pub namespace: String,
    pub run_as_non_root: Option<bool>,
    pub run_as_user: Option<i64>,
    pub read_only_root_fs: Option<bool>,
    pub privileged: Option<bool>,
    pub allow_priv_escalation: Option<bool>,
    pub capabilities: Option<Capabilities>,
}

/// Linux capabilities added to / dropped from a container.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    pub add: Vec<String>,
    pub drop: Vec<String>,
}

/// One RBAC policy rule.
#[derive(Debug, Clone, Default)]
pub struct RbacRule {
    pub verbs: Vec<String>,
    pub resources: Vec<String>,
    pub api_groups: Vec<String>,
}
