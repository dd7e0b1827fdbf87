//! SecurityEngine — full-cluster security analysis.
//!
//! One `analyze` pass scrapes Pods, Roles, ClusterRoles, NetworkPolicies
//! and Secrets through the fetcher, runs pod security-context analysis,
//! an RBAC audit, network-policy gap detection and secret exposure
//! classification, folds in the compliance checks, and commits a scored,
//! graded snapshot to a ring of the last 20.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::{info, warn};

use clusterscope_core::{Resource, ResourceFetcher};

use crate::analyzer::{security_grade, Analyzer};
use crate::compliance::{
    generate_compliance_report, ComplianceCheck, ComplianceChecker, ComplianceReport,
    ComplianceStandard,
};
use crate::scanner::{ImageScanResult, Scanner, Vulnerability};
use crate::types::{
    Capabilities, IssueSummary, PodSecurityContext, RbacRule, SecurityIssue, Severity,
};

/// Security snapshots retained.
const MAX_SNAPSHOTS: usize = 20;

/// A namespace whose pods have no NetworkPolicy protection.
#[derive(Debug, Clone, serde::Serialize)]
pub struct NetworkPolicyGap {
    pub namespace: String,
    pub pod_count: usize,
    pub description: String,
    pub remediation: String,
}

/// A secret with elevated exposure risk.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SecretExposure {
    pub name: String,
    pub namespace: String,
    #[serde(rename = "secret_type")]
    pub secret_type: String,
    pub risk_level: Severity,
    pub description: String,
    pub remediation: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub mounted_by: Vec<String>,
}

/// An over-privileged role or cluster role.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RbacFinding {
    /// "Role" or "ClusterRole".
    pub resource_type: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub issues: Vec<String>,
    pub severity: Severity,
    pub remediation: String,
}

/// The full point-in-time security posture.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SecuritySnapshot {
    pub timestamp: DateTime<Utc>,
    pub score: u8,
    pub grade: String,
    pub issues: Vec<SecurityIssue>,
    pub summary: IssueSummary,
    pub rbac_findings: Vec<RbacFinding>,
    pub network_policy_gaps: Vec<NetworkPolicyGap>,
    pub secret_exposures: Vec<SecretExposure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compliance: Option<ComplianceReport>,
    pub recommendations: Vec<String>,
    pub pod_scanned: usize,
    pub roles_audited: usize,
    pub namespaces_scanned: usize,
}

#[derive(Default)]
struct EngineState {
    last_snapshot: Option<Arc<SecuritySnapshot>>,
    snapshots: Vec<Arc<SecuritySnapshot>>,
}

/// Drives cluster security analysis against fetched resources.
pub struct SecurityEngine {
    fetcher: Option<Arc<dyn ResourceFetcher>>,
    analyzer: Analyzer,
    checker: ComplianceChecker,
    scanner: Scanner,
    state: RwLock<EngineState>,
}

impl SecurityEngine {
    /// `fetcher` may be `None`; all analysis then runs against empty
    /// inventories and degrades to an empty snapshot rather than an error.
    pub fn new(fetcher: Option<Arc<dyn ResourceFetcher>>) -> Self {
        Self {
            fetcher,
            analyzer: Analyzer::new(),
            checker: ComplianceChecker::new(ComplianceStandard::CisKubernetes),
            scanner: Scanner::new(),
            state: RwLock::new(EngineState::default()),
        }
    }

    pub fn with_standard(mut self, standard: ComplianceStandard) -> Self {
        self.checker = ComplianceChecker::new(standard);
        self
    }

    // ── Public API ──────────────────────────────────────────────────────

    /// Perform a full cluster security scan and commit a snapshot.
    pub async fn analyze(&self) -> Arc<SecuritySnapshot> {
        let mut issues: Vec<SecurityIssue> = Vec::new();
        let mut checks: Vec<ComplianceCheck> = Vec::new();
        let mut rbac_findings: Vec<RbacFinding> = Vec::new();
        let mut network_gaps: Vec<NetworkPolicyGap> = Vec::new();
        let mut secret_exposures: Vec<SecretExposure> = Vec::new();

        // 1. Pod security analysis.
        let pods = self.list("Pod").await;
        for pod in &pods {
            let ctx = extract_pod_security_context(&pod.name, &pod.namespace, &pod.data);
            issues.extend(self.analyzer.analyze_pod_security(&ctx));
            checks.extend(self.checker.check_pod_compliance(&ctx));
        }

        // 2. RBAC audit.
        let roles = self.list("Role").await;
        let cluster_roles = self.list("ClusterRole").await;
        let roles_audited = roles.len() + cluster_roles.len();

        for role in &roles {
            self.audit_role(role, false, &mut rbac_findings, &mut issues, &mut checks);
        }
        for role in &cluster_roles {
            self.audit_role(role, true, &mut rbac_findings, &mut issues, &mut checks);
        }

        // 3. Network policy gaps.
        let policies = self.list("NetworkPolicy").await;
        let covered: HashSet<&str> = policies.iter().map(|p| p.namespace.as_str()).collect();

        let mut pods_by_namespace: HashMap<&str, usize> = HashMap::new();
        for pod in &pods {
            *pods_by_namespace.entry(pod.namespace.as_str()).or_insert(0) += 1;
        }

        for (namespace, pod_count) in &pods_by_namespace {
            if covered.contains(namespace) || *pod_count == 0 {
                continue;
            }
            network_gaps.push(NetworkPolicyGap {
                namespace: namespace.to_string(),
                pod_count: *pod_count,
                description: format!(
                    "Namespace '{}' has {} pod(s) with no NetworkPolicy — all ingress/egress is unrestricted",
                    namespace, pod_count
                ),
                remediation: "Create a default-deny NetworkPolicy and explicitly allow only required traffic".into(),
            });
            issues.push(SecurityIssue {
                issue_type: "network_policy".into(),
                severity: Severity::High,
                title: "No NetworkPolicy in namespace".into(),
                description: format!("Namespace {} has no network isolation", namespace),
                remediation: "Apply a default-deny NetworkPolicy".into(),
                resource: namespace.to_string(),
                namespace: namespace.to_string(),
                timestamp: Utc::now(),
            });
        }

        // 4. Secret exposure detection.
        let secrets = self.list("Secret").await;
        let mounts = build_secret_mount_map(&pods);
        for secret in &secrets {
            if let Some(exposure) = analyze_secret(secret, &mounts) {
                issues.push(SecurityIssue {
                    issue_type: "secret_exposure".into(),
                    severity: exposure.risk_level,
                    title: "Sensitive secret detected".into(),
                    description: exposure.description.clone(),
                    remediation: exposure.remediation.clone(),
                    resource: secret.name.clone(),
                    namespace: secret.namespace.clone(),
                    timestamp: Utc::now(),
                });
                secret_exposures.push(exposure);
            }
        }

        // 5. Compliance report, if any checks accumulated.
        let compliance = if checks.is_empty() {
            None
        } else {
            Some(generate_compliance_report(self.checker.standard(), checks))
        };

        // 6. Score, grade, summary, recommendations.
        let score = self.analyzer.security_score(&issues);
        let grade = security_grade(score).to_string();
        let summary = IssueSummary::from_issues(&issues);

        let mut recommendations = self.analyzer.recommendations(&issues);
        if !network_gaps.is_empty() {
            recommendations.extend([
                "Implement NetworkPolicies in all namespaces with default-deny rules".to_string(),
                "Use Calico or Cilium for fine-grained network segmentation".to_string(),
            ]);
        }
        if !secret_exposures.is_empty() {
            recommendations.extend([
                "Rotate exposed credentials and audit secret access patterns".to_string(),
                "Use external secret managers (Vault, AWS SSM) instead of native K8s secrets".to_string(),
            ]);
        }
        let recommendations = dedup(recommendations);

        // 7. Sort by descending severity; stable sort keeps encounter order
        // within a rank.
        issues.sort_by(|a, b| b.severity.rank().cmp(&a.severity.rank()));
        rbac_findings.sort_by(|a, b| b.severity.rank().cmp(&a.severity.rank()));

        let namespaces: HashSet<&str> = pods.iter().map(|p| p.namespace.as_str()).collect();

        let snapshot = Arc::new(SecuritySnapshot {
            timestamp: Utc::now(),
            score,
            grade,
            summary,
            issues,
            rbac_findings,
            network_policy_gaps: network_gaps,
            secret_exposures,
            compliance,
            recommendations,
            pod_scanned: pods.len(),
            roles_audited,
            namespaces_scanned: namespaces.len(),
        });

        info!(
            score = snapshot.score,
            grade = %snapshot.grade,
            issues = snapshot.issues.len(),
            pods = snapshot.pod_scanned,
            "Security analysis complete"
        );

        // 8. Commit under the write lock.
        let mut state = self.state.write();
        state.last_snapshot = Some(Arc::clone(&snapshot));
        if state.snapshots.len() >= MAX_SNAPSHOTS {
            state.snapshots.remove(0);
        }
        state.snapshots.push(Arc::clone(&snapshot));

        snapshot
    }

    /// Most recent snapshot, if any analysis ran.
    pub fn last_snapshot(&self) -> Option<Arc<SecuritySnapshot>> {
        self.state.read().last_snapshot.clone()
    }

    /// Stored snapshots, oldest first.
    pub fn snapshots(&self) -> Vec<Arc<SecuritySnapshot>> {
        self.state.read().snapshots.clone()
    }

    /// The last snapshot, triggering an analysis if none exists.
    pub async fn posture(&self) -> Arc<SecuritySnapshot> {
        if let Some(snapshot) = self.last_snapshot() {
            return snapshot;
        }
        self.analyze().await
    }

    /// Proxy to the embedded image scanner.
    pub fn scan_image(&self, image: &str) -> ImageScanResult {
        self.scanner.scan_image(image)
    }

    /// CVE detail lookup via the embedded scanner.
    pub fn vulnerability_by_id(&self, cve_id: &str) -> Vulnerability {
        self.scanner.vulnerability_by_id(cve_id)
    }

    // ── Internal ────────────────────────────────────────────────────────

    async fn list(&self, kind: &str) -> Vec<Arc<Resource>> {
        let Some(fetcher) = &self.fetcher else {
            return Vec::new();
        };
        match fetcher.list_resources(kind, "").await {
            Ok(resources) => resources,
            Err(e) => {
                warn!(kind = %kind, error = %e, "Fetch failed, analyzing without");
                Vec::new()
            }
        }
    }

    fn audit_role(
        &self,
        role: &Resource,
        is_cluster: bool,
        findings: &mut Vec<RbacFinding>,
        issues: &mut Vec<SecurityIssue>,
        checks: &mut Vec<ComplianceCheck>,
    ) {
        let rules = extract_rules(&role.data);
        let role_issues = self.analyzer.analyze_rbac(&role.name, &rules);
        checks.extend(self.checker.check_rbac_compliance(&role.name, &rules));

        if !role_issues.is_empty() {
            let severity = role_issues
                .iter()
                .map(|i| i.severity)
                .max()
                .unwrap_or(Severity::Low);
            findings.push(RbacFinding {
                resource_type: if is_cluster { "ClusterRole" } else { "Role" }.into(),
                name: role.name.clone(),
                namespace: role.namespace.clone(),
                issues: role_issues.iter().map(|i| i.title.clone()).collect(),
                severity,
                remediation: "Review and restrict permissions following the principle of least privilege".into(),
            });
        }

        issues.extend(role_issues);
    }
}

// ── Extraction helpers ──────────────────────────────────────────────────

/// Read security-context fields out of a pod's opaque payload: pod-level
/// securityContext for the user settings, first-container-level for the
/// rest.
fn extract_pod_security_context(name: &str, namespace: &str, data: &Value) -> PodSecurityContext {
    let mut ctx = PodSecurityContext {
        name: name.into(),
        namespace: namespace.into(),
        ..Default::default()
    };

    let Some(spec) = data.get("spec") else {
        return ctx;
    };

    if let Some(pod_sc) = spec.get("securityContext") {
        ctx.run_as_non_root = pod_sc.get("runAsNonRoot").and_then(Value::as_bool);
        ctx.run_as_user = pod_sc.get("runAsUser").and_then(Value::as_i64);
    }

    let container_sc = spec
        .get("containers")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("securityContext"));
    if let Some(sc) = container_sc {
        ctx.privileged = sc.get("privileged").and_then(Value::as_bool);
        ctx.allow_priv_escalation = sc.get("allowPrivilegeEscalation").and_then(Value::as_bool);
        ctx.read_only_root_fs = sc.get("readOnlyRootFilesystem").and_then(Value::as_bool);
        if let Some(caps) = sc.get("capabilities") {
            ctx.capabilities = Some(Capabilities {
                add: string_vec(caps.get("add")),
                drop: string_vec(caps.get("drop")),
            });
        }
    }

    ctx
}

/// Parse RBAC rules out of a Role/ClusterRole payload.
fn extract_rules(data: &Value) -> Vec<RbacRule> {
    let Some(rules) = data.get("rules").and_then(Value::as_array) else {
        return Vec::new();
    };
    rules
        .iter()
        .map(|rule| RbacRule {
            verbs: string_vec(rule.get("verbs")),
            resources: string_vec(rule.get("resources")),
            api_groups: string_vec(rule.get("apiGroups")),
        })
        .collect()
}

/// Map `namespace/secret-name` to the pods whose volumes mount it.
fn build_secret_mount_map(pods: &[Arc<Resource>]) -> HashMap<String, Vec<String>> {
    let mut mounts: HashMap<String, Vec<String>> = HashMap::new();
    for pod in pods {
        let volumes = pod
            .data
            .get("spec")
            .and_then(|s| s.get("volumes"))
            .and_then(Value::as_array);
        let Some(volumes) = volumes else {
            continue;
        };
        for volume in volumes {
            let secret_name = volume
                .get("secret")
                .and_then(|s| s.get("secretName"))
                .and_then(Value::as_str);
            if let Some(secret_name) = secret_name {
                let key = format!("{}/{}", pod.namespace, secret_name);
                mounts.entry(key).or_default().push(pod.name.clone());
            }
        }
    }
    mounts
}

/// Classify a secret's exposure risk; `None` means not high-risk.
fn analyze_secret(secret: &Resource, mounts: &HashMap<String, Vec<String>>) -> Option<SecretExposure> {
    let secret_type = secret
        .data
        .get("type")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or("Opaque");

    let risk_level = determine_secret_risk(&secret.name, secret_type)?;

    let mount_key = format!("{}/{}", secret.namespace, secret.name);
    let mounted_by = mounts.get(&mount_key).cloned().unwrap_or_default();

    Some(SecretExposure {
        name: secret.name.clone(),
        namespace: secret.namespace.clone(),
        secret_type: secret_type.to_string(),
        risk_level,
        description: format!(
            "Secret '{}/{}' (type: {}) has elevated exposure risk",
            secret.namespace, secret.name, secret_type
        ),
        remediation: "Rotate credentials, restrict RBAC access, and consider using an external secret manager".into(),
        mounted_by,
    })
}

/// Name patterns that suggest credential material.
const SENSITIVE_NAME_PATTERNS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "credential",
    "api-key",
    "apikey",
    "private-key",
    "privatekey",
    "auth",
    "cert",
    "tls",
    "ssh-key",
    "sshkey",
    "database",
    "db-pass",
    "db-password",
];

fn determine_secret_risk(name: &str, secret_type: &str) -> Option<Severity> {
    match secret_type {
        "kubernetes.io/service-account-token" | "kubernetes.io/tls" => {
            return Some(Severity::Medium)
        }
        "kubernetes.io/dockerconfigjson"
        | "kubernetes.io/dockercfg"
        | "bootstrap.kubernetes.io/token" => return Some(Severity::High),
        _ => {}
    }

    let name = name.to_lowercase();
    if SENSITIVE_NAME_PATTERNS.iter().any(|p| name.contains(p)) {
        return Some(Severity::High);
    }
    None
}

fn string_vec(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(Value::as_str)
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.into_iter().filter(|s| seen.insert(s.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clusterscope_core::StaticFetcher;
    use serde_json::json;

    fn insecure_pod(name: &str, namespace: &str) -> Resource {
        Resource::new("Pod", namespace, name).with_data(json!({
            "spec": {
                "securityContext": {"runAsNonRoot": false},
                "containers": [{
                    "name": "app",
                    "securityContext": {
                        "privileged": true,
                        "allowPrivilegeEscalation": true,
                        "readOnlyRootFilesystem": false
                    }
                }],
                "volumes": [{"name": "creds", "secret": {"secretName": "db-password"}}]
            },
            "status": {"phase": "Running"}
        }))
    }

    fn secure_pod(name: &str, namespace: &str) -> Resource {
        Resource::new("Pod", namespace, name).with_data(json!({
            "spec": {
                "securityContext": {"runAsNonRoot": true, "runAsUser": 1000},
                "containers": [{
                    "name": "app",
                    "securityContext": {
                        "privileged": false,
                        "allowPrivilegeEscalation": false,
                        "readOnlyRootFilesystem": true,
                        "capabilities": {"drop": ["ALL"]}
                    }
                }]
            }
        }))
    }

    fn wildcard_role(name: &str) -> Resource {
        Resource::new("ClusterRole", "", name).with_data(json!({
            "rules": [{"verbs": ["*"], "resources": ["*"], "apiGroups": ["*"]}]
        }))
    }

    fn cluster_fetcher() -> Arc<StaticFetcher> {
        Arc::new(StaticFetcher::with_inventory(vec![
            insecure_pod("bad-pod", "default"),
            secure_pod("good-pod", "default"),
            wildcard_role("super-role"),
            Resource::new("Secret", "default", "db-password").with_data(json!({"type": "Opaque"})),
            Resource::new("Secret", "default", "app-config").with_data(json!({"type": "Opaque"})),
            Resource::new("NetworkPolicy", "protected", "default-deny"),
        ]))
    }

    #[tokio::test]
    async fn test_analyze_full_pipeline() {
        let engine = SecurityEngine::new(Some(cluster_fetcher()));
        let snapshot = engine.analyze().await;

        assert_eq!(snapshot.pod_scanned, 2);
        assert_eq!(snapshot.roles_audited, 1);
        assert_eq!(snapshot.namespaces_scanned, 1);
        assert!(snapshot.score < 80);
        assert!(!snapshot.issues.is_empty());

        // Issues are sorted by descending severity.
        let ranks: Vec<u8> = snapshot.issues.iter().map(|i| i.severity.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(ranks, sorted);

        // Score deductions and the summary agree with the issue list.
        assert_eq!(snapshot.summary.total, snapshot.issues.len());
    }

    #[tokio::test]
    async fn test_network_policy_gap_detected() {
        let engine = SecurityEngine::new(Some(cluster_fetcher()));
        let snapshot = engine.analyze().await;

        // Pods live in `default`, the only policy is in `protected`.
        assert_eq!(snapshot.network_policy_gaps.len(), 1);
        assert_eq!(snapshot.network_policy_gaps[0].namespace, "default");
        assert_eq!(snapshot.network_policy_gaps[0].pod_count, 2);
        assert!(snapshot
            .issues
            .iter()
            .any(|i| i.issue_type == "network_policy" && i.severity == Severity::High));
    }

    #[tokio::test]
    async fn test_secret_exposure_with_mounting_pods() {
        let engine = SecurityEngine::new(Some(cluster_fetcher()));
        let snapshot = engine.analyze().await;

        // Only the credential-named secret is flagged.
        assert_eq!(snapshot.secret_exposures.len(), 1);
        let exposure = &snapshot.secret_exposures[0];
        assert_eq!(exposure.name, "db-password");
        assert_eq!(exposure.risk_level, Severity::High);
        assert_eq!(exposure.mounted_by, vec!["bad-pod".to_string()]);
    }

    #[tokio::test]
    async fn test_rbac_finding_carries_max_severity() {
        let engine = SecurityEngine::new(Some(cluster_fetcher()));
        let snapshot = engine.analyze().await;

        assert_eq!(snapshot.rbac_findings.len(), 1);
        let finding = &snapshot.rbac_findings[0];
        assert_eq!(finding.resource_type, "ClusterRole");
        assert_eq!(finding.name, "super-role");
        // Wildcard resources are critical; that dominates.
        assert_eq!(finding.severity, Severity::Critical);
        assert!(finding.issues.iter().any(|i| i.contains("Wildcard")));
    }

    #[tokio::test]
    async fn test_compliance_report_accumulates() {
        let engine = SecurityEngine::new(Some(cluster_fetcher()));
        let snapshot = engine.analyze().await;

        let compliance = snapshot.compliance.as_ref().unwrap();
        // Two pods × 8 CIS pod checks, plus RBAC checks for the role.
        assert!(compliance.total_checks >= 16);
        assert!(compliance.failed_checks > 0);
        assert!(compliance.compliance_score < 100.0);
        assert!(compliance
            .checks
            .iter()
            .any(|c| c.id == "CIS-5.1.3" && c.resource == "super-role"));
    }

    #[tokio::test]
    async fn test_recommendations_deduplicated() {
        let engine = SecurityEngine::new(Some(cluster_fetcher()));
        let snapshot = engine.analyze().await;

        let mut unique = snapshot.recommendations.clone();
        unique.dedup();
        assert_eq!(unique.len(), snapshot.recommendations.len());
        assert!(snapshot
            .recommendations
            .iter()
            .any(|r| r.contains("NetworkPolicies")));
        assert!(snapshot
            .recommendations
            .iter()
            .any(|r| r.contains("Rotate exposed credentials")));
    }

    #[tokio::test]
    async fn test_nil_fetcher_degrades_to_empty_snapshot() {
        let engine = SecurityEngine::new(None);
        let snapshot = engine.analyze().await;

        assert_eq!(snapshot.score, 100);
        assert_eq!(snapshot.grade, "A");
        assert!(snapshot.issues.is_empty());
        assert!(snapshot.compliance.is_none());
        assert_eq!(snapshot.pod_scanned, 0);
    }

    #[tokio::test]
    async fn test_snapshot_ring_caps_at_twenty() {
        let engine = SecurityEngine::new(None);
        for _ in 0..25 {
            engine.analyze().await;
        }
        assert_eq!(engine.snapshots().len(), MAX_SNAPSHOTS);
        assert!(engine.last_snapshot().is_some());
    }

    #[tokio::test]
    async fn test_posture_analyzes_on_first_use() {
        let engine = SecurityEngine::new(None);
        assert!(engine.last_snapshot().is_none());

        let snapshot = engine.posture().await;
        assert_eq!(snapshot.score, 100);
        assert!(engine.last_snapshot().is_some());
    }

    #[test]
    fn test_extract_pod_security_context() {
        let pod = insecure_pod("bad-pod", "default");
        let ctx = extract_pod_security_context("bad-pod", "default", &pod.data);

        assert_eq!(ctx.run_as_non_root, Some(false));
        assert_eq!(ctx.privileged, Some(true));
        assert_eq!(ctx.allow_priv_escalation, Some(true));
        assert_eq!(ctx.read_only_root_fs, Some(false));
        assert!(ctx.capabilities.is_none());

        // Missing spec leaves every field unset.
        let bare = extract_pod_security_context("x", "default", &Value::Null);
        assert!(bare.run_as_non_root.is_none());
        assert!(bare.privileged.is_none());
    }

    #[test]
    fn test_extract_rules() {
        let role = wildcard_role("super-role");
        let rules = extract_rules(&role.data);
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].verbs, vec!["*"]);
        assert_eq!(rules[0].resources, vec!["*"]);
        assert_eq!(rules[0].api_groups, vec!["*"]);

        assert!(extract_rules(&Value::Null).is_empty());
    }

    #[test]
    fn test_secret_risk_classification() {
        // Type-based.
        assert_eq!(
            determine_secret_risk("anything", "kubernetes.io/service-account-token"),
            Some(Severity::Medium)
        );
        assert_eq!(
            determine_secret_risk("anything", "kubernetes.io/tls"),
            Some(Severity::Medium)
        );
        assert_eq!(
            determine_secret_risk("anything", "kubernetes.io/dockercfg"),
            Some(Severity::High)
        );
        assert_eq!(
            determine_secret_risk("anything", "bootstrap.kubernetes.io/token"),
            Some(Severity::High)
        );

        // Name-pattern based.
        assert_eq!(determine_secret_risk("db-password", "Opaque"), Some(Severity::High));
        assert_eq!(determine_secret_risk("API-KEY-prod", "Opaque"), Some(Severity::High));

        // Benign.
        assert_eq!(determine_secret_risk("app-settings", "Opaque"), None);
    }

    #[test]
    fn test_scan_image_proxy() {
        let engine = SecurityEngine::new(None);
        let result = engine.scan_image("nginx:1.19");
        assert!(result.vulnerability_count > 0);
    }
}
