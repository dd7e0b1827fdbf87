//! ComplianceChecker — CIS Kubernetes Benchmark and Pod Security Standards
//! check expansion.
//!
//! Every pod evaluation emits the full CIS 5.2.x check set as pass or
//! fail/warning; RBAC evaluations emit the applicable 5.1.x checks. The
//! compliance score counts only passing checks against the total, so
//! warnings drag the score down without being failures.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::analyzer::contains_wildcard;
use crate::types::{PodSecurityContext, RbacRule, Severity};

/// Supported compliance frameworks. NIST and SOC2 reuse the CIS check set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStandard {
    CisKubernetes,
    PodSecurityStandard,
    Nist,
    Soc2,
}

impl ComplianceStandard {
    pub fn as_str(self) -> &'static str {
        match self {
            ComplianceStandard::CisKubernetes => "cis_kubernetes",
            ComplianceStandard::PodSecurityStandard => "pod_security_standard",
            ComplianceStandard::Nist => "nist",
            ComplianceStandard::Soc2 => "soc2",
        }
    }
}

impl FromStr for ComplianceStandard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cis_kubernetes" => Ok(ComplianceStandard::CisKubernetes),
            "pod_security_standard" => Ok(ComplianceStandard::PodSecurityStandard),
            "nist" => Ok(ComplianceStandard::Nist),
            "soc2" => Ok(ComplianceStandard::Soc2),
            other => Err(format!("unknown compliance standard: {}", other)),
        }
    }
}

/// Outcome of a single compliance check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warning,
    NotApplicable,
}

/// A single evaluated compliance check.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComplianceCheck {
    pub id: String,
    pub standard: ComplianceStandard,
    pub section: String,
    pub title: String,
    pub description: String,
    pub status: CheckStatus,
    pub severity: Severity,
    pub details: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub remediation: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub namespace: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregated compliance status over a set of checks.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ComplianceReport {
    pub standard: ComplianceStandard,
    pub total_checks: usize,
    pub passed_checks: usize,
    pub failed_checks: usize,
    pub warning_checks: usize,
    /// `passed / total × 100`. Warnings count in the total but never as
    /// passed.
    pub compliance_score: f64,
    pub checks: Vec<ComplianceCheck>,
    pub timestamp: DateTime<Utc>,
}

/// Generate a report from accumulated checks.
pub fn generate_compliance_report(
    standard: ComplianceStandard,
    checks: Vec<ComplianceCheck>,
) -> ComplianceReport {
    let total_checks = checks.len();
    let mut passed_checks = 0;
    let mut failed_checks = 0;
    let mut warning_checks = 0;
    for check in &checks {
        match check.status {
            CheckStatus::Pass => passed_checks += 1,
            CheckStatus::Fail => failed_checks += 1,
            CheckStatus::Warning => warning_checks += 1,
            CheckStatus::NotApplicable => {}
        }
    }

    let compliance_score = if total_checks > 0 {
        passed_checks as f64 / total_checks as f64 * 100.0
    } else {
        0.0
    };

    ComplianceReport {
        standard,
        total_checks,
        passed_checks,
        failed_checks,
        warning_checks,
        compliance_score,
        checks,
        timestamp: Utc::now(),
    }
}

/// Expands pod and RBAC state into per-standard compliance checks.
pub struct ComplianceChecker {
    standard: ComplianceStandard,
}

impl ComplianceChecker {
    pub fn new(standard: ComplianceStandard) -> Self {
        Self { standard }
    }

    pub fn standard(&self) -> ComplianceStandard {
        self.standard
    }

    pub fn check_pod_compliance(&self, ctx: &PodSecurityContext) -> Vec<ComplianceCheck> {
        match self.standard {
            ComplianceStandard::PodSecurityStandard => self.pss_checks(ctx),
            // NIST and SOC2 fall back to the CIS set.
            _ => self.cis_pod_checks(ctx),
        }
    }

    pub fn check_rbac_compliance(&self, role_name: &str, rules: &[RbacRule]) -> Vec<ComplianceCheck> {
        self.cis_rbac_checks(role_name, rules)
    }

    // ── CIS Kubernetes Benchmark: 5.2 Pod Security Policies ─────────────

    fn cis_pod_checks(&self, ctx: &PodSecurityContext) -> Vec<ComplianceCheck> {
        let mut checks = Vec::with_capacity(8);
        let subject = format!("{}/{}", ctx.namespace, ctx.name);

        // 5.2.1 privileged containers
        if ctx.privileged.unwrap_or(false) {
            checks.push(self.cis_pod_check(
                ctx,
                "CIS-5.2.1",
                "Minimize the admission of privileged containers",
                "Privileged containers have access to all Linux capabilities",
                CheckStatus::Fail,
                Severity::Critical,
                format!("Pod {} is running in privileged mode", subject),
                "Set securityContext.privileged to false or remove the field",
            ));
        } else {
            checks.push(self.cis_pod_check(
                ctx,
                "CIS-5.2.1",
                "Minimize the admission of privileged containers",
                "Privileged containers have access to all Linux capabilities",
                CheckStatus::Pass,
                Severity::Info,
                format!("Pod {} is not running in privileged mode", subject),
                "",
            ));
        }

        // 5.2.2–5.2.4 host namespace sharing is not expressed in the
        // extracted context; recorded as passing until a manifest says
        // otherwise.
        checks.push(self.cis_pod_check(
            ctx,
            "CIS-5.2.2",
            "Minimize admission of containers wishing to share the host process ID namespace",
            "Containers should not share the host process ID namespace",
            CheckStatus::Pass,
            Severity::Info,
            "HostPID not configured".into(),
            "",
        ));
        checks.push(self.cis_pod_check(
            ctx,
            "CIS-5.2.3",
            "Minimize admission of containers wishing to share the host IPC namespace",
            "Containers should not share the host IPC namespace",
            CheckStatus::Pass,
            Severity::Info,
            "HostIPC not configured".into(),
            "",
        ));
        checks.push(self.cis_pod_check(
            ctx,
            "CIS-5.2.4",
            "Minimize admission of containers wishing to share the host network namespace",
            "Containers should not share the host network namespace",
            CheckStatus::Pass,
            Severity::Info,
            "HostNetwork not configured".into(),
            "",
        ));

        // 5.2.5 allowPrivilegeEscalation
        if ctx.allow_priv_escalation.unwrap_or(true) {
            checks.push(self.cis_pod_check(
                ctx,
                "CIS-5.2.5",
                "Minimize the admission of containers with allowPrivilegeEscalation",
                "Privilege escalation allows processes to gain more privileges than their parent",
                CheckStatus::Fail,
                Severity::High,
                format!("Pod {} allows privilege escalation", subject),
                "Set securityContext.allowPrivilegeEscalation to false",
            ));
        } else {
            checks.push(self.cis_pod_check(
                ctx,
                "CIS-5.2.5",
                "Minimize the admission of containers with allowPrivilegeEscalation",
                "Privilege escalation allows processes to gain more privileges than their parent",
                CheckStatus::Pass,
                Severity::Info,
                format!("Pod {} does not allow privilege escalation", subject),
                "",
            ));
        }

        // 5.2.6 root containers
        if ctx.run_as_non_root.unwrap_or(false) {
            checks.push(self.cis_pod_check(
                ctx,
                "CIS-5.2.6",
                "Minimize the admission of root containers",
                "Containers should not run as root user",
                CheckStatus::Pass,
                Severity::Info,
                format!("Pod {} enforces non-root user", subject),
                "",
            ));
        } else {
            checks.push(self.cis_pod_check(
                ctx,
                "CIS-5.2.6",
                "Minimize the admission of root containers",
                "Containers should not run as root user",
                CheckStatus::Fail,
                Severity::High,
                format!("Pod {} may run as root user", subject),
                "Set securityContext.runAsNonRoot to true and specify a non-root user ID",
            ));
        }

        // 5.2.7 added capabilities
        let added = ctx
            .capabilities
            .as_ref()
            .map(|c| c.add.as_slice())
            .unwrap_or_default();
        if !added.is_empty() {
            checks.push(self.cis_pod_check(
                ctx,
                "CIS-5.2.7",
                "Minimize the admission of containers with added capabilities",
                "Containers should drop all capabilities and add only those required",
                CheckStatus::Warning,
                Severity::Medium,
                format!("Pod {} adds capabilities: {:?}", subject, added),
                "Remove unnecessary capabilities and use 'drop: [ALL]' first",
            ));
        } else {
            checks.push(self.cis_pod_check(
                ctx,
                "CIS-5.2.7",
                "Minimize the admission of containers with added capabilities",
                "Containers should drop all capabilities and add only those required",
                CheckStatus::Pass,
                Severity::Info,
                format!("Pod {} does not add capabilities", subject),
                "",
            ));
        }

        // 5.2.9 drop ALL
        let has_drop_all = ctx
            .capabilities
            .as_ref()
            .map(|c| c.drop.iter().any(|cap| cap.eq_ignore_ascii_case("ALL")))
            .unwrap_or(false);
        if has_drop_all {
            checks.push(self.cis_pod_check(
                ctx,
                "CIS-5.2.9",
                "Minimize the admission of containers with capabilities assigned",
                "Containers should drop all capabilities by default",
                CheckStatus::Pass,
                Severity::Info,
                format!("Pod {} drops all capabilities", subject),
                "",
            ));
        } else {
            checks.push(self.cis_pod_check(
                ctx,
                "CIS-5.2.9",
                "Minimize the admission of containers with capabilities assigned",
                "Containers should drop all capabilities by default",
                CheckStatus::Warning,
                Severity::Medium,
                format!("Pod {} does not drop all capabilities", subject),
                "Add 'capabilities: { drop: [ALL] }' to security context",
            ));
        }

        checks
    }

    // ── CIS Kubernetes Benchmark: 5.1 RBAC and Service Accounts ─────────

    fn cis_rbac_checks(&self, role_name: &str, rules: &[RbacRule]) -> Vec<ComplianceCheck> {
        let mut checks = Vec::new();

        // 5.1.1 cluster-admin usage
        if role_name == "cluster-admin" {
            checks.push(self.cis_rbac_check(
                role_name,
                "CIS-5.1.1",
                "Ensure that the cluster-admin role is only used where required",
                "The cluster-admin role provides unrestricted access",
                CheckStatus::Warning,
                Severity::High,
                "cluster-admin role detected - ensure this is necessary".into(),
                "Use more restrictive roles and follow principle of least privilege",
            ));
        }

        // 5.1.3 wildcard use
        let has_wildcard = rules.iter().any(|rule| {
            contains_wildcard(&rule.verbs)
                || contains_wildcard(&rule.resources)
                || contains_wildcard(&rule.api_groups)
        });
        if has_wildcard {
            checks.push(self.cis_rbac_check(
                role_name,
                "CIS-5.1.3",
                "Minimize wildcard use in Roles and ClusterRoles",
                "Wildcard permissions grant excessive access",
                CheckStatus::Fail,
                Severity::Critical,
                format!("Role {} uses wildcard (*) permissions", role_name),
                "Specify explicit verbs, resources, and API groups instead of wildcards",
            ));
        } else {
            checks.push(self.cis_rbac_check(
                role_name,
                "CIS-5.1.3",
                "Minimize wildcard use in Roles and ClusterRoles",
                "Wildcard permissions grant excessive access",
                CheckStatus::Pass,
                Severity::Info,
                format!("Role {} does not use wildcard permissions", role_name),
                "",
            ));
        }

        // 5.1.5 default service account usage
        if role_name == "default" {
            checks.push(self.cis_rbac_check(
                role_name,
                "CIS-5.1.5",
                "Ensure that default service accounts are not actively used",
                "Default service accounts should not be used by pods",
                CheckStatus::Warning,
                Severity::Medium,
                "Default service account detected".into(),
                "Create dedicated service accounts for each workload",
            ));
        }

        // 5.1.6 service account token mounts (informational)
        checks.push(self.cis_rbac_check(
            role_name,
            "CIS-5.1.6",
            "Ensure that Service Account Tokens are only mounted where necessary",
            "Unnecessary service account token mounts increase attack surface",
            CheckStatus::Pass,
            Severity::Info,
            "Manual verification required for automountServiceAccountToken".into(),
            "Set automountServiceAccountToken: false when not needed",
        ));

        checks
    }

    // ── Pod Security Standards ──────────────────────────────────────────

    // PSS emits failures only: a compliant pod contributes no checks.
    fn pss_checks(&self, ctx: &PodSecurityContext) -> Vec<ComplianceCheck> {
        let mut checks = Vec::new();
        let subject = format!("{}/{}", ctx.namespace, ctx.name);

        if ctx.privileged.unwrap_or(false) {
            checks.push(self.pss_check(
                ctx,
                "PSS-BASELINE-1",
                "Baseline Profile",
                "Privileged containers are disallowed",
                "Privileged pods disable most security mechanisms",
                Severity::Critical,
                format!("Pod {} is privileged", subject),
                "Remove privileged: true from security context",
            ));
        }

        if !ctx.run_as_non_root.unwrap_or(false) {
            checks.push(self.pss_check(
                ctx,
                "PSS-RESTRICTED-1",
                "Restricted Profile",
                "Running as Non-root",
                "Containers must be required to run as non-root users",
                Severity::High,
                format!("Pod {} may run as root", subject),
                "Set runAsNonRoot: true",
            ));
        }

        if ctx.allow_priv_escalation.unwrap_or(true) {
            checks.push(self.pss_check(
                ctx,
                "PSS-RESTRICTED-2",
                "Restricted Profile",
                "Privilege Escalation",
                "Privilege escalation must be disallowed",
                Severity::High,
                format!("Pod {} allows privilege escalation", subject),
                "Set allowPrivilegeEscalation: false",
            ));
        }

        checks
    }

    // ── Constructors ────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn cis_pod_check(
        &self,
        ctx: &PodSecurityContext,
        id: &str,
        title: &str,
        description: &str,
        status: CheckStatus,
        severity: Severity,
        details: String,
        remediation: &str,
    ) -> ComplianceCheck {
        ComplianceCheck {
            id: id.into(),
            standard: ComplianceStandard::CisKubernetes,
            section: "5.2 Pod Security Policies".into(),
            title: title.into(),
            description: description.into(),
            status,
            severity,
            details,
            remediation: remediation.into(),
            resource: ctx.name.clone(),
            namespace: ctx.namespace.clone(),
            timestamp: Utc::now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn cis_rbac_check(
        &self,
        role_name: &str,
        id: &str,
        title: &str,
        description: &str,
        status: CheckStatus,
        severity: Severity,
        details: String,
        remediation: &str,
    ) -> ComplianceCheck {
        ComplianceCheck {
            id: id.into(),
            standard: ComplianceStandard::CisKubernetes,
            section: "5.1 RBAC and Service Accounts".into(),
            title: title.into(),
            description: description.into(),
            status,
            severity,
            details,
            remediation: remediation.into(),
            resource: role_name.into(),
            namespace: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn pss_check(
        &self,
        ctx: &PodSecurityContext,
        id: &str,
        section: &str,
        title: &str,
        description: &str,
        severity: Severity,
        details: String,
        remediation: &str,
    ) -> ComplianceCheck {
        ComplianceCheck {
            id: id.into(),
            standard: ComplianceStandard::PodSecurityStandard,
            section: section.into(),
            title: title.into(),
            description: description.into(),
            status: CheckStatus::Fail,
            severity,
            details,
            remediation: remediation.into(),
            resource: ctx.name.clone(),
            namespace: ctx.namespace.clone(),
            timestamp: Utc::now(),
        }
    }
}
