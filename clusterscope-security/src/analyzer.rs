//! Analyzer — pure checks over pod security contexts and RBAC rules.

use chrono::Utc;

use crate::types::{PodSecurityContext, RbacRule, SecurityIssue, Severity};

/// Capabilities that effectively grant host-level control.
const DANGEROUS_CAPABILITIES: &[&str] = &[
    "SYS_ADMIN",
    "NET_ADMIN",
    "SYS_MODULE",
    "SYS_RAWIO",
    "SYS_PTRACE",
    "SYS_BOOT",
    "MAC_ADMIN",
];

/// Resources where create/delete access enables privilege escalation or
/// credential theft.
const DANGEROUS_RESOURCES: &[&str] = &[
    "pods/exec",
    "pods/attach",
    "pods/portforward",
    "secrets",
    "clusterroles",
    "clusterrolebindings",
    "roles",
    "rolebindings",
];

/// Performs security analysis over extracted contexts and rules.
#[derive(Debug, Default)]
pub struct Analyzer;

impl Analyzer {
    pub fn new() -> Self {
        Self
    }

    /// Check one pod security context against the baseline expectations.
    pub fn analyze_pod_security(&self, ctx: &PodSecurityContext) -> Vec<SecurityIssue> {
        let mut issues = Vec::new();

        if !ctx.run_as_non_root.unwrap_or(false) {
            issues.push(pod_issue(
                ctx,
                Severity::High,
                "Pod may run as root",
                format!("Pod {}/{} does not enforce non-root user", ctx.namespace, ctx.name),
                "Set securityContext.runAsNonRoot: true and specify a non-root user ID",
            ));
        }

        if !ctx.read_only_root_fs.unwrap_or(false) {
            issues.push(pod_issue(
                ctx,
                Severity::Medium,
                "Root filesystem is writable",
                format!("Pod {}/{} allows writes to root filesystem", ctx.namespace, ctx.name),
                "Set securityContext.readOnlyRootFilesystem: true",
            ));
        }

        if ctx.privileged.unwrap_or(false) {
            issues.push(pod_issue(
                ctx,
                Severity::Critical,
                "Privileged container detected",
                format!("Pod {}/{} runs in privileged mode", ctx.namespace, ctx.name),
                "Remove securityContext.privileged or set to false. Use specific capabilities instead",
            ));
        }

        // Absent counts as allowed: the default is true.
        if ctx.allow_priv_escalation.unwrap_or(true) {
            issues.push(pod_issue(
                ctx,
                Severity::High,
                "Privilege escalation allowed",
                format!("Pod {}/{} allows privilege escalation", ctx.namespace, ctx.name),
                "Set securityContext.allowPrivilegeEscalation: false",
            ));
        }

        if let Some(capabilities) = &ctx.capabilities {
            for cap in &capabilities.add {
                if is_dangerous_capability(cap) {
                    issues.push(pod_issue(
                        ctx,
                        Severity::High,
                        &format!("Dangerous capability: {}", cap),
                        format!("Pod {}/{} adds dangerous capability {}", ctx.namespace, ctx.name, cap),
                        &format!("Remove capability {} or use a more restrictive alternative", cap),
                    ));
                }
            }
        }

        issues
    }

    /// Check RBAC rules for over-broad or dangerous grants.
    pub fn analyze_rbac(&self, role_name: &str, rules: &[RbacRule]) -> Vec<SecurityIssue> {
        let mut issues = Vec::new();

        for rule in rules {
            if contains_wildcard(&rule.verbs) {
                issues.push(rbac_issue(
                    role_name,
                    "rbac_wildcard",
                    Severity::High,
                    "Wildcard verb permissions",
                    format!("Role {} grants wildcard (*) verb permissions", role_name),
                    "Specify explicit verbs (get, list, watch, etc.) instead of wildcard",
                ));
            }

            if contains_wildcard(&rule.resources) {
                issues.push(rbac_issue(
                    role_name,
                    "rbac_wildcard",
                    Severity::Critical,
                    "Wildcard resource permissions",
                    format!("Role {} grants wildcard (*) resource permissions", role_name),
                    "Specify explicit resources instead of wildcard",
                ));
            }

            for verb in &rule.verbs {
                if verb == "create" || verb == "delete" || verb == "deletecollection" {
                    for resource in &rule.resources {
                        if DANGEROUS_RESOURCES.contains(&resource.as_str()) {
                            issues.push(rbac_issue(
                                role_name,
                                "rbac",
                                Severity::High,
                                &format!("Dangerous permission: {} {}", verb, resource),
                                format!("Role {} can {} {} resources", role_name, verb, resource),
                                "Review if this permission is necessary. Consider using more restrictive verbs",
                            ));
                        }
                    }
                }
            }

            if rule.resources.iter().any(|r| r == "secrets")
                && rule.verbs.iter().any(|v| v == "get" || v == "list")
            {
                issues.push(rbac_issue(
                    role_name,
                    "rbac",
                    Severity::Medium,
                    "Secrets read access",
                    format!("Role {} can read secrets", role_name),
                    "Ensure secrets access is necessary. Consider using service account tokens instead",
                ));
            }
        }

        issues
    }

    /// Overall score: start at 100, deduct 20/10/5/2 per
    /// critical/high/medium/low issue, floor at 0.
    pub fn security_score(&self, issues: &[SecurityIssue]) -> u8 {
        let mut score: i32 = 100;
        for issue in issues {
            score -= match issue.severity {
                Severity::Critical => 20,
                Severity::High => 10,
                Severity::Medium => 5,
                Severity::Low => 2,
                Severity::Info => 0,
            };
        }
        score.max(0) as u8
    }

    /// Remediation themes derived from the issue categories present.
    /// Wildcard findings keep their own "rbac_wildcard" tag and do not
    /// trigger the RBAC block on their own.
    pub fn recommendations(&self, issues: &[SecurityIssue]) -> Vec<String> {
        let has_security_context = issues.iter().any(|i| i.issue_type == "security_context");
        let has_rbac = issues.iter().any(|i| i.issue_type == "rbac");

        let mut recommendations = Vec::new();
        if has_security_context {
            recommendations.extend([
                "Implement Pod Security Standards (PSS) baseline or restricted profiles".to_string(),
                "Use security context constraints to enforce non-root users".to_string(),
                "Enable read-only root filesystems where possible".to_string(),
            ]);
        }
        if has_rbac {
            recommendations.extend([
                "Follow principle of least privilege for RBAC".to_string(),
                "Avoid wildcard permissions in roles".to_string(),
                "Regularly audit RBAC configurations".to_string(),
            ]);
        }
        recommendations
    }
}

/// Letter grade for a security score.
pub fn security_grade(score: u8) -> &'static str {
    match score {
        90..=u8::MAX => "A",
        80..=89 => "B",
        70..=79 => "C",
        60..=69 => "D",
        _ => "F",
    }
}

pub(crate) fn contains_wildcard(values: &[String]) -> bool {
    values.iter().any(|v| v == "*")
}

fn is_dangerous_capability(cap: &str) -> bool {
    let cap = cap.to_uppercase();
    DANGEROUS_CAPABILITIES.iter().any(|d| *d == cap)
}

fn pod_issue(
    ctx: &PodSecurityContext,
    severity: Severity,
    title: &str,
    description: String,
    remediation: &str,
) -> SecurityIssue {
    SecurityIssue {
        issue_type: "security_context".into(),
        severity,
        title: title.into(),
        description,
        remediation: remediation.into(),
        resource: ctx.name.clone(),
        namespace: ctx.namespace.clone(),
        timestamp: Utc::now(),
    }
}

fn rbac_issue(
    role_name: &str,
    issue_type: &str,
    severity: Severity,
    title: &str,
    description: String,
    remediation: &str,
) -> SecurityIssue {
    SecurityIssue {
        issue_type: issue_type.into(),
        severity,
        title: title.into(),
        description,
        remediation: remediation.into(),
        resource: role_name.into(),
        namespace: String::new(),
        timestamp: Utc::now(),
    }
}
