mod orchestrator;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use clusterscope_core::{Resource, ScopeConfig, StaticFetcher};
use orchestrator::Orchestrator;

#[derive(Parser, Debug)]
#[command(
    name = "clusterscope",
    version,
    about = "clusterscope — in-memory observability substrate for Kubernetes clusters"
)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "clusterscope.toml")]
    config: String,

    /// Log level (overrides config file)
    #[arg(short, long)]
    log_level: Option<String>,

    /// Generate a default config file and exit
    #[arg(long)]
    generate_config: bool,

    /// Scan a container image and print the vulnerability report
    #[arg(long)]
    scan_image: Option<String>,

    /// Text query to run against the synced inventory
    #[arg(long)]
    search: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Generate Config ──────────────────────────────────────────────
    if cli.generate_config {
        let config = ScopeConfig::default();
        config.save(&cli.config)?;
        println!("Default configuration written to {}", cli.config);
        return Ok(());
    }

    // ── Load Config ──────────────────────────────────────────────────
    let config = ScopeConfig::load(&cli.config).unwrap_or_else(|e| {
        eprintln!("Warning: {}, using defaults", e);
        ScopeConfig::default()
    });

    // ── Tracing ──────────────────────────────────────────────────────
    let log_level = cli.log_level.as_deref().unwrap_or(&config.general.log_level);
    let level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("clusterscope v{}", env!("CARGO_PKG_VERSION"));

    // ── Demo Cluster ─────────────────────────────────────────────────
    // No live backend is wired in this build; a synthetic inventory
    // exercises the full substrate end to end.
    let fetcher = Arc::new(StaticFetcher::with_inventory(demo_inventory()));
    let orch = Orchestrator::new(&config, fetcher);
    orch.start().await?;

    // ── Reports ──────────────────────────────────────────────────────
    let overview = orch.query().cluster_overview();
    println!("── Cluster overview ──");
    println!("{}", serde_json::to_string_pretty(&overview)?);

    let snapshot = orch.analyze_security().await;
    println!("── Security posture ──");
    println!(
        "score={} grade={} issues={} rbac_findings={} network_gaps={} secret_exposures={}",
        snapshot.score,
        snapshot.grade,
        snapshot.issues.len(),
        snapshot.rbac_findings.len(),
        snapshot.network_policy_gaps.len(),
        snapshot.secret_exposures.len(),
    );
    if let Some(compliance) = &snapshot.compliance {
        println!(
            "compliance: {}/{} checks passed ({:.1}%)",
            compliance.passed_checks, compliance.total_checks, compliance.compliance_score
        );
    }
    for rec in &snapshot.recommendations {
        println!("  - {}", rec);
    }

    // ── Incremental Path ─────────────────────────────────────────────
    // Push one watch-style update through the synchronizer, then read the
    // resource's event history back out of the temporal store.
    let bumped = Arc::new(
        Resource::new("Pod", "default", "web-7f9b")
            .with_version("102")
            .with_labels(&[("app", "web"), ("tier", "frontend")])
            .with_data(json!({"status": {"phase": "Running"}})),
    );
    orch.synchronizer().apply_update("MODIFIED", bumped)?;

    let now = chrono::Utc::now();
    let history = orch.temporal().get_event_history(
        "Pod",
        "default",
        "web-7f9b",
        now - chrono::Duration::minutes(5),
        now,
    )?;
    println!("── Event history: Pod/default/web-7f9b ({} events) ──", history.len());
    println!("{}", serde_json::to_string_pretty(&history)?);

    if let Some(image) = &cli.scan_image {
        let report = orch.security().scan_image(image);
        println!("── Image scan: {} ──", image);
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    if let Some(query) = &cli.search {
        let matches = orch.query().find_resources_matching_text(query, 0);
        println!("── Search: {:?} ({} matches) ──", query, matches.len());
        for r in matches {
            println!("  {}", r.id());
        }
    }

    println!("── Status ──");
    println!("{}", serde_json::to_string_pretty(&orch.status())?);

    orch.stop().await;
    Ok(())
}

/// A small synthetic cluster with enough variety to exercise every
/// analysis path: a privileged pod, a hardened pod, a wildcard role,
/// sensitive secrets and a partially covered namespace set.
fn demo_inventory() -> Vec<Resource> {
    vec![
        Resource::new("Namespace", "", "default"),
        Resource::new("Namespace", "", "payments"),
        Resource::new("Node", "", "worker-1").with_data(json!({
            "status": {"phase": "Ready"}
        })),
        Resource::new("Pod", "default", "web-7f9b")
            .with_version("101")
            .with_labels(&[("app", "web"), ("tier", "frontend")])
            .with_data(json!({
                "spec": {
                    "securityContext": {"runAsNonRoot": true, "runAsUser": 1000},
                    "containers": [{
                        "name": "web",
                        "image": "nginx:1.25",
                        "securityContext": {
                            "privileged": false,
                            "allowPrivilegeEscalation": false,
                            "readOnlyRootFilesystem": true,
                            "capabilities": {"drop": ["ALL"]}
                        }
                    }]
                },
                "status": {"phase": "Running"}
            })),
        Resource::new("Pod", "default", "legacy-agent")
            .with_version("57")
            .with_labels(&[("app", "agent")])
            .with_data(json!({
                "spec": {
                    "containers": [{
                        "name": "agent",
                        "image": "agent:1.2-legacy",
                        "securityContext": {
                            "privileged": true,
                            "allowPrivilegeEscalation": true,
                            "capabilities": {"add": ["SYS_ADMIN"]}
                        }
                    }],
                    "volumes": [{"name": "creds", "secret": {"secretName": "payments-db-password"}}]
                },
                "status": {"phase": "Running"}
            })),
        Resource::new("Pod", "payments", "ledger-0")
            .with_version("12")
            .with_labels(&[("app", "ledger")])
            .with_data(json!({
                "spec": {
                    "securityContext": {"runAsNonRoot": true},
                    "containers": [{"name": "ledger", "image": "ledger:2.4"}]
                },
                "status": {"phase": "Running"}
            })),
        Resource::new("Deployment", "default", "web")
            .with_labels(&[("app", "web")]),
        Resource::new("Service", "default", "web")
            .with_labels(&[("app", "web")]),
        Resource::new("ClusterRole", "", "ops-admin").with_data(json!({
            "rules": [{"verbs": ["*"], "resources": ["*"], "apiGroups": ["*"]}]
        })),
        Resource::new("Role", "default", "secret-reader").with_data(json!({
            "rules": [{"verbs": ["get", "list"], "resources": ["secrets"], "apiGroups": [""]}]
        })),
        Resource::new("Secret", "default", "payments-db-password").with_data(json!({
            "type": "Opaque"
        })),
        Resource::new("Secret", "default", "registry-pull").with_data(json!({
            "type": "kubernetes.io/dockerconfigjson"
        })),
        Resource::new("NetworkPolicy", "payments", "default-deny"),
    ]
}
