//! pollarisd — the Pollaris daemon.
//!
//! Runs the template registry and the target lifecycle service in one
//! process over an in-process fabric (this node is sole member and leader
//! of both services). Multi-node deployments swap in a real fabric behind
//! the same interfaces.
//!
//! # Usage
//!
//! ```text
//! pollarisd --port 8443 --data-dir /var/lib/pollaris \
//!     --templates /etc/pollaris/templates.json \
//!     --links /etc/pollaris/links.json
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use pollaris_fabric::{InMemoryReplicatedMap, InProcessFabric};
use pollaris_registry::{Pollaris, PollarisRegistry};
use pollaris_state::TargetStore;
use pollaris_targets::{LinkBinding, LinkResolver, TargetService};

#[derive(Parser)]
#[command(name = "pollarisd", about = "Pollaris daemon")]
struct Cli {
    /// Port to listen on.
    #[arg(long, default_value = "8443")]
    port: u16,

    /// Data directory for persistent state.
    #[arg(long, default_value = "/var/lib/pollaris")]
    data_dir: PathBuf,

    /// JSON file with the initial template set.
    #[arg(long)]
    templates: Option<PathBuf>,

    /// JSON file mapping links ids to pipeline service bindings.
    #[arg(long)]
    links: Option<PathBuf>,

    /// Stabilisation delay before boot recovery, in seconds.
    #[arg(long, default_value = "30")]
    recovery_delay_secs: u64,

    /// Node ID of this process in the service fabric.
    #[arg(long, default_value = "pollaris-1")]
    node_id: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pollarisd=debug,pollaris=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    info!("pollaris daemon starting");

    // Ensure data directory exists.
    std::fs::create_dir_all(&cli.data_dir)?;
    let db_path = cli.data_dir.join("targets.redb");

    // ── Initialize subsystems ──────────────────────────────────

    // Target store. A store that cannot open is unrecoverable at startup.
    let store = TargetStore::open(&db_path)?;
    info!(path = ?db_path, "target store opened");

    // Fabric: this node is member and leader of both services.
    let fabric = Arc::new(InProcessFabric::single_node(
        cli.node_id.clone(),
        &[pollaris_registry::service_id(), pollaris_targets::service_id()],
    ));
    info!(node_id = %cli.node_id, "fabric initialized");

    // Template registry, seeded from the boot template set if given.
    let initial = match &cli.templates {
        Some(path) => {
            let raw = std::fs::read_to_string(path)?;
            let templates: Vec<Pollaris> = serde_json::from_str(&raw)?;
            info!(path = ?path, count = templates.len(), "loaded initial templates");
            templates
        }
        None => Vec::new(),
    };
    let registry = Arc::new(PollarisRegistry::with_seed(
        Arc::new(InMemoryReplicatedMap::<Pollaris>::new()),
        initial,
    )?);
    info!("template registry initialized");

    // Link resolver, loaded from configuration.
    let links = Arc::new(LinkResolver::new());
    if let Some(path) = &cli.links {
        let raw = std::fs::read_to_string(path)?;
        let bindings: HashMap<String, LinkBinding> = serde_json::from_str(&raw)?;
        let count = bindings.len();
        for (links_id, binding) in bindings {
            links.add_link(links_id, binding);
        }
        info!(path = ?path, count, "link bindings loaded");
    }

    // Target lifecycle service.
    let targets = Arc::new(TargetService::new(store, links, fabric));
    info!("target service initialized");

    // Boot recovery: leader-gated replay of live targets.
    let recovery = targets.spawn_recovery(Duration::from_secs(cli.recovery_delay_secs));

    // ── Start API server ───────────────────────────────────────

    let router = pollaris_api::build_router(registry, targets);
    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));

    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    let server = axum::serve(listener, router).with_graceful_shutdown(async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
    });

    server.await?;

    recovery.abort();
    info!("pollaris daemon stopped");
    Ok(())
}
