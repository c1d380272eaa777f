//! agentfeedd - AgentFeed HTTP daemon
//!
//! Serves the feed API and per-thread live streams, dispatching mentioned
//! agents to the chat backend (or canned replies when no API key is set).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agentfeed_core::{
    AgentRegistry, Orchestrator, OrchestratorConfig, StaticAgentRegistry, TracingHook, METRICS,
};
use agentfeed_llm::{select_executor, ChatConfig};
use agentfeedd::{router, AppState};
use anyhow::{Context, Result};
use clap::Parser;
use feed_state::{PostStore, SurrealPostStore};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "agentfeedd")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "AgentFeed daemon: mention orchestration and live thread feeds", long_about = None)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "AGENTFEED_BIND", default_value = "127.0.0.1:8080")]
    bind: String,

    /// Agent registry file (TOML); the stock agents are used when omitted
    #[arg(long, env = "AGENTFEED_AGENTS")]
    agents: Option<PathBuf>,

    /// SurrealDB endpoint (e.g. surrealkv://data/feed, ws://host:8000);
    /// in-memory when omitted
    #[arg(long, env = "AGENTFEED_DATABASE")]
    database: Option<String>,

    /// Maximum agent runs executing at once
    #[arg(long)]
    max_concurrent_runs: Option<usize>,

    /// Per-run executor deadline in seconds
    #[arg(long)]
    run_timeout_secs: Option<u64>,

    /// Pending events buffered per live subscriber
    #[arg(long)]
    subscriber_queue: Option<usize>,

    /// Recent thread posts handed to each agent
    #[arg(long)]
    context_posts: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// Environment first, flags on top.
    fn orchestrator_config(&self) -> Result<OrchestratorConfig> {
        let mut config = OrchestratorConfig::from_env()?;
        if let Some(n) = self.max_concurrent_runs {
            config = config.with_max_concurrent_runs(n);
        }
        if let Some(secs) = self.run_timeout_secs {
            config = config.with_run_timeout(Duration::from_secs(secs));
        }
        if let Some(n) = self.subscriber_queue {
            config = config.with_subscriber_queue_capacity(n);
        }
        if let Some(n) = self.context_posts {
            config = config.with_context_posts(n);
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    agentfeed_core::init_tracing(cli.json, level);

    let config = cli.orchestrator_config()?;

    let registry = match &cli.agents {
        Some(path) => StaticAgentRegistry::from_file(path)
            .with_context(|| format!("Failed to load agent registry {}", path.display()))?,
        None => StaticAgentRegistry::builtin().context("Failed to load stock agents")?,
    };
    info!(agents = registry.enabled_handles().len(), "agent registry ready");

    let store: Arc<dyn PostStore> = match &cli.database {
        Some(url) => Arc::new(
            SurrealPostStore::connect(url)
                .await
                .with_context(|| format!("Failed to connect to {url}"))?,
        ),
        None => Arc::new(
            SurrealPostStore::in_memory()
                .await
                .context("Failed to start in-memory store")?,
        ),
    };

    let executor = select_executor(ChatConfig::from_env()?)?;

    let orchestrator = Orchestrator::builder(Arc::new(registry), store, executor)
        .config(config)
        .hook(Arc::new(TracingHook))
        .build()?;

    let app = router(AppState::new(Arc::new(orchestrator)));
    let listener = tokio::net::TcpListener::bind(&cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    info!(addr = %listener.local_addr()?, "agentfeedd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    METRICS.flush();
    info!("agentfeedd stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
