use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pagewarden::audit::LighthouseCli;
use pagewarden::config::Config;
use pagewarden::orchestrator::Orchestrator;
use pagewarden::server::{self, AppState};
use pagewarden::session::SessionManager;
use pagewarden::storage::HttpBucketStore;
use pagewarden::tasks::StrategyRegistry;

#[derive(Parser, Debug)]
#[command(name = "pagewarden", version)]
#[command(about = "Protocol-driven web page inspection service")]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let default_filter = if args.verbose {
        "pagewarden=debug,info"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut config = Config::from_env()?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }

    let rule_script = std::fs::read_to_string(&config.axe_script_path).with_context(|| {
        format!(
            "reading accessibility rule script {}",
            config.axe_script_path.display()
        )
    })?;

    let store = Arc::new(HttpBucketStore::new(
        &config.storage_endpoint,
        &config.storage_bucket,
        config.public_base_url.as_deref(),
    ));
    let auditor = Arc::new(LighthouseCli::default());
    let strategies = StrategyRegistry::new(
        store,
        auditor,
        rule_script.into(),
        config.link_check_cap,
    );
    let sessions = SessionManager::new(config.chrome_path.clone());
    let state = Arc::new(AppState {
        orchestrator: Orchestrator::new(sessions, strategies),
    });

    info!(env = %config.app_env, "pagewarden starting");
    server::serve(state, &config.host, config.port).await
}
