//! Tessera Node: entry point.
//!
//! Loads the TOML configuration, reads secrets from the environment,
//! opens the store and serves the agent over HTTP.

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tessera_node::config::{Secrets, TesseraConfig};
use tessera_node::node::TesseraNode;

/// Tessera Node
#[derive(Parser, Debug)]
#[command(name = "tessera-node", version, about = "Tessera DID and credential agent")]
struct Args {
    /// Path to the configuration file (TOML).
    #[arg(short, long, default_value = "tessera.toml")]
    config: PathBuf,

    /// Override the API port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the data directory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,

    /// Generate a default config file and exit.
    #[arg(long)]
    init: bool,
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Handle --init flag
    if args.init {
        let config = TesseraConfig::default();
        config.save(&args.config)?;
        init_tracing(&config.logging.level, &config.logging.format);
        tracing::info!(path = %args.config.display(), "wrote default config");
        return Ok(());
    }

    // Load configuration
    let mut config = TesseraConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(api_port) = args.api_port {
        config.api.port = api_port;
    }
    if let Some(ref data_dir) = args.data_dir {
        config.storage.data_dir = data_dir.clone();
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }

    init_tracing(&config.logging.level, &config.logging.format);
    tracing::info!("Tessera Node v{}", env!("CARGO_PKG_VERSION"));

    let secrets = Secrets::from_env()?;
    let node = TesseraNode::new(config, &secrets)?;
    drop(secrets);

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        tracing::info!("received shutdown signal");
    };

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "API server error");
                return Err(e);
            }
        }
        _ = shutdown => {
            tracing::info!("initiating graceful shutdown");
        }
    }

    tracing::info!("Tessera node exited cleanly");
    Ok(())
}
