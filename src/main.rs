//! covert-gate
//!
//! ```text
//!                 ┌──────────────────────────── GATE ─────────────────────────────┐
//!                 │                                                               │
//!  Request ──────▶│ request id → trace span (no URI) → dispatch                   │
//!                 │                                      │                        │
//!                 │                  namespace or decoy? ├── no ──▶ 404           │
//!                 │                                      ▼                        │
//!                 │   origin → allowlist → honeypot → rate limit → credential     │
//!                 │      │          │           │           │            │        │
//!                 │      └──────────┴───────────┴───────────┴────────────┴─▶ 404  │
//!                 │                                                   │           │
//!                 │                                                   ▼           │
//!  Response ◀─────│                                       payload / rotation      │
//!                 │                                                               │
//!                 │   audit: subscribers · tracing target "audit" · JSON lines    │
//!                 └───────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use covert_gate::admin::StatusPayload;
use covert_gate::config::watcher::ConfigWatcher;
use covert_gate::config::{load_config, GateConfig};
use covert_gate::lifecycle::{launch, signals};
use covert_gate::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "covert-gate", version, about = "Hidden, rate-limited operator endpoint")]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Load and validate the configuration, then exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GateConfig::default(),
    };

    if cli.check {
        println!("configuration ok");
        return Ok(());
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "covert-gate starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let handle = launch(config, listener, Arc::new(StatusPayload::new())).await?;

    // Keep the watcher alive for the lifetime of the process.
    let _watcher = match &cli.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let watcher = watcher.run()?;
            let gate = handle.gate().clone();
            tokio::spawn(async move {
                while let Some(next) = updates.recv().await {
                    if let Err(e) = gate.reload_policy(&next) {
                        tracing::error!(error = %e, "Access policy reload rejected");
                    }
                }
            });
            Some(watcher)
        }
        None => None,
    };

    signals::wait_for_termination().await;
    handle.stop().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
