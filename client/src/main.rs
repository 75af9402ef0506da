mod cli;
mod config;
mod display;
mod reconciler;

use anyhow::{Context, Result};
use clap::Parser;
use cli::CliArgs;
use common::DaemonClient;
use config::ClientConfig;
use display::LogDisplay;
use reconciler::{Reconciler, ReconcilerSettings};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut cfg = ClientConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;
    args.apply(&mut cfg);
    cfg.validate()?;

    // One-shot output goes to stdout; keep the log out of the way.
    let log_dir = if args.once { None } else { cfg.log_dir.clone() };
    let _guard = common::init_tracing(
        log_dir.as_deref().map(Path::new),
        &cfg.log_file,
        if args.once { "warn" } else { cfg.log_level.as_str() },
        cfg.log_max_files,
    )?;

    let settings = ReconcilerSettings::from(&cfg);
    let api = Arc::new(DaemonClient::new(cfg.clone()));
    let mut reconciler = Reconciler::new(api, LogDisplay, settings);

    if args.once {
        reconciler.refresh_status().await;
        let axes = reconciler.display().snapshot();
        if args.json {
            let object: serde_json::Map<String, serde_json::Value> = axes
                .into_iter()
                .map(|(axis, title)| (axis.to_string(), serde_json::Value::String(title)))
                .collect();
            println!("{}", serde_json::to_string_pretty(&object)?);
        } else {
            for (_, title) in axes {
                println!("{}", title);
            }
        }
        return Ok(());
    }

    info!(
        "Starting wazuh-agent-status-client {} (daemon {})",
        env!("CARGO_PKG_VERSION"),
        cfg.daemon_addr
    );

    let shutdown = CancellationToken::new();
    let reconciler_shutdown = shutdown.child_token();
    let reconciler_task = tokio::spawn(async move {
        reconciler.run(reconciler_shutdown).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Received shutdown signal");
    shutdown.cancel();
    reconciler_task.await.context("Reconciler task panicked")?;

    info!("Client stopped");
    Ok(())
}
