mod cli;
mod config;
mod connection;
mod error;
mod orchestrator;
mod platform;
mod poller;
mod server;
mod status_cache;
mod telemetry;
mod version;

use anyhow::{Context, Result};
use clap::Parser;
use cli::CliArgs;
use config::DaemonConfig;
use server::StatusDaemon;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use version::HttpVersionSource;

fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut cfg = DaemonConfig::load_or_default(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config))?;
    args.apply(&mut cfg);
    cfg.validate()?;

    if args.init_config {
        cfg.save(&args.config)
            .with_context(|| format!("Failed to write configuration to {}", args.config))?;
        println!("Configuration written to {}", args.config);
        return Ok(());
    }

    let _guard = telemetry::init_tracing(&cfg)?;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    if let Some(threads) = cfg.runtime_threads {
        builder.worker_threads(threads);
    }
    let runtime = builder
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(run(cfg))
}

async fn run(cfg: DaemonConfig) -> Result<()> {
    info!("Starting wazuh-agent-status {}", env!("CARGO_PKG_VERSION"));
    info!("Listen address: {}", cfg.listen_addr);
    info!("Poll interval: {:?}", cfg.poll_interval());
    info!("Updates enabled: {}", cfg.update_enabled);
    if let Some(threads) = cfg.runtime_threads {
        info!("Runtime threads: {}", threads);
    } else {
        info!("Runtime threads: default (CPU cores)");
    }
    if let Some(console_port) = cfg.console_port {
        #[cfg(feature = "console")]
        info!(
            "tokio-console enabled on 127.0.0.1:{} (connect with: tokio-console http://localhost:{})",
            console_port, console_port
        );
        #[cfg(not(feature = "console"))]
        info!(
            "console_port={} configured but build is missing --features console",
            console_port
        );
    }
    if cfg.listens_beyond_loopback() {
        warn!(
            "listen_addr {} is not a loopback address; agent control commands are unauthenticated",
            cfg.listen_addr
        );
    }

    let control = platform::detect(cfg.install_dir.clone());
    info!(
        "Agent control: {} (version file {})",
        control.name(),
        control.version_file().display()
    );

    let versions = HttpVersionSource::new(
        control.version_file(),
        cfg.version_url.clone(),
        cfg.version_fetch_timeout(),
    )?;

    let daemon = StatusDaemon::new(cfg, control, Arc::new(versions));

    let shutdown = CancellationToken::new();
    let daemon_shutdown = shutdown.child_token();
    let mut daemon_task = tokio::spawn(daemon.run(daemon_shutdown));

    tokio::select! {
        result = &mut daemon_task => {
            result.context("Daemon task panicked")??;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            shutdown.cancel();
            daemon_task.await.context("Daemon task panicked")??;
        }
    }

    info!("Shutting down wazuh-agent-status");
    Ok(())
}
