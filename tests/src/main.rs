pub mod integration_tests;
pub mod mock_daemon;

use anyhow::{Result, bail};
use clap::{Parser, Subcommand};
use mock_daemon::MockDaemon;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "integration-tests")]
#[command(about = "Conformance testing tool for the Wazuh agent status daemon")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run protocol conformance checks against a running daemon
    Integration {
        /// Daemon address (e.g., "127.0.0.1:50505")
        #[arg(short, long, default_value = common::DEFAULT_DAEMON_ADDR)]
        daemon_addr: String,
    },
    /// Serve the status protocol with scripted agent behaviour
    MockDaemon {
        /// Listening port
        #[arg(short, long, default_value = "50505")]
        port: u16,

        /// Version reported as installed
        #[arg(long, default_value = "4.6.0")]
        local_version: String,

        /// Version reported as published
        #[arg(long, default_value = "4.7.0")]
        remote_version: String,

        /// How long a simulated update keeps running, in seconds
        #[arg(long, default_value = "20")]
        update_secs: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Integration { daemon_addr } => {
            tracing::info!("Running integration tests against {}", daemon_addr);
            let results = integration_tests::run_all_tests(&daemon_addr).await?;
            if results.failed > 0 {
                bail!("{} of {} checks failed", results.failed, results.total_tests);
            }
        }
        Commands::MockDaemon {
            port,
            local_version,
            remote_version,
            update_secs,
        } => {
            tracing::info!(
                "Starting mock daemon: installed {}, published {}, update takes {}s",
                local_version,
                remote_version,
                update_secs
            );
            let daemon = Arc::new(MockDaemon::new(
                local_version,
                remote_version,
                Duration::from_secs(update_secs),
            ));
            daemon.run(port).await?;
        }
    }

    Ok(())
}
