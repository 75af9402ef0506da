use crate::config::DaemonConfig;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, fmt};

/// Installs the global subscriber for the daemon. The returned guard flushes
/// the file writer on drop and must live as long as `main`.
pub fn init_tracing(config: &DaemonConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = common::env_filter(&config.log_level);

    let (file_layer, stderr_layer, guard) = match config.log_dir.as_deref() {
        Some(log_dir) => {
            let (non_blocking, guard) = common::rolling_file_writer(
                Path::new(log_dir),
                &config.log_file,
                config.log_max_files,
            )?;
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_ansi(false)
                .boxed();
            (Some(layer), None, Some(guard))
        }
        None => {
            let layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .boxed();
            (None, Some(layer), None)
        }
    };

    #[cfg(feature = "console")]
    let console_layer = config.console_port.map(|port| {
        console_subscriber::ConsoleLayer::builder()
            .server_addr((std::net::Ipv4Addr::LOCALHOST, port))
            .spawn()
    });

    #[cfg(not(feature = "console"))]
    if config.console_port.is_some() {
        eprintln!(
            "console_port is configured but the daemon is not built with --features console; tokio-console is disabled"
        );
    }

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer);

    #[cfg(feature = "console")]
    registry.with(console_layer).try_init()?;

    #[cfg(not(feature = "console"))]
    registry.try_init()?;

    Ok(guard)
}
