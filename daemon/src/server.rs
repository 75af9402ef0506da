use crate::config::DaemonConfig;
use crate::connection::{CommandContext, ServerConnection};
use crate::error::Result;
use crate::orchestrator::UpdateOrchestrator;
use crate::platform::AgentControl;
use crate::poller::StatusPoller;
use crate::status_cache::StatusCache;
use crate::version::{VersionChecker, VersionSource};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Pause after a failed accept, so a persistent error such as running out of
/// file descriptors does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

pub struct StatusDaemon {
    config: Arc<DaemonConfig>,
    cache: Arc<StatusCache>,
    control: Arc<dyn AgentControl>,
    versions: Arc<VersionChecker>,
    orchestrator: Arc<UpdateOrchestrator>,
}

impl StatusDaemon {
    pub fn new(
        config: DaemonConfig,
        control: Arc<dyn AgentControl>,
        versions: Arc<dyn VersionSource>,
    ) -> Self {
        let config = Arc::new(config);
        let versions = Arc::new(VersionChecker::new(versions));
        let orchestrator = Arc::new(UpdateOrchestrator::new(
            control.clone(),
            versions.clone(),
            config.update_max_duration(),
            config.update_enabled,
        ));

        Self {
            config,
            cache: Arc::new(StatusCache::new()),
            control,
            versions,
            orchestrator,
        }
    }

    /// Binds the configured address and serves until `shutdown` fires.
    /// Failing to bind is the only fatal error.
    pub async fn run(self, shutdown: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        info!("Status daemon listening on {}", self.config.listen_addr);
        self.serve(listener, shutdown).await;
        Ok(())
    }

    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) {
        let poller = StatusPoller::new(
            self.control.clone(),
            self.cache.clone(),
            self.config.poll_interval(),
            self.config.probe_timeout(),
        );
        let poller_handle = tokio::spawn(poller.run(shutdown.child_token()));

        let versions = self.versions.clone();
        tokio::spawn(async move {
            versions.check().await;
        });

        let context = CommandContext {
            status: self.cache.reader(),
            control: self.control.clone(),
            versions: self.versions.clone(),
            orchestrator: self.orchestrator.clone(),
        };

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("Accepted connection from {}", addr);
                            let connection = ServerConnection::new(
                                stream,
                                context.clone(),
                                self.config.idle_timeout(),
                                self.config.write_timeout(),
                            );
                            tokio::spawn(async move {
                                if let Err(e) = connection.run().await {
                                    debug!("Connection from {} ended: {}", addr, e);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                            tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                        }
                    }
                }
                _ = shutdown.cancelled() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        let _ = poller_handle.await;

        if let Some(run) = self.orchestrator.last_run() {
            info!(
                "Last agent update {} (started {}, finished {})",
                run.outcome, run.started_at, run.finished_at
            );
        }
        if let Some(version) = self.versions.last() {
            info!("Last known agent version: {}", version.to_check());
        }
    }
}
