use crate::config::ClientConfig;
use crate::display::{
    DebouncedDisplay, DisplayAxis, DisplaySink, UpdateIndicator, connection_title, service_title,
    version_title,
};
use common::DaemonApi;
use protocol::{Command, ConnectionState, Response, ServiceState, UpdateProgress, VersionCheck};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy)]
pub struct ReconcilerSettings {
    pub status_interval: Duration,
    pub version_interval: Duration,
    pub update_poll_interval: Duration,
    pub update_monitor_max: Duration,
}

impl From<&ClientConfig> for ReconcilerSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            status_interval: config.status_interval(),
            version_interval: config.version_interval(),
            update_poll_interval: config.update_poll_interval(),
            update_monitor_max: config.update_monitor_max(),
        }
    }
}

struct UpdateMonitor {
    started: Instant,
    ticker: Interval,
}

/// Keeps the display in step with the daemon.
///
/// All timers are driven from one `select!` in [`Reconciler::run`], so the
/// handlers below never race each other and at most one update monitor can
/// exist.
pub struct Reconciler<S> {
    api: Arc<dyn DaemonApi>,
    display: DebouncedDisplay<S>,
    settings: ReconcilerSettings,
    version: Option<VersionCheck>,
    monitor: Option<UpdateMonitor>,
}

impl<S: DisplaySink> Reconciler<S> {
    pub fn new(api: Arc<dyn DaemonApi>, sink: S, settings: ReconcilerSettings) -> Self {
        Self {
            api,
            display: DebouncedDisplay::new(sink),
            settings,
            version: None,
            monitor: None,
        }
    }

    pub fn display(&self) -> &DebouncedDisplay<S> {
        &self.display
    }

    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_some()
    }

    pub async fn run(&mut self, shutdown: CancellationToken) {
        let mut status_ticker = time::interval(self.settings.status_interval);
        status_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut version_ticker = time::interval(self.settings.version_interval);
        version_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = status_ticker.tick() => self.refresh_status().await,
                _ = version_ticker.tick() => self.refresh_version(true).await,
                _ = next_update_poll(&mut self.monitor), if self.monitor.is_some() => {
                    self.poll_update().await
                }
            }
        }
        debug!(
            "Reconciler stopped (update monitor active: {})",
            self.is_monitoring()
        );
    }

    /// Fetches service and connection state. Also fills in the version when
    /// it has never been shown or is unknown, without starting an update.
    pub async fn refresh_status(&mut self) {
        let (service, connection) = match self.api.request(Command::Status).await {
            Ok(Response::Status {
                service,
                connection,
            }) => (service, connection),
            Ok(other) => {
                warn!("Unexpected response to status: {}", other);
                (ServiceState::Unknown, ConnectionState::Unknown)
            }
            Err(e) => {
                warn!("Failed to fetch status: {}", e);
                (ServiceState::Unknown, ConnectionState::Unknown)
            }
        };
        self.display.show(DisplayAxis::Service, service_title(service));
        self.display
            .show(DisplayAxis::Connection, connection_title(connection));

        if matches!(self.version, None | Some(VersionCheck::Unknown)) {
            self.refresh_version(false).await;
        }
    }

    /// Fetches the version verdict. With `auto_update`, an outdated agent
    /// starts the update monitor.
    pub async fn refresh_version(&mut self, auto_update: bool) {
        let check = match self.api.request(Command::CheckVersion).await {
            Ok(Response::VersionCheck(check)) => check,
            Ok(other) => {
                warn!("Unexpected response to check-version: {}", other);
                VersionCheck::Unknown
            }
            Err(e) => {
                warn!("Failed to fetch version status: {}", e);
                VersionCheck::Unknown
            }
        };
        self.display.show(DisplayAxis::Version, version_title(&check));

        match &check {
            VersionCheck::UpToDate(_) => {
                self.display
                    .show(DisplayAxis::Update, UpdateIndicator::UpToDate.title());
            }
            VersionCheck::Outdated(version) if auto_update => {
                info!("Version v{} is outdated, starting update monitor", version);
                self.start_update_monitor().await;
            }
            VersionCheck::Outdated(_) => {
                if self.monitor.is_none() {
                    self.display
                        .show(DisplayAxis::Update, UpdateIndicator::Available.title());
                }
            }
            VersionCheck::Unknown => {
                if self.monitor.is_none() {
                    self.display
                        .show(DisplayAxis::Update, UpdateIndicator::Unknown.title());
                }
            }
        }
        self.version = Some(check);
    }

    /// Sends `update` once and starts polling its progress. Returns false if
    /// a monitor is already running.
    pub async fn start_update_monitor(&mut self) -> bool {
        if self.monitor.is_some() {
            debug!("Update monitor already running");
            return false;
        }

        match self.api.request(Command::Update).await {
            Ok(response) => debug!("update -> {}", response),
            Err(e) => warn!("Failed to send update command: {}", e),
        }

        let period = self.settings.update_poll_interval;
        let now = Instant::now();
        self.monitor = Some(UpdateMonitor {
            started: now,
            ticker: time::interval_at(now + period, period),
        });
        self.display
            .show(DisplayAxis::Update, UpdateIndicator::Updating.title());
        true
    }

    async fn poll_update(&mut self) {
        let progress = match self.api.request(Command::UpdateStatus).await {
            Ok(Response::UpdateStatus(progress)) => Some(progress),
            Ok(other) => {
                warn!("Unexpected response to update-status: {}", other);
                None
            }
            Err(e) => {
                warn!("Failed to fetch update status: {}", e);
                None
            }
        };

        match progress {
            Some(UpdateProgress::Disable) => {
                info!("Update finished, re-checking version");
                self.monitor = None;
                self.refresh_version(false).await;
                return;
            }
            Some(UpdateProgress::Progressing) => {
                self.display
                    .show(DisplayAxis::Update, UpdateIndicator::Updating.title());
            }
            None => {}
        }

        let timed_out = self
            .monitor
            .as_ref()
            .is_some_and(|monitor| monitor.started.elapsed() > self.settings.update_monitor_max);
        if timed_out {
            warn!(
                "Update monitor timed out after {:?}, stopping",
                self.settings.update_monitor_max
            );
            self.monitor = None;
            self.refresh_version(false).await;
        }
    }
}

async fn next_update_poll(monitor: &mut Option<UpdateMonitor>) {
    match monitor {
        Some(monitor) => {
            monitor.ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
