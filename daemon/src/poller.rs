use crate::platform::AgentControl;
use crate::status_cache::{StatusCache, StatusSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Sole writer of the [`StatusCache`].
pub struct StatusPoller {
    control: Arc<dyn AgentControl>,
    cache: Arc<StatusCache>,
    interval: Duration,
    probe_timeout: Duration,
}

impl StatusPoller {
    pub fn new(
        control: Arc<dyn AgentControl>,
        cache: Arc<StatusCache>,
        interval: Duration,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            control,
            cache,
            interval,
            probe_timeout,
        }
    }

    /// Probes once and publishes the result. A failed or hung probe publishes
    /// [`StatusSnapshot::INACTIVE`].
    pub async fn poll_once(&self) -> StatusSnapshot {
        let snapshot = match time::timeout(self.probe_timeout, self.control.probe()).await {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                warn!("Agent probe via {} failed: {}", self.control.name(), e);
                StatusSnapshot::INACTIVE
            }
            Err(_) => {
                warn!(
                    "Agent probe via {} timed out after {:?}",
                    self.control.name(),
                    self.probe_timeout
                );
                StatusSnapshot::INACTIVE
            }
        };

        let previous = self.cache.replace(snapshot);
        if previous != snapshot {
            info!("Agent status changed: {} -> {}", previous, snapshot);
        } else {
            debug!("Agent status unchanged: {}", snapshot);
        }
        snapshot
    }

    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let started = Instant::now();
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = self.poll_once() => {}
                    }
                    // A probe that outlived the interval must not be followed
                    // by an immediate catch-up tick.
                    if started.elapsed() >= self.interval {
                        ticker.reset();
                    }
                }
            }
        }
        info!("Status poller stopped");
    }
}
