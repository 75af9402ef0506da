use crate::platform::AgentControl;
use crate::version::VersionChecker;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use protocol::UpdateProgress;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum UpdateState {
    Idle = 0,
    Running = 1,
    Disabled = 2,
}

impl UpdateState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => UpdateState::Running,
            2 => UpdateState::Disabled,
            _ => UpdateState::Idle,
        }
    }
}

impl From<UpdateState> for UpdateProgress {
    fn from(state: UpdateState) -> Self {
        match state {
            UpdateState::Running => UpdateProgress::Progressing,
            UpdateState::Idle | UpdateState::Disabled => UpdateProgress::Disable,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Succeeded,
    Failed(String),
    TimedOut,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Succeeded => f.write_str("succeeded"),
            RunOutcome::Failed(reason) => write!(f, "failed: {}", reason),
            RunOutcome::TimedOut => f.write_str("timed out"),
        }
    }
}

/// One finished update run.
#[derive(Debug, Clone)]
pub struct UpdateRun {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
}

/// Runs the agent update at most once at a time.
///
/// `Idle -> Running` is a compare-and-set on an atomic, so concurrent triggers
/// race for a single winner and never block. The run is bounded by
/// `max_duration`; at the ceiling the executor task is aborted, which drops
/// and kills any process it spawned. Every run ends with a version re-check.
pub struct UpdateOrchestrator {
    state: AtomicU8,
    control: Arc<dyn AgentControl>,
    versions: Arc<VersionChecker>,
    max_duration: Duration,
    last_run: Mutex<Option<UpdateRun>>,
}

impl UpdateOrchestrator {
    pub fn new(
        control: Arc<dyn AgentControl>,
        versions: Arc<VersionChecker>,
        max_duration: Duration,
        enabled: bool,
    ) -> Self {
        let initial = if enabled {
            UpdateState::Idle
        } else {
            UpdateState::Disabled
        };
        Self {
            state: AtomicU8::new(initial as u8),
            control,
            versions,
            max_duration,
            last_run: Mutex::new(None),
        }
    }

    pub fn state(&self) -> UpdateState {
        UpdateState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() == UpdateState::Running
    }

    pub fn last_run(&self) -> Option<UpdateRun> {
        self.last_run.lock().clone()
    }

    /// Starts an update in the background unless one is already running.
    /// Returns as soon as the decision is made.
    pub fn trigger(self: &Arc<Self>) -> TriggerOutcome {
        match self.state.compare_exchange(
            UpdateState::Idle as u8,
            UpdateState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => {
                info!("Starting agent update via {}", self.control.name());
                let this = Arc::clone(self);
                tokio::spawn(async move { this.execute().await });
                TriggerOutcome::Started
            }
            Err(current) if current == UpdateState::Disabled as u8 => {
                info!("Update requested but updates are disabled");
                TriggerOutcome::Disabled
            }
            Err(_) => {
                info!("Update requested while one is already running");
                TriggerOutcome::AlreadyRunning
            }
        }
    }

    async fn execute(self: Arc<Self>) {
        let started_at = Utc::now();
        let control = Arc::clone(&self.control);
        let mut executor = tokio::spawn(async move { control.update().await });

        let outcome = match tokio::time::timeout(self.max_duration, &mut executor).await {
            Ok(Ok(Ok(()))) => RunOutcome::Succeeded,
            Ok(Ok(Err(e))) => RunOutcome::Failed(e.to_string()),
            Ok(Err(join_error)) => RunOutcome::Failed(join_error.to_string()),
            Err(_) => {
                executor.abort();
                RunOutcome::TimedOut
            }
        };

        match &outcome {
            RunOutcome::Succeeded => info!("Agent update succeeded"),
            RunOutcome::Failed(reason) => error!("Agent update failed: {}", reason),
            RunOutcome::TimedOut => warn!(
                "Agent update exceeded {:?}; update process terminated",
                self.max_duration
            ),
        }

        *self.last_run.lock() = Some(UpdateRun {
            started_at,
            finished_at: Utc::now(),
            outcome,
        });
        self.state
            .store(UpdateState::Idle as u8, Ordering::Release);

        self.versions.check().await;
    }
}
