use common::{ClientConnectionConfig, DEFAULT_DAEMON_ADDR};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Address of the status daemon
    #[serde(default = "default_daemon_addr")]
    pub daemon_addr: String,

    #[serde(default = "default_dial_timeout_secs")]
    pub dial_timeout_secs: u64,

    /// Deadline for sending one command and reading its response
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,

    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,

    #[serde(default = "default_version_interval_secs")]
    pub version_interval_secs: u64,

    /// Poll interval for `update-status` while an update is in flight
    #[serde(default = "default_update_poll_interval_secs")]
    pub update_poll_interval_secs: u64,

    /// The update monitor gives up after this many seconds
    #[serde(default = "default_update_monitor_max_secs")]
    pub update_monitor_max_secs: u64,

    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log directory for file-based logging; stderr when unset
    #[serde(default = "default_log_dir")]
    pub log_dir: Option<String>,

    #[serde(default = "default_log_file")]
    pub log_file: String,

    #[serde(default = "default_log_max_files")]
    pub log_max_files: usize,
}

fn default_daemon_addr() -> String {
    DEFAULT_DAEMON_ADDR.to_string()
}

fn default_dial_timeout_secs() -> u64 {
    2
}

fn default_io_timeout_secs() -> u64 {
    3
}

fn default_status_interval_secs() -> u64 {
    10
}

fn default_version_interval_secs() -> u64 {
    4 * 60 * 60
}

fn default_update_poll_interval_secs() -> u64 {
    5
}

fn default_update_monitor_max_secs() -> u64 {
    15 * 60
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> Option<String> {
    let dir: PathBuf = if cfg!(target_os = "windows") {
        dirs::data_dir()?.join("wazuh").join("logs")
    } else {
        dirs::home_dir()?.join(".wazuh")
    };
    Some(dir.to_string_lossy().into_owned())
}

fn default_log_file() -> String {
    "wazuh-agent-status-client.log".to_string()
}

fn default_log_max_files() -> usize {
    3
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            daemon_addr: default_daemon_addr(),
            dial_timeout_secs: default_dial_timeout_secs(),
            io_timeout_secs: default_io_timeout_secs(),
            status_interval_secs: default_status_interval_secs(),
            version_interval_secs: default_version_interval_secs(),
            update_poll_interval_secs: default_update_poll_interval_secs(),
            update_monitor_max_secs: default_update_monitor_max_secs(),
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            log_max_files: default_log_max_files(),
        }
    }
}

impl ClientConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`ClientConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("dial_timeout_secs", self.dial_timeout_secs),
            ("io_timeout_secs", self.io_timeout_secs),
            ("status_interval_secs", self.status_interval_secs),
            ("version_interval_secs", self.version_interval_secs),
            ("update_poll_interval_secs", self.update_poll_interval_secs),
            ("update_monitor_max_secs", self.update_monitor_max_secs),
        ] {
            anyhow::ensure!(value > 0, "{name} must be > 0");
        }
        Ok(())
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    pub fn version_interval(&self) -> Duration {
        Duration::from_secs(self.version_interval_secs)
    }

    pub fn update_poll_interval(&self) -> Duration {
        Duration::from_secs(self.update_poll_interval_secs)
    }

    pub fn update_monitor_max(&self) -> Duration {
        Duration::from_secs(self.update_monitor_max_secs)
    }
}

impl ClientConnectionConfig for ClientConfig {
    fn daemon_addr(&self) -> String {
        self.daemon_addr.clone()
    }

    fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}
