use crate::error::DaemonError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_VERSION_URL: &str =
    "https://raw.githubusercontent.com/ADORSYS-GIS/wazuh-agent/main/version.txt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Address of the command protocol listener (loopback only in practice)
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Seconds between two agent probes
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// A probe still running after this many seconds counts as failed
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,

    /// When false, `update` is acknowledged but never runs
    #[serde(default = "default_update_enabled")]
    pub update_enabled: bool,

    /// Hard ceiling for one update run
    #[serde(default = "default_update_max_duration_secs")]
    pub update_max_duration_secs: u64,

    /// Idle client connections are closed after this many seconds
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,

    /// Plain-text file holding the latest published agent version
    #[serde(default = "default_version_url")]
    pub version_url: String,

    #[serde(default = "default_version_fetch_timeout_secs")]
    pub version_fetch_timeout_secs: u64,

    /// Agent installation root; the platform default is used when unset
    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log directory for file-based logging; stderr when unset
    #[serde(default = "default_log_dir")]
    pub log_dir: Option<String>,

    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// Number of rotated log files kept on disk
    #[serde(default = "default_log_max_files")]
    pub log_max_files: usize,

    #[serde(default)]
    pub console_port: Option<u16>,

    /// Number of Tokio runtime worker threads (defaults to CPU cores)
    #[serde(default)]
    pub runtime_threads: Option<usize>,
}

fn default_listen_addr() -> String {
    "127.0.0.1:50505".to_string()
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_probe_timeout_secs() -> u64 {
    30
}

fn default_update_enabled() -> bool {
    true
}

fn default_update_max_duration_secs() -> u64 {
    15 * 60
}

fn default_idle_timeout_secs() -> u64 {
    300
}

fn default_write_timeout_secs() -> u64 {
    3
}

fn default_version_url() -> String {
    DEFAULT_VERSION_URL.to_string()
}

fn default_version_fetch_timeout_secs() -> u64 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_dir() -> Option<String> {
    if cfg!(target_os = "windows") {
        Some(r"C:\ProgramData\wazuh\logs".to_string())
    } else {
        Some("/var/log".to_string())
    }
}

fn default_log_file() -> String {
    "wazuh-agent-status.log".to_string()
}

fn default_log_max_files() -> usize {
    3
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            poll_interval_secs: default_poll_interval_secs(),
            probe_timeout_secs: default_probe_timeout_secs(),
            update_enabled: default_update_enabled(),
            update_max_duration_secs: default_update_max_duration_secs(),
            idle_timeout_secs: default_idle_timeout_secs(),
            write_timeout_secs: default_write_timeout_secs(),
            version_url: default_version_url(),
            version_fetch_timeout_secs: default_version_fetch_timeout_secs(),
            install_dir: None,
            log_level: default_log_level(),
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            log_max_files: default_log_max_files(),
            console_port: None,
            runtime_threads: None,
        }
    }
}

impl DaemonConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: DaemonConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`DaemonConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), DaemonError> {
        self.listen_addr.parse::<SocketAddr>().map_err(|e| {
            DaemonError::Configuration(format!("invalid listen_addr '{}': {e}", self.listen_addr))
        })?;
        for (name, value) in [
            ("poll_interval_secs", self.poll_interval_secs),
            ("probe_timeout_secs", self.probe_timeout_secs),
            ("update_max_duration_secs", self.update_max_duration_secs),
            ("idle_timeout_secs", self.idle_timeout_secs),
            ("write_timeout_secs", self.write_timeout_secs),
            ("version_fetch_timeout_secs", self.version_fetch_timeout_secs),
        ] {
            if value == 0 {
                return Err(DaemonError::Configuration(format!("{name} must be > 0")));
            }
        }
        if self.runtime_threads == Some(0) {
            return Err(DaemonError::Configuration(
                "runtime_threads must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// True when the listener would accept connections from other hosts.
    pub fn listens_beyond_loopback(&self) -> bool {
        self.listen_addr
            .parse::<SocketAddr>()
            .map(|addr| !addr.ip().is_loopback())
            .unwrap_or(false)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn update_max_duration(&self) -> Duration {
        Duration::from_secs(self.update_max_duration_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    pub fn version_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.version_fetch_timeout_secs)
    }
}
