use std::fmt::Debug;
use std::time::Duration;

pub const DEFAULT_DAEMON_ADDR: &str = "127.0.0.1:50505";
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(3);

/// Configuration for a connection to the status daemon
pub trait ClientConnectionConfig: Debug + Send + Sync {
    /// Daemon address to connect to
    fn daemon_addr(&self) -> String;

    /// Upper bound for establishing the TCP connection
    fn dial_timeout(&self) -> Duration {
        DEFAULT_DIAL_TIMEOUT
    }

    /// Upper bound for writing the command and reading its response line
    fn io_timeout(&self) -> Duration {
        DEFAULT_IO_TIMEOUT
    }
}

/// Plain address plus deadlines, for callers without a config file.
#[derive(Debug, Clone)]
pub struct DaemonEndpoint {
    pub addr: String,
    pub dial_timeout: Duration,
    pub io_timeout: Duration,
}

impl DaemonEndpoint {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            dial_timeout: DEFAULT_DIAL_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
        }
    }
}

impl Default for DaemonEndpoint {
    fn default() -> Self {
        Self::new(DEFAULT_DAEMON_ADDR)
    }
}

impl ClientConnectionConfig for DaemonEndpoint {
    fn daemon_addr(&self) -> String {
        self.addr.clone()
    }

    fn dial_timeout(&self) -> Duration {
        self.dial_timeout
    }

    fn io_timeout(&self) -> Duration {
        self.io_timeout
    }
}
