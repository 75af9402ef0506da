use crate::config::ClientConfig;
use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(name = "wazuh-agent-status-client")]
#[command(about = "Wazuh agent status client", long_about = None)]
#[command(version, disable_version_flag = true)]
pub struct CliArgs {
    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    _version: (),

    /// Path to configuration file
    #[arg(short, long, default_value = "wazuh-agent-status-client.toml")]
    pub config: String,

    /// Override daemon address
    #[arg(short, long, env = "WAZUH_STATUS_DAEMON_ADDR")]
    pub daemon_addr: Option<String>,

    /// Query status and version once, print them and exit
    #[arg(long)]
    pub once: bool,

    /// Print the `--once` result as JSON
    #[arg(long, requires = "once")]
    pub json: bool,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log directory
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Log to stderr instead of a file
    #[arg(long, conflicts_with = "log_dir")]
    pub log_stderr: bool,
}

impl CliArgs {
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(addr) = &self.daemon_addr {
            config.daemon_addr = addr.clone();
        }
        if let Some(log_level) = &self.log_level {
            config.log_level = log_level.clone();
        }
        if let Some(log_dir) = &self.log_dir {
            config.log_dir = Some(log_dir.clone());
        }
        if self.log_stderr {
            config.log_dir = None;
        }
    }
}
