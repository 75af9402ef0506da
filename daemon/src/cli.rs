use crate::config::DaemonConfig;
use clap::{ArgAction, Parser};

#[derive(Parser, Debug)]
#[command(name = "wazuh-agent-status")]
#[command(about = "Wazuh agent status daemon", long_about = None)]
#[command(version, disable_version_flag = true)]
pub struct CliArgs {
    /// Print version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    _version: (),

    /// Path to configuration file
    #[arg(short, long, default_value = "wazuh-agent-status.toml")]
    pub config: String,

    /// Write the effective configuration to the config path and exit
    #[arg(long)]
    pub init_config: bool,

    /// Override listen address
    #[arg(short, long, env = "WAZUH_STATUS_LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Override agent installation directory
    #[arg(long)]
    pub install_dir: Option<String>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log directory
    #[arg(long)]
    pub log_dir: Option<String>,

    /// Log to stderr instead of a file
    #[arg(long, conflicts_with = "log_dir")]
    pub log_stderr: bool,

    /// Override number of runtime worker threads
    #[arg(long)]
    pub runtime_threads: Option<usize>,

    /// Tokio console port (requires the `console` feature)
    #[arg(long)]
    pub console_port: Option<u16>,
}

impl CliArgs {
    pub fn apply(&self, config: &mut DaemonConfig) {
        if let Some(listen) = &self.listen {
            config.listen_addr = listen.clone();
        }
        if let Some(install_dir) = &self.install_dir {
            config.install_dir = Some(install_dir.into());
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
        if let Some(threads) = self.runtime_threads {
            config.runtime_threads = Some(threads);
        }
        if let Some(port) = self.console_port {
            config.console_port = Some(port);
        }
    }
}
