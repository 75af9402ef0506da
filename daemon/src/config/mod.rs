mod daemon_config;

pub use daemon_config::DaemonConfig;
