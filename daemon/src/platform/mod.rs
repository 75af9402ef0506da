//! Agent control per platform family.
//!
//! Everything the daemon needs from the operating system goes through
//! [`AgentControl`]; the concrete implementation is picked once at startup by
//! [`detect`].

mod process;
mod wazuh_control;
mod windows_service;

pub use wazuh_control::WazuhControl;
pub use windows_service::WindowsServiceControl;

use crate::error::Result;
use crate::status_cache::StatusSnapshot;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Marker written to the agentd state file while the agent is connected to its
/// manager.
pub(crate) const CONNECTED_MARKER: &str = "status='connected'";

#[async_trait]
pub trait AgentControl: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// File holding the installed agent version.
    fn version_file(&self) -> PathBuf;

    /// Current service and connection state. An error means the state could
    /// not be determined at all.
    async fn probe(&self) -> Result<StatusSnapshot>;

    async fn pause(&self) -> Result<()>;

    async fn restart(&self) -> Result<()>;

    /// Runs the upgrade procedure to completion. Any process spawned here is
    /// killed if the returned future is dropped.
    async fn update(&self) -> Result<()>;
}

/// Control implementation for the platform this binary was built for.
pub fn detect(install_dir: Option<PathBuf>) -> Arc<dyn AgentControl> {
    if cfg!(target_os = "windows") {
        Arc::new(WindowsServiceControl::new(
            install_dir.unwrap_or_else(WindowsServiceControl::default_install_dir),
        ))
    } else if cfg!(target_os = "macos") {
        Arc::new(WazuhControl::new(
            install_dir.unwrap_or_else(|| PathBuf::from(wazuh_control::MACOS_INSTALL_DIR)),
        ))
    } else {
        Arc::new(WazuhControl::new(
            install_dir.unwrap_or_else(|| PathBuf::from(wazuh_control::LINUX_INSTALL_DIR)),
        ))
    }
}
