use super::process::{run_checked, run_tree_checked};
use super::{AgentControl, CONNECTED_MARKER};
use crate::error::Result;
use crate::status_cache::StatusSnapshot;
use async_trait::async_trait;
use protocol::{ConnectionState, ServiceState};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

const POWERSHELL: &str = r"C:\Windows\System32\WindowsPowerShell\v1.0\powershell.exe";
const SERVICE_NAME: &str = "WazuhSvc";
const DEFAULT_INSTALL_DIR: &str = r"C:\Program Files (x86)\ossec-agent";

/// Service start and stop are asynchronous on Windows; give the service
/// manager this long before the next step.
const SETTLE_DELAY: Duration = Duration::from_secs(5);

/// Windows agent, driven through the service manager via PowerShell.
#[derive(Debug, Clone)]
pub struct WindowsServiceControl {
    install_dir: PathBuf,
    settle_delay: Duration,
}

impl WindowsServiceControl {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
            settle_delay: SETTLE_DELAY,
        }
    }

    pub fn default_install_dir() -> PathBuf {
        PathBuf::from(DEFAULT_INSTALL_DIR)
    }

    fn state_file(&self) -> PathBuf {
        self.install_dir.join("wazuh-agent.state")
    }

    fn update_script(&self) -> PathBuf {
        self.install_dir.join("adorsys-update.ps1")
    }

    fn service_command(verb: &str) -> String {
        format!("{verb}-Service -Name {SERVICE_NAME}")
    }

    fn update_command(&self) -> String {
        // Single quotes inside a PowerShell single-quoted string are doubled.
        let script = self.update_script().display().to_string().replace('\'', "''");
        format!("& '{script}'")
    }

    async fn powershell(command: &str) -> Result<String> {
        run_checked(POWERSHELL, ["-NoProfile", "-Command", command]).await
    }

    async fn stop(&self) -> Result<()> {
        Self::powershell(&Self::service_command("Stop")).await?;
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    async fn connection_state(&self) -> ConnectionState {
        match tokio::fs::read_to_string(self.state_file()).await {
            Ok(content) if content.contains(CONNECTED_MARKER) => ConnectionState::Connected,
            Ok(_) => ConnectionState::Disconnected,
            Err(e) => {
                warn!(
                    "Failed to read agent state file {}: {}",
                    self.state_file().display(),
                    e
                );
                ConnectionState::Disconnected
            }
        }
    }
}

#[async_trait]
impl AgentControl for WindowsServiceControl {
    fn name(&self) -> &'static str {
        "windows-service"
    }

    fn version_file(&self) -> PathBuf {
        self.install_dir.join("version.txt")
    }

    async fn probe(&self) -> Result<StatusSnapshot> {
        let output = Self::powershell(&Self::service_command("Get")).await?;
        let service = if output.contains("Running") {
            ServiceState::Active
        } else {
            ServiceState::Inactive
        };
        Ok(StatusSnapshot::new(service, self.connection_state().await))
    }

    async fn pause(&self) -> Result<()> {
        self.stop().await
    }

    async fn restart(&self) -> Result<()> {
        if let Err(e) = self.stop().await {
            warn!("Stopping {} before restart failed: {}", SERVICE_NAME, e);
        }
        Self::powershell(&Self::service_command("Start")).await?;
        tokio::time::sleep(self.settle_delay).await;
        Ok(())
    }

    async fn update(&self) -> Result<()> {
        Self::powershell(
            "Set-ExecutionPolicy -Scope CurrentUser -ExecutionPolicy RemoteSigned -Force",
        )
        .await?;

        info!("Running update script {}", self.update_script().display());
        let update = self.update_command();
        run_tree_checked(POWERSHELL, ["-NoProfile", "-Command", update.as_str()]).await?;

        if let Err(e) = self.restart().await {
            warn!("Agent updated but restart failed: {}", e);
        }
        Ok(())
    }
}
