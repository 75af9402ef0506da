use super::process::{run_checked, run_tree_checked};
use super::{AgentControl, CONNECTED_MARKER};
use crate::error::Result;
use crate::status_cache::StatusSnapshot;
use async_trait::async_trait;
use protocol::{ConnectionState, ServiceState};
use std::path::PathBuf;
use tracing::{info, warn};

pub const LINUX_INSTALL_DIR: &str = "/var/ossec";
pub const MACOS_INSTALL_DIR: &str = "/Library/Ossec";

const RUNNING_MARKER: &str = "wazuh-agentd is running";

/// Linux and macOS agents, driven through `bin/wazuh-control`.
#[derive(Debug, Clone)]
pub struct WazuhControl {
    install_dir: PathBuf,
}

impl WazuhControl {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_dir: install_dir.into(),
        }
    }

    fn control_bin(&self) -> PathBuf {
        self.install_dir.join("bin").join("wazuh-control")
    }

    fn state_file(&self) -> PathBuf {
        self.install_dir
            .join("var")
            .join("run")
            .join("wazuh-agentd.state")
    }

    fn update_script(&self) -> PathBuf {
        self.install_dir
            .join("active-response")
            .join("bin")
            .join("adorsys-update.sh")
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
impl AgentControl for WazuhControl {
    fn name(&self) -> &'static str {
        "wazuh-control"
    }

    fn version_file(&self) -> PathBuf {
        self.install_dir.join("etc").join("version.txt")
    }

    async fn probe(&self) -> Result<StatusSnapshot> {
        let output = run_checked(self.control_bin(), ["status"]).await?;
        let service = if output.contains(RUNNING_MARKER) {
            ServiceState::Active
        } else {
            ServiceState::Inactive
        };
        Ok(StatusSnapshot::new(service, self.connection_state().await))
    }

    async fn pause(&self) -> Result<()> {
        run_checked(self.control_bin(), ["stop"]).await?;
        Ok(())
    }

    async fn restart(&self) -> Result<()> {
        run_checked(self.control_bin(), ["restart"]).await?;
        Ok(())
    }

    async fn update(&self) -> Result<()> {
        let script = self.update_script();
        info!("Running update script {}", script.display());
        run_tree_checked("bash", [script.as_os_str()]).await?;

        if let Err(e) = self.restart().await {
            warn!("Agent updated but restart failed: {}", e);
        }
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;

    fn write_script(path: &Path, body: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn fake_install(control_body: &str, state: Option<&str>) -> (TempDir, WazuhControl) {
        let dir = tempfile::tempdir().unwrap();
        let control = WazuhControl::new(dir.path());
        write_script(&control.control_bin(), control_body);
        if let Some(state) = state {
            let state_file = control.state_file();
            fs::create_dir_all(state_file.parent().unwrap()).unwrap();
            fs::write(state_file, state).unwrap();
        }
        (dir, control)
    }

    #[tokio::test]
    async fn probe_reports_running_and_connected_agent() {
        let (_dir, control) = fake_install(
            "echo 'wazuh-modulesd is running...'; echo 'wazuh-agentd is running...'",
            Some("# State file\nstatus='connected'\n"),
        );

        let snapshot = control.probe().await.unwrap();
        assert_eq!(
            snapshot,
            StatusSnapshot::new(ServiceState::Active, ConnectionState::Connected)
        );
    }

    #[tokio::test]
    async fn probe_reports_stopped_agent_as_inactive() {
        let (_dir, control) = fake_install(
            "echo 'wazuh-agentd not running...'",
            Some("status='disconnected'\n"),
        );

        let snapshot = control.probe().await.unwrap();
        assert_eq!(snapshot, StatusSnapshot::INACTIVE);
    }

    #[tokio::test]
    async fn missing_state_file_means_disconnected() {
        let (_dir, control) = fake_install("echo 'wazuh-agentd is running...'", None);

        let snapshot = control.probe().await.unwrap();
        assert_eq!(
            snapshot,
            StatusSnapshot::new(ServiceState::Active, ConnectionState::Disconnected)
        );
    }

    #[tokio::test]
    async fn probe_fails_when_control_exits_non_zero() {
        let (_dir, control) = fake_install("exit 1", Some("status='connected'\n"));
        assert!(control.probe().await.is_err());
    }

    #[tokio::test]
    async fn update_runs_script_then_restarts() {
        let (dir, control) = fake_install("echo \"$1\" >> \"$(dirname \"$0\")/calls\"", None);
        write_script(&control.update_script(), "exit 0");

        control.update().await.unwrap();

        let calls = fs::read_to_string(dir.path().join("bin").join("calls")).unwrap();
        assert_eq!(calls.trim(), "restart");
    }

    #[tokio::test]
    async fn failing_update_script_is_reported() {
        let (_dir, control) = fake_install("exit 0", None);
        write_script(&control.update_script(), "echo 'download failed' >&2; exit 2");

        assert!(control.update().await.is_err());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn abandoned_update_leaves_no_script_children() {
        use crate::platform::process::tests::background_process_exits;
        use std::time::Duration;

        let (dir, control) = fake_install("exit 0", None);
        let pid_file = dir.path().join("download.pid");
        write_script(
            &control.update_script(),
            &format!("sleep 30 &\necho $! > '{}'\nwait", pid_file.display()),
        );

        let update = control.update();
        assert!(
            tokio::time::timeout(Duration::from_millis(500), update)
                .await
                .is_err()
        );

        assert!(background_process_exits(&pid_file).await);
    }
}
