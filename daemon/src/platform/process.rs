use crate::error::{DaemonError, Result};
use std::ffi::OsStr;
use std::process::{Output, Stdio};
use tokio::process::{Child, Command};
use tracing::debug;

fn command_error(program: &OsStr, detail: impl Into<String>) -> DaemonError {
    DaemonError::Command {
        program: program.to_string_lossy().into_owned(),
        detail: detail.into(),
    }
}

fn output_excerpt(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    text.chars().take(512).collect()
}

fn checked_stdout(program: &OsStr, output: Output) -> Result<String> {
    if !output.status.success() {
        return Err(command_error(
            program,
            format!("{}: {}", output.status, output_excerpt(&output)),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Runs `program` to completion and captures its output.
///
/// The child is killed if the returned future is dropped before it finishes.
pub async fn run<P, I, S>(program: P, args: I) -> Result<Output>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| command_error(program, e.to_string()))?;
    debug!(
        "{} exited with {}",
        program.to_string_lossy(),
        output.status
    );
    Ok(output)
}

/// Like [`run`], but a non-zero exit status is an error. Returns stdout.
pub async fn run_checked<P, I, S>(program: P, args: I) -> Result<String>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    let output = run(program, args).await?;
    checked_stdout(program, output)
}

/// Like [`run_checked`], but `program` becomes the root of its own process
/// tree. Dropping the returned future before it exits kills every process in
/// that tree, including whatever the program started in the background.
pub async fn run_tree_checked<P, I, S>(program: P, args: I) -> Result<String>
where
    P: AsRef<OsStr>,
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let program = program.as_ref();
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let child = command
        .spawn()
        .map_err(|e| command_error(program, e.to_string()))?;
    let tree = ProcessTree::adopt(&child)?;

    let output = child
        .wait_with_output()
        .await
        .map_err(|e| command_error(program, e.to_string()))?;
    tree.release();

    debug!(
        "{} exited with {}",
        program.to_string_lossy(),
        output.status
    );
    checked_stdout(program, output)
}

/// Kills a child and all of its descendants when dropped, unless released
/// after the child exited on its own.
#[cfg(unix)]
struct ProcessTree {
    group: Option<nix::unistd::Pid>,
}

#[cfg(unix)]
impl ProcessTree {
    fn adopt(child: &Child) -> Result<Self> {
        // The child leads its own group, so the group id is its pid.
        let group = child
            .id()
            .and_then(|id| i32::try_from(id).ok())
            .map(nix::unistd::Pid::from_raw);
        Ok(Self { group })
    }

    fn release(mut self) {
        self.group = None;
    }
}

#[cfg(unix)]
impl Drop for ProcessTree {
    fn drop(&mut self) {
        use nix::errno::Errno;
        use nix::sys::signal::{Signal, killpg};

        let Some(group) = self.group.take() else {
            return;
        };
        match killpg(group, Signal::SIGKILL) {
            Ok(()) => debug!("Killed process group {}", group),
            Err(Errno::ESRCH) => {}
            Err(e) => tracing::warn!("Failed to kill process group {}: {}", group, e),
        }
    }
}

#[cfg(windows)]
struct ProcessTree {
    job: Option<windows::Win32::Foundation::HANDLE>,
}

#[cfg(windows)]
impl ProcessTree {
    fn adopt(child: &Child) -> Result<Self> {
        use windows::Win32::Foundation::HANDLE;
        use windows::Win32::System::JobObjects::{AssignProcessToJobObject, CreateJobObjectW};
        use windows::core::PCWSTR;

        let Some(process) = child.raw_handle() else {
            return Ok(Self { job: None });
        };
        // SAFETY: an anonymous job with default security; the handle is owned
        // by the returned value and closed on drop.
        let job = unsafe { CreateJobObjectW(None, PCWSTR::null()) }.map_err(std::io::Error::from)?;
        let tree = Self { job: Some(job) };
        // SAFETY: `process` is the live child handle owned by `child`.
        unsafe { AssignProcessToJobObject(job, HANDLE(process as isize)) }
            .map_err(std::io::Error::from)?;
        Ok(tree)
    }

    fn release(mut self) {
        use windows::Win32::Foundation::CloseHandle;

        if let Some(job) = self.job.take() {
            // SAFETY: `job` came from CreateJobObjectW and is closed once.
            let _ = unsafe { CloseHandle(job) };
        }
    }
}

#[cfg(windows)]
impl Drop for ProcessTree {
    fn drop(&mut self) {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::JobObjects::TerminateJobObject;

        let Some(job) = self.job.take() else {
            return;
        };
        // SAFETY: `job` came from CreateJobObjectW and is closed once.
        unsafe {
            if let Err(e) = TerminateJobObject(job, 1) {
                tracing::warn!("Failed to terminate update job: {}", e);
            }
            let _ = CloseHandle(job);
        }
    }
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;
    use tokio::time::Instant;

    /// Live, non-zombie process. Reads procfs, so it only answers on Linux.
    #[cfg(target_os = "linux")]
    pub(crate) fn is_alive(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.trim_start().chars().next())
                .is_some_and(|state| state != 'Z'),
            Err(_) => false,
        }
    }

    /// Waits for the pid written to `pid_file`, then for that process to go
    /// away. Returns whether it did.
    #[cfg(target_os = "linux")]
    pub(crate) async fn background_process_exits(pid_file: &Path) -> bool {
        let deadline = Instant::now() + Duration::from_secs(3);
        let pid = loop {
            if let Some(pid) = std::fs::read_to_string(pid_file)
                .ok()
                .and_then(|text| text.trim().parse::<i32>().ok())
            {
                break pid;
            }
            assert!(Instant::now() < deadline, "background pid never written");
            tokio::time::sleep(Duration::from_millis(20)).await;
        };

        while is_alive(pid) {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        true
    }

    #[tokio::test]
    async fn run_checked_returns_stdout_on_success() {
        let stdout = run_checked("sh", ["-c", "echo running"]).await.unwrap();
        assert_eq!(stdout.trim(), "running");
    }

    #[tokio::test]
    async fn run_checked_reports_non_zero_exit() {
        let err = run_checked("sh", ["-c", "echo boom >&2; exit 3"])
            .await
            .unwrap_err();
        match err {
            DaemonError::Command { program, detail } => {
                assert_eq!(program, "sh");
                assert!(detail.contains("boom"), "detail was {detail}");
            }
            other => panic!("Unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn run_reports_missing_program() {
        let err = run("/nonexistent/bin/wazuh-control", ["status"])
            .await
            .unwrap_err();
        assert!(matches!(err, DaemonError::Command { .. }));
    }

    #[tokio::test]
    async fn run_tree_checked_behaves_like_run_checked() {
        let stdout = run_tree_checked("sh", ["-c", "echo updated"]).await.unwrap();
        assert_eq!(stdout.trim(), "updated");

        let err = run_tree_checked("sh", ["-c", "exit 4"]).await.unwrap_err();
        assert!(matches!(err, DaemonError::Command { .. }));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn dropped_tree_run_kills_background_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("sleeper.pid");
        let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());

        let run = run_tree_checked("sh", ["-c", script.as_str()]);
        assert!(
            tokio::time::timeout(Duration::from_millis(500), run)
                .await
                .is_err()
        );

        assert!(background_process_exits(&pid_file).await);
    }
}
