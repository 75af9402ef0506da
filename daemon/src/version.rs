use crate::error::{DaemonError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use protocol::VersionCheck;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where the installed and the published agent versions come from.
#[async_trait]
pub trait VersionSource: Send + Sync {
    async fn local_version(&self) -> Result<String>;
    async fn remote_version(&self) -> Result<String>;
}

fn non_empty(value: &str, what: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(DaemonError::Version(format!("{what} is empty")));
    }
    Ok(value.to_string())
}

/// Local version from the agent's version file, remote version from a
/// plain-text document over HTTPS.
pub struct HttpVersionSource {
    version_file: PathBuf,
    url: String,
    client: reqwest::Client,
}

impl HttpVersionSource {
    pub fn new(version_file: PathBuf, url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("wazuh-agent-status/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            version_file,
            url,
            client,
        })
    }
}

#[async_trait]
impl VersionSource for HttpVersionSource {
    async fn local_version(&self) -> Result<String> {
        let content = tokio::fs::read_to_string(&self.version_file).await?;
        non_empty(&content, &self.version_file.display().to_string())
    }

    async fn remote_version(&self) -> Result<String> {
        debug!("Fetching published version from {}", self.url);
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(DaemonError::Version(format!(
                "{} returned HTTP {}",
                self.url,
                response.status()
            )));
        }
        let body = response.text().await?;
        non_empty(&body, &self.url)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionComparison {
    UpToDate,
    Outdated,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub local_version: Option<String>,
    pub remote_version: Option<String>,
    pub comparison: VersionComparison,
}

impl VersionInfo {
    /// Exact comparison of the trimmed values; unknown if either side is missing.
    pub fn compare(local_version: Option<String>, remote_version: Option<String>) -> Self {
        let comparison = match (&local_version, &remote_version) {
            (Some(local), Some(remote)) if local.trim() == remote.trim() => {
                VersionComparison::UpToDate
            }
            (Some(_), Some(_)) => VersionComparison::Outdated,
            _ => VersionComparison::Unknown,
        };
        Self {
            local_version,
            remote_version,
            comparison,
        }
    }

    pub fn to_check(&self) -> VersionCheck {
        match (&self.comparison, &self.local_version) {
            (VersionComparison::UpToDate, Some(local)) => {
                VersionCheck::UpToDate(local.trim().to_string())
            }
            (VersionComparison::Outdated, Some(local)) => {
                VersionCheck::Outdated(local.trim().to_string())
            }
            _ => VersionCheck::Unknown,
        }
    }
}

/// Runs version checks and keeps the most recent result.
pub struct VersionChecker {
    source: Arc<dyn VersionSource>,
    last: RwLock<Option<VersionInfo>>,
}

impl VersionChecker {
    pub fn new(source: Arc<dyn VersionSource>) -> Self {
        Self {
            source,
            last: RwLock::new(None),
        }
    }

    /// Reads both versions afresh and stores the outcome.
    pub async fn check(&self) -> VersionInfo {
        let (local, remote) =
            tokio::join!(self.source.local_version(), self.source.remote_version());

        let local = local
            .map_err(|e| warn!("Failed to read local agent version: {}", e))
            .ok();
        let remote = remote
            .map_err(|e| warn!("Failed to fetch published agent version: {}", e))
            .ok();

        let info = VersionInfo::compare(local, remote);
        let previous = self.last.write().replace(info.clone());
        if previous.as_ref().map(VersionInfo::to_check) != Some(info.to_check()) {
            info!(
                "Agent version: {} (published: {})",
                info.to_check(),
                info.remote_version.as_deref().unwrap_or("unknown")
            );
        }
        info
    }

    pub fn last(&self) -> Option<VersionInfo> {
        self.last.read().clone()
    }
}
