use crate::error::ProtocolError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Whether the monitored agent's service is running.
///
/// The daemon only ever reports `Active` or `Inactive`; `Unknown` is produced
/// on the client side when the daemon itself could not be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ServiceState {
    Active,
    #[default]
    Inactive,
    Unknown,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Active => "Active",
            ServiceState::Inactive => "Inactive",
            ServiceState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceState {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Active" => Ok(ServiceState::Active),
            "Inactive" => Ok(ServiceState::Inactive),
            "Unknown" => Ok(ServiceState::Unknown),
            other => Err(ProtocolError::InvalidState(other.to_string())),
        }
    }
}

/// Whether the agent holds a live connection to its manager.
///
/// Independent of [`ServiceState`]: an agent can be active but disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum ConnectionState {
    Connected,
    #[default]
    Disconnected,
    Unknown,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connected => "Connected",
            ConnectionState::Disconnected => "Disconnected",
            ConnectionState::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionState {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Connected" => Ok(ConnectionState::Connected),
            "Disconnected" => Ok(ConnectionState::Disconnected),
            "Unknown" => Ok(ConnectionState::Unknown),
            other => Err(ProtocolError::InvalidState(other.to_string())),
        }
    }
}

/// Wire projection of the daemon's update state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UpdateProgress {
    Progressing,
    Disable,
}

impl UpdateProgress {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateProgress::Progressing => "Progressing",
            UpdateProgress::Disable => "Disable",
        }
    }
}

impl fmt::Display for UpdateProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UpdateProgress {
    type Err = ProtocolError;

    // Older daemons answered with `Disabled` or `Idle`; all mean "not running".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Progressing" => Ok(UpdateProgress::Progressing),
            "Disable" | "Disabled" | "Idle" => Ok(UpdateProgress::Disable),
            other => Err(ProtocolError::InvalidState(other.to_string())),
        }
    }
}

/// Outcome of comparing the installed agent version with the published one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "version", rename_all = "snake_case")]
pub enum VersionCheck {
    UpToDate(String),
    Outdated(String),
    Unknown,
}

impl VersionCheck {
    /// Installed version, when it is known.
    pub fn version(&self) -> Option<&str> {
        match self {
            VersionCheck::UpToDate(v) | VersionCheck::Outdated(v) => Some(v),
            VersionCheck::Unknown => None,
        }
    }

    pub fn is_outdated(&self) -> bool {
        matches!(self, VersionCheck::Outdated(_))
    }
}

impl fmt::Display for VersionCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionCheck::UpToDate(v) => write!(f, "Up to date, v{}", v),
            VersionCheck::Outdated(v) => write!(f, "Outdated, v{}", v),
            VersionCheck::Unknown => f.write_str("Unknown"),
        }
    }
}

impl FromStr for VersionCheck {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "Unknown" {
            return Ok(VersionCheck::Unknown);
        }

        let (verdict, version) = s
            .split_once(", ")
            .ok_or_else(|| ProtocolError::InvalidState(s.to_string()))?;
        let version = version.strip_prefix('v').unwrap_or(version).to_string();

        match verdict {
            "Up to date" => Ok(VersionCheck::UpToDate(version)),
            "Outdated" => Ok(VersionCheck::Outdated(version)),
            other => Err(ProtocolError::InvalidState(other.to_string())),
        }
    }
}
