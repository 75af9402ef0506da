use crate::error::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// A request line understood by the status daemon.
///
/// Matching is exact and case-sensitive after trimming surrounding whitespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Status,
    Update,
    UpdateStatus,
    CheckVersion,
    Pause,
    Restart,
}

impl Command {
    pub const ALL: [Command; 6] = [
        Command::Status,
        Command::Update,
        Command::UpdateStatus,
        Command::CheckVersion,
        Command::Pause,
        Command::Restart,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Status => "status",
            Command::Update => "update",
            Command::UpdateStatus => "update-status",
            Command::CheckVersion => "check-version",
            Command::Pause => "pause",
            Command::Restart => "restart",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        Command::ALL
            .into_iter()
            .find(|command| command.as_str() == line)
            .ok_or_else(|| ProtocolError::UnknownCommand(line.to_string()))
    }
}
