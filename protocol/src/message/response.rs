use super::command::Command;
use super::state::{ConnectionState, ServiceState, UpdateProgress, VersionCheck};
use crate::error::{ProtocolError, Result};
use std::fmt;

const UNKNOWN_COMMAND_PREFIX: &str = "Unknown command: ";

pub const UPDATE_ACK: &str = "Update command received";
pub const PAUSE_ACK: &str = "Pause command received";
pub const RESTART_ACK: &str = "Restart command received";

/// A single response line written by the daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Status {
        service: ServiceState,
        connection: ConnectionState,
    },
    UpdateStatus(UpdateProgress),
    VersionCheck(VersionCheck),
    /// Free-text acknowledgment for `update`, `pause` and `restart`.
    Acknowledged(String),
    UnknownCommand(String),
}

impl Response {
    pub fn update_ack() -> Self {
        Response::Acknowledged(UPDATE_ACK.to_string())
    }

    pub fn pause_ack() -> Self {
        Response::Acknowledged(PAUSE_ACK.to_string())
    }

    pub fn restart_ack() -> Self {
        Response::Acknowledged(RESTART_ACK.to_string())
    }

    /// Parses `line` as the answer to `command`.
    ///
    /// The wire format is not self-describing, so the caller must say which
    /// request the line answers.
    pub fn parse(command: Command, line: &str) -> Result<Self> {
        let line = line.trim();
        if let Some(input) = line.strip_prefix(UNKNOWN_COMMAND_PREFIX) {
            return Ok(Response::UnknownCommand(input.trim().to_string()));
        }

        let invalid = || ProtocolError::InvalidResponse {
            command: command.as_str(),
            line: line.to_string(),
        };

        match command {
            Command::Status => {
                let rest = line.strip_prefix("Status: ").ok_or_else(invalid)?;
                let (service, connection) =
                    rest.split_once(", Connection: ").ok_or_else(invalid)?;
                Ok(Response::Status {
                    service: service.parse()?,
                    connection: connection.parse()?,
                })
            }
            Command::UpdateStatus => {
                let rest = line.strip_prefix("Update: ").ok_or_else(invalid)?;
                Ok(Response::UpdateStatus(rest.parse()?))
            }
            Command::CheckVersion => {
                let rest = line.strip_prefix("VersionCheck: ").ok_or_else(invalid)?;
                Ok(Response::VersionCheck(rest.parse()?))
            }
            Command::Update | Command::Pause | Command::Restart => {
                Ok(Response::Acknowledged(line.to_string()))
            }
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Status {
                service,
                connection,
            } => write!(f, "Status: {}, Connection: {}", service, connection),
            Response::UpdateStatus(progress) => write!(f, "Update: {}", progress),
            Response::VersionCheck(check) => write!(f, "VersionCheck: {}", check),
            Response::Acknowledged(text) => f.write_str(text),
            Response::UnknownCommand(input) => write!(f, "{}{}", UNKNOWN_COMMAND_PREFIX, input),
        }
    }
}
