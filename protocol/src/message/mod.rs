mod command;
mod response;
mod state;

pub use command::Command;
pub use response::{PAUSE_ACK, RESTART_ACK, Response, UPDATE_ACK};
pub use state::{ConnectionState, ServiceState, UpdateProgress, VersionCheck};

/// Upper bound for a single request or response line, newline excluded.
pub const MAX_LINE_LENGTH: usize = 1024;
