//! Line-oriented wire protocol spoken between the agent status daemon and its
//! clients.

pub mod codec;
pub mod error;
pub mod message;

pub use codec::{ClientCodec, Line, LineCodec, ServerCodec};
pub use error::{ProtocolError, Result};
pub use message::{
    Command, ConnectionState, MAX_LINE_LENGTH, PAUSE_ACK, RESTART_ACK, Response, ServiceState,
    UPDATE_ACK, UpdateProgress, VersionCheck,
};
