use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Invalid response for `{command}`: {line}")]
    InvalidResponse { command: &'static str, line: String },

    #[error("Invalid state value: {0}")]
    InvalidState(String),

    #[error("Line too long: more than {0} bytes")]
    LineTooLong(usize),
}
