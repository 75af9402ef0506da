mod daemon_error;

pub use daemon_error::DaemonError;
pub type Result<T> = std::result::Result<T, DaemonError>;
