//! Client side of the status protocol, shared by the tray client and the
//! integration harness

pub mod client;
pub mod config;

pub use client::{DaemonApi, DaemonClient};
pub use config::{
    ClientConnectionConfig, DEFAULT_DAEMON_ADDR, DEFAULT_DIAL_TIMEOUT, DEFAULT_IO_TIMEOUT,
    DaemonEndpoint,
};
