use protocol::{ConnectionState, ServiceState};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Service and connection state observed by one completed probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    pub service: ServiceState,
    pub connection: ConnectionState,
}

impl StatusSnapshot {
    /// What a failed probe degrades to, and what the daemon starts with.
    pub const INACTIVE: StatusSnapshot = StatusSnapshot {
        service: ServiceState::Inactive,
        connection: ConnectionState::Disconnected,
    };

    pub fn new(service: ServiceState, connection: ConnectionState) -> Self {
        Self {
            service,
            connection,
        }
    }

    // Service in bits 0-1, connection in bits 2-3.
    fn pack(self) -> u8 {
        let service = match self.service {
            ServiceState::Inactive => 0,
            ServiceState::Active => 1,
            ServiceState::Unknown => 2,
        };
        let connection = match self.connection {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connected => 1,
            ConnectionState::Unknown => 2,
        };
        service | (connection << 2)
    }

    fn unpack(bits: u8) -> Self {
        let service = match bits & 0b11 {
            0 => ServiceState::Inactive,
            1 => ServiceState::Active,
            _ => ServiceState::Unknown,
        };
        let connection = match (bits >> 2) & 0b11 {
            0 => ConnectionState::Disconnected,
            1 => ConnectionState::Connected,
            _ => ConnectionState::Unknown,
        };
        Self {
            service,
            connection,
        }
    }
}

impl fmt::Display for StatusSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.connection)
    }
}

/// Last-known agent status.
///
/// The whole snapshot lives in one atomic byte, so a reader can never observe
/// the service state of one probe paired with the connection state of another.
/// Only the polling loop writes; everyone else gets a [`StatusReader`].
#[derive(Debug)]
pub struct StatusCache {
    snapshot: AtomicU8,
}

impl StatusCache {
    pub fn new() -> Self {
        Self {
            snapshot: AtomicU8::new(StatusSnapshot::INACTIVE.pack()),
        }
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot::unpack(self.snapshot.load(Ordering::Acquire))
    }

    /// Replaces the snapshot and returns the one it superseded.
    pub fn replace(&self, snapshot: StatusSnapshot) -> StatusSnapshot {
        StatusSnapshot::unpack(self.snapshot.swap(snapshot.pack(), Ordering::AcqRel))
    }

    pub fn reader(self: &Arc<Self>) -> StatusReader {
        StatusReader {
            cache: Arc::clone(self),
        }
    }
}

impl Default for StatusCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only handle on a [`StatusCache`].
#[derive(Debug, Clone)]
pub struct StatusReader {
    cache: Arc<StatusCache>,
}

impl StatusReader {
    pub fn snapshot(&self) -> StatusSnapshot {
        self.cache.snapshot()
    }
}
