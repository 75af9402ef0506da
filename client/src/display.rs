use protocol::{ConnectionState, ServiceState, VersionCheck};
use std::collections::HashMap;
use std::fmt;
use tracing::info;

/// Independently rendered parts of the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayAxis {
    Service,
    Connection,
    Version,
    Update,
}

impl DisplayAxis {
    pub const ALL: [DisplayAxis; 4] = [
        DisplayAxis::Service,
        DisplayAxis::Connection,
        DisplayAxis::Version,
        DisplayAxis::Update,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayAxis::Service => "service",
            DisplayAxis::Connection => "connection",
            DisplayAxis::Version => "version",
            DisplayAxis::Update => "update",
        }
    }
}

impl fmt::Display for DisplayAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of the update entry, derived from version checks and the update
/// monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateIndicator {
    UpToDate,
    Available,
    Updating,
    Unknown,
}

impl UpdateIndicator {
    pub fn title(&self) -> &'static str {
        match self {
            UpdateIndicator::UpToDate => "Up to date",
            UpdateIndicator::Available => "Update",
            UpdateIndicator::Updating => "Updating...",
            UpdateIndicator::Unknown => "---",
        }
    }
}

pub fn service_title(state: ServiceState) -> String {
    format!("Agent: {}", state)
}

pub fn connection_title(state: ConnectionState) -> String {
    format!("Connection: {}", state)
}

pub fn version_title(check: &VersionCheck) -> String {
    match check.version() {
        Some(version) => format!("v{}", version),
        None => "Version: Unknown".to_string(),
    }
}

/// Whatever presents the titles to the user: a tray menu, a log, a test probe.
pub trait DisplaySink: Send {
    fn render(&mut self, axis: DisplayAxis, title: &str);
}

/// Renders into the log; used when no graphical shell is attached.
#[derive(Debug, Default)]
pub struct LogDisplay;

impl DisplaySink for LogDisplay {
    fn render(&mut self, axis: DisplayAxis, title: &str) {
        info!(axis = axis.as_str(), "{}", title);
    }
}

/// Forwards a title to the sink only when it differs from the last one
/// rendered on the same axis.
pub struct DebouncedDisplay<S> {
    sink: S,
    rendered: HashMap<DisplayAxis, String>,
}

impl<S: DisplaySink> DebouncedDisplay<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            rendered: HashMap::new(),
        }
    }

    /// Returns true when the sink was written to.
    pub fn show(&mut self, axis: DisplayAxis, title: impl Into<String>) -> bool {
        let title = title.into();
        if self.rendered.get(&axis) == Some(&title) {
            return false;
        }
        self.sink.render(axis, &title);
        self.rendered.insert(axis, title);
        true
    }

    pub fn current(&self, axis: DisplayAxis) -> Option<&str> {
        self.rendered.get(&axis).map(String::as_str)
    }

    /// Last rendered title of every axis, unrendered ones omitted.
    pub fn snapshot(&self) -> Vec<(DisplayAxis, String)> {
        DisplayAxis::ALL
            .iter()
            .filter_map(|axis| self.current(*axis).map(|title| (*axis, title.to_string())))
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn sink(&self) -> &S {
        &self.sink
    }
}
