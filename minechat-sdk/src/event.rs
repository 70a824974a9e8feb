//! Events the SDK emits for the UI layer to consume.

use std::fmt;

/// Which of the two chat connections an event refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionKind {
    /// Inbound connection: chat lines arrive here.
    Reader,
    /// Outbound connection: authorization and message submission.
    Sender,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Reader => f.write_str("reader"),
            SessionKind::Sender => f.write_str("sender"),
        }
    }
}

/// Lifecycle of a single connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Dialing has started.
    Initiated,
    /// The socket is open.
    Established,
    /// The connection was released (or dialing was abandoned).
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Initiated => f.write_str("initiated"),
            ConnectionState::Established => f.write_str("established"),
            ConnectionState::Closed => f.write_str("closed"),
        }
    }
}

/// Connection status change. Purely observational: the SDK never reads these back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEvent {
    pub kind: SessionKind,
    pub state: ConnectionState,
}

impl StatusEvent {
    pub fn new(kind: SessionKind, state: ConnectionState) -> Self {
        Self { kind, state }
    }
}

/// "The session is alive." Consumed only by the watchdog.
///
/// `source` is carried for logging; the watchdog treats every tick the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Liveness {
    pub source: SessionKind,
}
