//! Configuration for connecting to a chat server.

use std::fmt;
use std::time::Duration;

use crate::error::Error;

/// Default chat host.
pub const DEFAULT_HOST: &str = "minechat.dvmn.org";
/// Default port of the inbound (read-only) connection.
pub const DEFAULT_READER_PORT: u16 = 5000;
/// Default port of the outbound (authenticated) connection.
pub const DEFAULT_SENDER_PORT: u16 = 5050;

/// A `host:port` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddr {
    pub host: String,
    pub port: u16,
}

impl ServerAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }
}

impl fmt::Display for ServerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// The account token. Immutable for the process lifetime and never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Reject an empty token before any socket is opened.
    pub fn new(token: impl Into<String>) -> Result<Self, Error> {
        let token = token.into();
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::MissingCredential);
        }
        Ok(Self(token.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Keep tokens out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// How the reader notices a quiet server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdlePolicy {
    /// No per-read timeout; every line feeds the watchdog, which alone
    /// decides the session is dead.
    Watchdog,
    /// Each read is bounded. A read that times out ends the reader without
    /// error and the supervisor starts a fresh cohort.
    ReadTimeout(Duration),
}

/// Every delay and timeout used by the connection cohort.
#[derive(Debug, Clone)]
pub struct Timing {
    /// Bound on a single dial attempt.
    pub connect_timeout: Duration,
    /// Pause between failed dial attempts.
    pub dial_retry_delay: Duration,
    /// Longest silence tolerated before the session is declared dead.
    pub watchdog_timeout: Duration,
    /// Pause between a failed cohort and the next connection attempt.
    pub reconnect_backoff: Duration,
    /// How often an empty keep-alive message is queued. `None` disables it.
    pub keepalive_interval: Option<Duration>,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            dial_retry_delay: Duration::from_secs(1),
            watchdog_timeout: Duration::from_secs(10),
            reconnect_backoff: Duration::from_secs(1),
            keepalive_interval: Some(Duration::from_secs(5)),
        }
    }
}

/// Everything the supervisor needs to run.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Inbound connection address.
    pub reader: ServerAddr,
    /// Outbound connection address (also used for authorization).
    pub sender: ServerAddr,
    pub credential: Credential,
    pub timing: Timing,
    pub idle: IdlePolicy,
}

impl ClientConfig {
    /// Config against the default server with default timings.
    pub fn new(credential: Credential) -> Self {
        Self {
            reader: ServerAddr::new(DEFAULT_HOST, DEFAULT_READER_PORT),
            sender: ServerAddr::new(DEFAULT_HOST, DEFAULT_SENDER_PORT),
            credential,
            timing: Timing::default(),
            idle: IdlePolicy::Watchdog,
        }
    }
}
