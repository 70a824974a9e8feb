//! Liveness watchdog.
//!
//! A server can stop talking without closing the socket, so no read ever
//! fails. Readers and senders publish a [`Liveness`] tick for every line
//! they move; the watchdog keeps a deadline that each tick pushes forward.
//! When the deadline passes with no tick, the session is declared dead.
//!
//! A watchdog is single use: [`Watchdog::run`] consumes it, and the
//! supervisor builds a new one (with a new tick channel) for every cohort.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::SessionError;
use crate::event::Liveness;

/// Where liveness ticks go.
pub type LivenessSink = mpsc::UnboundedSender<Liveness>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// Alive until `deadline` unless another tick arrives.
    Waiting { deadline: Instant },
    /// Terminal.
    Dead,
}

#[derive(Debug)]
pub struct Watchdog {
    timeout: Duration,
    state: WatchdogState,
}

impl Watchdog {
    /// Start waiting now.
    pub fn new(timeout: Duration) -> Self {
        Self::starting_at(timeout, Instant::now())
    }

    pub fn starting_at(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            state: WatchdogState::Waiting {
                deadline: now + timeout,
            },
        }
    }

    pub fn state(&self) -> WatchdogState {
        self.state
    }

    /// A tick at `now` resets the deadline. Ticks after death are ignored.
    pub fn on_tick(&mut self, now: Instant) {
        if let WatchdogState::Waiting { .. } = self.state {
            self.state = WatchdogState::Waiting {
                deadline: now + self.timeout,
            };
        }
    }

    /// Advance to `now`. Returns `true` only on the transition to `Dead`.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.state {
            WatchdogState::Waiting { deadline } if now >= deadline => {
                self.state = WatchdogState::Dead;
                true
            }
            _ => false,
        }
    }

    /// Consume ticks until the deadline passes, then report the session dead.
    ///
    /// Never returns while ticks keep arriving in time.
    pub async fn run(mut self, ticks: &mut mpsc::UnboundedReceiver<Liveness>) -> SessionError {
        loop {
            let WatchdogState::Waiting { deadline } = self.state else {
                break;
            };
            match tokio::time::timeout_at(deadline, ticks.recv()).await {
                Ok(Some(tick)) => {
                    debug!(source = %tick.source, "connection is alive");
                    self.on_tick(Instant::now());
                }
                Ok(None) => {
                    // No producers left; nothing can save this deadline.
                    tokio::time::sleep_until(deadline).await;
                    self.expire(Instant::now());
                }
                Err(_) => {
                    self.expire(deadline);
                }
            }
        }
        warn!(
            timeout_ms = self.timeout.as_millis() as u64,
            "no traffic before the watchdog deadline"
        );
        SessionError::Silent(self.timeout)
    }
}
