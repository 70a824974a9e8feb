//! Connection supervisor.
//!
//! The supervisor owns one *cohort* per connection attempt: both connections,
//! the authorization handshake, the reader, the sender, the keep-alive pinger
//! and a fresh watchdog. Cohort members are plain futures polled together by
//! one `select!`, so the first member to finish decides the outcome and the
//! rest are dropped (closing their connections) before the supervisor moves
//! on. Nothing from a failed cohort can outlive it.
//!
//! ```text
//!   Connecting ──► Running ──► Faulted ──(backoff)──► Connecting
//!        │            │
//!        └────────────┴──► fatal error: returned to the caller
//! ```
//!
//! Failure is carried by the cohort's return value. The cancellation token
//! is only used to stop the whole client.

use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::auth;
use crate::config::ClientConfig;
use crate::connection::{self, StatusSink};
use crate::error::{Error, SessionError};
use crate::event::SessionKind;
use crate::keepalive;
use crate::reader::{self, MessageSink, ReaderExit};
use crate::sender::{self, Outbox, Outgoing};
use crate::watchdog::Watchdog;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Connecting,
    Running,
    Faulted,
}

/// How a cohort ended, when the end is worth a retry.
#[derive(Debug)]
pub enum CohortEnd {
    /// The reader gave up on a quiet chat.
    Idle,
    /// A member hit a session error (including the watchdog firing).
    Failed(SessionError),
}

/// Receives supervisor lifecycle notifications. Every method defaults to a no-op.
pub trait SupervisorObserver: Send + Sync {
    fn state_changed(&self, _state: SupervisorState) {}
    fn cohort_started(&self, _attempt: u32) {}
    fn cohort_ended(&self, _attempt: u32, _end: &CohortEnd) {}
    fn backoff(&self, _delay: Duration) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NoopObserver;

impl SupervisorObserver for NoopObserver {}

/// Runs one cohort to completion.
pub trait CohortRunner {
    /// `Ok` and `Err(Error::Session)` are retried; any other error is fatal.
    fn run_cohort(
        &mut self,
        attempt: u32,
        observer: &dyn SupervisorObserver,
    ) -> impl Future<Output = Result<CohortEnd, Error>> + Send;
}

/// The supervision loop: run cohorts until `cancel` fires or one returns a
/// fatal error. Returns `Ok(())` only on cancellation.
pub async fn supervise<C>(
    runner: &mut C,
    backoff: Duration,
    observer: &dyn SupervisorObserver,
    cancel: &CancellationToken,
) -> Result<(), Error>
where
    C: CohortRunner,
{
    let mut attempt: u32 = 0;
    loop {
        attempt = attempt.saturating_add(1);
        observer.state_changed(SupervisorState::Connecting);
        observer.cohort_started(attempt);
        debug!(attempt, "starting cohort");

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("client stopped");
                return Ok(());
            }
            outcome = runner.run_cohort(attempt, observer) => outcome,
        };

        let end = match outcome {
            Ok(end) => end,
            Err(Error::Session(e)) => CohortEnd::Failed(e),
            Err(fatal) => {
                warn!(attempt, error = %fatal, "fatal error, giving up");
                return Err(fatal);
            }
        };
        match &end {
            CohortEnd::Idle => info!(attempt, "chat idle, reconnecting"),
            CohortEnd::Failed(e) => warn!(attempt, error = %e, "connection error, reconnecting"),
        }
        observer.state_changed(SupervisorState::Faulted);
        observer.cohort_ended(attempt, &end);

        observer.backoff(backoff);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("client stopped");
                return Ok(());
            }
            _ = tokio::time::sleep(backoff) => {}
        }
    }
}

/// Channels the cohort publishes to.
#[derive(Debug, Clone)]
pub struct Sinks {
    /// Chat lines and notices for the user.
    pub display: MessageSink,
    /// Chat lines to persist.
    pub history: MessageSink,
    pub status: StatusSink,
}

/// The real cohort: two TCP sessions against the chat server.
pub struct SessionCohort {
    config: ClientConfig,
    sinks: Sinks,
    outbox: Outbox,
    /// Producer side of the outbound queue, for keep-alives.
    outbound: mpsc::Sender<Outgoing>,
}

impl SessionCohort {
    pub fn new(
        config: ClientConfig,
        sinks: Sinks,
        outbox: Outbox,
        outbound: mpsc::Sender<Outgoing>,
    ) -> Self {
        Self {
            config,
            sinks,
            outbox,
            outbound,
        }
    }
}

impl CohortRunner for SessionCohort {
    async fn run_cohort(
        &mut self,
        attempt: u32,
        observer: &dyn SupervisorObserver,
    ) -> Result<CohortEnd, Error> {
        let timing = &self.config.timing;
        let status = &self.sinks.status;

        let (reader_conn, mut sender_conn) = tokio::join!(
            connection::open(&self.config.reader, SessionKind::Reader, timing, status),
            connection::open(&self.config.sender, SessionKind::Sender, timing, status),
        );

        let handshake = auth::check_token(
            &mut sender_conn.reader,
            &mut sender_conn.writer,
            &self.config.credential,
        );
        let nickname = match tokio::time::timeout(timing.watchdog_timeout, handshake).await {
            Ok(res) => res?,
            Err(_) => return Err(SessionError::HandshakeTimeout(timing.watchdog_timeout).into()),
        };
        let _ = self.sinks.display.send(format!("Authorized as {nickname}."));

        observer.state_changed(SupervisorState::Running);
        info!(attempt, %nickname, "cohort running");

        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        let watchdog = Watchdog::new(timing.watchdog_timeout);
        let keepalive = pinger(self.outbound.clone(), timing.keepalive_interval);

        tokio::select! {
            res = reader::run(
                reader_conn,
                &self.sinks.display,
                &self.sinks.history,
                &live_tx,
                self.config.idle,
            ) => match res {
                Ok(ReaderExit::Idle) => Ok(CohortEnd::Idle),
                Err(e) => Err(e.into()),
            },
            e = sender::run(sender_conn, &mut self.outbox, &live_tx) => Err(e.into()),
            e = watchdog.run(&mut live_rx) => Err(e.into()),
            never = keepalive => match never {},
        }
    }
}

async fn pinger(outbound: mpsc::Sender<Outgoing>, every: Option<Duration>) -> Infallible {
    match every {
        Some(every) => keepalive::run(outbound, every).await,
        None => std::future::pending().await,
    }
}

/// Supervisor over a [`SessionCohort`].
pub struct Supervisor {
    cohort: SessionCohort,
    backoff: Duration,
    observer: Arc<dyn SupervisorObserver>,
    cancel: CancellationToken,
}

impl Supervisor {
    pub fn new(cohort: SessionCohort, cancel: CancellationToken) -> Self {
        let backoff = cohort.config.timing.reconnect_backoff;
        Self {
            cohort,
            backoff,
            observer: Arc::new(NoopObserver),
            cancel,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SupervisorObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run until cancelled (`Ok`) or until a fatal error (`Err`).
    pub async fn run(mut self) -> Result<(), Error> {
        supervise(&mut self.cohort, self.backoff, self.observer.as_ref(), &self.cancel).await
    }
}
