//! Run/stop entry point.
//!
//! [`start`] spawns the supervisor and returns a [`ClientHandle`] for
//! sending and stopping, plus the [`ClientStreams`] the UI and history
//! writer consume. The outbound queue lives as long as the handle, so
//! messages typed while the connection is down are sent after reconnecting.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::Error;
use crate::event::StatusEvent;
use crate::sender::{Outbox, Outgoing};
use crate::supervisor::{NoopObserver, SessionCohort, Sinks, Supervisor, SupervisorObserver};

/// Capacity of the outbound queue.
const OUTBOUND_CAPACITY: usize = 256;

/// A handle to a running client.
#[derive(Clone)]
pub struct ClientHandle {
    outbound: mpsc::Sender<Outgoing>,
    cancel: CancellationToken,
}

impl ClientHandle {
    /// Queue a chat message. Messages are sent in the order queued.
    pub async fn send(&self, text: &str) -> Result<()> {
        self.outbound.send(Outgoing::Chat(text.to_string())).await?;
        Ok(())
    }

    /// Stop the client. Open connections are closed before the run task ends.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Everything the client publishes.
pub struct ClientStreams {
    /// Chat lines plus client notices, for display.
    pub messages: mpsc::UnboundedReceiver<String>,
    /// Chat lines only, for persistence.
    pub history: mpsc::UnboundedReceiver<String>,
    /// Connection status changes.
    pub status: mpsc::UnboundedReceiver<StatusEvent>,
}

/// Start the client in a background task.
///
/// The task ends with `Ok(())` after [`ClientHandle::stop`], or with a fatal
/// [`Error`] (for example an unrecognised token).
pub fn start(config: ClientConfig) -> (ClientHandle, ClientStreams, JoinHandle<Result<(), Error>>) {
    start_with_observer(config, Arc::new(NoopObserver))
}

/// [`start`] with a supervisor observer attached.
pub fn start_with_observer(
    config: ClientConfig,
    observer: Arc<dyn SupervisorObserver>,
) -> (ClientHandle, ClientStreams, JoinHandle<Result<(), Error>>) {
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let (display_tx, display_rx) = mpsc::unbounded_channel();
    let (history_tx, history_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    let sinks = Sinks {
        display: display_tx,
        history: history_tx,
        status: status_tx,
    };
    let cohort = SessionCohort::new(config, sinks, Outbox::new(outbound_rx), outbound_tx.clone());
    let supervisor = Supervisor::new(cohort, cancel.clone()).with_observer(observer);
    let task = tokio::spawn(supervisor.run());

    let handle = ClientHandle {
        outbound: outbound_tx,
        cancel,
    };
    let streams = ClientStreams {
        messages: display_rx,
        history: history_rx,
        status: status_rx,
    };
    (handle, streams, task)
}
