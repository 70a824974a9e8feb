//! Keep-alive pinger.
//!
//! The server acknowledges every outbound message, even an empty one, so
//! queueing an empty message now and then makes a healthy but quiet chat
//! produce liveness ticks. Only the acknowledgement counts: a server that
//! stopped answering still lets the watchdog fire.

use std::convert::Infallible;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::sender::Outgoing;

/// Queue an empty message every `every`. Never returns; drop to stop.
pub async fn run(outbound: mpsc::Sender<Outgoing>, every: Duration) -> Infallible {
    let mut ticker = tokio::time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match outbound.try_send(Outgoing::KeepAlive) {
            Ok(()) => debug!("keep-alive queued"),
            // Real traffic is already waiting; it will do.
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Closed(_)) => return std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn queues_empty_messages_on_schedule() {
        let (tx, mut rx) = mpsc::channel(8);
        let pinger = tokio::spawn(run(tx, Duration::from_secs(5)));

        let start = Instant::now();
        assert_eq!(rx.recv().await, Some(Outgoing::KeepAlive));
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(rx.recv().await, Some(Outgoing::KeepAlive));
        assert!(start.elapsed() >= Duration::from_secs(10));
        pinger.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn full_queue_is_not_flooded() {
        let (tx, mut rx) = mpsc::channel(1);
        tx.try_send(Outgoing::Chat("user text".to_string())).unwrap();
        let pinger = tokio::spawn(run(tx, Duration::from_secs(1)));

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(rx.recv().await, Some(Outgoing::Chat("user text".to_string())));
        pinger.abort();
    }
}
