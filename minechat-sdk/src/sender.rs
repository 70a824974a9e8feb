//! Sender task: outbound queue to the authenticated connection.

use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tracing::debug;

use crate::connection::Connection;
use crate::error::SessionError;
use crate::event::{Liveness, SessionKind};
use crate::framing::{self, Line};
use crate::watchdog::LivenessSink;

/// One entry of the outbound queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outgoing {
    /// Text queued by the user.
    Chat(String),
    /// Synthetic empty message. Writing it only reaches the local socket
    /// buffer, so it is never a liveness tick; the server's reply is.
    KeepAlive,
}

impl Outgoing {
    /// Text to frame on the wire.
    pub fn text(&self) -> &str {
        match self {
            Outgoing::Chat(text) => text,
            Outgoing::KeepAlive => "",
        }
    }
}

/// The consumer side of the outbound queue, shared by successive cohorts.
///
/// A message stays at the head until [`Outbox::commit`] confirms it was
/// written, so a cohort that dies mid-write hands it to the next cohort
/// instead of losing it.
#[derive(Debug)]
pub struct Outbox {
    rx: mpsc::Receiver<Outgoing>,
    pending: Option<Outgoing>,
}

impl Outbox {
    pub fn new(rx: mpsc::Receiver<Outgoing>) -> Self {
        Self { rx, pending: None }
    }

    /// The head of the queue, waiting for one if needed. `None` once every
    /// producer is gone and the queue is drained.
    pub async fn peek(&mut self) -> Option<&Outgoing> {
        if self.pending.is_none() {
            self.pending = Some(self.rx.recv().await?);
        }
        self.pending.as_ref()
    }

    /// Drop the head after a successful write.
    pub fn commit(&mut self) {
        self.pending = None;
    }
}

/// Write queued messages until a write fails. Every chat message written is
/// a liveness tick; keep-alives are not.
///
/// If the queue closes the task idles; it only ever returns an error.
pub async fn send_messages<W>(
    writer: &mut W,
    outbox: &mut Outbox,
    liveness: &LivenessSink,
) -> SessionError
where
    W: AsyncWrite + Unpin,
{
    let kind = SessionKind::Sender;
    loop {
        let Some(message) = outbox.peek().await.cloned() else {
            debug!("outbound queue closed");
            return std::future::pending().await;
        };
        if let Err(e) = framing::submit_message(writer, message.text()).await {
            return SessionError::io(kind, e);
        }
        outbox.commit();
        match message {
            Outgoing::Chat(text) => {
                debug!(%text, "message sent");
                let _ = liveness.send(Liveness { source: kind });
            }
            Outgoing::KeepAlive => debug!("keep-alive sent"),
        }
    }
}

/// Consume the server's acknowledgements on the outbound connection.
/// Each one counts as a liveness tick; EOF means the session is gone.
pub async fn drain_replies<R>(reader: &mut R, liveness: &LivenessSink) -> SessionError
where
    R: AsyncBufRead + Unpin,
{
    let kind = SessionKind::Sender;
    loop {
        match framing::read_line(reader).await {
            Ok(Line::Text(reply)) => debug!(%reply, "sender reply"),
            Ok(Line::Invalid) => debug!("undecodable sender reply"),
            Ok(Line::Eof) => return SessionError::Closed(kind),
            Err(e) => return SessionError::io(kind, e),
        }
        let _ = liveness.send(Liveness { source: kind });
    }
}

/// Cohort entry point, run after authorization on the same connection.
pub async fn run(
    mut conn: Connection,
    outbox: &mut Outbox,
    liveness: &LivenessSink,
) -> SessionError {
    let Connection { reader, writer, .. } = &mut conn;
    tokio::select! {
        e = send_messages(writer, outbox, liveness) => e,
        e = drain_replies(reader, liveness) => e,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncReadExt, BufReader};

    fn chat(text: &str) -> Outgoing {
        Outgoing::Chat(text.to_string())
    }

    /// A writer whose every write fails.
    struct Broken;

    impl AsyncWrite for Broken {
        fn poll_write(
            self: Pin<&mut Self>,
            _: &mut Context<'_>,
            _: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Err(std::io::ErrorKind::ConnectionReset.into()))
        }
        fn poll_flush(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
        fn poll_shutdown(self: Pin<&mut Self>, _: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn sends_in_fifo_order_with_framing() {
        let (tx, rx) = mpsc::channel(8);
        let mut outbox = Outbox::new(rx);
        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        let (mut client, mut server) = tokio::io::duplex(256);

        tx.send(chat("first")).await.unwrap();
        tx.send(chat("a\nb\rc")).await.unwrap();
        tx.send(chat("")).await.unwrap();

        let task = async {
            send_messages(&mut client, &mut outbox, &live_tx).await;
        };
        let read = async {
            let mut buf = vec![0u8; "first\n\nabc\n\n\n\n".len()];
            server.read_exact(&mut buf).await.unwrap();
            String::from_utf8(buf).unwrap()
        };
        let got = tokio::select! {
            _ = task => unreachable!("sender never finishes on a healthy stream"),
            got = read => got,
        };
        assert_eq!(got, "first\n\nabc\n\n\n\n");
        let mut ticks = 0;
        while live_rx.try_recv().is_ok() {
            ticks += 1;
        }
        assert_eq!(ticks, 3);
    }

    #[tokio::test]
    async fn failed_write_keeps_message_for_next_cohort() {
        let (tx, rx) = mpsc::channel(8);
        let mut outbox = Outbox::new(rx);
        let (live_tx, _live_rx) = mpsc::unbounded_channel();
        tx.send(chat("precious")).await.unwrap();
        tx.send(chat("second")).await.unwrap();

        let err = send_messages(&mut Broken, &mut outbox, &live_tx).await;
        assert!(matches!(err, SessionError::Io { kind: SessionKind::Sender, .. }));

        assert_eq!(outbox.peek().await, Some(&chat("precious")));
        outbox.commit();
        assert_eq!(outbox.peek().await, Some(&chat("second")));
    }

    #[tokio::test]
    async fn keepalive_is_written_but_not_a_tick() {
        let (tx, rx) = mpsc::channel(8);
        let mut outbox = Outbox::new(rx);
        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        let (mut client, mut server) = tokio::io::duplex(256);

        tx.send(Outgoing::KeepAlive).await.unwrap();
        tx.send(Outgoing::KeepAlive).await.unwrap();
        tx.send(chat("hi")).await.unwrap();

        let task = async {
            send_messages(&mut client, &mut outbox, &live_tx).await;
        };
        let read = async {
            let mut buf = vec![0u8; "\n\n\n\nhi\n\n".len()];
            server.read_exact(&mut buf).await.unwrap();
            String::from_utf8(buf).unwrap()
        };
        let got = tokio::select! {
            _ = task => unreachable!("sender never finishes on a healthy stream"),
            got = read => got,
        };
        assert_eq!(got, "\n\n\n\nhi\n\n");
        assert!(live_rx.try_recv().is_ok());
        assert!(live_rx.try_recv().is_err(), "keep-alives fed the watchdog");
    }

    #[tokio::test]
    async fn outbox_ends_when_producers_are_gone() {
        let (tx, rx) = mpsc::channel(1);
        let mut outbox = Outbox::new(rx);
        drop(tx);
        assert_eq!(outbox.peek().await, None);
    }

    #[tokio::test]
    async fn reply_eof_closes_session() {
        let (live_tx, mut live_rx) = mpsc::unbounded_channel();
        let data: &[u8] = b"Message send. Write more, end message with an empty line.\n";
        let mut reader = BufReader::new(data);
        let err = drain_replies(&mut reader, &live_tx).await;
        assert!(matches!(err, SessionError::Closed(SessionKind::Sender)));
        assert!(live_rx.try_recv().is_ok());
    }
}
