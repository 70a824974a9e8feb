//! Connection opener.
//!
//! [`open`] keeps dialing until a socket is up: DNS failures, refusals and
//! timeouts before establishment are all transient. Once a [`Connection`] is
//! handed out, every failure on it belongs to the caller.
//!
//! Status reporting is tied to ownership. `Initiated` is emitted when dialing
//! starts and `Closed` when the returned connection is dropped, or when the
//! `open` future itself is dropped before a socket came up. Cancellation by
//! dropping a cohort therefore always produces a matching `Closed`.

use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::{ServerAddr, Timing};
use crate::error::DialError;
use crate::event::{ConnectionState, SessionKind, StatusEvent};

/// Where connection status changes go.
pub type StatusSink = mpsc::UnboundedSender<StatusEvent>;

/// Emits `Closed` for its session when dropped.
struct StatusGuard {
    kind: SessionKind,
    sink: StatusSink,
}

impl StatusGuard {
    fn initiated(kind: SessionKind, sink: StatusSink) -> Self {
        let guard = Self { kind, sink };
        guard.emit(ConnectionState::Initiated);
        guard
    }

    fn emit(&self, state: ConnectionState) {
        // The UI may already be gone during shutdown.
        let _ = self.sink.send(StatusEvent::new(self.kind, state));
    }
}

impl Drop for StatusGuard {
    fn drop(&mut self) {
        debug!(session = %self.kind, "connection released");
        self.emit(ConnectionState::Closed);
    }
}

/// An established connection, exclusively owned by the task that opened it.
///
/// The halves are public so a task can read and write concurrently.
pub struct Connection {
    pub reader: BufReader<OwnedReadHalf>,
    pub writer: OwnedWriteHalf,
    kind: SessionKind,
    _status: StatusGuard,
}

impl Connection {
    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    /// Shut the write side down politely, then release the socket.
    pub async fn close(mut self) {
        if let Err(e) = self.writer.shutdown().await {
            debug!(session = %self.kind, error = %e, "shutdown failed");
        }
    }
}

/// Dial `addr` until it succeeds. Never returns an error; drop the future
/// to give up.
pub async fn open(
    addr: &ServerAddr,
    kind: SessionKind,
    timing: &Timing,
    status: &StatusSink,
) -> Connection {
    let guard = StatusGuard::initiated(kind, status.clone());
    let mut attempt: u32 = 0;

    loop {
        attempt = attempt.saturating_add(1);
        match dial(addr, timing).await {
            Ok(tcp) => {
                guard.emit(ConnectionState::Established);
                info!(session = %kind, %addr, attempt, "connection established");
                let (reader, writer) = tcp.into_split();
                return Connection {
                    reader: BufReader::new(reader),
                    writer,
                    kind,
                    _status: guard,
                };
            }
            Err(e) => {
                warn!(
                    session = %kind,
                    attempt,
                    error = %e,
                    retry_ms = timing.dial_retry_delay.as_millis() as u64,
                    "dial failed, retrying"
                );
                tokio::time::sleep(timing.dial_retry_delay).await;
            }
        }
    }
}

async fn dial(addr: &ServerAddr, timing: &Timing) -> Result<TcpStream, DialError> {
    debug!(%addr, "dialing");
    let connect = TcpStream::connect((addr.host.as_str(), addr.port));
    match tokio::time::timeout(timing.connect_timeout, connect).await {
        Ok(Ok(tcp)) => Ok(tcp),
        Ok(Err(source)) => Err(DialError::Io {
            addr: addr.to_string(),
            source,
        }),
        Err(_) => Err(DialError::Timeout {
            addr: addr.to_string(),
            timeout: timing.connect_timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn fast_timing() -> Timing {
        Timing {
            connect_timeout: Duration::from_millis(500),
            dial_retry_delay: Duration::from_millis(20),
            ..Timing::default()
        }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<StatusEvent>) -> Vec<ConnectionState> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.state);
        }
        out
    }

    #[tokio::test]
    async fn status_lifecycle_on_success() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = ServerAddr::new("127.0.0.1", listener.local_addr().unwrap().port());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let conn = open(&addr, SessionKind::Reader, &fast_timing(), &tx).await;
        assert_eq!(conn.kind(), SessionKind::Reader);
        assert_eq!(
            drain(&mut rx),
            vec![ConnectionState::Initiated, ConnectionState::Established]
        );

        conn.close().await;
        assert_eq!(drain(&mut rx), vec![ConnectionState::Closed]);
    }

    #[tokio::test]
    async fn retries_until_server_appears() {
        // Reserve a port, then free it so the first dials are refused.
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let addr = ServerAddr::new("127.0.0.1", port);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let server = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let l = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
            let _ = l.accept().await.unwrap();
        });

        let conn = tokio::time::timeout(
            Duration::from_secs(5),
            open(&addr, SessionKind::Sender, &fast_timing(), &tx),
        )
        .await
        .expect("open should eventually succeed");
        server.await.unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![ConnectionState::Initiated, ConnectionState::Established]
        );
        drop(conn);
        assert_eq!(drain(&mut rx), vec![ConnectionState::Closed]);
    }

    #[tokio::test]
    async fn abandoned_dial_still_reports_closed() {
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let addr = ServerAddr::new("127.0.0.1", port);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let res = tokio::time::timeout(
            Duration::from_millis(100),
            open(&addr, SessionKind::Reader, &fast_timing(), &tx),
        )
        .await;
        assert!(res.is_err());
        assert_eq!(
            drain(&mut rx),
            vec![ConnectionState::Initiated, ConnectionState::Closed]
        );
    }
}
