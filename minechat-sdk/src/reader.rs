//! Reader task: inbound chat lines to the display and history sinks.

use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::IdlePolicy;
use crate::connection::Connection;
use crate::error::SessionError;
use crate::event::{Liveness, SessionKind};
use crate::framing::{self, Line};
use crate::watchdog::LivenessSink;

/// Where chat text goes (display or history).
pub type MessageSink = mpsc::UnboundedSender<String>;

/// Why the reader stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// Nothing arrived within the read timeout; a fresh session is wanted.
    Idle,
}

/// Read lines until the stream fails, or until a read times out under
/// [`IdlePolicy::ReadTimeout`].
///
/// Each line is pushed to `display` and then `history` before the next line
/// is read, so both sinks see the server's order.
pub async fn read_messages<R>(
    reader: &mut R,
    display: &MessageSink,
    history: &MessageSink,
    liveness: &LivenessSink,
    idle: IdlePolicy,
) -> Result<ReaderExit, SessionError>
where
    R: AsyncBufRead + Unpin,
{
    let kind = SessionKind::Reader;
    loop {
        let line = match idle {
            IdlePolicy::Watchdog => framing::read_line(reader).await,
            IdlePolicy::ReadTimeout(limit) => {
                match tokio::time::timeout(limit, framing::read_line(reader)).await {
                    Ok(res) => res,
                    Err(_) => {
                        info!(idle_ms = limit.as_millis() as u64, "chat idle, leaving reader");
                        return Ok(ReaderExit::Idle);
                    }
                }
            }
        };

        let text = match line.map_err(|e| SessionError::io(kind, e))? {
            Line::Text(text) => text,
            Line::Invalid => return Err(SessionError::Decode(kind)),
            Line::Eof => return Err(SessionError::Closed(kind)),
        };

        debug!(%text, "chat line");
        let _ = display.send(text.clone());
        let _ = history.send(text);
        let _ = liveness.send(Liveness { source: kind });
    }
}

/// Cohort entry point: owns the inbound connection for its whole life.
pub async fn run(
    mut conn: Connection,
    display: &MessageSink,
    history: &MessageSink,
    liveness: &LivenessSink,
    idle: IdlePolicy,
) -> Result<ReaderExit, SessionError> {
    let res = read_messages(&mut conn.reader, display, history, liveness, idle).await;
    conn.close().await;
    res
}
