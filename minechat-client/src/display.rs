//! Plain terminal front-end: chat on stdout, input from stdin.

use minechat_sdk::{ClientHandle, ConnectionState, SessionKind, StatusEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;

/// Human-readable status line.
pub fn status_line(event: StatusEvent) -> String {
    let side = match event.kind {
        SessionKind::Reader => "Reading",
        SessionKind::Sender => "Sending",
    };
    let state = match event.state {
        ConnectionState::Initiated => "connecting...",
        ConnectionState::Established => "connection established",
        ConnectionState::Closed => "connection closed",
    };
    format!("* {side}: {state}")
}

/// Print chat lines and status changes until both streams end.
pub async fn render(
    mut messages: mpsc::UnboundedReceiver<String>,
    mut status: mpsc::UnboundedReceiver<StatusEvent>,
) {
    let mut messages_open = true;
    let mut status_open = true;
    while messages_open || status_open {
        tokio::select! {
            msg = messages.recv(), if messages_open => match msg {
                Some(text) => println!("{text}"),
                None => messages_open = false,
            },
            ev = status.recv(), if status_open => match ev {
                Some(ev) => println!("{}", status_line(ev)),
                None => status_open = false,
            },
        }
    }
}

/// Forward input lines to the outbound queue.
///
/// End of input only ends this task; the client keeps listening until it is
/// stopped.
pub async fn read_input<R>(input: R, handle: ClientHandle)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if line.trim().is_empty() {
                    continue;
                }
                if let Err(e) = handle.send(&line).await {
                    if !handle.is_stopped() {
                        tracing::warn!("can't queue message: {e}");
                    }
                    return;
                }
            }
            Ok(None) => {
                tracing::info!("input closed, still listening (Ctrl-C to quit)");
                return;
            }
            Err(e) => {
                tracing::warn!("input error: {e}");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use minechat_sdk::{ClientConfig, Credential, ServerAddr, Timing, client};

    #[test]
    fn status_lines() {
        assert_eq!(
            status_line(StatusEvent::new(SessionKind::Reader, ConnectionState::Established)),
            "* Reading: connection established"
        );
        assert_eq!(
            status_line(StatusEvent::new(SessionKind::Sender, ConnectionState::Closed)),
            "* Sending: connection closed"
        );
    }

    #[tokio::test]
    async fn end_of_input_leaves_client_running() {
        // Nothing listens on this port; the client just keeps redialing.
        let port = {
            let l = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let mut config = ClientConfig::new(Credential::new("t").unwrap());
        config.reader = ServerAddr::new("127.0.0.1", port);
        config.sender = ServerAddr::new("127.0.0.1", port);
        config.timing = Timing {
            dial_retry_delay: Duration::from_millis(20),
            ..Timing::default()
        };
        let (handle, _streams, task) = client::start(config);

        let input: &[u8] = b"hello\n\n   \nbye\n";
        read_input(input, handle.clone()).await;
        assert!(!handle.is_stopped());
        assert!(!task.is_finished());

        handle.stop();
        task.await.unwrap().unwrap();
    }
}
