//! Wire framing.
//!
//! Inbound: one UTF-8 line per chat message, `\n` terminated.
//! Outbound: the text with every `\n`/`\r` removed, followed by an empty
//! line (`"<text>\n\n"`), which is how the server knows the message ended.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Strip embedded line breaks so one message can never span frames.
pub fn sanitize(text: &str) -> String {
    text.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// Encode an outbound chat message.
pub fn frame_message(text: &str) -> String {
    format!("{}\n\n", sanitize(text))
}

/// Write one framed chat message and flush it.
pub async fn submit_message<W>(writer: &mut W, text: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(frame_message(text).as_bytes()).await?;
    writer.flush().await
}

/// Write a single `\n`-terminated line (handshake traffic) and flush it.
pub async fn write_line<W>(writer: &mut W, line: &str) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(format!("{line}\n").as_bytes()).await?;
    writer.flush().await
}

/// Outcome of reading one inbound line.
#[derive(Debug, PartialEq, Eq)]
pub enum Line {
    /// A line with trailing terminators removed.
    Text(String),
    /// Bytes that are not valid UTF-8.
    Invalid,
    /// The peer closed the stream.
    Eof,
}

/// Read one line, tolerating `\r\n` endings. A final unterminated line
/// before EOF is still returned as text.
pub async fn read_line<R>(reader: &mut R) -> io::Result<Line>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf).await?;
    if n == 0 {
        return Ok(Line::Eof);
    }
    match String::from_utf8(buf) {
        Ok(s) => Ok(Line::Text(s.trim_end_matches(['\n', '\r']).to_string())),
        Err(_) => Ok(Line::Invalid),
    }
}
