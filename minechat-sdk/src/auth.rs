//! Token authorization over the outbound connection.
//!
//! ```text
//! S: Hello %username%! Enter your personal hash or leave it empty to create new account.
//! C: <token>
//! S: {"nickname": "max", "account_hash": "..."}      (or `null` for an unknown token)
//! ```

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info};

use crate::config::Credential;
use crate::error::{Error, SessionError};
use crate::event::SessionKind;
use crate::framing::{self, Line};

/// Account record the server sends after authorization or registration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub account_hash: String,
}

impl Account {
    /// Parse a server reply. Anything that is not a JSON object (including
    /// `null`) yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        serde_json::from_str(line.trim()).ok()
    }
}

/// Exchange `credential` for a nickname.
///
/// Returns an empty string when the server does not recognise the token or
/// its reply cannot be parsed; only transport failures are errors.
pub async fn authorize<R, W>(
    reader: &mut R,
    writer: &mut W,
    credential: &str,
) -> Result<String, SessionError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let kind = SessionKind::Sender;

    let greeting = read_reply(reader).await?;
    debug!(?greeting, "server greeting");

    framing::write_line(writer, &framing::sanitize(credential))
        .await
        .map_err(|e| SessionError::io(kind, e))?;

    let nickname = match read_reply(reader).await? {
        Some(reply) => Account::parse(&reply)
            .map(|account| account.nickname)
            .unwrap_or_default(),
        None => String::new(),
    };
    Ok(nickname)
}

/// `None` for an undecodable line; EOF is an error.
async fn read_reply<R>(reader: &mut R) -> Result<Option<String>, SessionError>
where
    R: AsyncBufRead + Unpin,
{
    let kind = SessionKind::Sender;
    match framing::read_line(reader)
        .await
        .map_err(|e| SessionError::io(kind, e))?
    {
        Line::Text(s) => Ok(Some(s)),
        Line::Invalid => Ok(None),
        Line::Eof => Err(SessionError::Closed(kind)),
    }
}

/// Authorize and turn an unrecognised token into [`Error::InvalidCredential`].
pub async fn check_token<R, W>(
    reader: &mut R,
    writer: &mut W,
    credential: &Credential,
) -> Result<String, Error>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let nickname = authorize(reader, writer, credential.as_str()).await?;
    if nickname.is_empty() {
        return Err(Error::InvalidCredential);
    }
    info!(%nickname, "authorized");
    Ok(nickname)
}
