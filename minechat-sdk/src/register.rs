//! New account registration over the outbound connection.
//!
//! Same greeting as authorization, but the client answers with an empty line
//! and is then asked for a nickname.

use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info};

use crate::auth::Account;
use crate::error::RegistrationError;
use crate::framing::{self, Line};

/// Register `nickname` and return the new account (token in `account_hash`).
pub async fn register<R, W>(
    reader: &mut R,
    writer: &mut W,
    nickname: &str,
) -> Result<Account, RegistrationError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let nickname = framing::sanitize(nickname.trim());
    if nickname.is_empty() {
        return Err(RegistrationError::EmptyNickname);
    }

    let greeting = next_line(reader).await?;
    debug!(%greeting, "server greeting");
    framing::write_line(writer, "").await?;

    let prompt = next_line(reader).await?;
    debug!(%prompt, "nickname prompt");
    framing::write_line(writer, &nickname).await?;

    let reply = next_line(reader).await?;
    match Account::parse(&reply) {
        Some(account) if !account.account_hash.is_empty() => {
            info!(nickname = %account.nickname, "registered");
            Ok(account)
        }
        _ => Err(RegistrationError::BadReply(reply)),
    }
}

async fn next_line<R>(reader: &mut R) -> Result<String, RegistrationError>
where
    R: AsyncBufRead + Unpin,
{
    match framing::read_line(reader).await? {
        Line::Text(s) => Ok(s),
        Line::Invalid => Err(RegistrationError::BadReply("<invalid utf-8>".to_string())),
        Line::Eof => Err(RegistrationError::Closed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    #[tokio::test]
    async fn registers_and_returns_account() {
        let (client, server) = tokio::io::duplex(1024);
        let (cr, mut cw) = tokio::io::split(client);
        let (sr, mut sw) = tokio::io::split(server);

        let srv = tokio::spawn(async move {
            let mut sr = BufReader::new(sr);
            let mut got = Vec::new();
            sw.write_all(b"Hello %username%!\n").await.unwrap();
            let mut line = String::new();
            sr.read_line(&mut line).await.unwrap();
            got.push(line.clone());
            sw.write_all(b"Enter preferred nickname below:\n").await.unwrap();
            line.clear();
            sr.read_line(&mut line).await.unwrap();
            got.push(line);
            sw.write_all(b"{\"nickname\": \"max\", \"account_hash\": \"f00\"}\n")
                .await
                .unwrap();
            got
        });

        let mut cr = BufReader::new(cr);
        let account = register(&mut cr, &mut cw, " ma\nx ").await.unwrap();
        assert_eq!(account.nickname, "max");
        assert_eq!(account.account_hash, "f00");
        assert_eq!(srv.await.unwrap(), vec!["\n".to_string(), "max\n".to_string()]);
    }

    #[tokio::test]
    async fn rejects_empty_nickname_without_io() {
        let (client, _server) = tokio::io::duplex(64);
        let (cr, mut cw) = tokio::io::split(client);
        let mut cr = BufReader::new(cr);
        let err = register(&mut cr, &mut cw, "  ").await.unwrap_err();
        assert!(matches!(err, RegistrationError::EmptyNickname));
    }

    #[tokio::test]
    async fn bad_reply_is_an_error() {
        let (client, server) = tokio::io::duplex(1024);
        let (cr, mut cw) = tokio::io::split(client);
        let (_sr, mut sw) = tokio::io::split(server);
        sw.write_all(b"hi\nnick?\nnull\n").await.unwrap();

        let mut cr = BufReader::new(cr);
        let err = register(&mut cr, &mut cw, "max").await.unwrap_err();
        assert!(matches!(err, RegistrationError::BadReply(r) if r == "null"));
    }
}
