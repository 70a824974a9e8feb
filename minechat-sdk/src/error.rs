//! Error taxonomy for the chat client.
//!
//! Only [`SessionError`] is recovered locally (the supervisor restarts the
//! cohort). Credential errors always escalate to the caller and stop the
//! client. Malformed server data never becomes an error on its own: the
//! handshake folds it into an empty nickname.

use std::io;
use std::time::Duration;

use crate::event::SessionKind;

/// Failure to open a socket. Transient: the connection opener retries it.
#[derive(Debug, thiserror::Error)]
pub enum DialError {
    #[error("connect to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },
    #[error("connect to {addr} failed: {source}")]
    Io {
        addr: String,
        #[source]
        source: io::Error,
    },
}

/// Failure of an established session. Fatal to the current cohort only.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{kind} connection I/O failed: {source}")]
    Io {
        kind: SessionKind,
        #[source]
        source: io::Error,
    },
    #[error("{0} connection closed by server")]
    Closed(SessionKind),
    #[error("{0} connection sent a line that is not valid UTF-8")]
    Decode(SessionKind),
    #[error("server sent nothing for {0:?}")]
    Silent(Duration),
    #[error("authorization handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
}

impl SessionError {
    pub(crate) fn io(kind: SessionKind, source: io::Error) -> Self {
        Self::Io { kind, source }
    }
}

/// Top-level client error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no token supplied")]
    MissingCredential,
    #[error("token rejected by server")]
    InvalidCredential,
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl Error {
    /// Fatal errors stop the whole client; everything else is retried.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Session(_))
    }

    /// Short user-facing title.
    pub fn title(&self) -> &'static str {
        match self {
            Error::MissingCredential => "Token is missing",
            Error::InvalidCredential => "Invalid token",
            Error::Session(_) => "Connection lost",
        }
    }

    /// User-facing explanation to show under [`Error::title`].
    pub fn message(&self) -> String {
        match self {
            Error::MissingCredential => {
                "Provide a token (--token or USER_TOKEN), or register to get one.".to_string()
            }
            Error::InvalidCredential => {
                "Check the token: the server did not recognise it.".to_string()
            }
            Error::Session(e) => e.to_string(),
        }
    }
}

/// The registration handshake did not produce an account.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("nickname must not be empty")]
    EmptyNickname,
    #[error("registration I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("server closed the connection during registration")]
    Closed,
    #[error("server reply is not an account record: {0:?}")]
    BadReply(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_session_errors_are_retryable() {
        assert!(Error::MissingCredential.is_fatal());
        assert!(Error::InvalidCredential.is_fatal());
        assert!(!Error::from(SessionError::Closed(SessionKind::Reader)).is_fatal());
    }

    #[test]
    fn credential_errors_have_user_facing_text() {
        let e = Error::InvalidCredential;
        assert_eq!(e.title(), "Invalid token");
        assert!(e.message().contains("did not recognise"));
    }

    #[test]
    fn session_error_display_names_the_side() {
        let e = SessionError::Closed(SessionKind::Sender);
        assert_eq!(e.to_string(), "sender connection closed by server");
    }
}
