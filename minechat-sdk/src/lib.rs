//! Client SDK for minechat-style line chat servers.
//!
//! A chat session is two TCP connections: an inbound stream that only
//! delivers chat lines, and an outbound stream that authenticates with a
//! token and then accepts framed messages. The SDK keeps both alive under a
//! [`supervisor`] that tears down and rebuilds the whole set of session tasks
//! (a *cohort*) whenever either side fails, including silent failures caught
//! by the [`watchdog`].
//!
//! Most consumers only need [`client::start`].

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod framing;
pub mod keepalive;
pub mod reader;
pub mod register;
pub mod sender;
pub mod supervisor;
pub mod token;
pub mod watchdog;

pub use client::{ClientHandle, ClientStreams, start};
pub use config::{ClientConfig, Credential, IdlePolicy, ServerAddr, Timing};
pub use error::{Error, SessionError};
pub use event::{ConnectionState, SessionKind, StatusEvent};
