//! Configuration for minechat-client.
//!
//! Values come from, in order of precedence: command line flags (each with
//! an environment variable fallback), the optional config file at
//! `~/.config/minechat/client.toml`, the token cache for the token, and
//! finally built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use minechat_sdk::config::{DEFAULT_HOST, DEFAULT_READER_PORT, DEFAULT_SENDER_PORT};
use minechat_sdk::{IdlePolicy, ServerAddr, Timing, token};
use serde::{Deserialize, Serialize};

/// Default history file name (relative to the working directory).
pub const DEFAULT_HISTORY: &str = "minechat.history";

#[derive(Parser, Debug)]
#[command(name = "minechat-client", about = "Terminal client for minechat servers")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Account token (falls back to the token cache)
    #[arg(short = 't', long, env = "USER_TOKEN")]
    pub token: Option<String>,

    /// Host to read chat messages from
    #[arg(long, env = "READER_HOST")]
    pub reader_host: Option<String>,

    /// Port to read chat messages from
    #[arg(long, env = "READER_PORT")]
    pub reader_port: Option<u16>,

    /// Host to send chat messages to
    #[arg(long, env = "SENDER_HOST")]
    pub sender_host: Option<String>,

    /// Port to send chat messages to
    #[arg(long, env = "SENDER_PORT")]
    pub sender_port: Option<u16>,

    /// File the chat history is appended to
    #[arg(short = 'f', long = "history-filepath", env = "HISTORY_FILEPATH")]
    pub history: Option<PathBuf>,

    /// Config file (default: ~/.config/minechat/client.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Token cache written by `register` (default: ~/.config/minechat/token.json)
    #[arg(long)]
    pub token_file: Option<PathBuf>,

    /// Seconds of silence before the connection is considered dead
    #[arg(long)]
    pub watchdog_timeout: Option<u64>,

    /// Bound each read to this many seconds instead of relying on the watchdog
    #[arg(long)]
    pub idle_timeout: Option<u64>,

    /// Log as JSON
    #[arg(long)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Register a new account and store its token
    Register {
        /// Desired nickname
        #[arg(long)]
        nickname: String,
    },
}

/// Optional file config (client.toml).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    pub reader_host: Option<String>,
    pub reader_port: Option<u16>,
    pub sender_host: Option<String>,
    pub sender_port: Option<u16>,
    pub history: Option<PathBuf>,
    pub token_file: Option<PathBuf>,
    pub watchdog_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
    /// 0 disables keep-alives.
    pub keepalive_secs: Option<u64>,
    pub reconnect_backoff_secs: Option<u64>,
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("minechat")
        .join("client.toml")
}

impl FileConfig {
    /// Read the file. Missing is fine; unreadable or malformed files are
    /// reported and ignored.
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(s) => match toml::from_str(&s) {
                    Ok(c) => return c,
                    Err(e) => tracing::warn!("bad config file {}: {e}", path.display()),
                },
                Err(e) => tracing::warn!("can't read {}: {e}", path.display()),
            }
        }
        Self::default()
    }
}

/// Effective settings after merging every source.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub reader: ServerAddr,
    pub sender: ServerAddr,
    /// May be empty; the SDK turns that into a missing-token error.
    pub token: String,
    pub history: PathBuf,
    pub token_file: PathBuf,
    pub timing: Timing,
    pub idle: IdlePolicy,
}

impl Resolved {
    /// Merge: CLI/env > config file > token cache > defaults.
    pub fn merge(cli: &Cli, file: &FileConfig) -> Self {
        let reader = ServerAddr::new(
            cli.reader_host
                .clone()
                .or_else(|| file.reader_host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            cli.reader_port.or(file.reader_port).unwrap_or(DEFAULT_READER_PORT),
        );
        let sender = ServerAddr::new(
            cli.sender_host
                .clone()
                .or_else(|| file.sender_host.clone())
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            cli.sender_port.or(file.sender_port).unwrap_or(DEFAULT_SENDER_PORT),
        );

        let token_file = cli
            .token_file
            .clone()
            .or_else(|| file.token_file.clone())
            .unwrap_or_else(token::default_path);
        let token = cli
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .or_else(|| token::load_token(&token_file))
            .unwrap_or_default();

        let history = cli
            .history
            .clone()
            .or_else(|| file.history.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY));

        let mut timing = Timing::default();
        if let Some(secs) = cli.watchdog_timeout.or(file.watchdog_timeout_secs) {
            timing.watchdog_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = file.reconnect_backoff_secs {
            timing.reconnect_backoff = Duration::from_secs(secs);
        }
        if let Some(secs) = file.keepalive_secs {
            timing.keepalive_interval = (secs > 0).then(|| Duration::from_secs(secs));
        }

        let idle = match cli.idle_timeout.or(file.idle_timeout_secs) {
            Some(secs) if secs > 0 => IdlePolicy::ReadTimeout(Duration::from_secs(secs)),
            _ => IdlePolicy::Watchdog,
        };

        Self {
            reader,
            sender,
            token,
            history,
            token_file,
            timing,
            idle,
        }
    }
}
