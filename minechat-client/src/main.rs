//! minechat-client: terminal chat client.
//!
//! Reads chat from the reader port, sends what you type through the
//! authenticated sender port, appends the chat to a history file and keeps
//! both connections alive across network trouble.
//!
//!   minechat-client --token <hash>           chat
//!   minechat-client register --nickname <n>  create an account, cache its token

mod config;
mod display;
mod history;

use anyhow::{Context, Result};
use clap::Parser;
use minechat_sdk::{
    ClientConfig, Credential, Error, SessionKind, client, connection, register, token,
};
use tokio::sync::mpsc;

use crate::config::{Cli, Command, FileConfig, Resolved, default_config_path};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let file = FileConfig::load(&config_path);
    let resolved = Resolved::merge(&cli, &file);

    match cli.command {
        Some(Command::Register { ref nickname }) => run_register(&resolved, nickname).await,
        None => run_chat(resolved).await,
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "minechat_sdk=info,minechat_client=info".into());
    // stdout belongs to the chat.
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

async fn run_chat(resolved: Resolved) -> Result<()> {
    let credential = match Credential::new(resolved.token.clone()) {
        Ok(c) => c,
        Err(e) => exit_fatal(&e),
    };

    tracing::info!(
        reader = %resolved.reader,
        sender = %resolved.sender,
        history = %resolved.history.display(),
        "Starting minechat-client"
    );

    if let Some(previous) = history::load(&resolved.history) {
        print!("{previous}");
    }

    let (handle, streams, task) = client::start(ClientConfig {
        reader: resolved.reader,
        sender: resolved.sender,
        credential,
        timing: resolved.timing,
        idle: resolved.idle,
    });

    let history_task = tokio::spawn(history::save_messages(resolved.history, streams.history));
    let render_task = tokio::spawn(display::render(streams.messages, streams.status));
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    tokio::spawn(display::read_input(stdin, handle.clone()));

    let stopper = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupted, stopping");
            stopper.stop();
        }
    });

    let outcome = task.await.context("client task panicked")?;
    // Senders are gone now; let the writers drain.
    let _ = render_task.await;
    match history_task.await {
        Ok(Err(e)) => tracing::warn!("history writer failed: {e:#}"),
        Err(e) => tracing::warn!("history writer panicked: {e}"),
        Ok(Ok(())) => {}
    }

    match outcome {
        Ok(()) => Ok(()),
        Err(e) => exit_fatal(&e),
    }
}

async fn run_register(resolved: &Resolved, nickname: &str) -> Result<()> {
    // Status changes are not shown while registering.
    let (status_tx, _status_rx) = mpsc::unbounded_channel();
    tracing::info!(server = %resolved.sender, %nickname, "registering");

    let mut conn = tokio::time::timeout(
        resolved.timing.watchdog_timeout,
        connection::open(&resolved.sender, SessionKind::Sender, &resolved.timing, &status_tx),
    )
    .await
    .with_context(|| format!("can't reach {}", resolved.sender))?;

    let account = register::register(&mut conn.reader, &mut conn.writer, nickname)
        .await
        .context("registration failed, try again later")?;
    conn.close().await;

    match token::save(&resolved.token_file, &account) {
        Ok(()) => println!(
            "Registered as {}. Token saved to {}",
            account.nickname,
            resolved.token_file.display()
        ),
        Err(e) => {
            tracing::warn!("{e}");
            println!(
                "Registered as {}. Keep this token: {}",
                account.nickname, account.account_hash
            );
        }
    }
    Ok(())
}

/// Show a fatal client error as title + message and exit.
fn exit_fatal(e: &Error) -> ! {
    eprintln!("{}", e.title());
    eprintln!("  {}", e.message());
    std::process::exit(2)
}
