//! Append-only chat history file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

/// Previous history, for replay on startup. `None` if there is none yet.
pub fn load(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(s) if !s.is_empty() => Some(s),
        Ok(_) => None,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            tracing::warn!("can't read history {}: {e}", path.display());
            None
        }
    }
}

/// One history line: `[DD.MM.YY HH:MM] text`.
pub fn format_line(at: DateTime<Local>, text: &str) -> String {
    format!("[{}] {}\n", at.format("%d.%m.%y %H:%M"), text)
}

/// Append every message from `rx` until the channel closes.
pub async fn save_messages(path: PathBuf, mut rx: mpsc::UnboundedReceiver<String>) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .with_context(|| format!("can't open history file {}", path.display()))?;

    while let Some(text) = rx.recv().await {
        let line = format_line(Local::now(), &text);
        file.write_all(line.as_bytes())
            .await
            .with_context(|| format!("can't write history file {}", path.display()))?;
        file.flush().await?;
    }
    Ok(())
}
