//! Persisted token cache.
//!
//! Registration writes the account record once; startup reads the
//! `account_hash` back when no token was supplied explicitly.

use std::io;
use std::path::{Path, PathBuf};

use crate::auth::Account;

#[derive(Debug, thiserror::Error)]
pub enum TokenCacheError {
    #[error("can't access token cache {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("token cache {path} is not an account record: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `<config dir>/minechat/token.json`.
pub fn default_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("minechat")
        .join("token.json")
}

/// Read the cached account. A missing file is `Ok(None)`.
pub fn load(path: &Path) -> Result<Option<Account>, TokenCacheError> {
    let data = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(TokenCacheError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    serde_json::from_str(&data)
        .map(Some)
        .map_err(|source| TokenCacheError::Format {
            path: path.to_path_buf(),
            source,
        })
}

/// Convenience: the cached token, if any. Unreadable caches count as empty.
pub fn load_token(path: &Path) -> Option<String> {
    match load(path) {
        Ok(account) => account
            .map(|a| a.account_hash)
            .filter(|hash| !hash.is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "ignoring token cache");
            None
        }
    }
}

/// Write the account record, creating parent directories as needed.
pub fn save(path: &Path, account: &Account) -> Result<(), TokenCacheError> {
    let io_err = |source| TokenCacheError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(io_err)?;
    }
    let json = serde_json::to_string(account).map_err(|source| TokenCacheError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, json).map_err(io_err)
}
