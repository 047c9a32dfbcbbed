mod config;
pub mod database;
pub mod snapshot;

pub use config::{Config, RewardConfig, StorageBackend, StorageConfig, TimerConfig};
pub use database::{CompletionRecord, Database, Stats};
pub use snapshot::{FileStore, KvStore, MemoryStore, SnapshotStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/focusquest[-dev]/` based on FOCUSQUEST_ENV.
///
/// Set FOCUSQUEST_ENV=dev to use the development data directory, or
/// FOCUSQUEST_DATA_DIR to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("FOCUSQUEST_DATA_DIR") {
        Some(explicit) => PathBuf::from(explicit),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("FOCUSQUEST_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("focusquest-dev")
            } else {
                base_dir.join("focusquest")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|source| ConfigError::DataDir {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}
