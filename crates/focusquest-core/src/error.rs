//! Core error types for focusquest-core.
//!
//! None of these reach the presentation layer from the countdown itself:
//! the countdown logs persistence failures and carries on. They are surfaced
//! by the stores, the config loader and the database for callers that want
//! to handle them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from opening the on-disk stores: resolving the data directory
/// and opening the database.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised while reading, writing or clearing a session snapshot.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot could not be encoded or decoded: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Snapshot database failure: {0}")]
    Database(#[from] DatabaseError),

    /// The stored record decoded but breaks a session invariant.
    #[error("Corrupt snapshot: {0}")]
    Corrupt(#[from] ValidationError),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The data directory could not be resolved or created
    #[error("Cannot prepare data directory {path}: {source}")]
    DataDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Session total must be positive
    #[error("total_seconds must be greater than zero")]
    ZeroDuration,

    /// Remaining time cannot exceed the session total
    #[error("remaining_seconds ({remaining}) exceeds total_seconds ({total})")]
    RemainingExceedsTotal { remaining: i64, total: u64 },

    /// A session cannot be running in the foreground and backgrounded at once
    #[error("session is marked running while a background interval is pending")]
    RunningWhileBackgrounded,
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if code.code == rusqlite::ErrorCode::DatabaseBusy
                    || code.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}
