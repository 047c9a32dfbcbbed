//! Durable homes for the in-flight session snapshot.
//!
//! Every store keeps at most one record and replaces it whole on each write,
//! so a crash between two writes leaves either the old snapshot or the new
//! one, never a mix of fields from both.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::database::Database;
use crate::error::StoreError;
use crate::timer::SessionSnapshot;

/// Key of the snapshot row in the database kv table.
pub const SNAPSHOT_KEY: &str = "countdown_snapshot";

pub trait SnapshotStore {
    fn write_snapshot(&mut self, snapshot: &SessionSnapshot) -> Result<(), StoreError>;

    /// `Ok(None)` when nothing is stored; `Err(StoreError::Corrupt)` or
    /// `Err(StoreError::Json)` when something is stored but unusable.
    fn read_snapshot(&mut self) -> Result<Option<SessionSnapshot>, StoreError>;

    fn clear_snapshot(&mut self) -> Result<(), StoreError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Box<S> {
    fn write_snapshot(&mut self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        (**self).write_snapshot(snapshot)
    }

    fn read_snapshot(&mut self) -> Result<Option<SessionSnapshot>, StoreError> {
        (**self).read_snapshot()
    }

    fn clear_snapshot(&mut self) -> Result<(), StoreError> {
        (**self).clear_snapshot()
    }
}

fn decode(raw: &str) -> Result<SessionSnapshot, StoreError> {
    let snapshot: SessionSnapshot = serde_json::from_str(raw)?;
    snapshot.validate()?;
    Ok(snapshot)
}

// ── Memory ──────────────────────────────────────────────────────────

/// Holds the snapshot as its encoded JSON, so reads go through the same
/// decode and validation path as the durable stores.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    raw: Option<String>,
    writes: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with arbitrary content, valid or not.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Some(raw.into()),
            writes: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_none()
    }

    /// Number of successful writes since creation.
    pub fn write_count(&self) -> usize {
        self.writes
    }

    /// Decode the held snapshot without going through the trait.
    pub fn peek(&self) -> Option<SessionSnapshot> {
        self.raw.as_deref().and_then(|raw| decode(raw).ok())
    }
}

impl SnapshotStore for MemoryStore {
    fn write_snapshot(&mut self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        self.raw = Some(serde_json::to_string(snapshot)?);
        self.writes += 1;
        Ok(())
    }

    fn read_snapshot(&mut self) -> Result<Option<SessionSnapshot>, StoreError> {
        self.raw.as_deref().map(decode).transpose()
    }

    fn clear_snapshot(&mut self) -> Result<(), StoreError> {
        self.raw = None;
        Ok(())
    }
}

// ── File ────────────────────────────────────────────────────────────

/// A JSON file replaced by temp-file-and-rename on every write.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data_dir>/countdown.json`.
    pub fn open_default() -> Result<Self, crate::error::ConfigError> {
        Ok(Self::new(super::data_dir()?.join("countdown.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl SnapshotStore for FileStore {
    fn write_snapshot(&mut self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let body = serde_json::to_vec_pretty(snapshot)?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_err(e))?;
        tmp.write_all(&body).map_err(|e| self.io_err(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;
        Ok(())
    }

    fn read_snapshot(&mut self) -> Result<Option<SessionSnapshot>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => decode(&raw).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn clear_snapshot(&mut self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_err(e)),
        }
    }
}

// ── SQLite kv ───────────────────────────────────────────────────────

/// One row of the database kv table.
pub struct KvStore {
    db: Database,
    key: String,
}

impl KvStore {
    pub fn new(db: Database) -> Self {
        Self::with_key(db, SNAPSHOT_KEY)
    }

    pub fn with_key(db: Database, key: impl Into<String>) -> Self {
        Self { db, key: key.into() }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl SnapshotStore for KvStore {
    fn write_snapshot(&mut self, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot)?;
        self.db.kv_set(&self.key, &json)?;
        Ok(())
    }

    fn read_snapshot(&mut self) -> Result<Option<SessionSnapshot>, StoreError> {
        match self.db.kv_get(&self.key)? {
            Some(raw) => decode(&raw).map(Some),
            None => Ok(None),
        }
    }

    fn clear_snapshot(&mut self) -> Result<(), StoreError> {
        self.db.kv_delete(&self.key)?;
        Ok(())
    }
}
