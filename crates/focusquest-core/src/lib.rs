//! # FocusQuest Core Library
//!
//! The timer core of FocusQuest, a work/rest focus timer dressed up as a boss
//! fight. The hero attacks while a work session counts down and rests during
//! a rest session; everything visual lives in the host app. This crate keeps
//! the countdown honest across pauses, host suspension and process restarts.
//!
//! ## Architecture
//!
//! - **Countdown**: a tick-driven state machine; the caller invokes `tick()`
//!   once per second and forwards host lifecycle notifications
//! - **Storage**: whole-record snapshot stores (memory, JSON file, SQLite kv),
//!   SQLite completion history and TOML configuration
//! - **Rewards**: coins booked for each completed session
//!
//! ## Key Components
//!
//! - [`ResumableCountdown`]: the countdown state machine
//! - [`SnapshotStore`]: durable home of the in-flight session
//! - [`CompletionSink`] / [`LifecycleObserver`]: collaborator seams
//! - [`Database`], [`Config`]: history and settings

pub mod clock;
pub mod error;
pub mod events;
pub mod rewards;
pub mod storage;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, CoreError, DatabaseError, StoreError, ValidationError};
pub use events::Event;
pub use rewards::HistorySink;
pub use storage::{Config, Database, FileStore, KvStore, MemoryStore, SnapshotStore};
pub use timer::{
    CompletedSession, CompletionSink, CountdownOptions, LifecycleObserver,
    RecoveryOutcome, ResumableCountdown, Session, SessionMode, SessionSnapshot,
};
