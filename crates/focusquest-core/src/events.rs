use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::SessionMode;

/// Every countdown command that changes something produces an Event.
/// The presentation layer renders them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_id: Uuid,
        mode: SessionMode,
        total_seconds: u64,
        at: DateTime<Utc>,
    },
    SessionPaused {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    /// Explicit stop; never counts as completion.
    SessionStopped {
        session_id: Uuid,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    /// Host suspended while the session was running.
    SessionSuspended {
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    /// A background or terminated interval was charged as one lump.
    SessionReconciled {
        elapsed_seconds: u64,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        session_id: Uuid,
        mode: SessionMode,
        total_seconds: u64,
        at: DateTime<Utc>,
    },
    /// Display state polled by the presentation layer.
    StateSnapshot {
        session_id: Option<Uuid>,
        mode: Option<SessionMode>,
        is_running: bool,
        is_backgrounded: bool,
        completed: bool,
        remaining_seconds: u64,
        total_seconds: u64,
        progress: f64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn is_completion(&self) -> bool {
        matches!(self, Event::SessionCompleted { .. })
    }
}
