use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Which duration class a session counts down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    Work,
    Rest,
}

impl SessionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionMode::Work => "work",
            SessionMode::Rest => "rest",
        }
    }
}

impl std::str::FromStr for SessionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "work" => Ok(SessionMode::Work),
            "rest" => Ok(SessionMode::Rest),
            other => Err(format!("unknown session mode: {other}")),
        }
    }
}

/// One work-or-rest countdown with a fixed total duration.
///
/// Fields are only mutated by `ResumableCountdown`; everything else reads
/// them through the accessors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    id: Uuid,
    mode: SessionMode,
    total_seconds: u64,
    remaining_seconds: u64,
    is_running: bool,
    started_at: DateTime<Utc>,
    backgrounded_at: Option<DateTime<Utc>>,
    accumulated_background_seconds: u64,
    completed: bool,
}

impl Session {
    pub(crate) fn begin(mode: SessionMode, total_seconds: u64, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            mode,
            total_seconds,
            remaining_seconds: total_seconds,
            is_running: true,
            started_at: now,
            backgrounded_at: None,
            accumulated_background_seconds: 0,
            completed: false,
        }
    }

    /// Rebuild a session from a persisted record, rejecting records that
    /// break the session invariants. Negative remaining time is read as zero.
    pub fn from_snapshot(snapshot: &SessionSnapshot) -> Result<Self, ValidationError> {
        snapshot.validate()?;
        Ok(Self {
            id: snapshot.id,
            mode: snapshot.mode,
            total_seconds: snapshot.total_seconds,
            remaining_seconds: snapshot.remaining_seconds.max(0) as u64,
            is_running: snapshot.is_running,
            started_at: snapshot.started_at,
            backgrounded_at: snapshot.backgrounded_at,
            accumulated_background_seconds: snapshot.accumulated_background_seconds,
            completed: false,
        })
    }

    pub fn to_snapshot(&self, last_seen_at: DateTime<Utc>) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            mode: self.mode,
            total_seconds: self.total_seconds,
            remaining_seconds: i64::try_from(self.remaining_seconds).unwrap_or(i64::MAX),
            is_running: self.is_running,
            started_at: self.started_at,
            backgrounded_at: self.backgrounded_at,
            last_seen_at,
            accumulated_background_seconds: self.accumulated_background_seconds,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.total_seconds - self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn backgrounded_at(&self) -> Option<DateTime<Utc>> {
        self.backgrounded_at
    }

    /// Running in the foreground or suspended while running.
    pub fn is_live(&self) -> bool {
        self.is_running || self.backgrounded_at.is_some()
    }

    pub fn accumulated_background_seconds(&self) -> u64 {
        self.accumulated_background_seconds
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// 0.0 .. 1.0 share of the session already consumed.
    pub fn progress(&self) -> f64 {
        if self.total_seconds == 0 {
            return 0.0;
        }
        self.elapsed_seconds() as f64 / self.total_seconds as f64
    }

    // ── Mutation (countdown only) ────────────────────────────────────

    /// Take one foreground second. Returns true when this reaches zero.
    pub(crate) fn decrement(&mut self) -> bool {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        self.remaining_seconds == 0
    }

    /// Lump-sum decrement for a background or terminated interval.
    /// Returns the seconds actually taken off the countdown.
    pub(crate) fn consume_background(&mut self, elapsed_seconds: u64) -> u64 {
        let taken = elapsed_seconds.min(self.remaining_seconds);
        self.remaining_seconds -= taken;
        self.accumulated_background_seconds =
            self.accumulated_background_seconds.saturating_add(elapsed_seconds);
        taken
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.is_running = running;
    }

    pub(crate) fn mark_backgrounded(&mut self, at: DateTime<Utc>) {
        self.is_running = false;
        self.backgrounded_at = Some(at);
    }

    pub(crate) fn take_backgrounded_at(&mut self) -> Option<DateTime<Utc>> {
        self.backgrounded_at.take()
    }

    pub(crate) fn mark_completed(&mut self) {
        self.remaining_seconds = 0;
        self.is_running = false;
        self.backgrounded_at = None;
        self.completed = true;
    }
}

/// The persisted form of a session: one record, written and replaced whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub mode: SessionMode,
    pub total_seconds: u64,
    /// Signed so that a record written as "overdue" still decodes.
    pub remaining_seconds: i64,
    pub is_running: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub started_at: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    pub backgrounded_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_seen_at: DateTime<Utc>,
    #[serde(default)]
    pub accumulated_background_seconds: u64,
}

impl SessionSnapshot {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.total_seconds == 0 {
            return Err(ValidationError::ZeroDuration);
        }
        if self.remaining_seconds > 0 && self.remaining_seconds as u64 > self.total_seconds {
            return Err(ValidationError::RemainingExceedsTotal {
                remaining: self.remaining_seconds,
                total: self.total_seconds,
            });
        }
        if self.is_running && self.backgrounded_at.is_some() {
            return Err(ValidationError::RunningWhileBackgrounded);
        }
        Ok(())
    }

    /// Was the session counting down (foreground or suspended) when written?
    pub fn was_live(&self) -> bool {
        self.is_running || self.backgrounded_at.is_some()
    }
}

/// What the completion sink receives when a session reaches zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedSession {
    pub session_id: Uuid,
    pub mode: SessionMode,
    pub total_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}
