//! Resumable countdown.
//!
//! Owns the authoritative remaining time of a single work or rest session.
//! There is no internal thread or timer: the host calls `tick()` at a steady
//! cadence while the session runs, and forwards suspend/resume notifications
//! through [`LifecycleObserver`].
//!
//! Time reaches the countdown through exactly one channel per segment:
//!
//! ```text
//! foreground       -> tick()            one second per call, never a clock delta
//! suspended        -> on_did_resume()   one lump, now - backgrounded_at
//! process was dead -> recover()         one lump, now - last_seen_at
//! ```
//!
//! Suspending clears `is_running`, so ticks delivered while backgrounded are
//! no-ops and the two channels never overlap.
//!
//! ## Usage
//!
//! ```ignore
//! let mut countdown = ResumableCountdown::new(store, sink, SystemClock);
//! countdown.recover();
//! countdown.start(SessionMode::Work, 25 * 60);
//! // Once per second:
//! countdown.tick(); // Returns Some(Event::SessionCompleted) at zero
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lifecycle::{CompletionSink, LifecycleObserver};
use super::session::{CompletedSession, Session, SessionMode};
use crate::clock::{whole_seconds_between, Clock};
use crate::error::StoreError;
use crate::events::Event;
use crate::storage::{SnapshotStore, TimerConfig};

/// Longest session `start` accepts. The snapshot stores remaining time as a
/// signed integer.
pub const MAX_SESSION_SECONDS: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountdownOptions {
    /// Persist every N foreground ticks. Transitions always persist.
    pub persist_interval_ticks: u32,
}

impl Default for CountdownOptions {
    fn default() -> Self {
        Self {
            persist_interval_ticks: 1,
        }
    }
}

impl From<&TimerConfig> for CountdownOptions {
    fn from(config: &TimerConfig) -> Self {
        Self {
            persist_interval_ticks: config.persist_interval_ticks.max(1),
        }
    }
}

/// What cold-start recovery found in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RecoveryOutcome {
    NoSession,
    /// Something was stored but could not be used; it has been cleared.
    Discarded { reason: String },
    Restored {
        remaining_seconds: u64,
        reconciled_seconds: u64,
        is_running: bool,
    },
    /// The stored session was already due, or the time since it was last
    /// seen used it up. Completion has fired.
    Completed { reconciled_seconds: u64 },
}

pub struct ResumableCountdown<S, K, C> {
    store: S,
    sink: K,
    clock: C,
    options: CountdownOptions,
    session: Option<Session>,
    ticks_since_persist: u32,
    store_failing: bool,
}

impl<S, K, C> ResumableCountdown<S, K, C>
where
    S: SnapshotStore,
    K: CompletionSink,
    C: Clock,
{
    /// A countdown with no session. Call [`recover`](Self::recover) before
    /// anything else to pick up a session interrupted by process exit.
    pub fn new(store: S, sink: K, clock: C) -> Self {
        Self {
            store,
            sink,
            clock,
            options: CountdownOptions::default(),
            session: None,
            ticks_since_persist: 0,
            store_failing: false,
        }
    }

    pub fn with_options(mut self, options: CountdownOptions) -> Self {
        self.options = options;
        self
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.session.as_ref().map(Session::remaining_seconds).unwrap_or(0)
    }

    pub fn is_running(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_running)
    }

    pub fn is_backgrounded(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.backgrounded_at().is_some())
    }

    pub fn is_completed(&self) -> bool {
        self.session.as_ref().is_some_and(Session::is_completed)
    }

    pub fn mode(&self) -> Option<SessionMode> {
        self.session.as_ref().map(Session::mode)
    }

    /// 0.0 .. 1.0 share of the session consumed; drives the boss HP bar.
    pub fn progress(&self) -> f64 {
        self.session.as_ref().map(Session::progress).unwrap_or(0.0)
    }

    pub fn options(&self) -> CountdownOptions {
        self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn into_parts(self) -> (S, K, C) {
        (self.store, self.sink, self.clock)
    }

    /// Display state for the presentation layer.
    pub fn snapshot(&self) -> Event {
        let session = self.session.as_ref();
        Event::StateSnapshot {
            session_id: session.map(Session::id),
            mode: session.map(Session::mode),
            is_running: self.is_running(),
            is_backgrounded: self.is_backgrounded(),
            completed: self.is_completed(),
            remaining_seconds: self.remaining_seconds(),
            total_seconds: session.map(Session::total_seconds).unwrap_or(0),
            progress: self.progress(),
            at: self.clock.now(),
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Cold-start recovery. Replaces any in-memory session with whatever the
    /// store holds, charging time that passed while the process was gone.
    pub fn recover(&mut self) -> RecoveryOutcome {
        self.session = None;
        self.ticks_since_persist = 0;

        let snapshot = match self.store.read_snapshot() {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                tracing::debug!("no interrupted session to recover");
                return RecoveryOutcome::NoSession;
            }
            Err(e @ (StoreError::Json(_) | StoreError::Corrupt(_))) => {
                return self.discard(e.to_string())
            }
            // The record may be fine; a later start retries the read.
            Err(e) => {
                tracing::warn!(error = %e, "could not read countdown snapshot, leaving it in place");
                return RecoveryOutcome::NoSession;
            }
        };

        let mut session = match Session::from_snapshot(&snapshot) {
            Ok(session) => session,
            Err(e) => return self.discard(e.to_string()),
        };
        let now = self.clock.now();

        if snapshot.remaining_seconds <= 0 {
            tracing::info!(session_id = %session.id(), "recovered session was already due");
            self.session = Some(session);
            self.complete(now);
            return RecoveryOutcome::Completed {
                reconciled_seconds: 0,
            };
        }

        let mut reconciled_seconds = 0;
        if snapshot.was_live() {
            session.take_backgrounded_at();
            reconciled_seconds = whole_seconds_between(snapshot.last_seen_at, now);
            session.consume_background(reconciled_seconds);
            session.set_running(true);
        }
        tracing::info!(
            session_id = %session.id(),
            mode = session.mode().as_str(),
            remaining = session.remaining_seconds(),
            reconciled_seconds,
            "recovered interrupted session"
        );
        self.session = Some(session);

        if self.remaining_seconds() == 0 {
            self.complete(now);
            return RecoveryOutcome::Completed { reconciled_seconds };
        }

        self.persist_at(now);
        RecoveryOutcome::Restored {
            remaining_seconds: self.remaining_seconds(),
            reconciled_seconds,
            is_running: self.is_running(),
        }
    }

    /// Begin a new session, replacing any current one.
    ///
    /// A zero duration is clamped to one second, and anything longer than
    /// [`MAX_SESSION_SECONDS`] down to that limit.
    pub fn start(&mut self, mode: SessionMode, total_seconds: u64) -> Option<Event> {
        let total_seconds = if total_seconds == 0 {
            tracing::warn!(mode = mode.as_str(), "zero-length session requested, clamping to 1s");
            1
        } else if total_seconds > MAX_SESSION_SECONDS {
            tracing::warn!(
                mode = mode.as_str(),
                requested = total_seconds,
                "session longer than the snapshot can record, clamping"
            );
            MAX_SESSION_SECONDS
        } else {
            total_seconds
        };

        let now = self.clock.now();
        let session = Session::begin(mode, total_seconds, now);
        let session_id = session.id();
        if let Some(previous) = self.session.replace(session) {
            tracing::debug!(previous = %previous.id(), "replacing session");
        }
        tracing::debug!(%session_id, mode = mode.as_str(), total_seconds, "session started");
        self.persist_at(now);

        Some(Event::SessionStarted {
            session_id,
            mode,
            total_seconds,
            at: now,
        })
    }

    /// Take one second off a running session.
    /// Returns `Some(Event::SessionCompleted)` when this reaches zero.
    pub fn tick(&mut self) -> Option<Event> {
        let session = self
            .session
            .as_mut()
            .filter(|s| s.is_running() && !s.is_completed())?;

        if session.decrement() {
            let now = self.clock.now();
            return self.complete(now);
        }

        self.ticks_since_persist += 1;
        if self.ticks_since_persist >= self.options.persist_interval_ticks.max(1) {
            let now = self.clock.now();
            self.persist_at(now);
        }
        None
    }

    pub fn pause(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let session = self
            .session
            .as_mut()
            .filter(|s| s.is_live() && !s.is_completed())?;

        // A pending background interval still belongs to the running segment.
        if let Some(since) = session.take_backgrounded_at() {
            session.consume_background(whole_seconds_between(since, now));
            if session.remaining_seconds() == 0 {
                return self.complete(now);
            }
        }
        session.set_running(false);
        let remaining_seconds = session.remaining_seconds();
        self.persist_at(now);

        Some(Event::SessionPaused {
            remaining_seconds,
            at: now,
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let session = self
            .session
            .as_mut()
            .filter(|s| !s.is_running() && !s.is_completed())?;

        if let Some(since) = session.take_backgrounded_at() {
            session.consume_background(whole_seconds_between(since, now));
            if session.remaining_seconds() == 0 {
                return self.complete(now);
            }
        }
        session.set_running(true);
        let remaining_seconds = session.remaining_seconds();
        self.persist_at(now);

        Some(Event::SessionResumed {
            remaining_seconds,
            at: now,
        })
    }

    /// Discard the session and its persisted snapshot. Never signals
    /// completion.
    pub fn stop(&mut self) -> Option<Event> {
        let now = self.clock.now();
        self.ticks_since_persist = 0;
        self.clear_store();
        let session = self.session.take()?;
        tracing::debug!(session_id = %session.id(), "session stopped");

        Some(Event::SessionStopped {
            session_id: session.id(),
            remaining_seconds: session.remaining_seconds(),
            at: now,
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// One-way transition to the completed state. Notifies the sink only the
    /// first time.
    fn complete(&mut self, now: DateTime<Utc>) -> Option<Event> {
        let session = self.session.as_mut()?;
        if session.is_completed() {
            return None;
        }
        session.mark_completed();
        let completed = CompletedSession {
            session_id: session.id(),
            mode: session.mode(),
            total_seconds: session.total_seconds(),
            started_at: session.started_at(),
            completed_at: now,
        };

        self.persist_at(now);
        self.sink.on_session_completed(&completed);
        self.clear_store();

        Some(Event::SessionCompleted {
            session_id: completed.session_id,
            mode: completed.mode,
            total_seconds: completed.total_seconds,
            at: now,
        })
    }

    fn persist_at(&mut self, now: DateTime<Utc>) {
        self.ticks_since_persist = 0;
        let Some(session) = self.session.as_ref() else {
            return;
        };

        match self.store.write_snapshot(&session.to_snapshot(now)) {
            Ok(()) => {
                if self.store_failing {
                    tracing::info!("snapshot writes recovered");
                    self.store_failing = false;
                }
            }
            Err(e) if self.store_failing => {
                tracing::debug!(error = %e, "snapshot write still failing");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to persist countdown snapshot, continuing in memory");
                self.store_failing = true;
            }
        }
    }

    fn clear_store(&mut self) {
        if let Err(e) = self.store.clear_snapshot() {
            tracing::warn!(error = %e, "failed to clear countdown snapshot");
        }
    }

    fn discard(&mut self, reason: String) -> RecoveryOutcome {
        tracing::warn!(%reason, "discarding unreadable countdown snapshot");
        self.clear_store();
        RecoveryOutcome::Discarded { reason }
    }
}

impl<S, K, C> LifecycleObserver for ResumableCountdown<S, K, C>
where
    S: SnapshotStore,
    K: CompletionSink,
    C: Clock,
{
    fn on_will_suspend(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let session = self
            .session
            .as_mut()
            .filter(|s| s.is_running() && !s.is_completed())?;

        session.mark_backgrounded(now);
        let remaining_seconds = session.remaining_seconds();
        tracing::debug!(remaining_seconds, "suspending running session");
        self.persist_at(now);

        Some(Event::SessionSuspended {
            remaining_seconds,
            at: now,
        })
    }

    fn on_did_resume(&mut self) -> Option<Event> {
        let now = self.clock.now();
        let session = self.session.as_mut().filter(|s| !s.is_completed())?;
        let since = session.take_backgrounded_at()?;

        let elapsed_seconds = whole_seconds_between(since, now);
        session.consume_background(elapsed_seconds);
        tracing::debug!(elapsed_seconds, remaining = session.remaining_seconds(), "reconciled background interval");
        if session.remaining_seconds() == 0 {
            return self.complete(now);
        }

        session.set_running(true);
        let remaining_seconds = session.remaining_seconds();
        self.persist_at(now);

        Some(Event::SessionReconciled {
            elapsed_seconds,
            remaining_seconds,
            at: now,
        })
    }
}
