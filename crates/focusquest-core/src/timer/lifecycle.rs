//! Collaborator seams around the countdown: who hears about completion, and
//! how host suspend/resume notifications reach it.

use super::session::CompletedSession;
use crate::events::Event;

/// Receives exactly one call per session that runs down to zero.
pub trait CompletionSink {
    fn on_session_completed(&mut self, completed: &CompletedSession);
}

/// Collects completions in memory.
impl CompletionSink for Vec<CompletedSession> {
    fn on_session_completed(&mut self, completed: &CompletedSession) {
        self.push(completed.clone());
    }
}

/// Host process lifecycle notifications.
///
/// Host adapters (an app delegate, a signal handler, the CLI) call these from
/// the same serial context that drives `tick()`.
pub trait LifecycleObserver {
    /// The host is about to be suspended or terminated.
    fn on_will_suspend(&mut self) -> Option<Event>;

    /// The host is back in the foreground.
    fn on_did_resume(&mut self) -> Option<Event>;
}
