mod countdown;
mod lifecycle;
mod session;

pub use countdown::{CountdownOptions, RecoveryOutcome, ResumableCountdown, MAX_SESSION_SECONDS};
pub use lifecycle::{CompletionSink, LifecycleObserver};
pub use session::{CompletedSession, Session, SessionMode, SessionSnapshot};
