//! Countdown host.
//!
//! Every invocation is a cold start: the countdown recovers whatever the
//! previous invocation left in the store, applies one command, and the new
//! snapshot is already persisted when the process exits. `run` is the only
//! long-lived command; it plays the part of the UI refresh loop.

use std::time::Duration;

use clap::Subcommand;
use focusquest_core::storage::{StorageBackend, TimerConfig};
use focusquest_core::{
    Config, CountdownOptions, Database, Event, FileStore, HistorySink, KvStore,
    LifecycleObserver, RecoveryOutcome, ResumableCountdown, SessionMode, SnapshotStore,
    SystemClock,
};

type HostCountdown = ResumableCountdown<Box<dyn SnapshotStore>, HistorySink, SystemClock>;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a new session, replacing any current one
    Start {
        /// Session mode: work or rest
        #[arg(long, default_value = "work")]
        mode: SessionMode,
        /// Session length in seconds (defaults to the configured minutes)
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Deliver foreground ticks by hand
    Tick {
        #[arg(long, default_value = "1")]
        count: u64,
    },
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// Discard the session without completing it
    Stop,
    /// Simulate the host going to background; the next invocation charges
    /// the time spent away
    Suspend,
    /// Print current countdown state as JSON
    Status,
    /// Only run cold-start recovery and print what it found
    Recover,
    /// Tick at the configured cadence until completion or Ctrl-C
    Run,
}

fn open_store(config: &Config) -> Result<Box<dyn SnapshotStore>, Box<dyn std::error::Error>> {
    Ok(match config.storage.backend {
        StorageBackend::Sqlite => Box::new(KvStore::new(Database::open()?)),
        StorageBackend::File => Box::new(FileStore::open_default()?),
    })
}

fn open_countdown(config: &Config) -> Result<(HostCountdown, RecoveryOutcome), Box<dyn std::error::Error>> {
    let store = open_store(config)?;
    let sink = HistorySink::new(Database::open()?, config.rewards.clone());
    let mut countdown = ResumableCountdown::new(store, sink, SystemClock)
        .with_options(CountdownOptions::from(&config.timer));
    let outcome = countdown.recover();
    tracing::debug!(?outcome, backend = ?config.storage.backend, "countdown opened");
    Ok((countdown, outcome))
}

fn print_event(event: &Event) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(event)?);
    Ok(())
}

/// Print the event if the command produced one, otherwise the current state.
fn print_outcome(countdown: &HostCountdown, event: Option<Event>) -> Result<(), Box<dyn std::error::Error>> {
    match event {
        Some(event) => print_event(&event),
        None => print_event(&countdown.snapshot()),
    }
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let (mut countdown, outcome) = open_countdown(&config)?;
    if matches!(outcome, RecoveryOutcome::Completed { .. }) {
        if let Some(coins) = countdown.sink().last_reward() {
            eprintln!("session finished while away: +{coins} coins");
        }
    }

    match action {
        TimerAction::Start { mode, seconds } => {
            let total = seconds.unwrap_or_else(|| config.timer.default_seconds(mode));
            let event = countdown.start(mode, total);
            print_outcome(&countdown, event)?;
        }
        TimerAction::Tick { count } => {
            let mut last = None;
            for _ in 0..count {
                if let Some(event) = countdown.tick() {
                    last = Some(event);
                    break;
                }
            }
            print_outcome(&countdown, last)?;
        }
        TimerAction::Pause => {
            let event = countdown.pause();
            print_outcome(&countdown, event)?;
        }
        TimerAction::Resume => {
            let event = countdown.resume();
            print_outcome(&countdown, event)?;
        }
        TimerAction::Stop => {
            let event = countdown.stop();
            print_outcome(&countdown, event)?;
        }
        TimerAction::Suspend => {
            let event = countdown.on_will_suspend();
            print_outcome(&countdown, event)?;
        }
        TimerAction::Status => {
            print_event(&countdown.snapshot())?;
        }
        TimerAction::Recover => {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        TimerAction::Run => {
            run_loop(&mut countdown, &config.timer)?;
        }
    }
    Ok(())
}

/// Drive `tick()` from a tokio interval on a single-threaded runtime, so
/// ticks and the Ctrl-C suspend notification are serialized on one task.
fn run_loop(countdown: &mut HostCountdown, timer: &TimerConfig) -> Result<(), Box<dyn std::error::Error>> {
    if !countdown.is_running() {
        print_event(&countdown.snapshot())?;
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let period = Duration::from_millis(timer.tick_interval_ms.max(1));
    runtime.block_on(drive(countdown, period, tokio::signal::ctrl_c()))
}

/// Tick until the session completes or `shutdown` resolves, which is
/// delivered as a suspend. `shutdown` is polled across iterations, never
/// recreated.
async fn drive<F>(countdown: &mut HostCountdown, period: Duration, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
where
    F: std::future::Future,
{
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick of a tokio interval fires immediately.
    interval.tick().await;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Some(event) = countdown.tick() {
                    print_event(&event)?;
                    if let Some(coins) = countdown.sink().last_reward() {
                        eprintln!("boss defeated: +{coins} coins");
                    }
                    break;
                }
                eprint!("\r{} remaining   ", format_remaining(countdown.remaining_seconds()));
            }
            _ = &mut shutdown => {
                eprintln!();
                if let Some(event) = countdown.on_will_suspend() {
                    print_event(&event)?;
                }
                break;
            }
        }
    }
    Ok(())
}

fn format_remaining(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use focusquest_core::storage::RewardConfig;
    use focusquest_core::MemoryStore;

    fn host_countdown() -> HostCountdown {
        let store: Box<dyn SnapshotStore> = Box::new(MemoryStore::new());
        let sink = HistorySink::new(Database::open_memory().unwrap(), RewardConfig::default());
        ResumableCountdown::new(store, sink, SystemClock)
    }

    #[tokio::test]
    async fn shutdown_suspends_the_running_session() {
        let mut countdown = host_countdown();
        countdown.start(SessionMode::Work, 600);

        drive(&mut countdown, Duration::from_secs(3_600), std::future::ready(()))
            .await
            .unwrap();

        assert!(countdown.is_backgrounded());
        assert!(!countdown.is_running());
        assert_eq!(countdown.remaining_seconds(), 600);
    }

    #[tokio::test]
    async fn pending_shutdown_lets_the_session_finish() {
        let mut countdown = host_countdown();
        countdown.start(SessionMode::Rest, 3);

        drive(&mut countdown, Duration::from_millis(1), std::future::pending::<()>())
            .await
            .unwrap();

        assert!(countdown.is_completed());
        assert_eq!(countdown.sink().database().stats().unwrap().total_sessions, 1);
    }

    #[test]
    fn remaining_formats_as_minutes_and_seconds() {
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(61), "01:01");
        assert_eq!(format_remaining(1500), "25:00");
    }
}
