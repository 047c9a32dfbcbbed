//! Integration tests for the resumable countdown: foreground ticking,
//! suspend/resume reconciliation and cold-start recovery.

use chrono::Duration;
use focusquest_core::{
    Clock, CompletedSession, Event, FileStore, LifecycleObserver, ManualClock, MemoryStore,
    RecoveryOutcome, ResumableCountdown, SessionMode, SessionSnapshot,
};
use proptest::prelude::*;
use uuid::Uuid;

type Countdown = ResumableCountdown<MemoryStore, Vec<CompletedSession>, ManualClock>;

fn fresh() -> (Countdown, ManualClock) {
    let clock = ManualClock::starting_now();
    (
        ResumableCountdown::new(MemoryStore::new(), Vec::new(), clock.clone()),
        clock,
    )
}

#[test]
fn full_run_of_ticks_completes_exactly_once() {
    for total in [1_u64, 2, 59, 600] {
        let (mut countdown, clock) = fresh();
        countdown.start(SessionMode::Work, total);

        let mut completions = 0;
        for _ in 0..total {
            clock.advance_secs(1);
            if countdown.tick().is_some_and(|e| e.is_completion()) {
                completions += 1;
            }
        }

        assert_eq!(completions, 1, "total = {total}");
        assert_eq!(countdown.remaining_seconds(), 0);
        assert_eq!(countdown.sink().len(), 1);
    }
}

#[test]
fn background_gap_is_reconciled_without_completion() {
    let (mut countdown, clock) = fresh();
    countdown.start(SessionMode::Work, 600);

    countdown.on_will_suspend();
    clock.advance_secs(100);
    countdown.on_did_resume();

    assert_eq!(countdown.remaining_seconds(), 500);
    assert!(countdown.is_running());
    assert!(countdown.sink().is_empty());
}

#[test]
fn background_overshoot_completes_once() {
    let (mut countdown, clock) = fresh();
    countdown.start(SessionMode::Rest, 60);

    countdown.on_will_suspend();
    clock.advance_secs(90);
    let event = countdown.on_did_resume();

    assert!(matches!(
        event,
        Some(Event::SessionCompleted {
            mode: SessionMode::Rest,
            total_seconds: 60,
            ..
        })
    ));
    assert_eq!(countdown.remaining_seconds(), 0);
    assert_eq!(countdown.sink().len(), 1);

    countdown.tick();
    countdown.on_did_resume();
    assert_eq!(countdown.sink().len(), 1);
}

#[test]
fn cold_start_with_elapsed_gap_completes_immediately() {
    let clock = ManualClock::starting_now();
    let now = clock.now();
    let snapshot = SessionSnapshot {
        id: Uuid::new_v4(),
        mode: SessionMode::Work,
        total_seconds: 1500,
        remaining_seconds: 30,
        is_running: true,
        started_at: now - Duration::seconds(1515),
        backgrounded_at: None,
        last_seen_at: now - Duration::seconds(45),
        accumulated_background_seconds: 0,
    };
    let store = MemoryStore::with_raw(serde_json::to_string(&snapshot).unwrap());

    let mut countdown = ResumableCountdown::new(store, Vec::new(), clock);
    let outcome = countdown.recover();

    assert_eq!(
        outcome,
        RecoveryOutcome::Completed {
            reconciled_seconds: 45
        }
    );
    assert_eq!(countdown.sink().len(), 1);
    assert_eq!(countdown.sink()[0].session_id, snapshot.id);
    assert!(countdown.store().is_empty());
}

#[test]
fn pause_then_resume_keeps_remaining() {
    let (mut countdown, _clock) = fresh();
    countdown.start(SessionMode::Work, 300);
    countdown.tick();

    countdown.pause();
    countdown.resume();

    assert_eq!(countdown.remaining_seconds(), 299);
    assert!(countdown.is_running());
}

#[test]
fn stop_leaves_nothing_to_recover() {
    let (mut countdown, clock) = fresh();
    countdown.start(SessionMode::Work, 300);
    countdown.tick();
    countdown.on_will_suspend();
    countdown.stop();

    let (store, sink, _) = countdown.into_parts();
    let mut revived = ResumableCountdown::new(store, sink, clock);
    assert_eq!(revived.recover(), RecoveryOutcome::NoSession);
    assert!(revived.session().is_none());
    assert!(revived.sink().is_empty());
}

#[test]
fn ticks_and_background_gap_are_counted_once() {
    let (mut countdown, clock) = fresh();
    countdown.start(SessionMode::Work, 600);

    for _ in 0..5 {
        clock.advance_secs(1);
        countdown.tick();
    }
    countdown.on_will_suspend();
    clock.advance_secs(10);
    // The host may still deliver a stray tick while going to background.
    countdown.tick();
    countdown.on_did_resume();
    for _ in 0..5 {
        clock.advance_secs(1);
        countdown.tick();
    }

    assert_eq!(countdown.remaining_seconds(), 600 - 5 - 10 - 5);
}

#[test]
fn process_death_while_backgrounded_survives_in_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("countdown.json");
    let clock = ManualClock::starting_now();

    let mut countdown =
        ResumableCountdown::new(FileStore::new(&path), Vec::new(), clock.clone());
    countdown.start(SessionMode::Work, 1500);
    for _ in 0..100 {
        clock.advance_secs(1);
        countdown.tick();
    }
    countdown.on_will_suspend();
    drop(countdown);

    clock.advance_secs(600);
    let mut revived = ResumableCountdown::new(FileStore::new(&path), Vec::new(), clock.clone());
    assert_eq!(
        revived.recover(),
        RecoveryOutcome::Restored {
            remaining_seconds: 800,
            reconciled_seconds: 600,
            is_running: true,
        }
    );

    for _ in 0..800 {
        clock.advance_secs(1);
        revived.tick();
    }
    assert!(revived.is_completed());
    assert_eq!(revived.sink().len(), 1);
    assert!(!path.exists());
}

#[derive(Debug, Clone)]
enum Step {
    Tick,
    Pause,
    Resume,
    Suspend,
    Wake,
    Wait(i64),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        6 => Just(Step::Tick),
        1 => Just(Step::Pause),
        1 => Just(Step::Resume),
        1 => Just(Step::Suspend),
        1 => Just(Step::Wake),
        2 => (0_i64..120).prop_map(Step::Wait),
    ]
}

proptest! {
    #[test]
    fn remaining_never_increases_and_completion_fires_at_most_once(
        total in 1_u64..900,
        steps in proptest::collection::vec(step(), 0..200),
    ) {
        let (mut countdown, clock) = fresh();
        countdown.start(SessionMode::Work, total);
        let mut previous = countdown.remaining_seconds();

        for step in steps {
            match step {
                Step::Tick => { countdown.tick(); }
                Step::Pause => { countdown.pause(); }
                Step::Resume => { countdown.resume(); }
                Step::Suspend => { countdown.on_will_suspend(); }
                Step::Wake => { countdown.on_did_resume(); }
                Step::Wait(secs) => clock.advance_secs(secs),
            }
            let remaining = countdown.remaining_seconds();
            prop_assert!(remaining <= previous);
            prop_assert!(remaining <= total);
            previous = remaining;
        }

        prop_assert!(countdown.sink().len() <= 1);
        prop_assert_eq!(countdown.sink().len() == 1, countdown.is_completed());
        if countdown.is_completed() {
            prop_assert_eq!(countdown.remaining_seconds(), 0);
        }
    }

    #[test]
    fn decrement_equals_ticks_plus_background_seconds(
        ticks_before in 0_u64..50,
        gap in 0_i64..50,
        ticks_after in 0_u64..50,
    ) {
        let (mut countdown, clock) = fresh();
        countdown.start(SessionMode::Work, 1_000);

        for _ in 0..ticks_before {
            clock.advance_secs(1);
            countdown.tick();
        }
        countdown.on_will_suspend();
        clock.advance_secs(gap);
        countdown.tick();
        countdown.on_did_resume();
        for _ in 0..ticks_after {
            clock.advance_secs(1);
            countdown.tick();
        }

        let consumed = 1_000 - countdown.remaining_seconds();
        prop_assert_eq!(consumed, ticks_before + gap as u64 + ticks_after);
    }
}
