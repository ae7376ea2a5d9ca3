//! Integration tests for the controller.
//!
//! These drive a full controller over an in-memory or SQLite store with a
//! hand-driven clock and check the user-visible workflows end to end.

use std::sync::Arc;

use chrono::NaiveDate;
use pomodesk_core::clock::ManualClock;
use pomodesk_core::timer::ForegroundTicker;
use pomodesk_core::{
    Clock, Controller, DailyStats, Event, KvStore, MemoryStore, NullAlerter, Posture, SessionType,
    Settings, SqliteStore, TimingMode,
};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
}

fn build(store: Box<dyn KvStore>, clock: Arc<ManualClock>) -> Controller {
    Controller::with_backends(
        store,
        Box::new(NullAlerter),
        clock.clone(),
        Box::new(ForegroundTicker::new(clock.clone())),
        Box::new(ForegroundTicker::new(clock)),
    )
}

fn controller(settings: Settings) -> (Controller, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::at_day(day()));
    let store = MemoryStore::new();
    settings.save(&store).unwrap();
    (build(Box::new(store), clock.clone()), clock)
}

#[test]
fn test_skipping_four_work_sessions_reaches_long_break() {
    let (mut c, _clock) = controller(Settings::default());
    let mut sequence = vec![c.session().session_type()];

    let mut work_skips = 0;
    while work_skips < 4 {
        if c.session().session_type() == SessionType::Work {
            work_skips += 1;
        }
        c.skip();
        sequence.push(c.session().session_type());
    }

    use SessionType::*;
    assert_eq!(
        sequence,
        vec![Work, ShortBreak, Work, ShortBreak, Work, ShortBreak, Work, LongBreak]
    );
    assert_eq!(c.stats().completed_sessions, 4);
    assert_eq!(c.stats().total_focus_minutes, 100);
    assert_eq!(c.session().total_seconds(), 15 * 60);

    c.skip();
    assert_eq!(c.session().session_type(), Work);
    assert_eq!(c.session().current_session_index(), 1);
}

#[test]
fn test_posture_segment_completes_into_paused_standing() {
    let (mut c, clock) = controller(Settings {
        posture_reminders_enabled: true,
        sitting_minutes: 1,
        ..Settings::default()
    });
    assert_eq!(c.posture().map(|p| p.posture()), Some(Posture::Sitting));

    c.pause_posture_timer();
    clock.advance_secs(61);
    let events = c.pump();

    assert!(events.iter().any(|e| matches!(
        e,
        Event::PostureSwitched { to: Posture::Standing, manual: false, running: false, .. }
    )));
    let posture = c.posture().unwrap();
    assert_eq!(posture.posture(), Posture::Standing);
    assert!(!posture.is_running());
    assert_eq!(c.stats().posture_changes, 1);
    assert!(c.stats().minutes_sitting >= 1);
}

#[test]
fn test_manual_switch_keeps_posture_running() {
    let (mut c, clock) = controller(Settings {
        posture_reminders_enabled: true,
        ..Settings::default()
    });
    c.switch_posture();
    assert!(c.posture().unwrap().is_running());

    clock.advance_secs(4 * 60);
    c.switch_posture();
    let posture = c.posture().unwrap();
    assert_eq!(posture.posture(), Posture::Sitting);
    assert!(posture.is_running());
    assert_eq!(c.stats().minutes_standing, 4);
    assert_eq!(c.stats().posture_changes, 0);
}

#[test]
fn test_pause_and_resume_preserves_remaining() {
    let (mut c, clock) = controller(Settings::default());
    c.start();
    clock.advance_secs(100);
    c.pump();
    c.pause();
    assert_eq!(c.snapshot().remaining_secs, 25 * 60 - 100);

    clock.advance_secs(3600);
    c.pump();
    assert_eq!(c.snapshot().remaining_secs, 25 * 60 - 100);

    c.start();
    assert_eq!(
        c.session().target_end_ms(),
        Some(clock.now_ms() + (25 * 60 - 100) * 1000)
    );
}

#[test]
fn test_long_gap_between_pumps_does_not_drift() {
    let (mut c, clock) = controller(Settings {
        work_minutes: 10,
        ..Settings::default()
    });
    c.start();
    // Host suspended for seven minutes, then wakes up.
    clock.advance_secs(7 * 60);
    c.resync();
    assert_eq!(c.snapshot().remaining_secs, 3 * 60);
}

#[test]
fn test_commands_after_missed_completion_count_it_once() {
    let (mut c, clock) = controller(Settings {
        work_minutes: 1,
        posture_reminders_enabled: true,
        sitting_minutes: 1,
        ..Settings::default()
    });
    c.start();
    c.pause_posture_timer();
    // Both countdowns run out with no pump in between.
    clock.advance_secs(300);

    let mut events = c.pause();
    events.extend(c.pause_posture_timer());
    for _ in 0..3 {
        clock.advance_secs(1);
        events.extend(c.pump());
    }

    let session_completions = events
        .iter()
        .filter(|e| matches!(e, Event::SessionCompleted { .. }))
        .count();
    let posture_switches = events
        .iter()
        .filter(|e| matches!(e, Event::PostureSwitched { manual: false, .. }))
        .count();
    assert_eq!(session_completions, 1);
    assert_eq!(posture_switches, 1);
    assert_eq!(c.session().session_type(), SessionType::ShortBreak);
    assert!(!c.session().is_running());
    assert_eq!(c.posture().map(|p| p.posture()), Some(Posture::Standing));
    assert_eq!(c.stats().completed_sessions, 1);
    assert_eq!(c.stats().posture_changes, 1);
}

#[test]
fn test_active_break_fires_once_per_interval() {
    let (mut c, clock) = controller(Settings {
        posture_reminders_enabled: true,
        active_break_interval_minutes: 20,
        ..Settings::default()
    });
    let due = |events: &[Event]| {
        events
            .iter()
            .filter(|e| matches!(e, Event::ActiveBreakDue { .. }))
            .count()
    };

    assert_eq!(due(&c.pump()), 0);
    let mut fired = 0;
    for _ in 0..60 {
        clock.advance_secs(60);
        fired += due(&c.pump());
    }
    assert_eq!(fired, 3);
}

#[test]
fn test_stats_persist_and_reset_on_new_day() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pomodesk.db");
    let clock = Arc::new(ManualClock::at_day(day()));

    {
        let mut c = build(Box::new(SqliteStore::open_at(&path).unwrap()), clock.clone());
        c.skip();
        assert_eq!(c.stats().completed_sessions, 1);
    }

    {
        let c = build(Box::new(SqliteStore::open_at(&path).unwrap()), clock.clone());
        assert_eq!(c.stats().completed_sessions, 1);
        assert_eq!(c.stats().total_focus_minutes, 25);
    }

    clock.advance_secs(24 * 3600);
    let store = SqliteStore::open_at(&path).unwrap();
    let c = build(Box::new(store), clock.clone());
    assert_eq!(c.stats().completed_sessions, 0);
    assert_eq!(c.stats().date, day().succ_opt().unwrap());

    let reread = DailyStats::load(&SqliteStore::open_at(&path).unwrap(), clock.today());
    assert_eq!(reread.completed_sessions, 0);
}

#[test]
fn test_settings_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pomodesk.db");
    let clock = Arc::new(ManualClock::at_day(day()));

    {
        let mut c = build(Box::new(SqliteStore::open_at(&path).unwrap()), clock.clone());
        c.save_settings(Settings {
            work_minutes: 50,
            auto_start: true,
            ..Settings::default()
        });
    }

    let c = build(Box::new(SqliteStore::open_at(&path).unwrap()), clock);
    assert_eq!(c.settings().work_minutes, 50);
    assert!(c.settings().auto_start);
    assert_eq!(c.session().total_seconds(), 50 * 60);
}

#[test]
fn test_alert_failure_does_not_block_completion() {
    let (mut c, _clock) = controller(Settings {
        sound_enabled: true,
        notifications_enabled: true,
        ..Settings::default()
    });
    let events = c.skip();
    let failures = events
        .iter()
        .filter(|e| matches!(e, Event::AlertFailed { .. }))
        .count();
    assert_eq!(failures, 2);
    assert_eq!(c.session().session_type(), SessionType::ShortBreak);
    assert_eq!(c.stats().completed_sessions, 1);
}

#[test]
fn test_background_mode_without_runtime_still_counts_down() {
    let clock = Arc::new(ManualClock::at_day(day()));
    let store = MemoryStore::new();
    Settings {
        work_minutes: 1,
        ..Settings::default()
    }
    .save(&store)
    .unwrap();
    let mut c = Controller::new(
        Box::new(store),
        Box::new(NullAlerter),
        clock.clone(),
        TimingMode::Background,
    );

    c.start();
    clock.advance_secs(60);
    c.pump();
    assert_eq!(c.session().session_type(), SessionType::ShortBreak);
}
