//! Posture cycle.
//!
//! A second countdown, independent of the pomodoro session, alternating
//! between sitting and standing. The two ways of switching behave
//! differently on purpose:
//!
//! - a manual switch always leaves the timer running,
//! - an automatic switch (countdown reached zero) always leaves it paused
//!   until the user resumes.
//!
//! Time spent in a posture is credited to the daily stats in whole minutes
//! when the segment ends. Running time is banked across pauses so that a
//! segment paused several times is still credited in full.

use super::active_break::ActiveBreakWatchdog;
use super::Posture;
use crate::settings::Settings;
use crate::stats::DailyStats;
use crate::timer::Countdown;

const MS_PER_MINUTE: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchKind {
    Manual,
    Automatic,
}

/// What a switch did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostureSwitch {
    pub kind: SwitchKind,
    pub from: Posture,
    pub to: Posture,
    /// Whole minutes credited to `from`.
    pub minutes_credited: u64,
}

#[derive(Debug, Clone)]
pub struct PostureController {
    posture: Posture,
    total_seconds: u64,
    /// Authoritative only while paused.
    remaining_seconds: u64,
    countdown: Countdown,
    /// Start of the current running stretch.
    running_since_ms: Option<u64>,
    /// Running time from earlier stretches of this segment.
    banked_ms: u64,
    watchdog: ActiveBreakWatchdog,
}

impl PostureController {
    /// Sitting, full duration, paused.
    pub fn initialize(settings: &Settings) -> Self {
        let total = Posture::Sitting.duration_secs(settings);
        Self {
            posture: Posture::Sitting,
            total_seconds: total,
            remaining_seconds: total,
            countdown: Countdown::new(),
            running_since_ms: None,
            banked_ms: 0,
            watchdog: ActiveBreakWatchdog::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn posture(&self) -> Posture {
        self.posture
    }

    pub fn total_seconds(&self) -> u64 {
        self.total_seconds
    }

    pub fn is_running(&self) -> bool {
        self.countdown.is_running()
    }

    pub fn target_end_ms(&self) -> Option<u64> {
        self.countdown.target_end_ms()
    }

    pub fn epoch(&self) -> u64 {
        self.countdown.epoch()
    }

    pub fn is_current(&self, epoch: u64) -> bool {
        self.countdown.is_current(epoch)
    }

    pub fn remaining_secs(&self, now_ms: u64) -> u64 {
        self.countdown
            .peek(now_ms)
            .map(|r| r.min(self.total_seconds))
            .unwrap_or(self.remaining_seconds)
    }

    /// Running with the target already reached.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.countdown.peek(now_ms) == Some(0)
    }

    pub fn last_active_break_check_ms(&self) -> Option<u64> {
        self.watchdog.last_check_ms()
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Toggle posture and keep (or start) running with a fresh target.
    pub fn manual_switch(
        &mut self,
        now_ms: u64,
        settings: &Settings,
        stats: &mut DailyStats,
    ) -> PostureSwitch {
        let from = self.posture;
        let minutes_credited = self.flush(now_ms, stats);
        self.enter(from.toggled(), settings);
        self.resume(now_ms);
        PostureSwitch {
            kind: SwitchKind::Manual,
            from,
            to: self.posture,
            minutes_credited,
        }
    }

    /// Countdown reached zero: count the change, toggle, and wait paused.
    pub fn automatic_completion(
        &mut self,
        now_ms: u64,
        settings: &Settings,
        stats: &mut DailyStats,
    ) -> PostureSwitch {
        let from = self.posture;
        let minutes_credited = self.flush(now_ms, stats);
        stats.record_posture_change();
        self.enter(from.toggled(), settings);
        PostureSwitch {
            kind: SwitchKind::Automatic,
            from,
            to: self.posture,
            minutes_credited,
        }
    }

    /// Pause when running, resume when paused. Returns whether it now runs.
    pub fn pause_resume(&mut self, now_ms: u64) -> bool {
        if self.is_running() {
            self.pause(now_ms);
            false
        } else {
            self.resume(now_ms);
            true
        }
    }

    /// Credit the current segment and clear all timing state. Returns the
    /// minutes credited.
    pub fn stop(&mut self, now_ms: u64, stats: &mut DailyStats) -> u64 {
        let minutes = self.flush(now_ms, stats);
        self.countdown.stop();
        self.remaining_seconds = self.total_seconds;
        self.watchdog.reset();
        minutes
    }

    /// Record a remaining value reported by a timing backend.
    pub fn observe_remaining(&mut self, remaining_secs: u64) {
        if self.is_running() {
            self.remaining_seconds = remaining_secs.min(self.total_seconds);
        }
    }

    /// Run the active-break watchdog. Returns true when a reminder is due.
    pub fn check_active_break(&mut self, now_ms: u64, settings: &Settings) -> bool {
        self.watchdog
            .check(now_ms, settings.active_break_interval_minutes)
    }

    /// Re-derive the current segment's length after a settings change. Only
    /// applies while paused at the start of a segment.
    pub fn apply_settings(&mut self, settings: &Settings) {
        if self.is_running() || self.banked_ms > 0 {
            return;
        }
        self.enter(self.posture, settings);
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn resume(&mut self, now_ms: u64) {
        if self.is_running() {
            return;
        }
        self.countdown.start(self.remaining_seconds, now_ms);
        self.running_since_ms = Some(now_ms);
    }

    fn pause(&mut self, now_ms: u64) {
        if let Some(remaining) = self.countdown.peek(now_ms) {
            self.remaining_seconds = remaining.min(self.total_seconds);
        }
        self.countdown.stop();
        self.bank(now_ms);
    }

    fn bank(&mut self, now_ms: u64) {
        if let Some(since) = self.running_since_ms.take() {
            self.banked_ms = self.banked_ms.saturating_add(now_ms.saturating_sub(since));
        }
    }

    /// Credit whole minutes of the current segment to the posture being
    /// left and start a new segment.
    fn flush(&mut self, now_ms: u64, stats: &mut DailyStats) -> u64 {
        let was_running = self.running_since_ms.is_some();
        self.bank(now_ms);
        let minutes = self.banked_ms / MS_PER_MINUTE;
        self.banked_ms = 0;
        if was_running {
            self.running_since_ms = Some(now_ms);
        }
        if minutes > 0 {
            stats.record_posture_minutes(self.posture, minutes);
        }
        minutes
    }

    fn enter(&mut self, posture: Posture, settings: &Settings) {
        self.countdown.stop();
        self.running_since_ms = None;
        self.banked_ms = 0;
        self.posture = posture;
        self.total_seconds = posture.duration_secs(settings);
        self.remaining_seconds = self.total_seconds;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stats() -> DailyStats {
        DailyStats::fresh(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    fn settings() -> Settings {
        Settings {
            posture_reminders_enabled: true,
            sitting_minutes: 30,
            standing_minutes: 10,
            ..Settings::default()
        }
    }

    #[test]
    fn initialize_starts_paused_sitting() {
        let p = PostureController::initialize(&settings());
        assert_eq!(p.posture(), Posture::Sitting);
        assert_eq!(p.total_seconds(), 30 * 60);
        assert!(!p.is_running());
        assert_eq!(p.target_end_ms(), None);
    }

    #[test]
    fn manual_switch_always_runs() {
        let s = settings();
        let mut st = stats();
        let mut p = PostureController::initialize(&s);

        let switch = p.manual_switch(0, &s, &mut st);
        assert_eq!(switch.to, Posture::Standing);
        assert!(p.is_running());
        assert_eq!(p.target_end_ms(), Some(10 * 60_000));
        assert_eq!(st.posture_changes, 0);
    }

    #[test]
    fn manual_switch_credits_the_posture_left() {
        let s = settings();
        let mut st = stats();
        let mut p = PostureController::initialize(&s);
        p.pause_resume(0);

        let switch = p.manual_switch(7 * 60_000 + 30_000, &s, &mut st);
        assert_eq!(switch.minutes_credited, 7);
        assert_eq!(st.minutes_sitting, 7);
        assert_eq!(st.minutes_standing, 0);

        p.manual_switch(7 * 60_000 + 30_000 + 3 * 60_000, &s, &mut st);
        assert_eq!(st.minutes_standing, 3);
    }

    #[test]
    fn automatic_completion_always_pauses() {
        let s = settings();
        let mut st = stats();
        let mut p = PostureController::initialize(&s);
        p.pause_resume(0);

        assert_eq!(p.remaining_secs(30 * 60_000), 0);
        let switch = p.automatic_completion(30 * 60_000, &s, &mut st);
        assert_eq!(switch.kind, SwitchKind::Automatic);
        assert_eq!(p.posture(), Posture::Standing);
        assert!(!p.is_running());
        assert_eq!(p.remaining_secs(40 * 60_000), 10 * 60);
        assert_eq!(st.posture_changes, 1);
        assert_eq!(st.minutes_sitting, 30);
    }

    #[test]
    fn resume_uses_remaining_not_stale_target() {
        let s = settings();
        let mut p = PostureController::initialize(&s);
        assert!(p.pause_resume(0));
        assert!(!p.pause_resume(5 * 60_000));
        assert_eq!(p.remaining_secs(60 * 60_000), 25 * 60);

        assert!(p.pause_resume(60 * 60_000));
        assert_eq!(p.target_end_ms(), Some(60 * 60_000 + 25 * 60_000));
    }

    #[test]
    fn paused_time_is_not_credited() {
        let s = settings();
        let mut st = stats();
        let mut p = PostureController::initialize(&s);
        p.pause_resume(0);
        p.pause_resume(40_000);
        p.pause_resume(10 * 60_000);
        // 40 s + 30 s of running time across two stretches.
        p.manual_switch(10 * 60_000 + 30_000, &s, &mut st);
        assert_eq!(st.minutes_sitting, 1);
    }

    #[test]
    fn stop_flushes_and_clears() {
        let s = settings();
        let mut st = stats();
        let mut p = PostureController::initialize(&s);
        p.pause_resume(0);
        p.check_active_break(0, &s);

        assert_eq!(p.stop(2 * 60_000, &mut st), 2);
        assert_eq!(st.minutes_sitting, 2);
        assert!(!p.is_running());
        assert_eq!(p.last_active_break_check_ms(), None);
    }

    #[test]
    fn active_break_ignores_posture_running_state() {
        let s = Settings {
            active_break_interval_minutes: 20,
            ..settings()
        };
        let mut p = PostureController::initialize(&s);
        assert!(!p.check_active_break(0, &s));
        assert!(p.check_active_break(20 * 60_000, &s));
    }

    #[test]
    fn apply_settings_resizes_untouched_segment() {
        let mut p = PostureController::initialize(&settings());
        let s = Settings {
            sitting_minutes: 45,
            ..settings()
        };
        p.apply_settings(&s);
        assert_eq!(p.total_seconds(), 45 * 60);

        p.pause_resume(0);
        p.apply_settings(&settings());
        assert_eq!(p.total_seconds(), 45 * 60);
    }
}
