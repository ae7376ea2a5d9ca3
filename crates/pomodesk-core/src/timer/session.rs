//! Work / break sequencing.
//!
//! ## State Transitions
//!
//! ```text
//! Work --(index <  K)--> ShortBreak --> Work   (index + 1)
//! Work --(index >= K)--> LongBreak  --> Work   (index reset to 1)
//! ```
//!
//! `K` is `sessions_before_long_break`. The machine owns only sequencing and
//! the countdown; recording stats, alerting and auto-restart are the
//! controller's job.

use serde::{Deserialize, Serialize};

use super::countdown::Countdown;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Work,
    ShortBreak,
    LongBreak,
}

impl SessionType {
    pub fn is_break(self) -> bool {
        !matches!(self, SessionType::Work)
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionType::Work => "Work Session",
            SessionType::ShortBreak => "Short Break",
            SessionType::LongBreak => "Long Break",
        }
    }

    pub fn duration_secs(self, settings: &Settings) -> u64 {
        match self {
            SessionType::Work => settings.work_secs(),
            SessionType::ShortBreak => settings.short_break_secs(),
            SessionType::LongBreak => settings.long_break_secs(),
        }
    }
}

/// What a completion did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub finished: SessionType,
    pub next: SessionType,
    /// Session index after the transition.
    pub index: u32,
}

#[derive(Debug, Clone)]
pub struct SessionMachine {
    session_type: SessionType,
    current_session_index: u32,
    total_seconds: u64,
    /// Authoritative only while paused; a display cache while running.
    remaining_seconds: u64,
    countdown: Countdown,
}

impl SessionMachine {
    /// Work session 1, paused, sized from `settings`.
    pub fn new(settings: &Settings) -> Self {
        let total = SessionType::Work.duration_secs(settings);
        Self {
            session_type: SessionType::Work,
            current_session_index: 1,
            total_seconds: total,
            remaining_seconds: total,
            countdown: Countdown::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn current_session_index(&self) -> u32 {
        self.current_session_index
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

    /// Whether a timing message stamped `epoch` belongs to the current run.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.countdown.is_current(epoch)
    }

    /// Remaining seconds, recomputed from the target while running.
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

    // ── Commands ─────────────────────────────────────────────────────

    /// Start or resume. Returns the target end-instant, or `None` when
    /// already running.
    pub fn start(&mut self, now_ms: u64) -> Option<u64> {
        if self.is_running() {
            return None;
        }
        Some(self.countdown.start(self.remaining_seconds, now_ms))
    }

    /// Freeze the remaining time and clear the target. Returns whether the
    /// machine was running.
    pub fn pause(&mut self, now_ms: u64) -> bool {
        let Some(remaining) = self.countdown.peek(now_ms) else {
            return false;
        };
        self.remaining_seconds = remaining.min(self.total_seconds);
        self.countdown.stop();
        true
    }

    /// Pause and restore the full duration of the current session.
    pub fn reset(&mut self, now_ms: u64) {
        self.pause(now_ms);
        self.remaining_seconds = self.total_seconds;
    }

    /// Record a remaining value reported by a timing backend.
    pub fn observe_remaining(&mut self, remaining_secs: u64) {
        if self.is_running() {
            self.remaining_seconds = remaining_secs.min(self.total_seconds);
        }
    }

    /// Stop and move to the next session type.
    pub fn complete(&mut self, settings: &Settings) -> Transition {
        self.countdown.stop();
        let finished = self.session_type;
        let next = match finished {
            SessionType::Work => {
                if self.current_session_index >= settings.sessions_before_long_break {
                    self.current_session_index = 1;
                    SessionType::LongBreak
                } else {
                    self.current_session_index += 1;
                    SessionType::ShortBreak
                }
            }
            SessionType::ShortBreak | SessionType::LongBreak => SessionType::Work,
        };
        self.enter(next, settings);
        Transition {
            finished,
            next,
            index: self.current_session_index,
        }
    }

    /// Back to Work session 1 with durations re-derived from `settings`.
    pub fn restart_cycle(&mut self, settings: &Settings) {
        self.countdown.stop();
        self.current_session_index = 1;
        self.enter(SessionType::Work, settings);
    }

    fn enter(&mut self, session_type: SessionType, settings: &Settings) {
        self.session_type = session_type;
        self.total_seconds = session_type.duration_secs(settings);
        self.remaining_seconds = self.total_seconds;
    }
}
