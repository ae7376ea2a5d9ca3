//! The controller: single owner of all timer state.
//!
//! ## Usage
//!
//! ```ignore
//! let mut controller = Controller::new(store, alerter, clock, TimingMode::Foreground);
//! controller.start();
//! // In a loop:
//! for event in controller.pump() { render(event) }
//! ```
//!
//! Every command takes `&mut self`, so mutations of session, posture and
//! stats state never interleave. Timing backends only deliver messages; they
//! are applied here after checking that the message's epoch still matches
//! the active countdown. Settings and stats are persisted through the store
//! whenever they change; store failures are logged and otherwise ignored.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alert::{self, Alerter, Notice, PermissionStatus, SoundPattern, TestAlertReport};
use crate::clock::Clock;
use crate::events::Event;
use crate::posture::{Posture, PostureController};
use crate::settings::Settings;
use crate::stats::DailyStats;
use crate::storage::{KvStore, TimingMode};
use crate::timer::{
    backend_for, SessionMachine, SessionType, TimingBackend, TimingMessage, TimingMessageKind,
};

/// Delay between a completion and the automatic start of the next session.
pub const AUTO_START_DELAY_MS: u64 = 2_000;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostureSnapshot {
    pub posture: Posture,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub running: bool,
    pub target_end_ms: Option<u64>,
    pub last_active_break_check_ms: Option<u64>,
}

/// Everything a host needs to render the current state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub session_type: SessionType,
    pub session_label: String,
    pub session_index: u32,
    pub sessions_before_long_break: u32,
    pub remaining_secs: u64,
    pub total_secs: u64,
    pub running: bool,
    pub target_end_ms: Option<u64>,
    pub auto_start_at_ms: Option<u64>,
    pub posture: Option<PostureSnapshot>,
    pub stats: DailyStats,
    pub notification_permission: PermissionStatus,
    pub at: DateTime<Utc>,
}

pub struct Controller {
    settings: Settings,
    session: SessionMachine,
    posture: Option<PostureController>,
    stats: DailyStats,
    pending_auto_start_ms: Option<u64>,
    store: Box<dyn KvStore>,
    alerter: Box<dyn Alerter>,
    clock: Arc<dyn Clock>,
    session_timer: Box<dyn TimingBackend>,
    posture_timer: Box<dyn TimingBackend>,
}

impl Controller {
    /// Load settings and stats from `store` and build backends for `timing`.
    pub fn new(
        store: Box<dyn KvStore>,
        alerter: Box<dyn Alerter>,
        clock: Arc<dyn Clock>,
        timing: TimingMode,
    ) -> Self {
        let session_timer = backend_for(timing, clock.clone());
        let posture_timer = backend_for(timing, clock.clone());
        Self::with_backends(store, alerter, clock, session_timer, posture_timer)
    }

    pub fn with_backends(
        store: Box<dyn KvStore>,
        alerter: Box<dyn Alerter>,
        clock: Arc<dyn Clock>,
        session_timer: Box<dyn TimingBackend>,
        posture_timer: Box<dyn TimingBackend>,
    ) -> Self {
        let settings = Settings::load(store.as_ref());
        let stats = DailyStats::load(store.as_ref(), clock.today());
        let session = SessionMachine::new(&settings);
        let posture = settings
            .posture_reminders_enabled
            .then(|| PostureController::initialize(&settings));

        Self {
            settings,
            session,
            posture,
            stats,
            pending_auto_start_ms: None,
            store,
            alerter,
            clock,
            session_timer,
            posture_timer,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn stats(&self) -> &DailyStats {
        &self.stats
    }

    pub fn session(&self) -> &SessionMachine {
        &self.session
    }

    pub fn posture(&self) -> Option<&PostureController> {
        self.posture.as_ref()
    }

    pub fn pending_auto_start_ms(&self) -> Option<u64> {
        self.pending_auto_start_ms
    }

    pub fn snapshot(&self) -> Snapshot {
        let now = self.clock.now_ms();
        Snapshot {
            session_type: self.session.session_type(),
            session_label: self.session.session_type().label().to_string(),
            session_index: self.session.current_session_index(),
            sessions_before_long_break: self.settings.sessions_before_long_break,
            remaining_secs: self.session.remaining_secs(now),
            total_secs: self.session.total_seconds(),
            running: self.session.is_running(),
            target_end_ms: self.session.target_end_ms(),
            auto_start_at_ms: self.pending_auto_start_ms,
            posture: self.posture.as_ref().map(|p| PostureSnapshot {
                posture: p.posture(),
                remaining_secs: p.remaining_secs(now),
                total_secs: p.total_seconds(),
                running: p.is_running(),
                target_end_ms: p.target_end_ms(),
                last_active_break_check_ms: p.last_active_break_check_ms(),
            }),
            stats: self.stats.clone(),
            notification_permission: self.alerter.permission(),
            at: self.clock.now_utc(),
        }
    }

    // ── Session commands ─────────────────────────────────────────────

    pub fn start(&mut self) -> Vec<Event> {
        self.pending_auto_start_ms = None;
        let now = self.clock.now_ms();
        self.start_session(now, false).into_iter().collect()
    }

    /// Pause the running session. A session whose countdown already ran
    /// out is completed instead, without scheduling an auto-start.
    pub fn pause(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        if let Some(mut events) = self.catch_up_session(now) {
            self.cancel_auto_start(&mut events);
            return events;
        }
        self.pending_auto_start_ms = None;
        if !self.session.pause(now) {
            return Vec::new();
        }
        self.session_timer.stop();
        vec![Event::SessionPaused {
            remaining_secs: self.session.remaining_secs(now),
            at: self.clock.now_utc(),
        }]
    }

    pub fn reset(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        let mut events = self.catch_up_session(now).unwrap_or_default();
        self.cancel_auto_start(&mut events);
        self.session.reset(now);
        self.session_timer.stop();
        events.push(Event::SessionReset {
            session_type: self.session.session_type(),
            remaining_secs: self.session.remaining_secs(now),
            at: self.clock.now_utc(),
        });
        events
    }

    /// End the current session now, as if its countdown had run out.
    pub fn skip(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        if let Some(events) = self.catch_up_session(now) {
            return events;
        }
        self.pending_auto_start_ms = None;
        let session_type = self.session.session_type();
        self.session.pause(now);
        self.session_timer.stop();
        tracing::debug!(?session_type, "session skipped");

        let mut events = vec![Event::SessionSkipped {
            session_type,
            at: self.clock.now_utc(),
        }];
        events.extend(self.complete_session(now));
        events
    }

    // ── Settings and stats ───────────────────────────────────────────

    /// Clamp and persist `settings`, then re-derive dependent state.
    ///
    /// A paused session restarts at Work 1 with the new durations; a running
    /// one picks them up at its next transition. Toggling posture reminders
    /// creates or tears down the posture cycle.
    pub fn save_settings(&mut self, settings: Settings) -> Vec<Event> {
        let now = self.clock.now_ms();
        let at = self.clock.now_utc();
        let mut events = Vec::new();

        self.settings = settings.clamped();
        if let Err(e) = self.settings.save(self.store.as_ref()) {
            tracing::warn!(error = %e, "failed to persist settings");
        }
        self.pending_auto_start_ms = None;

        let enabled = self.settings.posture_reminders_enabled;
        if enabled && self.posture.is_none() {
            self.posture = Some(PostureController::initialize(&self.settings));
            events.push(Event::PostureEnabled { at });
        } else if !enabled && self.posture.is_some() {
            self.roll_stats_if_needed(&mut events);
            if let Some(mut posture) = self.posture.take() {
                let minutes_credited = posture.stop(now, &mut self.stats);
                self.posture_timer.stop();
                persist_stats(self.store.as_ref(), &self.stats);
                events.push(Event::PostureDisabled {
                    minutes_credited,
                    at,
                });
            }
        } else if let Some(posture) = self.posture.as_mut() {
            posture.apply_settings(&self.settings);
        }

        if !self.session.is_running() {
            self.session.restart_cycle(&self.settings);
        }

        events.push(Event::SettingsSaved { at });
        events
    }

    pub fn reset_stats(&mut self) -> Vec<Event> {
        self.stats.reset(self.clock.today());
        persist_stats(self.store.as_ref(), &self.stats);
        vec![Event::StatsReset {
            stats: self.stats.clone(),
            at: self.clock.now_utc(),
        }]
    }

    // ── Posture commands ─────────────────────────────────────────────

    /// Switch posture by hand. Always leaves the posture timer running.
    ///
    /// When the current segment already ran out, the timer-driven switch is
    /// applied first and the new segment is started.
    pub fn switch_posture(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        if self.posture.is_none() {
            return Vec::new();
        }
        if let Some(mut events) = self.catch_up_posture(now) {
            events.extend(self.pause_posture_timer());
            return events;
        }
        let mut events = Vec::new();
        self.roll_stats_if_needed(&mut events);

        let Some(posture) = self.posture.as_mut() else {
            return events;
        };
        let switch = posture.manual_switch(now, &self.settings, &mut self.stats);
        if let Some(target) = posture.target_end_ms() {
            self.posture_timer.start(posture.epoch(), target);
        }
        if switch.minutes_credited > 0 {
            persist_stats(self.store.as_ref(), &self.stats);
        }
        tracing::info!(from = ?switch.from, to = ?switch.to, "posture switched manually");

        events.push(Event::PostureSwitched {
            from: switch.from,
            to: switch.to,
            manual: true,
            minutes_credited: switch.minutes_credited,
            running: true,
            at: self.clock.now_utc(),
        });
        events
    }

    /// Pause the posture timer when running, resume it when paused.
    ///
    /// Pausing a segment that already ran out applies the timer-driven
    /// switch, which leaves the next segment paused.
    pub fn pause_posture_timer(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        let at = self.clock.now_utc();
        if let Some(events) = self.catch_up_posture(now) {
            return events;
        }
        let Some(posture) = self.posture.as_mut() else {
            return Vec::new();
        };

        let event = if posture.pause_resume(now) {
            if let Some(target) = posture.target_end_ms() {
                self.posture_timer.start(posture.epoch(), target);
            }
            Event::PostureStarted {
                posture: posture.posture(),
                remaining_secs: posture.remaining_secs(now),
                at,
            }
        } else {
            self.posture_timer.stop();
            Event::PosturePaused {
                posture: posture.posture(),
                remaining_secs: posture.remaining_secs(now),
                at,
            }
        };
        vec![event]
    }

    pub fn test_alert(&mut self) -> TestAlertReport {
        alert::test(self.alerter.as_ref())
    }

    // ── Event pump ───────────────────────────────────────────────────

    /// Apply pending timing messages, fire a due auto-start and run the
    /// active-break watchdog. Call periodically.
    pub fn pump(&mut self) -> Vec<Event> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();
        self.roll_stats_if_needed(&mut events);

        for message in self.session_timer.drain() {
            events.extend(self.apply_session_message(message, now));
        }

        if let Some(start_at) = self.pending_auto_start_ms {
            if now >= start_at {
                self.pending_auto_start_ms = None;
                events.extend(self.start_session(now, true));
            }
        }

        for message in self.posture_timer.drain() {
            events.extend(self.apply_posture_message(message, now));
        }

        let due = match self.posture.as_mut() {
            Some(posture) => posture.check_active_break(now, &self.settings),
            None => false,
        };
        if due {
            tracing::info!("active break due");
            events.push(Event::ActiveBreakDue {
                at: self.clock.now_utc(),
            });
            events.extend(self.alert(SoundPattern::ActiveBreak, &Notice::active_break()));
        }

        events
    }

    /// The host regained visibility: re-derive every countdown from its
    /// target instead of trusting anything accumulated while hidden.
    pub fn resync(&mut self) -> Vec<Event> {
        self.session_timer.request_check();
        self.posture_timer.request_check();
        self.pump()
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn start_session(&mut self, now: u64, auto: bool) -> Option<Event> {
        let target = self.session.start(now)?;
        self.session_timer.start(self.session.epoch(), target);
        tracing::debug!(
            session_type = ?self.session.session_type(),
            target_end_ms = target,
            auto,
            "session started"
        );
        Some(Event::SessionStarted {
            session_type: self.session.session_type(),
            session_index: self.session.current_session_index(),
            remaining_secs: self.session.remaining_secs(now),
            target_end_ms: target,
            auto,
            at: self.clock.now_utc(),
        })
    }

    fn apply_session_message(&mut self, message: TimingMessage, now: u64) -> Vec<Event> {
        if !self.session.is_current(message.epoch) {
            tracing::debug!(epoch = message.epoch, "discarding stale session timer message");
            return Vec::new();
        }
        match message.kind {
            TimingMessageKind::Tick { remaining_secs } => {
                self.session.observe_remaining(remaining_secs);
                Vec::new()
            }
            TimingMessageKind::Complete => self.complete_session(now),
        }
    }

    /// Complete a running session whose target has passed but whose
    /// `Complete` message has not been applied yet.
    fn catch_up_session(&mut self, now: u64) -> Option<Vec<Event>> {
        if !self.session.is_expired(now) {
            return None;
        }
        tracing::debug!("session ran out before the command, completing it first");
        Some(self.complete_session(now))
    }

    fn catch_up_posture(&mut self, now: u64) -> Option<Vec<Event>> {
        let expired = self.posture.as_ref().is_some_and(|p| p.is_expired(now));
        if !expired {
            return None;
        }
        tracing::debug!("posture segment ran out before the command, switching first");
        let mut events = Vec::new();
        self.roll_stats_if_needed(&mut events);
        events.extend(self.complete_posture_segment(now));
        Some(events)
    }

    fn cancel_auto_start(&mut self, events: &mut Vec<Event>) {
        if self.pending_auto_start_ms.take().is_some() {
            events.retain(|e| !matches!(e, Event::AutoStartScheduled { .. }));
        }
    }

    fn complete_session(&mut self, now: u64) -> Vec<Event> {
        let mut events = Vec::new();
        self.session_timer.stop();
        let transition = self.session.complete(&self.settings);
        let counted = transition.finished == SessionType::Work;

        if counted {
            self.roll_stats_if_needed(&mut events);
            self.stats.record_work_session(self.settings.work_minutes);
            persist_stats(self.store.as_ref(), &self.stats);
        }
        tracing::info!(
            finished = ?transition.finished,
            next = ?transition.next,
            index = transition.index,
            "session completed"
        );

        events.push(Event::SessionCompleted {
            finished: transition.finished,
            next: transition.next,
            session_index: transition.index,
            counted,
            at: self.clock.now_utc(),
        });
        events.extend(self.alert(
            SoundPattern::SessionComplete,
            &Notice::session_finished(transition.finished),
        ));

        if self.settings.auto_start {
            let start_at_ms = now.saturating_add(AUTO_START_DELAY_MS);
            self.pending_auto_start_ms = Some(start_at_ms);
            events.push(Event::AutoStartScheduled {
                start_at_ms,
                at: self.clock.now_utc(),
            });
        }
        events
    }

    fn apply_posture_message(&mut self, message: TimingMessage, now: u64) -> Vec<Event> {
        let mut events = Vec::new();
        let is_current = self
            .posture
            .as_ref()
            .is_some_and(|p| p.is_current(message.epoch));
        if !is_current {
            tracing::debug!(epoch = message.epoch, "discarding stale posture timer message");
            return events;
        }

        match message.kind {
            TimingMessageKind::Tick { remaining_secs } => {
                if let Some(posture) = self.posture.as_mut() {
                    posture.observe_remaining(remaining_secs);
                }
            }
            TimingMessageKind::Complete => {
                self.roll_stats_if_needed(&mut events);
                events.extend(self.complete_posture_segment(now));
            }
        }
        events
    }

    fn complete_posture_segment(&mut self, now: u64) -> Vec<Event> {
        let mut events = Vec::new();
        let Some(posture) = self.posture.as_mut() else {
            return events;
        };
        let switch = posture.automatic_completion(now, &self.settings, &mut self.stats);
        self.posture_timer.stop();
        persist_stats(self.store.as_ref(), &self.stats);
        tracing::info!(from = ?switch.from, to = ?switch.to, "posture segment finished");

        events.push(Event::PostureSwitched {
            from: switch.from,
            to: switch.to,
            manual: false,
            minutes_credited: switch.minutes_credited,
            running: false,
            at: self.clock.now_utc(),
        });
        let minutes = switch.to.duration_minutes(&self.settings);
        events.extend(self.alert(
            SoundPattern::PostureSwitch,
            &Notice::posture_due(switch.to, minutes),
        ));
        events
    }

    fn alert(&self, pattern: SoundPattern, notice: &Notice) -> Vec<Event> {
        let failures = alert::dispatch(self.alerter.as_ref(), &self.settings, pattern, notice);
        if failures.is_empty() {
            return Vec::new();
        }
        let permission = self.alerter.permission();
        let at = self.clock.now_utc();
        failures
            .into_iter()
            .map(|failure| Event::AlertFailed {
                channel: failure.channel,
                reason: failure.error.to_string(),
                permission,
                at,
            })
            .collect()
    }

    fn roll_stats_if_needed(&mut self, events: &mut Vec<Event>) {
        if self.stats.roll_over_if_needed(self.clock.today()) {
            tracing::info!(today = %self.stats.date, "daily stats rolled over");
            persist_stats(self.store.as_ref(), &self.stats);
            events.push(Event::StatsRolledOver {
                stats: self.stats.clone(),
                at: self.clock.now_utc(),
            });
        }
    }
}

fn persist_stats(store: &dyn KvStore, stats: &DailyStats) {
    if let Err(e) = stats.save(store) {
        tracing::warn!(error = %e, "failed to persist stats");
    }
}
