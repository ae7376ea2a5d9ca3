use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alert::{AlertChannel, PermissionStatus};
use crate::posture::Posture;
use crate::stats::DailyStats;
use crate::timer::SessionType;

/// Every state change in the controller produces an Event.
/// The host renders them; nothing in the core depends on them being read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        session_type: SessionType,
        session_index: u32,
        remaining_secs: u64,
        target_end_ms: u64,
        /// Set when the start came from the auto-start delay.
        auto: bool,
        at: DateTime<Utc>,
    },
    SessionPaused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionReset {
        session_type: SessionType,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    SessionSkipped {
        session_type: SessionType,
        at: DateTime<Utc>,
    },
    SessionCompleted {
        finished: SessionType,
        next: SessionType,
        session_index: u32,
        /// Whether the finished session was counted in the daily stats.
        counted: bool,
        at: DateTime<Utc>,
    },
    AutoStartScheduled {
        start_at_ms: u64,
        at: DateTime<Utc>,
    },
    PostureStarted {
        posture: Posture,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    PosturePaused {
        posture: Posture,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    PostureSwitched {
        from: Posture,
        to: Posture,
        manual: bool,
        minutes_credited: u64,
        running: bool,
        at: DateTime<Utc>,
    },
    PostureEnabled {
        at: DateTime<Utc>,
    },
    PostureDisabled {
        minutes_credited: u64,
        at: DateTime<Utc>,
    },
    ActiveBreakDue {
        at: DateTime<Utc>,
    },
    SettingsSaved {
        at: DateTime<Utc>,
    },
    StatsReset {
        stats: DailyStats,
        at: DateTime<Utc>,
    },
    StatsRolledOver {
        stats: DailyStats,
        at: DateTime<Utc>,
    },
    AlertFailed {
        channel: AlertChannel,
        reason: String,
        permission: PermissionStatus,
        at: DateTime<Utc>,
    },
}
