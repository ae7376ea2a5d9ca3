//! Daily statistics.
//!
//! One record per calendar day, persisted under the `stats` key. When the
//! stored record belongs to another day it is discarded and a zeroed record
//! for today is written back straight away.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::posture::Posture;
use crate::storage::{merge_with_defaults, KvStore};

pub const STATS_KEY: &str = "stats";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub completed_sessions: u32,
    pub total_focus_minutes: u64,
    pub posture_changes: u32,
    pub minutes_standing: u64,
    pub minutes_sitting: u64,
}

impl Default for DailyStats {
    fn default() -> Self {
        let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
        Self::fresh(epoch)
    }
}

impl DailyStats {
    /// All counters zero, keyed to `day`.
    pub fn fresh(day: NaiveDate) -> Self {
        Self {
            date: day,
            completed_sessions: 0,
            total_focus_minutes: 0,
            posture_changes: 0,
            minutes_standing: 0,
            minutes_sitting: 0,
        }
    }

    /// Load today's record, resetting and persisting it if the stored one is
    /// from a different day. Never fails.
    pub fn load(store: &dyn KvStore, today: NaiveDate) -> Self {
        let stored = match store.get(STATS_KEY) {
            Ok(Some(raw)) => merge_with_defaults::<DailyStats>(&raw),
            Ok(None) => return Self::fresh(today),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read stats, starting from zero");
                return Self::fresh(today);
            }
        };

        if stored.date == today {
            return stored;
        }

        tracing::info!(previous = %stored.date, today = %today, "daily stats rolled over");
        let fresh = Self::fresh(today);
        if let Err(e) = fresh.save(store) {
            tracing::warn!(error = %e, "failed to persist reset stats");
        }
        fresh
    }

    pub fn save(&self, store: &dyn KvStore) -> crate::Result<()> {
        let json = serde_json::to_string(self)?;
        store.set(STATS_KEY, &json)?;
        Ok(())
    }

    /// Zero every counter if `today` is a new day. Returns whether it did.
    pub fn roll_over_if_needed(&mut self, today: NaiveDate) -> bool {
        if self.date == today {
            return false;
        }
        *self = Self::fresh(today);
        true
    }

    pub fn reset(&mut self, today: NaiveDate) {
        *self = Self::fresh(today);
    }

    pub fn record_work_session(&mut self, minutes: u32) {
        self.completed_sessions = self.completed_sessions.saturating_add(1);
        self.total_focus_minutes = self.total_focus_minutes.saturating_add(minutes as u64);
    }

    pub fn record_posture_minutes(&mut self, posture: Posture, minutes: u64) {
        let slot = match posture {
            Posture::Sitting => &mut self.minutes_sitting,
            Posture::Standing => &mut self.minutes_standing,
        };
        *slot = slot.saturating_add(minutes);
    }

    pub fn record_posture_change(&mut self) {
        self.posture_changes = self.posture_changes.saturating_add(1);
    }
}
