//! User settings.
//!
//! Persisted as the `settings` JSON record in the key-value store. Stored
//! records carry no schema version, so loading merges whatever is present
//! onto the defaults field by field and then clamps every duration into its
//! declared range.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::storage::{merge_with_defaults, KvStore};

pub const SETTINGS_KEY: &str = "settings";

/// Inclusive range a numeric setting is clamped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub min: u32,
    pub max: u32,
}

impl Bounds {
    const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn clamp(self, value: i64) -> u32 {
        value.clamp(self.min as i64, self.max as i64) as u32
    }
}

pub const WORK_MINUTES: Bounds = Bounds::new(1, 120);
pub const SHORT_BREAK_MINUTES: Bounds = Bounds::new(1, 60);
pub const SESSIONS_BEFORE_LONG_BREAK: Bounds = Bounds::new(1, 12);
pub const SITTING_MINUTES: Bounds = Bounds::new(1, 240);
pub const STANDING_MINUTES: Bounds = Bounds::new(1, 240);
pub const ACTIVE_BREAK_INTERVAL_MINUTES: Bounds = Bounds::new(1, 240);

/// Factor applied to the short break to obtain the long break.
///
/// The long break is not configurable on its own.
pub const LONG_BREAK_MULTIPLIER: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub work_minutes: u32,
    pub short_break_minutes: u32,
    pub sessions_before_long_break: u32,
    pub auto_start: bool,
    pub sound_enabled: bool,
    pub notifications_enabled: bool,
    pub posture_reminders_enabled: bool,
    pub sitting_minutes: u32,
    pub standing_minutes: u32,
    pub active_break_interval_minutes: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            sessions_before_long_break: 4,
            auto_start: false,
            sound_enabled: true,
            notifications_enabled: false,
            posture_reminders_enabled: false,
            sitting_minutes: 30,
            standing_minutes: 30,
            active_break_interval_minutes: 60,
        }
    }
}

/// Outcome of [`Settings::set`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum FieldUpdate {
    Applied { value: String },
    Clamped { requested: String, applied: u32 },
    /// The input could not be parsed; the previous value is kept.
    Ignored { reason: String },
}

enum FieldMut<'a> {
    Number(&'a mut u32, Bounds),
    Flag(&'a mut bool),
}

impl Settings {
    pub const KEYS: [&'static str; 10] = [
        "workMinutes",
        "shortBreakMinutes",
        "sessionsBeforeLongBreak",
        "autoStart",
        "soundEnabled",
        "notificationsEnabled",
        "postureRemindersEnabled",
        "sittingMinutes",
        "standingMinutes",
        "activeBreakIntervalMinutes",
    ];

    /// Load from the store, falling back to defaults for anything missing or
    /// malformed. Never fails.
    pub fn load(store: &dyn KvStore) -> Self {
        match store.get(SETTINGS_KEY) {
            Ok(Some(raw)) => merge_with_defaults::<Settings>(&raw).clamped(),
            Ok(None) => Self::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read settings, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn KvStore) -> crate::Result<()> {
        let json = serde_json::to_string(self)?;
        store.set(SETTINGS_KEY, &json)?;
        Ok(())
    }

    /// Every numeric field forced into its declared range.
    pub fn clamped(mut self) -> Self {
        self.work_minutes = WORK_MINUTES.clamp(self.work_minutes as i64);
        self.short_break_minutes = SHORT_BREAK_MINUTES.clamp(self.short_break_minutes as i64);
        self.sessions_before_long_break =
            SESSIONS_BEFORE_LONG_BREAK.clamp(self.sessions_before_long_break as i64);
        self.sitting_minutes = SITTING_MINUTES.clamp(self.sitting_minutes as i64);
        self.standing_minutes = STANDING_MINUTES.clamp(self.standing_minutes as i64);
        self.active_break_interval_minutes =
            ACTIVE_BREAK_INTERVAL_MINUTES.clamp(self.active_break_interval_minutes as i64);
        self
    }

    pub fn work_secs(&self) -> u64 {
        minutes_to_secs(self.work_minutes)
    }

    pub fn short_break_secs(&self) -> u64 {
        minutes_to_secs(self.short_break_minutes)
    }

    pub fn long_break_secs(&self) -> u64 {
        minutes_to_secs(self.short_break_minutes).saturating_mul(LONG_BREAK_MULTIPLIER)
    }

    pub fn sitting_secs(&self) -> u64 {
        minutes_to_secs(self.sitting_minutes)
    }

    pub fn standing_secs(&self) -> u64 {
        minutes_to_secs(self.standing_minutes)
    }

    /// Get a setting rendered as text by its JSON key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        json.get(key).map(|v| v.to_string())
    }

    /// Update one field from user text.
    ///
    /// Out-of-range numbers are clamped to the nearest bound and unparsable
    /// input leaves the field untouched. Only an unknown key is an error.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<FieldUpdate, ConfigError> {
        let field = self
            .field_mut(key)
            .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        let raw = raw.trim();

        let update = match field {
            FieldMut::Number(slot, bounds) => match parse_whole_number(raw) {
                Some(requested) => {
                    let applied = bounds.clamp(requested);
                    *slot = applied;
                    if applied as i64 == requested {
                        FieldUpdate::Applied {
                            value: applied.to_string(),
                        }
                    } else {
                        FieldUpdate::Clamped {
                            requested: raw.to_string(),
                            applied,
                        }
                    }
                }
                None => FieldUpdate::Ignored {
                    reason: format!("'{raw}' is not a number"),
                },
            },
            FieldMut::Flag(slot) => match parse_flag(raw) {
                Some(value) => {
                    *slot = value;
                    FieldUpdate::Applied {
                        value: value.to_string(),
                    }
                }
                None => FieldUpdate::Ignored {
                    reason: format!("'{raw}' is not a boolean"),
                },
            },
        };
        Ok(update)
    }

    fn field_mut(&mut self, key: &str) -> Option<FieldMut<'_>> {
        let field = match key {
            "workMinutes" => FieldMut::Number(&mut self.work_minutes, WORK_MINUTES),
            "shortBreakMinutes" => {
                FieldMut::Number(&mut self.short_break_minutes, SHORT_BREAK_MINUTES)
            }
            "sessionsBeforeLongBreak" => FieldMut::Number(
                &mut self.sessions_before_long_break,
                SESSIONS_BEFORE_LONG_BREAK,
            ),
            "autoStart" => FieldMut::Flag(&mut self.auto_start),
            "soundEnabled" => FieldMut::Flag(&mut self.sound_enabled),
            "notificationsEnabled" => FieldMut::Flag(&mut self.notifications_enabled),
            "postureRemindersEnabled" => FieldMut::Flag(&mut self.posture_reminders_enabled),
            "sittingMinutes" => FieldMut::Number(&mut self.sitting_minutes, SITTING_MINUTES),
            "standingMinutes" => FieldMut::Number(&mut self.standing_minutes, STANDING_MINUTES),
            "activeBreakIntervalMinutes" => FieldMut::Number(
                &mut self.active_break_interval_minutes,
                ACTIVE_BREAK_INTERVAL_MINUTES,
            ),
            _ => return None,
        };
        Some(field)
    }
}

fn minutes_to_secs(minutes: u32) -> u64 {
    (minutes.max(1) as u64).saturating_mul(60)
}

/// Integers, or decimals truncated toward zero.
fn parse_whole_number(raw: &str) -> Option<i64> {
    if let Ok(n) = raw.parse::<i64>() {
        return Some(n);
    }
    let f = raw.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Some(f.trunc().clamp(i64::MIN as f64, i64::MAX as f64) as i64)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
