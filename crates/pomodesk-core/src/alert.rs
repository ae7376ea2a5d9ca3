//! Alert capability and delivery policy.
//!
//! The host implements [`Alerter`]; the core decides when to call it and
//! what to say. Delivery is best-effort: every failure is returned as an
//! [`AlertFailure`] for the host to show and never affects timer state.

use serde::{Deserialize, Serialize};

use crate::error::AlertError;
use crate::posture::Posture;
use crate::settings::Settings;
use crate::timer::SessionType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tone {
    pub frequency_hz: u32,
    pub duration_ms: u32,
    /// Silence after the tone.
    pub gap_ms: u32,
}

const fn tone(frequency_hz: u32) -> Tone {
    Tone {
        frequency_hz,
        duration_ms: 300,
        gap_ms: 150,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundPattern {
    SessionComplete,
    PostureSwitch,
    ActiveBreak,
    Test,
}

impl SoundPattern {
    pub fn tones(self) -> &'static [Tone] {
        const RISING: [Tone; 3] = [tone(800), tone(1000), tone(1200)];
        const FALLING: [Tone; 2] = [tone(1000), tone(700)];
        const PULSE: [Tone; 4] = [tone(900), tone(900), tone(900), tone(900)];
        match self {
            SoundPattern::SessionComplete | SoundPattern::Test => &RISING,
            SoundPattern::PostureSwitch => &FALLING,
            SoundPattern::ActiveBreak => &PULSE,
        }
    }
}

pub trait Alerter {
    fn play_sound(&self, pattern: SoundPattern) -> Result<(), AlertError>;

    fn show_notification(&self, title: &str, body: &str) -> Result<(), AlertError>;

    fn permission(&self) -> PermissionStatus {
        PermissionStatus::Undetermined
    }

    /// Ask the user for notification permission if not yet decided.
    fn request_permission(&self) -> PermissionStatus {
        self.permission()
    }
}

/// Host without any alert capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAlerter;

impl Alerter for NullAlerter {
    fn play_sound(&self, _pattern: SoundPattern) -> Result<(), AlertError> {
        Err(AlertError::Unsupported("Sound"))
    }

    fn show_notification(&self, _title: &str, _body: &str) -> Result<(), AlertError> {
        Err(AlertError::Unsupported("Notification"))
    }

    fn permission(&self) -> PermissionStatus {
        PermissionStatus::Denied
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub body: String,
}

impl Notice {
    fn new(title: &str, body: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            body: body.into(),
        }
    }

    /// Message for the end of `finished`.
    pub fn session_finished(finished: SessionType) -> Self {
        match finished {
            SessionType::Work => Self::new(
                "🎉 Work session complete!",
                "Time for a well-deserved break!",
            ),
            SessionType::ShortBreak | SessionType::LongBreak => {
                Self::new("⏰ Break time is over!", "Ready to focus again?")
            }
        }
    }

    pub fn posture_due(next: Posture, minutes: u32) -> Self {
        match next {
            Posture::Standing => Self::new(
                "🧍 Time to stand up!",
                format!("Stand for the next {minutes} minutes."),
            ),
            Posture::Sitting => Self::new(
                "🪑 Time to sit down!",
                format!("Sit for the next {minutes} minutes."),
            ),
        }
    }

    pub fn active_break() -> Self {
        Self::new(
            "🤸 Active break",
            "Time to move: stretch or walk for a couple of minutes.",
        )
    }

    pub fn test() -> Self {
        Self::new("🍅 Pomodoro Timer", "Notifications are working perfectly!")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertChannel {
    Sound,
    Notification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertFailure {
    pub channel: AlertChannel,
    pub error: AlertError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AlertOutcome {
    Delivered,
    Failed { reason: String },
}

impl From<Result<(), AlertError>> for AlertOutcome {
    fn from(result: Result<(), AlertError>) -> Self {
        match result {
            Ok(()) => AlertOutcome::Delivered,
            Err(e) => AlertOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Result of the user-triggered alert test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestAlertReport {
    pub sound: AlertOutcome,
    pub notification: AlertOutcome,
    pub permission: PermissionStatus,
}

/// Deliver one alert as allowed by `settings`. Returns what failed.
pub fn dispatch(
    alerter: &dyn Alerter,
    settings: &Settings,
    pattern: SoundPattern,
    notice: &Notice,
) -> Vec<AlertFailure> {
    let mut failures = Vec::new();

    if settings.sound_enabled {
        if let Err(error) = alerter.play_sound(pattern) {
            failures.push(AlertFailure {
                channel: AlertChannel::Sound,
                error,
            });
        }
    }

    if settings.notifications_enabled {
        if let Err(error) = notify_with_permission(alerter, notice) {
            failures.push(AlertFailure {
                channel: AlertChannel::Notification,
                error,
            });
        }
    }

    for failure in &failures {
        tracing::warn!(channel = ?failure.channel, error = %failure.error, "alert not delivered");
    }
    failures
}

/// Play the test pattern and show a test notification regardless of the
/// enabled flags.
pub fn test(alerter: &dyn Alerter) -> TestAlertReport {
    let sound = AlertOutcome::from(alerter.play_sound(SoundPattern::Test));
    let notification = AlertOutcome::from(notify_with_permission(alerter, &Notice::test()));
    TestAlertReport {
        sound,
        notification,
        permission: alerter.permission(),
    }
}

fn notify_with_permission(alerter: &dyn Alerter, notice: &Notice) -> Result<(), AlertError> {
    let permission = match alerter.permission() {
        PermissionStatus::Undetermined => alerter.request_permission(),
        decided => decided,
    };
    match permission {
        PermissionStatus::Granted => alerter.show_notification(&notice.title, &notice.body),
        PermissionStatus::Denied | PermissionStatus::Undetermined => {
            Err(AlertError::PermissionDenied)
        }
    }
}
