//! Sit/stand alternation and the active-break reminder layered on it.

mod active_break;
mod cycle;

pub use active_break::ActiveBreakWatchdog;
pub use cycle::{PostureController, PostureSwitch, SwitchKind};

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Posture {
    Sitting,
    Standing,
}

impl Posture {
    pub fn toggled(self) -> Self {
        match self {
            Posture::Sitting => Posture::Standing,
            Posture::Standing => Posture::Sitting,
        }
    }

    pub fn duration_secs(self, settings: &Settings) -> u64 {
        match self {
            Posture::Sitting => settings.sitting_secs(),
            Posture::Standing => settings.standing_secs(),
        }
    }

    pub fn duration_minutes(self, settings: &Settings) -> u32 {
        match self {
            Posture::Sitting => settings.sitting_minutes,
            Posture::Standing => settings.standing_minutes,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Posture::Sitting => "Sitting",
            Posture::Standing => "Standing",
        }
    }
}
