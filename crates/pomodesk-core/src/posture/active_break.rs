//! Active-break watchdog.
//!
//! Fires a reminder to get up and move every `interval` whole minutes,
//! independent of the sit/stand cycle. The first check after construction
//! only records the instant.

const MS_PER_MINUTE: u64 = 60_000;

#[derive(Debug, Clone, Default)]
pub struct ActiveBreakWatchdog {
    last_check_ms: Option<u64>,
}

impl ActiveBreakWatchdog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_check_ms(&self) -> Option<u64> {
        self.last_check_ms
    }

    /// Returns true when a reminder is due.
    pub fn check(&mut self, now_ms: u64, interval_minutes: u32) -> bool {
        let Some(last) = self.last_check_ms else {
            self.last_check_ms = Some(now_ms);
            return false;
        };
        let elapsed_minutes = now_ms.saturating_sub(last) / MS_PER_MINUTE;
        if elapsed_minutes >= interval_minutes.max(1) as u64 {
            self.last_check_ms = Some(now_ms);
            return true;
        }
        false
    }

    /// Forget the last instant; the next check seeds again.
    pub fn reset(&mut self) {
        self.last_check_ms = None;
    }
}
