//! Drift-corrected countdown.
//!
//! A running countdown is nothing more than an absolute target end-instant.
//! Remaining time is recomputed from it on every tick, so throttled hosts,
//! late background messages or skipped ticks never accumulate error.
//!
//! ```text
//! start(remaining, now) -> target = now + remaining
//! tick(now)             -> ceil((target - now) / 1000), clamped at 0
//! ```

/// Seconds left until `target_end_ms`, rounded up and clamped at zero.
pub fn remaining_secs(target_end_ms: u64, now_ms: u64) -> u64 {
    target_end_ms.saturating_sub(now_ms).div_ceil(1000)
}

/// Result of one recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub remaining_secs: u64,
    /// True only on the first tick that observes zero in a start cycle.
    pub completed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Countdown {
    target_end_ms: Option<u64>,
    /// Bumped on every start and stop; identifies the active run.
    epoch: u64,
    fired: bool,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchor the countdown to `now + remaining_secs` and return the target.
    pub fn start(&mut self, remaining_secs: u64, now_ms: u64) -> u64 {
        let target = now_ms.saturating_add(remaining_secs.saturating_mul(1000));
        self.anchor(target);
        target
    }

    /// Run toward an already computed target end-instant.
    pub fn anchor(&mut self, target_end_ms: u64) {
        self.epoch += 1;
        self.target_end_ms = Some(target_end_ms);
        self.fired = false;
    }

    /// Clear the target. Anything still referring to the previous epoch is stale.
    pub fn stop(&mut self) {
        if self.target_end_ms.take().is_some() {
            self.epoch += 1;
        }
        self.fired = false;
    }

    /// Recompute remaining time. Returns `None` when not running.
    pub fn tick(&mut self, now_ms: u64) -> Option<Tick> {
        let target = self.target_end_ms?;
        let remaining = remaining_secs(target, now_ms);
        let completed = remaining == 0 && !self.fired;
        if completed {
            self.fired = true;
        }
        Some(Tick {
            remaining_secs: remaining,
            completed,
        })
    }

    /// Remaining seconds without consuming the completion edge.
    pub fn peek(&self, now_ms: u64) -> Option<u64> {
        self.target_end_ms
            .map(|target| remaining_secs(target, now_ms))
    }

    pub fn is_running(&self) -> bool {
        self.target_end_ms.is_some()
    }

    pub fn target_end_ms(&self) -> Option<u64> {
        self.target_end_ms
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether a message stamped with `epoch` belongs to the current run.
    pub fn is_current(&self, epoch: u64) -> bool {
        self.is_running() && self.epoch == epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_rounds_up_partial_seconds() {
        assert_eq!(remaining_secs(10_000, 0), 10);
        assert_eq!(remaining_secs(10_000, 1), 10);
        assert_eq!(remaining_secs(10_000, 9_000), 1);
        assert_eq!(remaining_secs(10_000, 9_999), 1);
        assert_eq!(remaining_secs(10_000, 10_000), 0);
        assert_eq!(remaining_secs(10_000, 50_000), 0);
    }

    #[test]
    fn start_anchors_target_to_now() {
        let mut countdown = Countdown::new();
        let target = countdown.start(90, 5_000);
        assert_eq!(target, 95_000);
        assert_eq!(countdown.target_end_ms(), Some(95_000));
        assert!(countdown.is_running());
    }

    #[test]
    fn completion_fires_once_per_start() {
        let mut countdown = Countdown::new();
        countdown.start(2, 0);

        assert_eq!(
            countdown.tick(1_500),
            Some(Tick { remaining_secs: 1, completed: false })
        );
        assert_eq!(
            countdown.tick(2_000),
            Some(Tick { remaining_secs: 0, completed: true })
        );
        assert_eq!(
            countdown.tick(7_000),
            Some(Tick { remaining_secs: 0, completed: false })
        );

        countdown.start(1, 8_000);
        assert!(countdown.tick(9_000).unwrap().completed);
    }

    #[test]
    fn missed_ticks_do_not_drift() {
        let mut countdown = Countdown::new();
        countdown.start(1500, 0);
        // A single late tick after a long throttled gap sees the true value.
        assert_eq!(countdown.tick(1_000_250).unwrap().remaining_secs, 500);
    }

    #[test]
    fn stop_clears_target_and_invalidates_epoch() {
        let mut countdown = Countdown::new();
        countdown.start(10, 0);
        let epoch = countdown.epoch();
        assert!(countdown.is_current(epoch));

        countdown.stop();
        assert!(!countdown.is_running());
        assert!(!countdown.is_current(epoch));
        assert_eq!(countdown.tick(1_000), None);

        countdown.start(10, 0);
        assert!(!countdown.is_current(epoch));
    }

    #[test]
    fn stop_on_idle_countdown_keeps_epoch() {
        let mut countdown = Countdown::new();
        countdown.stop();
        assert_eq!(countdown.epoch(), 0);
    }
}
