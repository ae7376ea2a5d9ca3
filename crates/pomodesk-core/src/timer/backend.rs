//! Timing backends.
//!
//! A backend is told the target end-instant of a countdown and reports back
//! `Tick` and `Complete` messages. It never touches session or posture state:
//! the controller drains its messages, checks the epoch against the active
//! countdown and applies them itself. Both implementations recompute from the
//! target through [`Countdown`], so they are interchangeable.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::countdown::Countdown;
use crate::clock::Clock;
use crate::storage::TimingMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingMessageKind {
    Tick { remaining_secs: u64 },
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingMessage {
    /// Epoch of the countdown run this message was computed for.
    pub epoch: u64,
    pub kind: TimingMessageKind,
}

impl TimingMessage {
    fn tick(epoch: u64, remaining_secs: u64) -> Self {
        Self {
            epoch,
            kind: TimingMessageKind::Tick { remaining_secs },
        }
    }

    fn complete(epoch: u64) -> Self {
        Self {
            epoch,
            kind: TimingMessageKind::Complete,
        }
    }
}

pub trait TimingBackend: Send {
    /// Begin reporting for a run ending at `target_end_ms`. Replaces any
    /// previous run.
    fn start(&mut self, epoch: u64, target_end_ms: u64);

    fn stop(&mut self);

    /// Ask for an immediate `Tick` with the current remaining time.
    fn request_check(&mut self);

    /// Messages produced since the last drain, oldest first.
    fn drain(&mut self) -> Vec<TimingMessage>;
}

/// Build the backend selected by the host configuration.
///
/// The background backend needs a tokio runtime; without one this falls back
/// to the foreground backend.
pub fn backend_for(mode: TimingMode, clock: Arc<dyn Clock>) -> Box<dyn TimingBackend> {
    match mode {
        TimingMode::Foreground => Box::new(ForegroundTicker::new(clock)),
        TimingMode::Background => match tokio::runtime::Handle::try_current() {
            Ok(_) => Box::new(BackgroundTicker::spawn(
                clock,
                BackgroundTicker::DEFAULT_CADENCE,
            )),
            Err(_) => {
                tracing::warn!("no tokio runtime available, using foreground timing");
                Box::new(ForegroundTicker::new(clock))
            }
        },
    }
}

#[derive(Debug)]
struct ActiveRun {
    epoch: u64,
    countdown: Countdown,
}

impl ActiveRun {
    fn new(epoch: u64, target_end_ms: u64) -> Self {
        let mut countdown = Countdown::new();
        countdown.anchor(target_end_ms);
        Self { epoch, countdown }
    }

    /// Recompute and append the resulting messages. Returns true once the run
    /// has completed.
    fn emit(&mut self, now_ms: u64, out: &mut Vec<TimingMessage>) -> bool {
        let Some(tick) = self.countdown.tick(now_ms) else {
            return true;
        };
        out.push(TimingMessage::tick(self.epoch, tick.remaining_secs));
        if tick.completed {
            out.push(TimingMessage::complete(self.epoch));
        }
        tick.completed
    }
}

// ── Foreground ──────────────────────────────────────────────────────

/// Recomputes on the caller's schedule: every `drain` is a tick.
pub struct ForegroundTicker {
    clock: Arc<dyn Clock>,
    active: Option<ActiveRun>,
}

impl ForegroundTicker {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            active: None,
        }
    }
}

impl TimingBackend for ForegroundTicker {
    fn start(&mut self, epoch: u64, target_end_ms: u64) {
        self.active = Some(ActiveRun::new(epoch, target_end_ms));
    }

    fn stop(&mut self) {
        self.active = None;
    }

    fn request_check(&mut self) {
        // Every drain already recomputes from the target.
    }

    fn drain(&mut self) -> Vec<TimingMessage> {
        let mut out = Vec::new();
        if let Some(run) = self.active.as_mut() {
            if run.emit(self.clock.now_ms(), &mut out) {
                self.active = None;
            }
        }
        out
    }
}

// ── Background ──────────────────────────────────────────────────────

#[derive(Debug)]
enum WorkerCommand {
    Start { epoch: u64, target_end_ms: u64 },
    Stop,
    Check,
}

/// A tokio task that ticks on its own interval and posts messages back.
///
/// Dropping the handle aborts the task.
pub struct BackgroundTicker {
    commands: mpsc::UnboundedSender<WorkerCommand>,
    messages: mpsc::UnboundedReceiver<TimingMessage>,
    task: JoinHandle<()>,
}

impl BackgroundTicker {
    pub const DEFAULT_CADENCE: Duration = Duration::from_millis(100);

    /// Spawn the worker on the current tokio runtime.
    ///
    /// # Panics
    /// Panics when called outside a tokio runtime; use [`backend_for`] to
    /// fall back gracefully.
    pub fn spawn(clock: Arc<dyn Clock>, cadence: Duration) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (message_tx, message_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_worker(clock, cadence, command_rx, message_tx));
        Self {
            commands: command_tx,
            messages: message_rx,
            task,
        }
    }

    /// Wait for the next message.
    pub async fn recv(&mut self) -> Option<TimingMessage> {
        self.messages.recv().await
    }

    fn send(&self, command: WorkerCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("background timer worker has exited");
        }
    }
}

impl TimingBackend for BackgroundTicker {
    fn start(&mut self, epoch: u64, target_end_ms: u64) {
        self.send(WorkerCommand::Start {
            epoch,
            target_end_ms,
        });
    }

    fn stop(&mut self) {
        self.send(WorkerCommand::Stop);
    }

    fn request_check(&mut self) {
        self.send(WorkerCommand::Check);
    }

    fn drain(&mut self) -> Vec<TimingMessage> {
        let mut out = Vec::new();
        while let Ok(message) = self.messages.try_recv() {
            out.push(message);
        }
        out
    }
}

impl Drop for BackgroundTicker {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_worker(
    clock: Arc<dyn Clock>,
    cadence: Duration,
    mut commands: mpsc::UnboundedReceiver<WorkerCommand>,
    messages: mpsc::UnboundedSender<TimingMessage>,
) {
    let mut interval = tokio::time::interval(cadence);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut active: Option<ActiveRun> = None;
    let mut out = Vec::new();

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                None => break,
                Some(WorkerCommand::Start { epoch, target_end_ms }) => {
                    active = Some(ActiveRun::new(epoch, target_end_ms));
                    interval.reset_immediately();
                }
                Some(WorkerCommand::Stop) => active = None,
                Some(WorkerCommand::Check) => {
                    if let Some(run) = active.as_ref() {
                        if let Some(remaining) = run.countdown.peek(clock.now_ms()) {
                            out.push(TimingMessage::tick(run.epoch, remaining));
                        }
                    }
                }
            },
            _ = interval.tick(), if active.is_some() => {
                if let Some(run) = active.as_mut() {
                    if run.emit(clock.now_ms(), &mut out) {
                        active = None;
                    }
                }
            }
        }

        for message in out.drain(..) {
            if messages.send(message).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn kinds(messages: &[TimingMessage]) -> Vec<TimingMessageKind> {
        messages.iter().map(|m| m.kind).collect()
    }

    #[test]
    fn foreground_ticks_until_complete() {
        let clock = Arc::new(ManualClock::new(0));
        let mut ticker = ForegroundTicker::new(clock.clone());
        assert!(ticker.drain().is_empty());

        ticker.start(7, 3_000);
        assert_eq!(
            ticker.drain(),
            vec![TimingMessage::tick(7, 3)]
        );

        clock.advance_ms(3_500);
        assert_eq!(
            kinds(&ticker.drain()),
            vec![
                TimingMessageKind::Tick { remaining_secs: 0 },
                TimingMessageKind::Complete
            ]
        );
        // Deactivated after completion.
        assert!(ticker.drain().is_empty());
    }

    #[test]
    fn foreground_stop_silences() {
        let clock = Arc::new(ManualClock::new(0));
        let mut ticker = ForegroundTicker::new(clock);
        ticker.start(1, 10_000);
        ticker.stop();
        assert!(ticker.drain().is_empty());
    }

    #[test]
    fn backend_for_without_runtime_falls_back() {
        let clock = Arc::new(ManualClock::new(0));
        let mut backend = backend_for(TimingMode::Background, clock);
        backend.start(1, 0);
        assert_eq!(
            kinds(&backend.drain()),
            vec![
                TimingMessageKind::Tick { remaining_secs: 0 },
                TimingMessageKind::Complete
            ]
        );
    }

    async fn next(ticker: &mut BackgroundTicker) -> TimingMessage {
        tokio::time::timeout(Duration::from_secs(5), ticker.recv())
            .await
            .expect("worker message")
            .expect("worker alive")
    }

    #[tokio::test]
    async fn background_reports_completion() {
        let clock = Arc::new(ManualClock::new(0));
        let mut ticker = BackgroundTicker::spawn(clock.clone(), Duration::from_millis(5));
        ticker.start(3, 2_000);

        assert_eq!(next(&mut ticker).await, TimingMessage::tick(3, 2));

        clock.advance_ms(2_000);
        loop {
            let message = next(&mut ticker).await;
            assert_eq!(message.epoch, 3);
            if message.kind == TimingMessageKind::Complete {
                break;
            }
        }
    }

    #[tokio::test]
    async fn background_check_reports_current_remaining() {
        let clock = Arc::new(ManualClock::new(0));
        let mut ticker = BackgroundTicker::spawn(clock.clone(), Duration::from_secs(3600));
        ticker.start(1, 60_000);
        assert_eq!(next(&mut ticker).await, TimingMessage::tick(1, 60));

        clock.advance_secs(15);
        ticker.request_check();
        assert_eq!(next(&mut ticker).await, TimingMessage::tick(1, 45));
    }
}
