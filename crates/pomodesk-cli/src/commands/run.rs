//! Interactive timer loop.
//!
//! Reads one-letter commands from stdin and pumps the controller on the
//! configured tick interval. Shows a status line, or prints every event as a
//! JSON line with `--json`.

use std::io::Write;
use std::sync::Arc;

use clap::Args;
use pomodesk_core::alert::AlertOutcome;
use pomodesk_core::controller::AUTO_START_DELAY_MS;
use pomodesk_core::{
    AppConfig, Clock, Controller, Event, SqliteStore, SystemClock, TimingMode,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::alerts::TerminalAlerter;

const HELP: &str = "\
commands:
  <enter>  start / pause the session
  r        reset the session
  s        skip to the next session
  p        switch posture
  pp       pause / resume the posture timer
  t        test sound and notification
  v        resync timers with the clock
  j        print the full state as JSON
  set <key> <value>
           change a setting (e.g. set workMinutes 50)
  reset-stats
           zero today's stats
  q        quit";

#[derive(Args)]
pub struct RunArgs {
    /// Print events as JSON lines instead of a status line
    #[arg(long)]
    json: bool,
    /// Use the background timing worker regardless of config.toml
    #[arg(long)]
    background: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Toggle,
    Reset,
    Skip,
    SwitchPosture,
    PausePosture,
    TestAlert,
    Resync,
    Snapshot,
    Set { key: String, value: String },
    ResetStats,
    Help,
    Quit,
}

fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    if words.next() == Some("set") {
        let key = words.next()?.to_string();
        let value = words.next()?.to_string();
        if words.next().is_some() {
            return None;
        }
        return Some(Command::Set { key, value });
    }

    let command = match line.trim() {
        "" => Command::Toggle,
        "r" => Command::Reset,
        "s" => Command::Skip,
        "p" => Command::SwitchPosture,
        "pp" => Command::PausePosture,
        "t" => Command::TestAlert,
        "v" => Command::Resync,
        "j" => Command::Snapshot,
        "reset-stats" => Command::ResetStats,
        "h" | "?" | "help" => Command::Help,
        "q" | "quit" => Command::Quit,
        _ => return None,
    };
    Some(command)
}

pub fn run(args: RunArgs, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_loop(args, config))
}

async fn run_loop(args: RunArgs, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open()?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let timing = if args.background {
        TimingMode::Background
    } else {
        config.timing
    };
    tracing::debug!(?timing, tick_ms = config.tick_interval_ms, "starting timer loop");

    let mut controller = Controller::new(
        Box::new(store),
        Box::new(TerminalAlerter::new()),
        clock,
        timing,
    );
    let mut view = View::new(args.json);

    if args.json {
        println!("{}", serde_json::to_string(&controller.snapshot())?);
    } else {
        println!("{HELP}");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut ticker = tokio::time::interval(config.tick_interval());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(command) = parse_command(&line) else {
                    eprintln!("unknown command: {} (h for help)", line.trim());
                    continue;
                };
                if command == Command::Quit {
                    break;
                }
                apply(&mut controller, command, &mut view)?;
            }
            _ = ticker.tick() => {
                let events = controller.pump();
                view.events(&events)?;
            }
        }
        view.status(&controller)?;
    }

    // Drain anything a completion queued between the last tick and quit.
    let events = controller.pump();
    view.events(&events)?;
    view.finish();
    Ok(())
}

fn apply(
    controller: &mut Controller,
    command: Command,
    view: &mut View,
) -> Result<(), Box<dyn std::error::Error>> {
    let events = match command {
        Command::Toggle => {
            if controller.session().is_running() {
                controller.pause()
            } else {
                controller.start()
            }
        }
        Command::Reset => controller.reset(),
        Command::Skip => controller.skip(),
        Command::SwitchPosture => {
            if controller.posture().is_none() {
                view.note("posture reminders are off (set postureRemindersEnabled true)");
            }
            controller.switch_posture()
        }
        Command::PausePosture => controller.pause_posture_timer(),
        Command::Resync => controller.resync(),
        Command::Set { key, value } => {
            let mut settings = controller.settings().clone();
            match settings.set(&key, &value) {
                Ok(update) => {
                    if view.json {
                        println!("{}", serde_json::to_string(&update)?);
                    }
                    controller.save_settings(settings)
                }
                Err(e) => {
                    view.note(&format!("error: {e}"));
                    Vec::new()
                }
            }
        }
        Command::ResetStats => controller.reset_stats(),
        Command::TestAlert => {
            let report = controller.test_alert();
            if view.json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                view.note(&format!(
                    "sound: {}, notification: {}",
                    outcome_text(&report.sound),
                    outcome_text(&report.notification)
                ));
            }
            Vec::new()
        }
        Command::Snapshot => {
            view.clear_status();
            println!("{}", serde_json::to_string_pretty(&controller.snapshot())?);
            Vec::new()
        }
        Command::Help => {
            view.note(HELP);
            Vec::new()
        }
        Command::Quit => Vec::new(),
    };
    view.events(&events)
}

fn outcome_text(outcome: &AlertOutcome) -> String {
    match outcome {
        AlertOutcome::Delivered => "delivered".into(),
        AlertOutcome::Failed { reason } => format!("failed ({reason})"),
    }
}

fn clock_face(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Terminal output: either JSON lines or a self-overwriting status line.
struct View {
    json: bool,
    last_status: Option<String>,
}

impl View {
    fn new(json: bool) -> Self {
        Self {
            json,
            last_status: None,
        }
    }

    fn events(&mut self, events: &[Event]) -> Result<(), Box<dyn std::error::Error>> {
        for event in events {
            if self.json {
                println!("{}", serde_json::to_string(event)?);
            } else if let Some(text) = describe(event) {
                self.note(&text);
            }
        }
        Ok(())
    }

    fn note(&mut self, text: &str) {
        self.clear_status();
        println!("{text}");
    }

    fn clear_status(&mut self) {
        if self.last_status.take().is_some() {
            println!();
        }
    }

    fn status(&mut self, controller: &Controller) -> std::io::Result<()> {
        if self.json {
            return Ok(());
        }
        let snapshot = controller.snapshot();
        let mut line = format!(
            "{} {}/{} {} {}",
            snapshot.session_label,
            snapshot.session_index,
            snapshot.sessions_before_long_break,
            clock_face(snapshot.remaining_secs),
            if snapshot.running { "▶" } else { "⏸" },
        );
        if let Some(posture) = &snapshot.posture {
            line.push_str(&format!(
                " | {} {} {}",
                posture.posture.label(),
                clock_face(posture.remaining_secs),
                if posture.running { "▶" } else { "⏸" },
            ));
        }
        line.push_str(&format!(
            " | today: {} sessions, {} min",
            snapshot.stats.completed_sessions, snapshot.stats.total_focus_minutes
        ));

        if self.last_status.as_deref() == Some(line.as_str()) {
            return Ok(());
        }
        let mut stdout = std::io::stdout();
        write!(stdout, "\r\x1b[2K{line}")?;
        stdout.flush()?;
        self.last_status = Some(line);
        Ok(())
    }

    fn finish(&mut self) {
        self.clear_status();
    }
}

fn describe(event: &Event) -> Option<String> {
    let text = match event {
        Event::SessionStarted {
            session_type,
            remaining_secs,
            auto,
            ..
        } => format!(
            "{}{} started ({})",
            if *auto { "auto: " } else { "" },
            session_type.label(),
            clock_face(*remaining_secs)
        ),
        Event::SessionPaused { remaining_secs, .. } => {
            format!("paused at {}", clock_face(*remaining_secs))
        }
        Event::SessionReset { session_type, .. } => format!("{} reset", session_type.label()),
        Event::SessionSkipped { session_type, .. } => format!("{} skipped", session_type.label()),
        Event::SessionCompleted { finished, next, .. } => {
            format!("{} finished, next: {}", finished.label(), next.label())
        }
        Event::AutoStartScheduled { .. } => format!(
            "next session starts in {} s",
            AUTO_START_DELAY_MS / 1000
        ),
        Event::PostureSwitched { to, manual, .. } => {
            if *manual {
                format!("now {}", to.label().to_lowercase())
            } else {
                format!("time to switch: {} (pp to start)", to.label().to_lowercase())
            }
        }
        Event::PostureStarted { posture, .. } => format!("{} timer running", posture.label()),
        Event::PosturePaused { posture, .. } => format!("{} timer paused", posture.label()),
        Event::PostureEnabled { .. } => "posture reminders on".into(),
        Event::PostureDisabled { .. } => "posture reminders off".into(),
        Event::ActiveBreakDue { .. } => "active break: stand up and move".into(),
        Event::StatsReset { .. } => "today's stats reset".into(),
        Event::StatsRolledOver { .. } => "new day, stats reset".into(),
        Event::AlertFailed {
            channel, reason, ..
        } => format!("alert ({channel:?}) not delivered: {reason}"),
        Event::SettingsSaved { .. } => return None,
    };
    Some(text)
}
