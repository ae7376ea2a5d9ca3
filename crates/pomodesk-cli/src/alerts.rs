//! Terminal host for the alert capability.
//!
//! Sound is the terminal bell rung once per tone of the pattern, on a
//! separate thread so the timer loop keeps running. Notifications go through
//! the desktop notification service.

use std::io::{IsTerminal, Write};
use std::thread;
use std::time::Duration;

use notify_rust::Notification;
use pomodesk_core::alert::{Alerter, PermissionStatus, SoundPattern};
use pomodesk_core::AlertError;

#[derive(Debug, Default)]
pub struct TerminalAlerter;

impl TerminalAlerter {
    pub fn new() -> Self {
        Self
    }
}

impl Alerter for TerminalAlerter {
    fn play_sound(&self, pattern: SoundPattern) -> Result<(), AlertError> {
        if !std::io::stderr().is_terminal() {
            return Err(AlertError::Unsupported("Sound"));
        }
        let tones = pattern.tones();
        thread::spawn(move || {
            let mut stderr = std::io::stderr();
            for tone in tones {
                let _ = stderr.write_all(b"\x07");
                let _ = stderr.flush();
                thread::sleep(Duration::from_millis(u64::from(
                    tone.duration_ms + tone.gap_ms,
                )));
            }
        });
        Ok(())
    }

    fn show_notification(&self, title: &str, body: &str) -> Result<(), AlertError> {
        Notification::new()
            .summary(title)
            .body(body)
            .appname("pomodesk")
            .icon("alarm-clock")
            .show()
            .map(|_| ())
            .map_err(|e| AlertError::Delivery(e.to_string()))
    }

    fn permission(&self) -> PermissionStatus {
        // Linux desktops have no permission prompt; a missing session bus
        // means nothing can display the notification.
        if cfg!(target_os = "linux") && std::env::var_os("DBUS_SESSION_BUS_ADDRESS").is_none() {
            PermissionStatus::Denied
        } else {
            PermissionStatus::Granted
        }
    }
}
