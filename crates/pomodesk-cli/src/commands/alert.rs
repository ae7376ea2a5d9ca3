use clap::Subcommand;

use crate::alerts::TerminalAlerter;

#[derive(Subcommand)]
pub enum AlertAction {
    /// Play the test sound and show a test notification
    Test,
    /// Print the notification permission status
    Permission,
}

pub fn run(action: AlertAction) -> Result<(), Box<dyn std::error::Error>> {
    let alerter = TerminalAlerter::new();

    match action {
        AlertAction::Test => {
            let report = pomodesk_core::alert::test(&alerter);
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        AlertAction::Permission => {
            use pomodesk_core::Alerter;
            println!("{}", serde_json::to_string(&alerter.permission())?);
        }
    }
    Ok(())
}
