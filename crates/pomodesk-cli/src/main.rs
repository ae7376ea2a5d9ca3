use clap::{Parser, Subcommand};
use pomodesk_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod alerts;
mod commands;

#[derive(Parser)]
#[command(name = "pomodesk", version, about = "Pomodoro timer with sit/stand reminders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the interactive timer
    Run(commands::run::RunArgs),
    /// User settings
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Daily statistics
    Stats {
        #[command(subcommand)]
        action: commands::stats::StatsAction,
    },
    /// Sound and notification checks
    Alert {
        #[command(subcommand)]
        action: commands::alert::AlertAction,
    },
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default();
    init_tracing(&config);

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args, &config),
        Commands::Settings { action } => commands::settings::run(action),
        Commands::Stats { action } => commands::stats::run(action),
        Commands::Alert { action } => commands::alert::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
