use clap::Subcommand;
use pomodesk_core::settings::SETTINGS_KEY;
use pomodesk_core::{ConfigError, KvStore, Settings, SqliteStore};

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Print all settings as JSON
    List,
    /// Get one setting
    Get {
        /// Setting key (e.g. "workMinutes", "autoStart")
        key: String,
    },
    /// Set one setting; numbers are clamped to their allowed range
    Set {
        /// Setting key
        key: String,
        /// New value
        value: String,
    },
    /// Restore the defaults
    Reset,
}

pub fn run(action: SettingsAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open()?;

    match action {
        SettingsAction::List => {
            let settings = Settings::load(&store);
            println!("{}", serde_json::to_string_pretty(&settings)?);
        }
        SettingsAction::Get { key } => {
            let settings = Settings::load(&store);
            let value = settings.get(&key).ok_or(ConfigError::UnknownKey(key))?;
            println!("{value}");
        }
        SettingsAction::Set { key, value } => {
            let mut settings = Settings::load(&store);
            let update = settings.set(&key, &value)?;
            settings.save(&store)?;
            println!("{}", serde_json::to_string(&update)?);
        }
        SettingsAction::Reset => {
            store.remove(SETTINGS_KEY)?;
            println!("settings reset to defaults");
        }
    }
    Ok(())
}
