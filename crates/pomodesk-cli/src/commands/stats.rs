use clap::Subcommand;
use pomodesk_core::{Clock, DailyStats, SqliteStore, SystemClock};

#[derive(Subcommand)]
pub enum StatsAction {
    /// Today's stats
    Today,
    /// Zero today's counters
    Reset,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteStore::open()?;
    let today = SystemClock.today();

    match action {
        StatsAction::Today => {
            let stats = DailyStats::load(&store, today);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        StatsAction::Reset => {
            let mut stats = DailyStats::load(&store, today);
            stats.reset(today);
            stats.save(&store)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}
