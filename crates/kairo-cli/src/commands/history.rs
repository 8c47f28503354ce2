use clap::Subcommand;
use kairo_core::catalog::SessionFamily;
use kairo_core::storage::database::local_day_start_ms;
use kairo_core::storage::Database;

#[derive(Subcommand)]
pub enum HistoryAction {
    /// All completed sessions, oldest first
    List,
    /// Today's focus completions and the next session ordinal
    Today,
    /// Erase the whole log
    Clear,
}

pub fn run(action: HistoryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    match action {
        HistoryAction::List => {
            let entries = db.list_all()?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        HistoryAction::Today => {
            let completed = db.count_since(local_day_start_ms(), SessionFamily::Focus)?;
            let summary = serde_json::json!({
                "completed_today": completed,
                "next_session_ordinal": completed + 1,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        HistoryAction::Clear => {
            db.clear_all()?;
            println!("history cleared");
        }
    }
    Ok(())
}
