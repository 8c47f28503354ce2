mod config;
pub mod database;

pub use config::{Config, CuesConfig, NotificationsConfig, TimerConfig, TipsConfig};
pub use database::{Database, PersistedSession, SessionLogEntry};

use std::path::PathBuf;

/// Returns `~/.config/kairo[-dev]/` based on KAIRO_ENV.
///
/// Set KAIRO_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("KAIRO_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("kairo-dev")
    } else {
        base_dir.join("kairo")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
