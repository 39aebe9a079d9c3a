mod check_queue;
mod config;
pub mod database;
pub mod migrations;

pub use check_queue::CheckQueue;
pub use config::{Config, DaemonConfig, LogConfig, NotificationsConfig, SchedulerBackend, SchedulerConfig};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `GOALWATCH_DATA_DIR` overrides the location outright. Otherwise it is
/// `~/.config/goalwatch[-dev]/`, with `GOALWATCH_ENV=dev` selecting the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("GOALWATCH_DATA_DIR") {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("GOALWATCH_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("goalwatch-dev")
            } else {
                base_dir.join("goalwatch")
            }
        }
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}

/// `<data_dir>/goalwatch.db`
pub fn database_path() -> Result<PathBuf, ConfigError> {
    Ok(data_dir()?.join("goalwatch.db"))
}
