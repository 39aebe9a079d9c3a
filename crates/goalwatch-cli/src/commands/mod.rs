pub mod config;
pub mod daemon;
pub mod goal;
pub mod schedule;

use chrono::NaiveDateTime;
use goalwatch_core::Config;

use crate::app::App;

/// Runs a one-shot command against a freshly opened [`App`].
///
/// The in-memory executor spawns its timers on a current-thread runtime that
/// lives for the duration of the command.
pub fn with_app<T>(
    config: Config,
    at: Option<NaiveDateTime>,
    f: impl FnOnce(&App) -> Result<T, Box<dyn std::error::Error>>,
) -> Result<T, Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let app = App::open(config, at, runtime.handle())?;
    f(&app)
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
