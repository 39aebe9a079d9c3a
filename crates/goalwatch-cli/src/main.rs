use chrono::NaiveDateTime;
use clap::{Parser, Subcommand};
use goalwatch_core::Config;
use tracing_subscriber::EnvFilter;

mod app;
mod commands;

#[derive(Parser)]
#[command(name = "goalwatch", version, about = "Single-goal habit tracker with missed-window checks")]
struct Cli {
    /// Pretend the local time is this instant (YYYY-MM-DDTHH:MM)
    #[arg(long, global = true, value_parser = parse_at)]
    at: Option<NaiveDateTime>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Goal management
    Goal {
        #[command(subcommand)]
        action: commands::goal::GoalAction,
    },
    /// Inspect and rebuild the missed-window checks
    Schedule {
        #[command(subcommand)]
        action: commands::schedule::ScheduleAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Run the check daemon until Ctrl-C
    Daemon,
}

fn parse_at(s: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| format!("expected YYYY-MM-DDTHH:MM: {e}"))
}

fn main() {
    let cli = Cli::parse();
    let config = Config::load_or_default();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.filter)))
        .init();

    let result = match cli.command {
        Commands::Goal { action } => commands::goal::run(action, config, cli.at),
        Commands::Schedule { action } => commands::schedule::run(action, config, cli.at),
        Commands::Config { action } => commands::config::run(action),
        Commands::Daemon => commands::daemon::run(config, cli.at),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
