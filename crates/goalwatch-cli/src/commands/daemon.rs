use chrono::NaiveDateTime;
use goalwatch_core::{Config, Daemon};

use crate::app::App;

pub fn run(config: Config, at: Option<NaiveDateTime>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let mut app = App::open(config, at, runtime.handle())?;
    let fired = app.take_fired().ok_or("fired-check source already taken")?;

    let mut daemon = Daemon::new(
        app.db.clone(),
        app.scheduler.clone(),
        app.handler(),
        app.clock.clone(),
        &app.config.daemon,
    );
    // A pinned clock never advances, so it would read as a clock jump on every tick.
    if at.is_some() {
        daemon = daemon.without_clock_jump_detection();
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    runtime.block_on(daemon.run(fired, shutdown, |event| match serde_json::to_string(&event) {
        Ok(line) => println!("{line}"),
        Err(e) => tracing::warn!("failed to serialize event: {e}"),
    }))?;
    Ok(())
}
