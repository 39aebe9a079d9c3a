//! Missed-window check commands.

use chrono::{NaiveDate, NaiveDateTime};
use clap::Subcommand;
use goalwatch_core::{CheckKey, Config, Event, GoalStore};
use serde::Serialize;

use super::{print_json, with_app};

#[derive(Subcommand)]
pub enum ScheduleAction {
    /// List the active goal's pending checks
    Show,
    /// Cancel and rebuild the active goal's checks
    Reschedule,
    /// Evaluate one check immediately, as if it had fired
    Fire {
        goal_id: i64,
        window_index: u32,
        /// Date of the window (YYYY-MM-DD)
        date: NaiveDate,
    },
}

#[derive(Serialize)]
struct PendingCheck {
    window_index: u32,
    date: NaiveDate,
    fire_at: NaiveDateTime,
}

pub fn run(
    action: ScheduleAction,
    config: Config,
    at: Option<NaiveDateTime>,
) -> Result<(), Box<dyn std::error::Error>> {
    with_app(config, at, |app| match action {
        ScheduleAction::Show => {
            let Some(goal) = app.db.get_active_goal()? else {
                println!("No active goal.");
                return Ok(());
            };
            let checks: Vec<PendingCheck> = app
                .scheduler
                .live_checks(goal.id)?
                .into_iter()
                .map(|c| PendingCheck {
                    window_index: c.key.window_index,
                    date: c.key.date,
                    fire_at: c.fire_at,
                })
                .collect();
            print_json(&checks)
        }
        ScheduleAction::Reschedule => match app.scheduler.reschedule_active()? {
            Some(outcome) => print_json(&Event::scheduled(&outcome)),
            None => {
                println!("No active goal.");
                Ok(())
            }
        },
        ScheduleAction::Fire {
            goal_id,
            window_index,
            date,
        } => {
            let key = CheckKey {
                goal_id,
                window_index,
                date,
            };
            app.scheduler.fired(&key)?;
            print_json(&app.handler().run(&key))
        }
    })
}
