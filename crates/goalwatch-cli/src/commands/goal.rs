//! Goal lifecycle commands.

use chrono::NaiveDateTime;
use clap::Subcommand;
use goalwatch_core::goal::template::{template_by_id, templates, templates_by_category};
use goalwatch_core::{Config, TemplateCategory, TimeWindow, WindowDraft};

use super::{print_json, with_app};

#[derive(Subcommand)]
pub enum GoalAction {
    /// Create the active goal, starting today
    Create {
        /// Goal title (defaults to the template's name)
        title: Option<String>,
        /// Number of days, including today
        #[arg(long)]
        days: Option<i64>,
        /// Daily window as HH:MM-HH:MM (repeatable)
        #[arg(long = "window")]
        windows: Vec<String>,
        /// Start from a preset; explicit options override it
        #[arg(long)]
        template: Option<String>,
    },
    /// Print the active goal, progress and today's windows as JSON
    Status,
    /// Record a press for the window open right now
    Press,
    /// Cancel the active goal and its pending checks
    Cancel,
    /// Remove the active goal once every press is recorded
    Dismiss,
    /// List goal presets
    Templates {
        /// Only this category (health, productivity, learning, sport, habits)
        #[arg(long)]
        category: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(action: GoalAction, config: Config, at: Option<NaiveDateTime>) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        GoalAction::Create {
            title,
            days,
            windows,
            template,
        } => {
            let preset = match template.as_deref() {
                Some(id) => Some(template_by_id(id).ok_or_else(|| format!("unknown template: {id}"))?),
                None => None,
            };

            let title = title
                .or_else(|| preset.as_ref().map(|t| t.name.to_string()))
                .ok_or("a title is required")?;
            let days = days
                .or_else(|| preset.as_ref().map(|t| i64::from(t.duration_days)))
                .ok_or("--days is required")?;

            let mut draft = WindowDraft::new();
            if windows.is_empty() {
                for window in preset.map(|t| t.time_windows).unwrap_or_default() {
                    draft.push(window)?;
                }
            } else {
                for window in &windows {
                    draft.push(window.parse::<TimeWindow>()?)?;
                }
            }

            with_app(config, at, |app| {
                let created = app.tracker().create_goal(&title, days, draft.windows())?;
                print_json(&created)
            })
        }
        GoalAction::Status => with_app(config, at, |app| match app.tracker().status()? {
            Some(status) => print_json(&status),
            None => {
                println!("No active goal. Use 'goal create' to start one.");
                Ok(())
            }
        }),
        GoalAction::Press => with_app(config, at, |app| print_json(&app.tracker().record_progress()?)),
        GoalAction::Cancel => with_app(config, at, |app| print_json(&app.tracker().cancel_goal()?)),
        GoalAction::Dismiss => with_app(config, at, |app| print_json(&app.tracker().dismiss_completed()?)),
        GoalAction::Templates { category, json } => {
            let list = match category {
                Some(name) => {
                    let category = TemplateCategory::ALL
                        .into_iter()
                        .find(|c| c.to_string().eq_ignore_ascii_case(&name))
                        .ok_or_else(|| format!("unknown category: {name}"))?;
                    templates_by_category(category)
                }
                None => templates(),
            };

            if json {
                return print_json(&list);
            }
            for t in list {
                let windows: Vec<String> = t.time_windows.iter().map(ToString::to_string).collect();
                println!(
                    "{:<20} {:<13} {:>3}d  {:<24} {}",
                    t.id,
                    t.category.to_string(),
                    t.duration_days,
                    windows.join(", "),
                    t.name
                );
            }
            Ok(())
        }
    }
}
