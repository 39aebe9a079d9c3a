//! Goal model: windows, goals and derived progress.

pub mod draft;
pub mod progress;
pub mod template;
pub mod validation;
mod window;

pub use draft::WindowDraft;
pub use progress::Progress;
pub use template::{GoalTemplate, TemplateCategory};
pub use window::TimeWindow;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned goal identifier.
pub type GoalId = i64;

/// A recurring goal.
///
/// Immutable for its lifetime apart from `is_active`. At most one goal is
/// active at a time; the store enforces that, not this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: GoalId,
    pub title: String,
    pub start_date: NaiveDate,
    pub duration_days: u32,
    pub time_windows: Vec<TimeWindow>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Goal {
    pub fn windows_per_day(&self) -> u32 {
        self.time_windows.len() as u32
    }

    pub fn total_required_presses(&self) -> u32 {
        self.duration_days * self.windows_per_day()
    }

    /// Last day of the goal, inclusive: `start_date + duration_days - 1`.
    pub fn end_date(&self) -> NaiveDate {
        self.start_date
            .checked_add_days(Days::new(u64::from(self.duration_days.saturating_sub(1))))
            .unwrap_or(NaiveDate::MAX)
    }

    pub fn is_completed(&self, total_presses: u32) -> bool {
        total_presses >= self.total_required_presses()
    }

    pub fn progress(&self, total_presses: u32) -> Progress {
        Progress::new(total_presses, self.total_required_presses())
    }

    pub fn window(&self, index: u32) -> Option<&TimeWindow> {
        self.time_windows.iter().find(|w| w.index == index)
    }

    /// Whether `date` falls inside `start_date ..= end_date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date()
    }
}

#[cfg(test)]
pub(crate) fn sample_goal(id: GoalId, start: NaiveDate, duration_days: u32, windows: Vec<TimeWindow>) -> Goal {
    Goal {
        id,
        title: format!("Goal {id}"),
        start_date: start,
        duration_days,
        time_windows: windows,
        is_active: true,
        created_at: Utc::now(),
    }
}
