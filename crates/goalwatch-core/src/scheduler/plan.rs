//! Pure check-point planning.

use chrono::{Days, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::CheckKey;
use crate::goal::Goal;

/// A single deferred check: fire at `fire_at` for `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckPoint {
    pub key: CheckKey,
    pub fire_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckPlan {
    /// Future check-points in date then window order.
    pub due: Vec<CheckPoint>,
    /// Check-points of the scheduled span whose window had already closed.
    pub skipped_elapsed: usize,
}

/// Enumerate the check-points of `goal` still ahead of `now`.
///
/// Dates run from `max(now.date(), start_date)` through the goal's end date.
/// A window whose end is not strictly after `now` is skipped.
pub fn plan_check_points(goal: &Goal, now: NaiveDateTime) -> CheckPlan {
    let mut plan = CheckPlan::default();
    let end_date = goal.end_date();
    let mut date = now.date().max(goal.start_date);

    while date <= end_date {
        for window in &goal.time_windows {
            match window.end_instant(date) {
                Some(fire_at) if fire_at > now => plan.due.push(CheckPoint {
                    key: CheckKey {
                        goal_id: goal.id,
                        window_index: window.index,
                        date,
                    },
                    fire_at,
                }),
                _ => plan.skipped_elapsed += 1,
            }
        }
        match date.checked_add_days(Days::new(1)) {
            Some(next) => date = next,
            None => break,
        }
    }

    plan
}
