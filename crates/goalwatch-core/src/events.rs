use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::check::CheckOutcome;
use crate::goal::GoalId;
use crate::scheduler::{CancelReport, CheckKey, ScheduleOutcome};

/// Every state change the daemon drives produces an Event.
/// The CLI prints them as JSON lines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    ChecksScheduled {
        goal_id: GoalId,
        scheduled: usize,
        skipped_elapsed: usize,
        failed: usize,
        at: DateTime<Utc>,
    },
    /// A schedule request named a goal that is no longer active.
    ScheduleStale {
        goal_id: GoalId,
        at: DateTime<Utc>,
    },
    ChecksCancelled {
        goal_id: GoalId,
        cancelled: usize,
        swept: usize,
        at: DateTime<Utc>,
    },
    /// The active goal was created, replaced or removed by another process.
    ActiveGoalChanged {
        previous: Option<GoalId>,
        current: Option<GoalId>,
        at: DateTime<Utc>,
    },
    CheckEvaluated {
        goal_id: GoalId,
        window_index: u32,
        date: NaiveDate,
        outcome: CheckOutcome,
        at: DateTime<Utc>,
    },
    /// Wall clock moved relative to the monotonic clock.
    ClockJumped {
        drift_secs: i64,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn scheduled(outcome: &ScheduleOutcome) -> Self {
        let at = Utc::now();
        match *outcome {
            ScheduleOutcome::Stale { goal_id } => Event::ScheduleStale { goal_id, at },
            ScheduleOutcome::Scheduled(report) => Event::ChecksScheduled {
                goal_id: report.goal_id,
                scheduled: report.scheduled,
                skipped_elapsed: report.skipped_elapsed,
                failed: report.failed,
                at,
            },
        }
    }

    pub fn cancelled(report: &CancelReport) -> Self {
        Event::ChecksCancelled {
            goal_id: report.goal_id,
            cancelled: report.cancelled,
            swept: report.swept,
            at: Utc::now(),
        }
    }

    pub fn evaluated(key: &CheckKey, outcome: CheckOutcome) -> Self {
        Event::CheckEvaluated {
            goal_id: key.goal_id,
            window_index: key.window_index,
            date: key.date,
            outcome,
            at: Utc::now(),
        }
    }
}
