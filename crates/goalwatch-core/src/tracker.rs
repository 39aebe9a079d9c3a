//! User-facing goal operations.
//!
//! [`GoalTracker`] ties the store, the scheduler and the notification sink
//! together so that creating, pressing and cancelling keep the deferred
//! checks in step with the active goal.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{CoreError, Result};
use crate::goal::{Goal, GoalId, Progress, TimeWindow};
use crate::notify::NotificationSink;
use crate::resolver::{current_open_window, WindowResolver};
use crate::scheduler::{CancelReport, CheckScheduler, ScheduleOutcome};
use crate::store::GoalStore;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatedGoal {
    pub goal: Goal,
    pub schedule: ScheduleOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum PressOutcome {
    Recorded {
        goal_id: GoalId,
        window_index: u32,
        date: NaiveDate,
    },
    AlreadyRecorded {
        goal_id: GoalId,
        window_index: u32,
        date: NaiveDate,
    },
    /// No window is open right now.
    OutsideWindow { goal_id: GoalId },
    /// Today is before the start date or after the end date.
    OutsideGoalSpan { goal_id: GoalId, date: NaiveDate },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Removal {
    pub goal_id: GoalId,
    pub cancel: CancelReport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowState {
    pub window: TimeWindow,
    pub pressed_today: bool,
    pub open_now: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalStatus {
    pub goal: Goal,
    pub progress: Progress,
    pub progress_label: String,
    pub end_date: NaiveDate,
    pub today: NaiveDate,
    pub open_window: Option<u32>,
    pub windows: Vec<WindowState>,
    pub live_checks: usize,
}

pub struct GoalTracker {
    store: Arc<dyn GoalStore>,
    scheduler: Arc<CheckScheduler>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    resolver: WindowResolver,
}

impl GoalTracker {
    pub fn new(
        store: Arc<dyn GoalStore>,
        scheduler: Arc<CheckScheduler>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let resolver = WindowResolver::new(clock.clone());
        Self {
            store,
            scheduler,
            sink,
            clock,
            resolver,
        }
    }

    fn active_goal(&self) -> Result<Goal> {
        self.store.get_active_goal()?.ok_or(CoreError::NoActiveGoal)
    }

    /// Validate, persist and schedule a new active goal.
    pub fn create_goal(&self, title: &str, duration_days: i64, windows: &[TimeWindow]) -> Result<CreatedGoal> {
        let id = self.store.create_goal(title, duration_days, windows)?;
        let goal = self
            .store
            .get_active_goal()?
            .filter(|g| g.id == id)
            .ok_or_else(|| CoreError::Custom(format!("goal {id} vanished right after creation")))?;
        // A daemon may already have picked the new goal up; rescheduling
        // replaces its registrations instead of adding to them.
        let schedule = self.scheduler.reschedule(id)?;
        Ok(CreatedGoal { goal, schedule })
    }

    /// Record a press for whichever window is open right now.
    pub fn record_progress(&self) -> Result<PressOutcome> {
        let goal = self.active_goal()?;
        let now = self.clock.now();
        let today = now.date();

        if !goal.covers(today) {
            return Ok(PressOutcome::OutsideGoalSpan {
                goal_id: goal.id,
                date: today,
            });
        }

        let Some(window_index) = current_open_window(now.time(), &goal.time_windows) else {
            tracing::debug!(goal_id = goal.id, time = %now.time(), "press outside any window");
            return Ok(PressOutcome::OutsideWindow { goal_id: goal.id });
        };

        if self.store.record_press(goal.id, window_index, today)? {
            tracing::info!(goal_id = goal.id, window_index, %today, "press recorded");
            self.sink.notify_praise(&goal.title);
            Ok(PressOutcome::Recorded {
                goal_id: goal.id,
                window_index,
                date: today,
            })
        } else {
            Ok(PressOutcome::AlreadyRecorded {
                goal_id: goal.id,
                window_index,
                date: today,
            })
        }
    }

    /// Cancel the active goal's checks and delete it.
    pub fn cancel_goal(&self) -> Result<Removal> {
        let goal = self.active_goal()?;
        self.remove(goal.id)
    }

    /// Like [`cancel_goal`](Self::cancel_goal), but only once every press is in.
    pub fn dismiss_completed(&self) -> Result<Removal> {
        let goal = self.active_goal()?;
        let completed = self.store.total_press_count(goal.id)?;
        if !goal.is_completed(completed) {
            return Err(CoreError::GoalNotCompleted {
                id: goal.id,
                completed,
                required: goal.total_required_presses(),
            });
        }
        self.remove(goal.id)
    }

    fn remove(&self, goal_id: GoalId) -> Result<Removal> {
        let cancel = self.scheduler.cancel(goal_id)?;
        self.store.delete_goal(goal_id)?;
        Ok(Removal { goal_id, cancel })
    }

    pub fn status(&self) -> Result<Option<GoalStatus>> {
        let Some(goal) = self.store.get_active_goal()? else {
            return Ok(None);
        };

        let now = self.clock.now();
        let today = now.date();
        let progress = goal.progress(self.store.total_press_count(goal.id)?);
        let pressed = self.store.presses_for_date(goal.id, today)?;
        let windows = goal
            .time_windows
            .iter()
            .map(|w| WindowState {
                window: *w,
                pressed_today: pressed.contains(&w.index),
                open_now: self.resolver.is_time_in_window(now.time(), w),
            })
            .collect();

        Ok(Some(GoalStatus {
            progress_label: progress.percentage_label(),
            progress,
            end_date: goal.end_date(),
            today,
            open_window: current_open_window(now.time(), &goal.time_windows),
            windows,
            live_checks: self.scheduler.live_checks(goal.id)?.len(),
            goal,
        }))
    }
}
