//! Deferred per-window checks.
//!
//! One check-point exists per `(date, window)` of the active goal's lifetime.
//! Each is registered with a [`DeferredExecutor`] to fire at the window's end
//! and recorded in a [`CheckIndex`] so that cancellation can find it again.
//!
//! ## Lifecycle per goal
//!
//! ```text
//! Unscheduled -> Scheduled -> (Cancelled | Exhausted)
//! ```
//!
//! Nothing registered with an executor is assumed to survive a restart;
//! [`CheckScheduler::reschedule_active`] rebuilds the schedule from the store.

mod engine;
mod plan;
mod timer;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{CancelReport, CheckScheduler, ScheduleOutcome, ScheduleReport};
pub use plan::{plan_check_points, CheckPlan, CheckPoint};
pub use timer::TimerExecutor;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SchedulingError};
use crate::goal::GoalId;

/// Identifies a check-point; also the payload delivered at fire time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CheckKey {
    pub goal_id: GoalId,
    pub window_index: u32,
    pub date: NaiveDate,
}

impl fmt::Display for CheckKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "goal {} window {} on {}", self.goal_id, self.window_index, self.date)
    }
}

/// Opaque registration token issued by an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CheckHandle(pub i64);

/// A check delivered by an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiredCheck {
    pub handle: CheckHandle,
    pub key: CheckKey,
}

/// A registration as remembered by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedCheck {
    pub key: CheckKey,
    pub handle: CheckHandle,
    pub fire_at: NaiveDateTime,
}

/// Fires a payload at or after a given instant.
///
/// At most one registration is pending per [`CheckKey`]: registering a key
/// that is already pending moves its fire time and returns the existing
/// handle. Durability across restarts is a property of the implementation;
/// callers never rely on it.
pub trait DeferredExecutor: Send + Sync {
    fn schedule_at(&self, at: NaiveDateTime, payload: CheckKey) -> Result<CheckHandle, SchedulingError>;

    /// Returns whether the handle was still pending.
    fn cancel(&self, handle: CheckHandle) -> bool;

    /// Tag-based bulk cancel of everything registered for a goal.
    fn cancel_goal(&self, goal_id: GoalId) -> usize;

    fn pending_for_goal(&self, goal_id: GoalId) -> usize;
}

/// Persistent `(goal, window, date) -> handle` mapping.
pub trait CheckIndex: Send + Sync {
    /// Upsert by key.
    fn record(&self, check: &IndexedCheck) -> Result<()>;

    /// Remove and return every entry of a goal.
    fn take_for_goal(&self, goal_id: GoalId) -> Result<Vec<IndexedCheck>>;

    /// Returns whether the key was present.
    fn forget(&self, key: &CheckKey) -> Result<bool>;

    /// Entries of a goal ordered by fire time.
    fn list_for_goal(&self, goal_id: GoalId) -> Result<Vec<IndexedCheck>>;
}
