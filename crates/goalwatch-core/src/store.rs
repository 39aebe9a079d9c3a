//! Goal store contract.
//!
//! The store owns the single shared mutable resource of the system: the
//! active goal and its press records. It is responsible for its own
//! consistency; callers only assume read-after-write visibility.

use chrono::NaiveDate;
use std::collections::BTreeSet;
use tokio::sync::watch;

use crate::error::Result;
use crate::goal::{Goal, GoalId, TimeWindow};

pub trait GoalStore: Send + Sync {
    /// Point read of the active goal.
    fn get_active_goal(&self) -> Result<Option<Goal>>;

    /// Reactive view of the active goal for presentation code.
    ///
    /// Only changes made through this store instance are published.
    fn observe_active_goal(&self) -> watch::Receiver<Option<Goal>>;

    /// Validate and insert a new active goal starting today.
    ///
    /// All-or-nothing: fails with a validation error, or with
    /// `ActiveGoalExists` when another goal holds the active slot.
    fn create_goal(&self, title: &str, duration_days: i64, windows: &[TimeWindow]) -> Result<GoalId>;

    /// Delete a goal together with its press records. Unknown ids are a no-op.
    fn delete_goal(&self, goal_id: GoalId) -> Result<()>;

    /// Insert-if-absent. `false` means the triple was already recorded.
    fn record_press(&self, goal_id: GoalId, window_index: u32, date: NaiveDate) -> Result<bool>;

    fn has_pressed(&self, goal_id: GoalId, window_index: u32, date: NaiveDate) -> Result<bool>;

    /// Window indices pressed on `date`.
    fn presses_for_date(&self, goal_id: GoalId, date: NaiveDate) -> Result<BTreeSet<u32>>;

    fn total_press_count(&self, goal_id: GoalId) -> Result<u32>;
}
