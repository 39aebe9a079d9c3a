use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{plan_check_points, CheckIndex, CheckKey, DeferredExecutor, FiredCheck, IndexedCheck};
use crate::clock::Clock;
use crate::error::Result;
use crate::goal::{Goal, GoalId};
use crate::store::GoalStore;

/// Result of a schedule request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScheduleOutcome {
    /// The goal is not the active one; nothing was registered.
    Stale { goal_id: GoalId },
    Scheduled(ScheduleReport),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleReport {
    pub goal_id: GoalId,
    pub scheduled: usize,
    pub skipped_elapsed: usize,
    /// Registrations refused by the executor.
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReport {
    pub goal_id: GoalId,
    /// Indexed handles that were still pending.
    pub cancelled: usize,
    /// Extra registrations removed by the goal-tagged sweep.
    pub swept: usize,
}

/// Keeps the executor's registrations in step with the active goal.
pub struct CheckScheduler {
    store: Arc<dyn GoalStore>,
    index: Arc<dyn CheckIndex>,
    executor: Arc<dyn DeferredExecutor>,
    clock: Arc<dyn Clock>,
}

impl CheckScheduler {
    pub fn new(
        store: Arc<dyn GoalStore>,
        index: Arc<dyn CheckIndex>,
        executor: Arc<dyn DeferredExecutor>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            index,
            executor,
            clock,
        }
    }

    /// Register one check per remaining `(date, window)` of the goal.
    ///
    /// Only the active goal is scheduled; any other id is reported as
    /// [`ScheduleOutcome::Stale`].
    pub fn schedule(&self, goal_id: GoalId) -> Result<ScheduleOutcome> {
        match self.store.get_active_goal()? {
            Some(goal) if goal.id == goal_id => Ok(ScheduleOutcome::Scheduled(self.schedule_goal(&goal))),
            _ => {
                tracing::debug!(goal_id, "schedule request for inactive goal ignored");
                Ok(ScheduleOutcome::Stale { goal_id })
            }
        }
    }

    fn schedule_goal(&self, goal: &Goal) -> ScheduleReport {
        let plan = plan_check_points(goal, self.clock.now());
        let mut report = ScheduleReport {
            goal_id: goal.id,
            scheduled: 0,
            skipped_elapsed: plan.skipped_elapsed,
            failed: 0,
        };

        for point in plan.due {
            let handle = match self.executor.schedule_at(point.fire_at, point.key) {
                Ok(handle) => handle,
                Err(e) => {
                    tracing::warn!(check = %point.key, fire_at = %point.fire_at, "failed to register check: {e}");
                    report.failed += 1;
                    continue;
                }
            };
            tracing::debug!(check = %point.key, fire_at = %point.fire_at, handle = handle.0, "check registered");

            let indexed = IndexedCheck {
                key: point.key,
                handle,
                fire_at: point.fire_at,
            };
            if let Err(e) = self.index.record(&indexed) {
                // Still reachable through the goal-tagged sweep.
                tracing::warn!(check = %point.key, "failed to index check: {e}");
            }
            report.scheduled += 1;
        }

        tracing::info!(
            goal_id = goal.id,
            scheduled = report.scheduled,
            skipped = report.skipped_elapsed,
            failed = report.failed,
            "checks scheduled"
        );
        report
    }

    /// Cancel every registration of a goal.
    ///
    /// Works for any id, active or not.
    pub fn cancel(&self, goal_id: GoalId) -> Result<CancelReport> {
        let indexed = self.index.take_for_goal(goal_id)?;
        let cancelled = indexed
            .iter()
            .filter(|check| self.executor.cancel(check.handle))
            .count();
        let swept = self.executor.cancel_goal(goal_id);

        tracing::info!(goal_id, indexed = indexed.len(), cancelled, swept, "checks cancelled");
        Ok(CancelReport {
            goal_id,
            cancelled,
            swept,
        })
    }

    /// `cancel` followed by `schedule`, reading the goal fresh.
    pub fn reschedule(&self, goal_id: GoalId) -> Result<ScheduleOutcome> {
        self.cancel(goal_id)?;
        self.schedule(goal_id)
    }

    /// Reschedule whatever goal is active. `None` when there is none.
    ///
    /// Entry point after a restart or a wall-clock jump.
    pub fn reschedule_active(&self) -> Result<Option<ScheduleOutcome>> {
        match self.store.get_active_goal()? {
            Some(goal) => self.reschedule(goal.id).map(Some),
            None => {
                tracing::debug!("no active goal to reschedule");
                Ok(None)
            }
        }
    }

    /// Take over checks whose fire time has passed while the executor still
    /// holds them.
    ///
    /// A wall clock set forward (or a machine waking from sleep) leaves
    /// monotonic timers behind. Each claimed check is withdrawn from the
    /// executor and the index, so the caller is the only one to deliver it.
    pub fn claim_overdue(&self, goal_id: GoalId) -> Result<Vec<FiredCheck>> {
        let now = self.clock.now();
        let mut claimed = Vec::new();
        for check in self.index.list_for_goal(goal_id)? {
            if check.fire_at > now {
                break;
            }
            // Already delivered, or registered by an executor that is gone.
            if !self.executor.cancel(check.handle) {
                continue;
            }
            self.index.forget(&check.key)?;
            claimed.push(FiredCheck {
                handle: check.handle,
                key: check.key,
            });
        }

        if !claimed.is_empty() {
            tracing::info!(goal_id, claimed = claimed.len(), "overdue checks claimed");
        }
        Ok(claimed)
    }

    /// Drop a fired check from the index.
    pub fn fired(&self, key: &CheckKey) -> Result<bool> {
        self.index.forget(key)
    }

    /// Indexed checks of a goal, ordered by fire time.
    pub fn live_checks(&self, goal_id: GoalId) -> Result<Vec<IndexedCheck>> {
        self.index.list_for_goal(goal_id)
    }

    /// Registrations the executor itself still holds for a goal.
    pub fn pending(&self, goal_id: GoalId) -> usize {
        self.executor.pending_for_goal(goal_id)
    }
}
