//! Evaluation of a fired missed-window check.

use serde::{Deserialize, Serialize};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::error::Result;
use crate::notify::NotificationSink;
use crate::scheduler::CheckKey;
use crate::store::GoalStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckOutcome {
    /// The goal is gone or was replaced; nothing to do.
    Stale,
    Pressed,
    /// No press was recorded; the user was notified.
    Missed,
    Failed { reason: String },
}

/// Runs fired checks. Never propagates a failure to the executor.
pub struct CheckHandler {
    store: Arc<dyn GoalStore>,
    sink: Arc<dyn NotificationSink>,
}

impl CheckHandler {
    pub fn new(store: Arc<dyn GoalStore>, sink: Arc<dyn NotificationSink>) -> Self {
        Self { store, sink }
    }

    pub fn run(&self, key: &CheckKey) -> CheckOutcome {
        let outcome = match catch_unwind(AssertUnwindSafe(|| self.evaluate(key))) {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => CheckOutcome::Failed { reason: e.to_string() },
            Err(panic) => CheckOutcome::Failed {
                reason: panic_message(panic.as_ref()),
            },
        };

        match &outcome {
            CheckOutcome::Failed { reason } => tracing::error!(check = %key, "check failed: {reason}"),
            other => tracing::debug!(check = %key, outcome = ?other, "check evaluated"),
        }
        outcome
    }

    fn evaluate(&self, key: &CheckKey) -> Result<CheckOutcome> {
        let goal = match self.store.get_active_goal()? {
            Some(goal) if goal.id == key.goal_id => goal,
            _ => return Ok(CheckOutcome::Stale),
        };

        if self.store.has_pressed(key.goal_id, key.window_index, key.date)? {
            return Ok(CheckOutcome::Pressed);
        }

        self.sink.notify_missed_window(&goal.title, key.window_index);
        Ok(CheckOutcome::Missed)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
