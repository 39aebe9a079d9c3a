//! Test doubles shared across the crate's unit tests.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{CheckHandle, CheckKey, DeferredExecutor};
use crate::error::SchedulingError;
use crate::goal::GoalId;

/// Executor that only remembers registrations.
#[derive(Default)]
pub(crate) struct FakeExecutor {
    pending: Mutex<HashMap<CheckHandle, CheckKey>>,
    next: Mutex<i64>,
    capacity: Option<usize>,
}

impl FakeExecutor {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

impl DeferredExecutor for FakeExecutor {
    fn schedule_at(&self, _at: NaiveDateTime, payload: CheckKey) -> Result<CheckHandle, SchedulingError> {
        let mut pending = self.pending.lock().unwrap();
        if let Some((&handle, _)) = pending.iter().find(|(_, key)| **key == payload) {
            return Ok(handle);
        }
        if let Some(limit) = self.capacity {
            if pending.len() >= limit {
                return Err(SchedulingError::CapacityExhausted { limit });
            }
        }
        let mut next = self.next.lock().unwrap();
        *next += 1;
        let handle = CheckHandle(*next);
        pending.insert(handle, payload);
        Ok(handle)
    }

    fn cancel(&self, handle: CheckHandle) -> bool {
        self.pending.lock().unwrap().remove(&handle).is_some()
    }

    fn cancel_goal(&self, goal_id: GoalId) -> usize {
        let mut pending = self.pending.lock().unwrap();
        let before = pending.len();
        pending.retain(|_, key| key.goal_id != goal_id);
        before - pending.len()
    }

    fn pending_for_goal(&self, goal_id: GoalId) -> usize {
        self.pending
            .lock()
            .unwrap()
            .values()
            .filter(|key| key.goal_id == goal_id)
            .count()
    }
}

