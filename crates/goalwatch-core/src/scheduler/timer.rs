//! Volatile in-process executor backed by tokio timers.

use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use super::{CheckHandle, CheckKey, DeferredExecutor, FiredCheck};
use crate::clock::Clock;
use crate::error::SchedulingError;
use crate::goal::GoalId;

struct Timer {
    key: CheckKey,
    task: AbortHandle,
}

type TimerTable = Arc<Mutex<HashMap<CheckHandle, Timer>>>;

/// One sleeping task per registration; fired checks arrive on a channel.
///
/// Nothing survives the process.
pub struct TimerExecutor {
    runtime: Handle,
    clock: Arc<dyn Clock>,
    fired: mpsc::UnboundedSender<FiredCheck>,
    timers: TimerTable,
    next_handle: AtomicI64,
    max_pending: usize,
}

impl TimerExecutor {
    pub fn new(
        runtime: Handle,
        clock: Arc<dyn Clock>,
        max_pending: usize,
    ) -> (Self, mpsc::UnboundedReceiver<FiredCheck>) {
        let (fired, rx) = mpsc::unbounded_channel();
        let executor = Self {
            runtime,
            clock,
            fired,
            timers: Arc::new(Mutex::new(HashMap::new())),
            next_handle: AtomicI64::new(1),
            max_pending,
        };
        (executor, rx)
    }

    pub fn pending(&self) -> usize {
        lock(&self.timers).len()
    }
}

fn lock(timers: &Mutex<HashMap<CheckHandle, Timer>>) -> MutexGuard<'_, HashMap<CheckHandle, Timer>> {
    timers.lock().unwrap_or_else(|e| e.into_inner())
}

impl DeferredExecutor for TimerExecutor {
    fn schedule_at(&self, at: NaiveDateTime, payload: CheckKey) -> Result<CheckHandle, SchedulingError> {
        if self.fired.is_closed() {
            return Err(SchedulingError::Closed);
        }

        let mut timers = lock(&self.timers);
        let existing = timers
            .iter()
            .find(|(_, timer)| timer.key == payload)
            .map(|(&handle, _)| handle);

        let handle = match existing {
            // Same key: restart its timer under the same handle.
            Some(handle) => {
                if let Some(old) = timers.remove(&handle) {
                    old.task.abort();
                }
                handle
            }
            None if timers.len() >= self.max_pending => {
                return Err(SchedulingError::CapacityExhausted {
                    limit: self.max_pending,
                });
            }
            None => CheckHandle(self.next_handle.fetch_add(1, Ordering::Relaxed)),
        };
        let delay = (at - self.clock.now()).to_std().unwrap_or(Duration::ZERO);
        let table = Arc::clone(&self.timers);
        let tx = self.fired.clone();

        // The table lock is held until the entry is inserted, so the task
        // can't observe a missing entry for a timer that is still live.
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if lock(&table).remove(&handle).is_some() {
                let _ = tx.send(FiredCheck { handle, key: payload });
            }
        });
        timers.insert(
            handle,
            Timer {
                key: payload,
                task: task.abort_handle(),
            },
        );

        Ok(handle)
    }

    fn cancel(&self, handle: CheckHandle) -> bool {
        match lock(&self.timers).remove(&handle) {
            Some(timer) => {
                timer.task.abort();
                true
            }
            None => false,
        }
    }

    fn cancel_goal(&self, goal_id: GoalId) -> usize {
        let mut timers = lock(&self.timers);
        let before = timers.len();
        timers.retain(|_, timer| {
            if timer.key.goal_id == goal_id {
                timer.task.abort();
                false
            } else {
                true
            }
        });
        before - timers.len()
    }

    fn pending_for_goal(&self, goal_id: GoalId) -> usize {
        lock(&self.timers)
            .values()
            .filter(|t| t.key.goal_id == goal_id)
            .count()
    }
}
