//! Long-running host for deferred checks.
//!
//! The daemon owns the recovery duties that nothing else performs:
//!
//! - rescheduling the active goal on start, since executor registrations are
//!   never assumed to survive a restart
//! - rescheduling when the wall clock jumps relative to the monotonic clock
//! - following active-goal changes made by other processes
//! - draining fired checks into the [`CheckHandler`]

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};

use crate::check::CheckHandler;
use crate::clock::Clock;
use crate::error::Result;
use crate::events::Event;
use crate::goal::GoalId;
use crate::scheduler::{CheckScheduler, FiredCheck};
use crate::storage::{CheckQueue, DaemonConfig};
use crate::store::GoalStore;

/// Where fired checks come from.
pub enum FiredChecks {
    /// Poll the durable queue on every tick.
    Queue(Arc<CheckQueue>),
    /// Receive from an in-process [`TimerExecutor`](crate::scheduler::TimerExecutor).
    Channel(mpsc::UnboundedReceiver<FiredCheck>),
}

/// Wall-clock drift in whole seconds when it exceeds `threshold`.
///
/// Positive drift means the wall clock moved further than real time passed
/// (set forward, or the machine slept); negative means it was set back.
pub fn detect_clock_jump(wall_elapsed: chrono::Duration, mono_elapsed: Duration, threshold: Duration) -> Option<i64> {
    let mono_ms = i64::try_from(mono_elapsed.as_millis()).unwrap_or(i64::MAX);
    let drift_ms = wall_elapsed.num_milliseconds().saturating_sub(mono_ms);
    let threshold_ms = u64::try_from(threshold.as_millis()).unwrap_or(u64::MAX);
    (drift_ms.unsigned_abs() > threshold_ms).then_some(drift_ms / 1000)
}

struct TickState {
    active: Option<GoalId>,
    last_wall: chrono::NaiveDateTime,
    last_mono: Instant,
}

pub struct Daemon {
    store: Arc<dyn GoalStore>,
    scheduler: Arc<CheckScheduler>,
    handler: CheckHandler,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    jump_threshold: Duration,
    detect_jumps: bool,
}

impl Daemon {
    pub fn new(
        store: Arc<dyn GoalStore>,
        scheduler: Arc<CheckScheduler>,
        handler: CheckHandler,
        clock: Arc<dyn Clock>,
        config: &DaemonConfig,
    ) -> Self {
        Self {
            store,
            scheduler,
            handler,
            clock,
            poll_interval: Duration::from_secs(config.poll_interval_secs.max(1)),
            jump_threshold: Duration::from_secs(config.clock_jump_threshold_secs),
            detect_jumps: true,
        }
    }

    /// Turn off clock-jump detection.
    ///
    /// For clocks that never advance on their own, where every tick would
    /// otherwise read as the wall clock falling behind.
    pub fn without_clock_jump_detection(mut self) -> Self {
        self.detect_jumps = false;
        self
    }

    /// Run until `shutdown` resolves.
    ///
    /// # Errors
    /// Fails only if the start-up reschedule fails; errors inside the loop
    /// are logged and retried on the next tick.
    pub async fn run<S, E>(&self, source: FiredChecks, shutdown: S, mut on_event: E) -> Result<()>
    where
        S: Future<Output = ()>,
        E: FnMut(Event),
    {
        let (queue, mut channel) = match source {
            FiredChecks::Queue(queue) => (Some(queue), None),
            FiredChecks::Channel(rx) => (None, Some(rx)),
        };

        tracing::info!(
            poll_secs = self.poll_interval.as_secs(),
            backend = if queue.is_some() { "durable" } else { "memory" },
            "daemon starting"
        );

        let mut state = TickState {
            active: self.store.get_active_goal()?.map(|g| g.id),
            last_wall: self.clock.now(),
            last_mono: Instant::now(),
        };
        self.reschedule_active(&mut on_event)?;

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("daemon stopping");
                    return Ok(());
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick(&mut state, queue.as_deref(), &mut on_event) {
                        tracing::error!("daemon tick failed: {e}");
                    }
                }
                Some(fired) = next_fired(&mut channel) => {
                    self.dispatch(fired, &mut on_event);
                }
            }
        }
    }

    fn reschedule_active(&self, on_event: &mut dyn FnMut(Event)) -> Result<()> {
        if let Some(outcome) = self.scheduler.reschedule_active()? {
            on_event(Event::scheduled(&outcome));
        }
        Ok(())
    }

    fn tick(
        &self,
        state: &mut TickState,
        queue: Option<&CheckQueue>,
        on_event: &mut dyn FnMut(Event),
    ) -> Result<()> {
        // Must run before the jump reschedule below, which cancels whatever is still queued.
        if let Some(queue) = queue {
            for fired in queue.take_due(self.clock.now())? {
                self.dispatch(fired, on_event);
            }
        }

        let wall = self.clock.now();
        let mono = Instant::now();
        let jump = detect_clock_jump(wall - state.last_wall, mono - state.last_mono, self.jump_threshold)
            .filter(|_| self.detect_jumps);
        state.last_wall = wall;
        state.last_mono = mono;

        if let Some(drift_secs) = jump {
            tracing::warn!(drift_secs, "wall clock jumped; rescheduling active goal");
            on_event(Event::ClockJumped {
                drift_secs,
                at: chrono::Utc::now(),
            });
            // Timers still sleeping on the monotonic clock may already be past
            // their wall-clock fire time; evaluate those before they are replaced.
            if let Some(goal) = self.store.get_active_goal()? {
                for fired in self.scheduler.claim_overdue(goal.id)? {
                    self.dispatch(fired, on_event);
                }
            }
            self.reschedule_active(on_event)?;
        }

        let current = self.store.get_active_goal()?.map(|g| g.id);
        if current != state.active {
            tracing::info!(previous = ?state.active, ?current, "active goal changed");
            on_event(Event::ActiveGoalChanged {
                previous: state.active,
                current,
                at: chrono::Utc::now(),
            });
            if let Some(previous) = state.active {
                on_event(Event::cancelled(&self.scheduler.cancel(previous)?));
            }
            if let Some(current) = current {
                on_event(Event::scheduled(&self.scheduler.reschedule(current)?));
            }
            state.active = current;
        }

        Ok(())
    }

    fn dispatch(&self, fired: FiredCheck, on_event: &mut dyn FnMut(Event)) {
        if let Err(e) = self.scheduler.fired(&fired.key) {
            tracing::warn!(check = %fired.key, "failed to drop fired check from index: {e}");
        }
        let outcome = self.handler.run(&fired.key);
        on_event(Event::evaluated(&fired.key, outcome));
    }
}

async fn next_fired(channel: &mut Option<mpsc::UnboundedReceiver<FiredCheck>>) -> Option<FiredCheck> {
    match channel {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
