//! Wiring shared by every command.

use chrono::NaiveDateTime;
use goalwatch_core::scheduler::TimerExecutor;
use goalwatch_core::storage::{database_path, CheckQueue, Config, Database, SchedulerBackend};
use goalwatch_core::{
    CheckHandler, CheckScheduler, Clock, DeferredExecutor, FiredChecks, GoalTracker, LogNotifier, ManualClock,
    NotificationSink, SystemClock,
};
use std::sync::Arc;
use tokio::runtime::Handle;

pub struct App {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub db: Arc<Database>,
    pub scheduler: Arc<CheckScheduler>,
    pub sink: Arc<dyn NotificationSink>,
    fired: Option<FiredChecks>,
}

impl App {
    /// Open the database and build the configured executor.
    ///
    /// `at` pins the clock to a fixed local time instead of the system clock.
    pub fn open(
        config: Config,
        at: Option<NaiveDateTime>,
        runtime: &Handle,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let clock: Arc<dyn Clock> = match at {
            Some(at) => Arc::new(ManualClock::new(at)),
            None => Arc::new(SystemClock),
        };

        let path = database_path()?;
        let db = Arc::new(Database::open_at(&path, clock.clone())?);

        let max_pending = config.scheduler.max_pending_checks;
        let (executor, fired): (Arc<dyn DeferredExecutor>, FiredChecks) = match config.scheduler.backend {
            SchedulerBackend::Durable => {
                let queue = Arc::new(CheckQueue::open(&path, max_pending)?);
                let executor: Arc<dyn DeferredExecutor> = queue.clone();
                (executor, FiredChecks::Queue(queue))
            }
            SchedulerBackend::Memory => {
                let (executor, rx) = TimerExecutor::new(runtime.clone(), clock.clone(), max_pending);
                let executor: Arc<dyn DeferredExecutor> = Arc::new(executor);
                (executor, FiredChecks::Channel(rx))
            }
        };

        let scheduler = Arc::new(CheckScheduler::new(db.clone(), db.clone(), executor, clock.clone()));
        let sink: Arc<dyn NotificationSink> = Arc::new(LogNotifier::new(config.notifications.clone()));

        Ok(Self {
            config,
            clock,
            db,
            scheduler,
            sink,
            fired: Some(fired),
        })
    }

    pub fn tracker(&self) -> GoalTracker {
        GoalTracker::new(self.db.clone(), self.scheduler.clone(), self.sink.clone(), self.clock.clone())
    }

    pub fn handler(&self) -> CheckHandler {
        CheckHandler::new(self.db.clone(), self.sink.clone())
    }

    /// Source of fired checks. Only the first caller gets it.
    pub fn take_fired(&mut self) -> Option<FiredChecks> {
        self.fired.take()
    }
}
