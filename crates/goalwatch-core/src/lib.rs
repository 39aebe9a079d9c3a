//! # Goalwatch Core Library
//!
//! Core logic for a single-active-goal habit tracker. A goal repeats a set of
//! daily time windows for a number of days; each window asks for one press.
//! When a window closes without a press, a deferred check notices and sends
//! a missed-window notification.
//!
//! The library follows a CLI-first design: every operation is available via
//! the `goalwatch` binary, which is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Goal model**: windows, validation, drafts, templates and progress
//! - **Storage**: SQLite goal store and check index, a durable check queue,
//!   and TOML configuration
//! - **Scheduler**: one deferred check per `(date, window)`, cancellable
//!   per goal and rebuilt after restarts and clock jumps
//! - **Daemon**: hosts the executor and feeds fired checks to the handler
//!
//! ## Key Components
//!
//! - [`GoalTracker`]: create, press, cancel, dismiss and status
//! - [`CheckScheduler`]: schedule / cancel / reschedule of deferred checks
//! - [`CheckHandler`]: evaluates a fired check
//! - [`Database`]: goal and press persistence
//! - [`Config`]: application configuration management

pub mod check;
pub mod clock;
pub mod daemon;
pub mod error;
pub mod events;
pub mod goal;
pub mod notify;
pub mod resolver;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod tracker;

pub use check::{CheckHandler, CheckOutcome};
pub use clock::{Clock, ManualClock, SystemClock};
pub use daemon::{Daemon, FiredChecks};
pub use error::{ConfigError, CoreError, DatabaseError, Result, SchedulingError, ValidationError};
pub use events::Event;
pub use goal::{Goal, GoalId, GoalTemplate, Progress, TemplateCategory, TimeWindow, WindowDraft};
pub use notify::{LogNotifier, NotificationSink, RecordingNotifier};
pub use resolver::WindowResolver;
pub use scheduler::{CheckKey, CheckScheduler, DeferredExecutor, ScheduleOutcome, TimerExecutor};
pub use storage::{CheckQueue, Config, Database, SchedulerBackend};
pub use store::GoalStore;
pub use tracker::{GoalStatus, GoalTracker, PressOutcome};
