//! Core error types for goalwatch-core.
//!
//! This module defines the error hierarchy using thiserror. Stale goal
//! references are deliberately absent: a check or schedule request for a goal
//! that is no longer active is an outcome, not an error.

use std::path::PathBuf;
use thiserror::Error;

use crate::goal::GoalId;

/// Core error type for goalwatch-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Deferred-execution errors
    #[error("Scheduling error: {0}")]
    Scheduling(#[from] SchedulingError),

    /// Another goal already holds the active slot
    #[error("Goal {0} is already active; cancel it before creating a new one")]
    ActiveGoalExists(GoalId),

    /// An operation needed an active goal and there is none
    #[error("No active goal")]
    NoActiveGoal,

    /// Dismissal was requested before every press was recorded
    #[error("Goal {id} is not completed yet ({completed}/{required} presses)")]
    GoalNotCompleted {
        id: GoalId,
        completed: u32,
        required: u32,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

    /// A stored row could not be decoded
    #[error("Corrupt row in '{table}': {message}")]
    CorruptRow { table: String, message: String },

    /// Database is locked
    #[error("Database is locked")]
    Locked,

    /// Connection mutex was poisoned by a panicking holder
    #[error("Database connection lock poisoned")]
    Poisoned,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Failed to prepare data directory: {0}")]
    DataDir(String),
}

/// Goal input validation errors.
///
/// Messages are user-facing; the CLI prints them verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("Title is too long (max {max} characters, got {len})")]
    TitleTooLong { len: usize, max: usize },

    #[error("Duration must be at least 1 day")]
    DurationTooShort,

    #[error("Duration cannot exceed {max} days (got {days})")]
    DurationTooLong { days: i64, max: i64 },

    #[error("At least one time window is required")]
    NoWindows,

    #[error("Invalid time window: {window}. End time must be after start time and within the same day.")]
    InvalidWindow { window: String },

    #[error("Time windows cannot overlap: {first} and {second}")]
    OverlappingWindows { first: String, second: String },

    #[error("Cannot parse time window '{input}': expected HH:MM-HH:MM")]
    UnparsableWindow { input: String },

    #[error("No window at position {position} (draft has {len})")]
    OutOfBounds { position: usize, len: usize },
}

/// Errors raised by a deferred-execution service when registering a check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulingError {
    /// Too many checks are already pending
    #[error("Executor is at capacity ({limit} pending checks)")]
    CapacityExhausted { limit: usize },

    /// The executor refused the registration
    #[error("Registration rejected: {0}")]
    Rejected(String),

    /// The receiving side of the executor has gone away
    #[error("Executor is shut down")]
    Closed,
}

// Helper implementations for converting from other error types

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg) => {
                if code.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Database(err.into())
    }
}

impl From<rusqlite::Error> for SchedulingError {
    fn from(err: rusqlite::Error) -> Self {
        SchedulingError::Rejected(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
