//! Database schema migrations for goalwatch.
//!
//! Migrations are versioned and applied automatically when opening the database.
//! The `schema_version` table tracks the current migration version.

use rusqlite::{Connection, Result as SqliteResult};

/// Current schema version.
///
/// Increment this when adding new migrations.
pub const SCHEMA_VERSION: i32 = 2;

/// Apply all pending migrations to bring the database to the current schema version.
///
/// # Errors
/// Returns an error if migration fails.
pub fn migrate(conn: &Connection) -> SqliteResult<()> {
    create_schema_version_table(conn)?;

    let current_version = get_schema_version(conn);

    if current_version < 1 {
        migrate_v1(conn)?;
    }
    if current_version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn create_schema_version_table(conn: &Connection) -> SqliteResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );",
    )
}

/// Get the current schema version from the database.
///
/// Returns 0 if no version is set (initial database).
pub(crate) fn get_schema_version(conn: &Connection) -> i32 {
    conn.query_row("SELECT version FROM schema_version", [], |row| row.get::<_, i32>(0))
        .unwrap_or_else(|e| {
            if !matches!(e, rusqlite::Error::QueryReturnedNoRows) {
                tracing::warn!("failed to read schema_version: {e}");
            }
            0
        })
}

fn set_schema_version(conn: &Connection, version: i32) -> SqliteResult<()> {
    conn.execute("DELETE FROM schema_version", [])?;
    conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])?;
    Ok(())
}

/// Migration v1: goals and press records.
///
/// The partial unique index on `is_active` is what enforces the single
/// active goal; the unique triple on `press_records` makes recording a press
/// an insert-if-absent.
fn migrate_v1(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS goals (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            title         TEXT NOT NULL,
            start_date    TEXT NOT NULL,
            duration_days INTEGER NOT NULL,
            time_windows  TEXT NOT NULL,
            is_active     INTEGER NOT NULL DEFAULT 1,
            created_at    TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_goals_single_active
            ON goals(is_active) WHERE is_active = 1;

        CREATE TABLE IF NOT EXISTS press_records (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            goal_id      INTEGER NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
            window_index INTEGER NOT NULL,
            date         TEXT NOT NULL,
            recorded_at  TEXT NOT NULL
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_press_records_triple
            ON press_records(goal_id, window_index, date);",
    )?;

    set_schema_version(&tx, 1)?;
    tx.commit()?;
    Ok(())
}

/// Migration v2: persisted index of scheduled checks.
///
/// Lets `cancel` find every live check of a goal even when the executor
/// that holds them can't enumerate its own registrations.
fn migrate_v2(conn: &Connection) -> SqliteResult<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS scheduled_checks (
            goal_id      INTEGER NOT NULL REFERENCES goals(id) ON DELETE CASCADE,
            window_index INTEGER NOT NULL,
            date         TEXT NOT NULL,
            handle       INTEGER NOT NULL,
            fire_at      TEXT NOT NULL,
            PRIMARY KEY (goal_id, window_index, date)
        );

        CREATE INDEX IF NOT EXISTS idx_scheduled_checks_goal ON scheduled_checks(goal_id);",
    )?;

    set_schema_version(&tx, 2)?;
    tx.commit()?;
    Ok(())
}
