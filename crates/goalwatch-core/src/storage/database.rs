//! SQLite-based goal storage.
//!
//! Provides persistent storage for:
//! - The active goal (at most one, enforced by a partial unique index)
//! - Press records, unique per `(goal, window, date)`
//! - The index of scheduled checks used for precise cancellation

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use crate::clock::Clock;
use crate::error::{CoreError, DatabaseError, Result};
use crate::goal::validation::validate_goal;
use crate::goal::{Goal, GoalId, TimeWindow};
use crate::scheduler::{CheckHandle, CheckIndex, CheckKey, IndexedCheck};
use crate::store::GoalStore;

use super::{database_path, migrations};

pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// SQLite database for goals, press records and the scheduled-check index.
pub struct Database {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    active: watch::Sender<Option<Goal>>,
}

/// Raw goal columns, decoded outside the rusqlite row closure.
struct GoalRow {
    id: GoalId,
    title: String,
    start_date: String,
    duration_days: u32,
    time_windows: String,
    is_active: bool,
    created_at: String,
}

const GOAL_COLUMNS: &str = "id, title, start_date, duration_days, time_windows, is_active, created_at";

impl Database {
    /// Open the database at `<data_dir>/goalwatch.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open(clock: Arc<dyn Clock>) -> Result<Self> {
        let path = database_path()?;
        Self::open_at(&path, clock)
    }

    pub fn open_at(path: &Path, clock: Arc<dyn Clock>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn, clock)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory(clock: Arc<dyn Clock>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, clock)
    }

    fn from_connection(conn: Connection, clock: Arc<dyn Clock>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;")?;
        migrations::migrate(&conn).map_err(|e| DatabaseError::MigrationFailed(e.to_string()))?;

        let active = query_active_goal(&conn)?;
        let (active, _) = watch::channel(active);
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
            active,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned.into())
    }

    /// Re-read the active goal and push it to observers.
    fn publish_active(&self) -> Result<()> {
        let goal = {
            let conn = self.lock()?;
            query_active_goal(&conn)?
        };
        self.active.send_replace(goal);
        Ok(())
    }
}

impl GoalStore for Database {
    fn get_active_goal(&self) -> Result<Option<Goal>> {
        let conn = self.lock()?;
        query_active_goal(&conn)
    }

    fn observe_active_goal(&self) -> watch::Receiver<Option<Goal>> {
        self.active.subscribe()
    }

    fn create_goal(&self, title: &str, duration_days: i64, windows: &[TimeWindow]) -> Result<GoalId> {
        validate_goal(title, duration_days, windows)?;

        let start_date = self.clock.today();
        let windows_json = serde_json::to_string(windows)?;
        let id = {
            let conn = self.lock()?;
            if let Some(existing) = active_goal_id(&conn)? {
                return Err(CoreError::ActiveGoalExists(existing));
            }

            let inserted = conn.execute(
                "INSERT INTO goals (title, start_date, duration_days, time_windows, is_active, created_at)
                 VALUES (?1, ?2, ?3, ?4, 1, ?5)",
                params![
                    title,
                    start_date.format(DATE_FORMAT).to_string(),
                    duration_days,
                    windows_json,
                    Utc::now().to_rfc3339(),
                ],
            );
            match inserted {
                Ok(_) => conn.last_insert_rowid(),
                // Another process won the active slot between our check and insert.
                Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
                    let existing = active_goal_id(&conn)?.unwrap_or_default();
                    return Err(CoreError::ActiveGoalExists(existing));
                }
                Err(e) => return Err(e.into()),
            }
        };

        tracing::info!(goal_id = id, title, duration_days, windows = windows.len(), "goal created");
        self.publish_active()?;
        Ok(id)
    }

    fn delete_goal(&self, goal_id: GoalId) -> Result<()> {
        {
            let conn = self.lock()?;
            let tx = conn.unchecked_transaction()?;
            // Cascades handle these too; explicit deletes keep it independent of the pragma.
            tx.execute("DELETE FROM press_records WHERE goal_id = ?1", [goal_id])?;
            tx.execute("DELETE FROM scheduled_checks WHERE goal_id = ?1", [goal_id])?;
            tx.execute("DELETE FROM goals WHERE id = ?1", [goal_id])?;
            tx.commit()?;
        }
        tracing::info!(goal_id, "goal deleted");
        self.publish_active()
    }

    fn record_press(&self, goal_id: GoalId, window_index: u32, date: NaiveDate) -> Result<bool> {
        let changed = self.lock()?.execute(
            "INSERT OR IGNORE INTO press_records (goal_id, window_index, date, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![goal_id, window_index, date.format(DATE_FORMAT).to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(changed == 1)
    }

    fn has_pressed(&self, goal_id: GoalId, window_index: u32, date: NaiveDate) -> Result<bool> {
        let exists = self.lock()?.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM press_records WHERE goal_id = ?1 AND window_index = ?2 AND date = ?3
             )",
            params![goal_id, window_index, date.format(DATE_FORMAT).to_string()],
            |row| row.get::<_, bool>(0),
        )?;
        Ok(exists)
    }

    fn presses_for_date(&self, goal_id: GoalId, date: NaiveDate) -> Result<BTreeSet<u32>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT window_index FROM press_records WHERE goal_id = ?1 AND date = ?2")?;
        let rows = stmt.query_map(params![goal_id, date.format(DATE_FORMAT).to_string()], |row| {
            row.get::<_, u32>(0)
        })?;

        let mut indices = BTreeSet::new();
        for row in rows {
            indices.insert(row?);
        }
        Ok(indices)
    }

    fn total_press_count(&self, goal_id: GoalId) -> Result<u32> {
        let count = self.lock()?.query_row(
            "SELECT COUNT(*) FROM press_records WHERE goal_id = ?1",
            [goal_id],
            |row| row.get::<_, u32>(0),
        )?;
        Ok(count)
    }
}

impl CheckIndex for Database {
    fn record(&self, check: &IndexedCheck) -> Result<()> {
        self.lock()?.execute(
            "INSERT OR REPLACE INTO scheduled_checks (goal_id, window_index, date, handle, fire_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                check.key.goal_id,
                check.key.window_index,
                check.key.date.format(DATE_FORMAT).to_string(),
                check.handle.0,
                check.fire_at.format(DATETIME_FORMAT).to_string(),
            ],
        )?;
        Ok(())
    }

    fn take_for_goal(&self, goal_id: GoalId) -> Result<Vec<IndexedCheck>> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let checks = select_checks(&tx, goal_id)?;
        tx.execute("DELETE FROM scheduled_checks WHERE goal_id = ?1", [goal_id])?;
        tx.commit()?;
        Ok(checks)
    }

    fn forget(&self, key: &CheckKey) -> Result<bool> {
        let removed = self.lock()?.execute(
            "DELETE FROM scheduled_checks WHERE goal_id = ?1 AND window_index = ?2 AND date = ?3",
            params![key.goal_id, key.window_index, key.date.format(DATE_FORMAT).to_string()],
        )?;
        Ok(removed > 0)
    }

    fn list_for_goal(&self, goal_id: GoalId) -> Result<Vec<IndexedCheck>> {
        let conn = self.lock()?;
        select_checks(&conn, goal_id)
    }
}

fn active_goal_id(conn: &Connection) -> Result<Option<GoalId>> {
    let id = conn
        .query_row("SELECT id FROM goals WHERE is_active = 1 LIMIT 1", [], |row| row.get(0))
        .optional()?;
    Ok(id)
}

fn query_active_goal(conn: &Connection) -> Result<Option<Goal>> {
    let row = conn
        .query_row(
            &format!("SELECT {GOAL_COLUMNS} FROM goals WHERE is_active = 1 LIMIT 1"),
            [],
            |row| {
                Ok(GoalRow {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    start_date: row.get(2)?,
                    duration_days: row.get(3)?,
                    time_windows: row.get(4)?,
                    is_active: row.get(5)?,
                    created_at: row.get(6)?,
                })
            },
        )
        .optional()?;
    row.map(decode_goal).transpose()
}

fn decode_goal(row: GoalRow) -> Result<Goal> {
    let corrupt = |message: String| DatabaseError::CorruptRow {
        table: "goals".into(),
        message: format!("goal {}: {message}", row.id),
    };

    let start_date = NaiveDate::parse_from_str(&row.start_date, DATE_FORMAT)
        .map_err(|e| corrupt(format!("start_date '{}': {e}", row.start_date)))?;
    let time_windows: Vec<TimeWindow> =
        serde_json::from_str(&row.time_windows).map_err(|e| corrupt(format!("time_windows: {e}")))?;
    let created_at = DateTime::parse_from_rfc3339(&row.created_at)
        .map_err(|e| corrupt(format!("created_at '{}': {e}", row.created_at)))?
        .with_timezone(&Utc);

    Ok(Goal {
        id: row.id,
        title: row.title,
        start_date,
        duration_days: row.duration_days,
        time_windows,
        is_active: row.is_active,
        created_at,
    })
}

fn select_checks(conn: &Connection, goal_id: GoalId) -> Result<Vec<IndexedCheck>> {
    let mut stmt = conn.prepare(
        "SELECT window_index, date, handle, fire_at FROM scheduled_checks
         WHERE goal_id = ?1 ORDER BY fire_at, window_index",
    )?;
    let rows = stmt.query_map([goal_id], |row| {
        Ok((
            row.get::<_, u32>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, i64>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut checks = Vec::new();
    for row in rows {
        let (window_index, date, handle, fire_at) = row?;
        let corrupt = |message: String| DatabaseError::CorruptRow {
            table: "scheduled_checks".into(),
            message,
        };
        let date = NaiveDate::parse_from_str(&date, DATE_FORMAT).map_err(|e| corrupt(format!("date '{date}': {e}")))?;
        let fire_at = NaiveDateTime::parse_from_str(&fire_at, DATETIME_FORMAT)
            .map_err(|e| corrupt(format!("fire_at '{fire_at}': {e}")))?;
        checks.push(IndexedCheck {
            key: CheckKey {
                goal_id,
                window_index,
                date,
            },
            handle: CheckHandle(handle),
            fire_at,
        });
    }
    Ok(checks)
}
