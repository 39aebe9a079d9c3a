//! Durable executor: pending checks live in a SQLite table and are drained
//! by whoever polls [`CheckQueue::take_due`].

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::database::{DATETIME_FORMAT, DATE_FORMAT};
use crate::error::{DatabaseError, Result, SchedulingError};
use crate::goal::GoalId;
use crate::scheduler::{CheckHandle, CheckKey, DeferredExecutor, FiredCheck};

pub struct CheckQueue {
    conn: Mutex<Connection>,
    max_pending: usize,
}

impl CheckQueue {
    pub fn open(path: &Path, max_pending: usize) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn, max_pending)
    }

    pub fn open_memory(max_pending: usize) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, max_pending)
    }

    fn from_connection(conn: Connection, max_pending: usize) -> Result<Self> {
        conn.execute_batch(
            "PRAGMA busy_timeout = 5000;

            CREATE TABLE IF NOT EXISTS pending_checks (
                handle       INTEGER PRIMARY KEY AUTOINCREMENT,
                goal_id      INTEGER NOT NULL,
                window_index INTEGER NOT NULL,
                date         TEXT NOT NULL,
                fire_at      TEXT NOT NULL,
                created_at   TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_pending_checks_fire_at ON pending_checks(fire_at);
            CREATE INDEX IF NOT EXISTS idx_pending_checks_goal ON pending_checks(goal_id);

            DELETE FROM pending_checks WHERE handle NOT IN (
                SELECT MIN(handle) FROM pending_checks GROUP BY goal_id, window_index, date
            );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_pending_checks_key
                ON pending_checks(goal_id, window_index, date);",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_pending,
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DatabaseError::Poisoned.into())
    }

    /// Remove and return every check due at or before `now`, oldest first.
    ///
    /// A due row that can't be decoded is logged and dropped; the rest are
    /// still delivered.
    pub fn take_due(&self, now: NaiveDateTime) -> Result<Vec<FiredCheck>> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        let cutoff = now.format(DATETIME_FORMAT).to_string();

        let due = select_due(&tx, &cutoff)?;
        tx.execute("DELETE FROM pending_checks WHERE fire_at <= ?1", [&cutoff])?;
        tx.commit()?;
        Ok(due)
    }

    pub fn pending(&self) -> Result<usize> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM pending_checks", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn select_due(tx: &Transaction<'_>, cutoff: &str) -> Result<Vec<FiredCheck>> {
    let mut stmt = tx.prepare(
        "SELECT handle, goal_id, window_index, date FROM pending_checks
         WHERE fire_at <= ?1 ORDER BY fire_at, handle",
    )?;
    let rows = stmt.query_map([cutoff], |row| {
        Ok((
            row.get::<_, i64>(0)?,
            row.get::<_, GoalId>(1)?,
            row.get::<_, u32>(2)?,
            row.get::<_, String>(3)?,
        ))
    })?;

    let mut due = Vec::new();
    for row in rows {
        let (handle, goal_id, window_index, date) = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!("dropping undecodable queued check: {e}");
                continue;
            }
        };
        let date = match NaiveDate::parse_from_str(&date, DATE_FORMAT) {
            Ok(date) => date,
            Err(e) => {
                let corrupt = DatabaseError::CorruptRow {
                    table: "pending_checks".into(),
                    message: format!("handle {handle}: date '{date}': {e}"),
                };
                tracing::warn!("dropping queued check: {corrupt}");
                continue;
            }
        };
        due.push(FiredCheck {
            handle: CheckHandle(handle),
            key: CheckKey {
                goal_id,
                window_index,
                date,
            },
        });
    }
    Ok(due)
}

impl DeferredExecutor for CheckQueue {
    fn schedule_at(&self, at: NaiveDateTime, payload: CheckKey) -> Result<CheckHandle, SchedulingError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| SchedulingError::Rejected("check queue lock poisoned".into()))?;

        let date = payload.date.format(DATE_FORMAT).to_string();
        let existing = handle_for_key(&conn, &payload, &date)?;
        if existing.is_none() {
            let pending: i64 = conn.query_row("SELECT COUNT(*) FROM pending_checks", [], |row| row.get(0))?;
            if pending as usize >= self.max_pending {
                return Err(SchedulingError::CapacityExhausted {
                    limit: self.max_pending,
                });
            }
        }

        // Another writer may have queued the same key since the lookup above;
        // the unique key index folds both into one row.
        conn.execute(
            "INSERT INTO pending_checks (goal_id, window_index, date, fire_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (goal_id, window_index, date) DO UPDATE SET fire_at = excluded.fire_at",
            params![
                payload.goal_id,
                payload.window_index,
                date,
                at.format(DATETIME_FORMAT).to_string(),
                Utc::now().to_rfc3339(),
            ],
        )?;
        let handle = handle_for_key(&conn, &payload, &date)?
            .ok_or_else(|| SchedulingError::Rejected(format!("queued check for {payload} disappeared")))?;
        Ok(CheckHandle(handle))
    }

    fn cancel(&self, handle: CheckHandle) -> bool {
        let removed = self
            .lock()
            .and_then(|conn| Ok(conn.execute("DELETE FROM pending_checks WHERE handle = ?1", [handle.0])?));
        match removed {
            Ok(n) => n > 0,
            Err(e) => {
                tracing::warn!(handle = handle.0, "failed to cancel queued check: {e}");
                false
            }
        }
    }

    fn cancel_goal(&self, goal_id: GoalId) -> usize {
        let removed = self
            .lock()
            .and_then(|conn| Ok(conn.execute("DELETE FROM pending_checks WHERE goal_id = ?1", [goal_id])?));
        removed.unwrap_or_else(|e| {
            tracing::warn!(goal_id, "failed to sweep queued checks: {e}");
            0
        })
    }

    fn pending_for_goal(&self, goal_id: GoalId) -> usize {
        let count = self.lock().and_then(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM pending_checks WHERE goal_id = ?1",
                [goal_id],
                |row| row.get::<_, i64>(0),
            )?)
        });
        count.map(|n| n as usize).unwrap_or_else(|e| {
            tracing::warn!(goal_id, "failed to count queued checks: {e}");
            0
        })
    }
}

fn handle_for_key(conn: &Connection, key: &CheckKey, date: &str) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT handle FROM pending_checks WHERE goal_id = ?1 AND window_index = ?2 AND date = ?3",
        params![key.goal_id, key.window_index, date],
        |row| row.get(0),
    )
    .optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(goal_id: GoalId, window_index: u32, day: u32) -> CheckKey {
        CheckKey {
            goal_id,
            window_index,
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
        }
    }

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn take_due_drains_in_fire_order() {
        let queue = CheckQueue::open_memory(100).unwrap();
        queue.schedule_at(at(1, 20), key(1, 1, 1)).unwrap();
        queue.schedule_at(at(1, 10), key(1, 0, 1)).unwrap();
        queue.schedule_at(at(2, 10), key(1, 0, 2)).unwrap();

        assert!(queue.take_due(at(1, 9)).unwrap().is_empty());

        let due = queue.take_due(at(1, 20)).unwrap();
        assert_eq!(due.iter().map(|f| f.key).collect::<Vec<_>>(), vec![key(1, 0, 1), key(1, 1, 1)]);
        assert!(queue.take_due(at(1, 23)).unwrap().is_empty());
        assert_eq!(queue.pending().unwrap(), 1);
    }

    #[test]
    fn cancel_by_handle_and_goal() {
        let queue = CheckQueue::open_memory(100).unwrap();
        let h = queue.schedule_at(at(1, 10), key(1, 0, 1)).unwrap();
        queue.schedule_at(at(1, 20), key(1, 1, 1)).unwrap();
        queue.schedule_at(at(1, 20), key(2, 0, 1)).unwrap();

        assert!(queue.cancel(h));
        assert!(!queue.cancel(h));
        assert_eq!(queue.pending_for_goal(1), 1);
        assert_eq!(queue.cancel_goal(1), 1);
        assert_eq!(queue.pending_for_goal(1), 0);
        assert_eq!(queue.pending_for_goal(2), 1);
    }

    #[test]
    fn capacity_is_enforced() {
        let queue = CheckQueue::open_memory(1).unwrap();
        queue.schedule_at(at(1, 10), key(1, 0, 1)).unwrap();
        assert_eq!(
            queue.schedule_at(at(1, 20), key(1, 1, 1)).unwrap_err(),
            SchedulingError::CapacityExhausted { limit: 1 }
        );
    }

    #[test]
    fn same_key_is_queued_once() {
        let queue = CheckQueue::open_memory(1).unwrap();
        let first = queue.schedule_at(at(1, 10), key(1, 0, 1)).unwrap();
        // At capacity, but the key is already queued.
        let second = queue.schedule_at(at(1, 12), key(1, 0, 1)).unwrap();

        assert_eq!(first, second);
        assert_eq!(queue.pending().unwrap(), 1);
        assert!(queue.take_due(at(1, 11)).unwrap().is_empty());
        assert_eq!(queue.take_due(at(1, 12)).unwrap().len(), 1);
    }

    #[test]
    fn corrupt_row_does_not_lose_the_batch() {
        let queue = CheckQueue::open_memory(10).unwrap();
        queue.schedule_at(at(1, 10), key(1, 0, 1)).unwrap();
        queue.schedule_at(at(1, 20), key(1, 1, 1)).unwrap();
        queue
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO pending_checks (goal_id, window_index, date, fire_at, created_at)
                 VALUES (1, 2, 'yesterday', '2024-01-01T15:00:00', '')",
                [],
            )
            .unwrap();

        let due = queue.take_due(at(1, 21)).unwrap();
        assert_eq!(due.iter().map(|f| f.key).collect::<Vec<_>>(), vec![key(1, 0, 1), key(1, 1, 1)]);
        assert_eq!(queue.pending().unwrap(), 0);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("goalwatch.db");
        {
            let queue = CheckQueue::open(&path, 10).unwrap();
            queue.schedule_at(at(1, 10), key(7, 0, 1)).unwrap();
        }

        let queue = CheckQueue::open(&path, 10).unwrap();
        let due = queue.take_due(at(1, 11)).unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].key, key(7, 0, 1));
    }
}
