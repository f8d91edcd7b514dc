//! SQLite-backed task store.
//!
//! Two tables: `tasks` (one row per task, current state) and `task_logs`
//! (append-only audit trail). Every state change goes through
//! [`TaskStore::transition`], which performs a compare-and-swap on the
//! stored state and writes the accompanying log row inside the same SQL
//! transaction. If the log insert fails, the state update rolls back with
//! it; the log is the only reconciliation mechanism available, so the two
//! writes commit as a single unit.

use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::error::EngineError;
use crate::recurrence::Schedule;
use crate::state_machine::{LogAction, Task, TaskLog, TaskScope, TaskState, VerificationMode};

/// One compare-and-swap transition plus its audit row.
#[derive(Debug)]
pub struct TransitionRequest {
    pub task_id: String,
    /// The state the caller read; the update commits only if it still holds.
    pub expected: TaskState,
    pub new_state: TaskState,
    /// `Some(new_value)` rewrites the deadline column (rollover, archive);
    /// `None` leaves it untouched.
    pub set_deadline: Option<Option<DateTime<Utc>>>,
    pub log: TaskLog,
}

/// One vote plus the transition it may trigger, committed as a unit by
/// [`TaskStore::cast_vote`].
#[derive(Debug)]
pub struct VoteRequest {
    pub task_id: String,
    /// The state the caller read; the commit requires it to still hold.
    pub expected: TaskState,
    /// Start of the current conflict episode; only votes at or after this
    /// point count toward the tally.
    pub since: DateTime<Utc>,
    pub log: TaskLog,
}

pub struct TaskStore {
    conn: Mutex<Connection>,
}

fn ts(at: DateTime<Utc>) -> String {
    // Fixed-width RFC 3339 so text comparison orders chronologically.
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>, EngineError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| EngineError::InvalidInput(format!("bad stored timestamp {s}: {e}")))
}

impl TaskStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let conn = Connection::open(path.as_ref())?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, EngineError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, EngineError> {
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        conn.pragma_update(None, "foreign_keys", "ON")?;
        install_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A poisoned lock only means another thread panicked mid-query;
        // the connection itself is still usable.
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn insert_task(&self, task: &Task) -> Result<(), EngineError> {
        self.conn().execute(
            "INSERT INTO tasks (id, title, created_by, assignee, scope, verification, partner, \
             schedule, deadline, state, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                task.id,
                task.title,
                task.created_by,
                task.assignee,
                task.scope.to_string(),
                task.verification.to_string(),
                task.partner,
                task.schedule.as_ref().map(|s| s.to_string()),
                task.deadline.map(ts),
                task.state.to_string(),
                ts(task.created_at),
                ts(task.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_task(&self, id: &str) -> Result<Task, EngineError> {
        self.conn()
            .query_row("SELECT * FROM tasks WHERE id = ?1", params![id], task_from_row)
            .optional()?
            .transpose()?
            .ok_or_else(|| EngineError::TaskNotFound(id.to_string()))
    }

    /// Commit one state transition and its log row atomically.
    ///
    /// Fails with `StaleState` when another transition won the race between
    /// the caller's read and this write, and `TaskNotFound` when the row is
    /// gone entirely. On success returns the task as re-read after commit.
    pub fn transition(&self, req: TransitionRequest) -> Result<Task, EngineError> {
        let mut guard = self.conn();
        let tx = guard.transaction()?;

        let now = ts(req.log.at);
        let changed = match req.set_deadline {
            Some(deadline) => tx.execute(
                "UPDATE tasks SET state = ?1, deadline = ?2, updated_at = ?3 \
                 WHERE id = ?4 AND state = ?5",
                params![
                    req.new_state.to_string(),
                    deadline.map(ts),
                    now,
                    req.task_id,
                    req.expected.to_string(),
                ],
            )?,
            None => tx.execute(
                "UPDATE tasks SET state = ?1, updated_at = ?2 WHERE id = ?3 AND state = ?4",
                params![
                    req.new_state.to_string(),
                    now,
                    req.task_id,
                    req.expected.to_string(),
                ],
            )?,
        };

        if changed == 0 {
            let actual: Option<String> = tx
                .query_row(
                    "SELECT state FROM tasks WHERE id = ?1",
                    params![req.task_id],
                    |row| row.get(0),
                )
                .optional()?;
            // Roll back the (empty) transaction before reporting.
            drop(tx);
            return match actual {
                Some(state) => Err(EngineError::StaleState {
                    task_id: req.task_id,
                    expected: req.expected,
                    actual: TaskState::from_str(&state)?,
                }),
                None => Err(EngineError::TaskNotFound(req.task_id)),
            };
        }

        insert_log(&tx, &req.log)?;
        tx.commit()?;
        drop(guard);

        self.get_task(&req.task_id)
    }

    pub fn list_in_state(&self, state: TaskState) -> Result<Vec<Task>, EngineError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT * FROM tasks WHERE state = ?1 ORDER BY created_at, id")?;
        let rows = stmt.query_map(params![state.to_string()], task_from_row)?;
        collect_tasks(rows)
    }

    /// Open tasks whose deadline has passed.
    pub fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Task>, EngineError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT * FROM tasks WHERE state = ?1 AND deadline IS NOT NULL AND deadline < ?2 \
             ORDER BY deadline, id",
        )?;
        let rows = stmt.query_map(params![TaskState::Todo.to_string(), ts(now)], task_from_row)?;
        collect_tasks(rows)
    }

    /// The most recent claim-type row: it opened the current episode and
    /// names the claimant.
    pub fn latest_claim(&self, task_id: &str) -> Result<Option<TaskLog>, EngineError> {
        self.conn()
            .query_row(
                "SELECT * FROM task_logs WHERE task_id = ?1 AND action IN ('claimed', 'swap_claimed') \
                 ORDER BY at DESC, rowid DESC LIMIT 1",
                params![task_id],
                log_from_row,
            )
            .optional()?
            .transpose()
    }

    /// Vote rows belonging to the episode that started at `since`, oldest
    /// first so the last row per member is their effective vote.
    pub fn votes_since(
        &self,
        task_id: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<TaskLog>, EngineError> {
        read_votes(&self.conn(), task_id, since)
    }

    /// Commit one vote and the transition it produces atomically.
    ///
    /// The episode's votes are re-read inside the transaction, with the
    /// incoming vote appended, and `resolve` maps that full set to the new
    /// state. Reading and writing under one lock means a concurrent vote is
    /// either fully visible to this tally or ordered strictly after it; a
    /// resolving vote can never be missed because two callers each tallied
    /// only their own row.
    pub fn cast_vote<F>(&self, req: VoteRequest, resolve: F) -> Result<Task, EngineError>
    where
        F: FnOnce(&[TaskLog]) -> Result<TaskState, EngineError>,
    {
        let mut guard = self.conn();
        let tx = guard.transaction()?;

        let mut votes = read_votes(&tx, &req.task_id, req.since)?;
        votes.push(req.log.clone());
        let new_state = resolve(&votes)?;

        let changed = tx.execute(
            "UPDATE tasks SET state = ?1, updated_at = ?2 WHERE id = ?3 AND state = ?4",
            params![
                new_state.to_string(),
                ts(req.log.at),
                req.task_id,
                req.expected.to_string(),
            ],
        )?;
        if changed == 0 {
            let actual: Option<String> = tx
                .query_row(
                    "SELECT state FROM tasks WHERE id = ?1",
                    params![req.task_id],
                    |row| row.get(0),
                )
                .optional()?;
            drop(tx);
            return match actual {
                Some(state) => Err(EngineError::StaleState {
                    task_id: req.task_id,
                    expected: req.expected,
                    actual: TaskState::from_str(&state)?,
                }),
                None => Err(EngineError::TaskNotFound(req.task_id)),
            };
        }

        insert_log(&tx, &req.log)?;
        tx.commit()?;
        drop(guard);

        self.get_task(&req.task_id)
    }

    /// Swap participations for `member` (either side of the swap) since the
    /// window start. Derived from the log on every call; no pre-aggregated
    /// counter to keep consistent.
    pub fn swap_participations(
        &self,
        member: &str,
        since: DateTime<Utc>,
    ) -> Result<u32, EngineError> {
        let count: u32 = self.conn().query_row(
            "SELECT COUNT(*) FROM task_logs WHERE action = 'swap_claimed' AND at >= ?1 \
             AND (swap_by = ?2 OR swap_from = ?2)",
            params![ts(since), member],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn logs_for(&self, task_id: &str) -> Result<Vec<TaskLog>, EngineError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT * FROM task_logs WHERE task_id = ?1 ORDER BY at, rowid")?;
        let rows = stmt.query_map(params![task_id], log_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row??);
        }
        Ok(out)
    }
}

fn read_votes(
    conn: &Connection,
    task_id: &str,
    since: DateTime<Utc>,
) -> Result<Vec<TaskLog>, EngineError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM task_logs WHERE task_id = ?1 AND action = 'vote_cast' AND at >= ?2 \
         ORDER BY at, rowid",
    )?;
    let rows = stmt.query_map(params![task_id, ts(since)], log_from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

fn install_schema(conn: &Connection) -> Result<(), EngineError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
          id TEXT PRIMARY KEY,
          title TEXT NOT NULL,
          created_by TEXT NOT NULL,
          assignee TEXT,
          scope TEXT NOT NULL,
          verification TEXT NOT NULL,
          partner TEXT,
          schedule TEXT,
          deadline TEXT,
          state TEXT NOT NULL,
          created_at TEXT NOT NULL,
          updated_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_tasks_state_deadline
          ON tasks(state, deadline);

        CREATE TABLE IF NOT EXISTS task_logs (
          id TEXT PRIMARY KEY,
          task_id TEXT NOT NULL,
          actor TEXT NOT NULL,
          action TEXT NOT NULL,
          note TEXT,
          decision INTEGER,
          swap_from TEXT,
          swap_by TEXT,
          at TEXT NOT NULL,
          FOREIGN KEY(task_id) REFERENCES tasks(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_task_logs_task_at
          ON task_logs(task_id, at);
        CREATE INDEX IF NOT EXISTS idx_task_logs_action_at
          ON task_logs(action, at);
        "#,
    )?;
    Ok(())
}

fn insert_log(conn: &Connection, log: &TaskLog) -> Result<(), EngineError> {
    conn.execute(
        "INSERT INTO task_logs (id, task_id, actor, action, note, decision, swap_from, swap_by, at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            log.id,
            log.task_id,
            log.actor,
            log.action.to_string(),
            log.note,
            log.decision,
            log.swap_from,
            log.swap_by,
            ts(log.at),
        ],
    )?;
    Ok(())
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Result<Task, EngineError>> {
    Ok(read_task(row))
}

fn read_task(row: &Row<'_>) -> Result<Task, EngineError> {
    let scope: String = row.get("scope")?;
    let verification: String = row.get("verification")?;
    let schedule: Option<String> = row.get("schedule")?;
    let deadline: Option<String> = row.get("deadline")?;
    let state: String = row.get("state")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        created_by: row.get("created_by")?,
        assignee: row.get("assignee")?,
        scope: TaskScope::from_str(&scope)?,
        verification: VerificationMode::from_str(&verification)?,
        partner: row.get("partner")?,
        schedule: schedule.as_deref().map(Schedule::from_str).transpose()?,
        deadline: deadline.as_deref().map(parse_ts).transpose()?,
        state: TaskState::from_str(&state)?,
        created_at: parse_ts(&created_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<Result<TaskLog, EngineError>> {
    Ok(read_log(row))
}

fn read_log(row: &Row<'_>) -> Result<TaskLog, EngineError> {
    let action: String = row.get("action")?;
    let at: String = row.get("at")?;
    Ok(TaskLog {
        id: row.get("id")?,
        task_id: row.get("task_id")?,
        actor: row.get("actor")?,
        action: LogAction::from_str(&action)?,
        note: row.get("note")?,
        decision: row.get("decision")?,
        swap_from: row.get("swap_from")?,
        swap_by: row.get("swap_by")?,
        at: parse_ts(&at)?,
    })
}

fn collect_tasks(
    rows: impl Iterator<Item = rusqlite::Result<Result<Task, EngineError>>>,
) -> Result<Vec<Task>, EngineError> {
    let mut out = Vec::new();
    for row in rows {
        out.push(row??);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn seeded_task(store: &TaskStore) -> Task {
        let mut task = Task::new("Dishes".into(), "alice".into(), now());
        task.assignee = Some("alice".into());
        store.insert_task(&task).unwrap();
        task
    }

    fn claim_request(task: &Task, actor: &str, at: DateTime<Utc>) -> TransitionRequest {
        TransitionRequest {
            task_id: task.id.clone(),
            expected: TaskState::Todo,
            new_state: TaskState::PendingVerification,
            set_deadline: None,
            log: TaskLog::new(&task.id, actor, LogAction::Claimed, at),
        }
    }

    #[test]
    fn insert_and_get_roundtrip() {
        let store = TaskStore::open_in_memory().unwrap();
        let mut task = Task::new("Vacuum".into(), "alice".into(), now());
        task.schedule = Some(Schedule::every_days(3).unwrap());
        task.deadline = Some(now() + Duration::days(3));
        store.insert_task(&task).unwrap();

        let loaded = store.get_task(&task.id).unwrap();
        assert_eq!(loaded.title, "Vacuum");
        assert_eq!(loaded.schedule, task.schedule);
        assert_eq!(loaded.deadline, task.deadline);
        assert_eq!(loaded.state, TaskState::Todo);
    }

    #[test]
    fn get_unknown_task_is_not_found() {
        let store = TaskStore::open_in_memory().unwrap();
        let err = store.get_task("missing").unwrap_err();
        assert!(matches!(err, EngineError::TaskNotFound(_)));
    }

    #[test]
    fn transition_commits_state_and_log_together() {
        let store = TaskStore::open_in_memory().unwrap();
        let task = seeded_task(&store);

        let updated = store.transition(claim_request(&task, "alice", now())).unwrap();
        assert_eq!(updated.state, TaskState::PendingVerification);

        let logs = store.logs_for(&task.id).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].action, LogAction::Claimed);
        assert_eq!(logs[0].actor, "alice");
    }

    #[test]
    fn stale_expected_state_is_rejected_without_log() {
        let store = TaskStore::open_in_memory().unwrap();
        let task = seeded_task(&store);
        store.transition(claim_request(&task, "alice", now())).unwrap();

        // Second claim still believes the task is TODO.
        let err = store.transition(claim_request(&task, "bob", now())).unwrap_err();
        match err {
            EngineError::StaleState { expected, actual, .. } => {
                assert_eq!(expected, TaskState::Todo);
                assert_eq!(actual, TaskState::PendingVerification);
            }
            other => panic!("expected StaleState, got {other:?}"),
        }

        // The losing transition left no audit row behind.
        assert_eq!(store.logs_for(&task.id).unwrap().len(), 1);
    }

    #[test]
    fn transition_on_missing_task_is_not_found() {
        let store = TaskStore::open_in_memory().unwrap();
        let ghost = Task::new("Ghost".into(), "alice".into(), now());
        let err = store.transition(claim_request(&ghost, "alice", now())).unwrap_err();
        assert!(matches!(err, EngineError::TaskNotFound(_)));
    }

    #[test]
    fn transition_can_rewrite_deadline() {
        let store = TaskStore::open_in_memory().unwrap();
        let task = seeded_task(&store);
        let new_deadline = now() + Duration::days(3);

        let updated = store
            .transition(TransitionRequest {
                task_id: task.id.clone(),
                expected: TaskState::Todo,
                new_state: TaskState::Todo,
                set_deadline: Some(Some(new_deadline)),
                log: TaskLog::new(&task.id, "scheduler", LogAction::RolledOver, now()),
            })
            .unwrap();
        assert_eq!(updated.deadline, Some(new_deadline));
    }

    #[test]
    fn overdue_listing_filters_by_state_and_deadline() {
        let store = TaskStore::open_in_memory().unwrap();

        let mut overdue = Task::new("Trash".into(), "alice".into(), now());
        overdue.deadline = Some(now() - Duration::hours(1));
        store.insert_task(&overdue).unwrap();

        let mut future = Task::new("Dishes".into(), "alice".into(), now());
        future.deadline = Some(now() + Duration::hours(1));
        store.insert_task(&future).unwrap();

        let backlog = Task::new("Garage".into(), "alice".into(), now());
        store.insert_task(&backlog).unwrap();

        let listed = store.list_overdue(now()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, overdue.id);
    }

    #[test]
    fn latest_claim_finds_most_recent_episode_opener() {
        let store = TaskStore::open_in_memory().unwrap();
        let task = seeded_task(&store);

        assert!(store.latest_claim(&task.id).unwrap().is_none());

        store.transition(claim_request(&task, "alice", now())).unwrap();
        let later = now() + Duration::hours(2);
        store
            .transition(TransitionRequest {
                task_id: task.id.clone(),
                expected: TaskState::PendingVerification,
                new_state: TaskState::Todo,
                set_deadline: None,
                log: TaskLog::new(&task.id, "bob", LogAction::SwapClaimed, later)
                    .with_swap("alice", "bob"),
            })
            .unwrap();

        let claim = store.latest_claim(&task.id).unwrap().unwrap();
        assert_eq!(claim.action, LogAction::SwapClaimed);
        assert_eq!(claim.at, later);
    }

    #[test]
    fn votes_since_scopes_to_episode() {
        let store = TaskStore::open_in_memory().unwrap();
        let task = seeded_task(&store);
        store.transition(claim_request(&task, "alice", now())).unwrap();

        let vote = |actor: &str, at: DateTime<Utc>, yes: bool| TransitionRequest {
            task_id: task.id.clone(),
            expected: TaskState::PendingVerification,
            new_state: TaskState::PendingVerification,
            set_deadline: None,
            log: TaskLog::new(&task.id, actor, LogAction::VoteCast, at).with_decision(yes),
        };

        store.transition(vote("bob", now() + Duration::minutes(5), true)).unwrap();
        store.transition(vote("carol", now() + Duration::minutes(6), false)).unwrap();

        let votes = store.votes_since(&task.id, now()).unwrap();
        assert_eq!(votes.len(), 2);
        assert_eq!(votes[0].actor, "bob");

        // Votes before the episode boundary are excluded.
        let votes = store
            .votes_since(&task.id, now() + Duration::minutes(6))
            .unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].actor, "carol");
    }

    fn conflicted_task(store: &TaskStore) -> Task {
        let task = seeded_task(store);
        store.transition(claim_request(&task, "alice", now())).unwrap();
        store
            .transition(TransitionRequest {
                task_id: task.id.clone(),
                expected: TaskState::PendingVerification,
                new_state: TaskState::Conflict,
                set_deadline: None,
                log: TaskLog::new(&task.id, "bob", LogAction::Rejected, now()).with_decision(false),
            })
            .unwrap();
        task
    }

    #[test]
    fn cast_vote_tallies_inside_the_commit() {
        let store = TaskStore::open_in_memory().unwrap();
        let task = conflicted_task(&store);
        let vote = |actor: &str, minute: i64, yes: bool| {
            TaskLog::new(&task.id, actor, LogAction::VoteCast, now() + Duration::minutes(minute))
                .with_decision(yes)
        };

        // The resolver sees the full episode including the incoming vote.
        store
            .cast_vote(
                VoteRequest {
                    task_id: task.id.clone(),
                    expected: TaskState::Conflict,
                    since: now(),
                    log: vote("bob", 1, true),
                },
                |votes| {
                    assert_eq!(votes.len(), 1);
                    Ok(TaskState::Conflict)
                },
            )
            .unwrap();

        let updated = store
            .cast_vote(
                VoteRequest {
                    task_id: task.id.clone(),
                    expected: TaskState::Conflict,
                    since: now(),
                    log: vote("carol", 2, true),
                },
                |votes| {
                    assert_eq!(votes.len(), 2);
                    Ok(TaskState::Completed)
                },
            )
            .unwrap();
        assert_eq!(updated.state, TaskState::Completed);
        assert_eq!(store.votes_since(&task.id, now()).unwrap().len(), 2);
    }

    #[test]
    fn cast_vote_stale_state_leaves_no_row() {
        let store = TaskStore::open_in_memory().unwrap();
        let task = conflicted_task(&store);

        let err = store
            .cast_vote(
                VoteRequest {
                    task_id: task.id.clone(),
                    expected: TaskState::Todo,
                    since: now(),
                    log: TaskLog::new(&task.id, "bob", LogAction::VoteCast, now())
                        .with_decision(true),
                },
                |_| Ok(TaskState::Completed),
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::StaleState { .. }));
        assert!(store.votes_since(&task.id, now()).unwrap().is_empty());
    }

    #[test]
    fn swap_participations_counts_both_sides_in_window() {
        let store = TaskStore::open_in_memory().unwrap();
        let task = seeded_task(&store);

        let swap = |from: &str, by: &str, at: DateTime<Utc>| TransitionRequest {
            task_id: task.id.clone(),
            expected: TaskState::Todo,
            new_state: TaskState::Todo,
            set_deadline: None,
            log: TaskLog::new(&task.id, by, LogAction::SwapClaimed, at).with_swap(from, by),
        };

        store.transition(swap("alice", "bob", now())).unwrap();
        store.transition(swap("bob", "carol", now() + Duration::days(1))).unwrap();
        // Outside the queried window.
        store.transition(swap("alice", "bob", now() - Duration::days(10))).unwrap();

        let since = now() - Duration::days(7);
        assert_eq!(store.swap_participations("bob", since).unwrap(), 2);
        assert_eq!(store.swap_participations("alice", since).unwrap(), 1);
        assert_eq!(store.swap_participations("carol", since).unwrap(), 1);
        assert_eq!(store.swap_participations("dave", since).unwrap(), 0);
    }

    #[test]
    fn store_persists_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hearth.db");

        let task_id = {
            let store = TaskStore::open(&path).unwrap();
            let task = seeded_task(&store);
            task.id
        };

        let store = TaskStore::open(&path).unwrap();
        let loaded = store.get_task(&task_id).unwrap();
        assert_eq!(loaded.title, "Dishes");
    }
}
