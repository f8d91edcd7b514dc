//! Swap ledger: Robin-Hood crediting and the takeover rate cap.
//!
//! A claim by someone other than the assignee is a swap. Who gets the
//! credit is decided when the episode reaches `COMPLETED`, because lateness
//! decides it: covering a task that is still on time is a favor to the
//! assignee, covering one that has gone overdue earns the completer the
//! credit.

use chrono::{DateTime, Duration, Utc};

use crate::error::EngineError;
use crate::store::TaskStore;

pub const DEFAULT_SWAP_CAP: u32 = 3;
pub const DEFAULT_SWAP_WINDOW_DAYS: i64 = 7;

/// Rolling-window takeover limit.
///
/// Counts are derived from `swap_claimed` log rows on every check; there is
/// no in-memory counter to drift across restarts.
#[derive(Debug, Clone, Copy)]
pub struct SwapPolicy {
    pub cap: u32,
    pub window_days: i64,
}

impl Default for SwapPolicy {
    fn default() -> Self {
        Self {
            cap: DEFAULT_SWAP_CAP,
            window_days: DEFAULT_SWAP_WINDOW_DAYS,
        }
    }
}

impl SwapPolicy {
    /// Reject the swap before any state transition if it would push
    /// `member` past the cap. Both sides of a swap consume the cap, so the
    /// engine checks the completer and the displaced assignee alike.
    pub fn check(
        &self,
        store: &TaskStore,
        member: &str,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let since = now - Duration::days(self.window_days);
        let count = store.swap_participations(member, since)?;
        if count >= self.cap {
            return Err(EngineError::SwapCapExceeded {
                member: member.to_string(),
                count,
                cap: self.cap,
                window_days: self.window_days,
            });
        }
        Ok(())
    }
}

/// Whose leaderboard tally the completed episode increments.
pub fn resolve_credit(
    assignee: &str,
    completer: &str,
    original_deadline: Option<DateTime<Utc>>,
    completed_at: DateTime<Utc>,
) -> String {
    match original_deadline {
        // On-or-before the deadline the assignee keeps the credit.
        Some(deadline) if completed_at > deadline => completer.to_string(),
        // A backlog task has no deadline to be late against.
        _ => assignee.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::{LogAction, Task, TaskLog, TaskState};
    use crate::store::TransitionRequest;
    use chrono::TimeZone;

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, n, 9, 0, 0).unwrap()
    }

    #[test]
    fn on_time_swap_credits_original_assignee() {
        let credit = resolve_credit("alice", "bob", Some(day(9)), day(9));
        assert_eq!(credit, "alice");

        let credit = resolve_credit("alice", "bob", Some(day(9)), day(8));
        assert_eq!(credit, "alice");
    }

    #[test]
    fn late_swap_credits_the_completer() {
        // Assignee misses day 9 by two days; bob finishes a day after
        // that, three days past the original deadline.
        let credit = resolve_credit("alice", "bob", Some(day(9)), day(12));
        assert_eq!(credit, "bob");
    }

    #[test]
    fn deadline_free_task_credits_assignee() {
        let credit = resolve_credit("alice", "bob", None, day(20));
        assert_eq!(credit, "alice");
    }

    fn record_swap(store: &TaskStore, task: &Task, from: &str, by: &str, at: DateTime<Utc>) {
        store
            .transition(TransitionRequest {
                task_id: task.id.clone(),
                expected: TaskState::Todo,
                new_state: TaskState::Todo,
                set_deadline: None,
                log: TaskLog::new(&task.id, by, LogAction::SwapClaimed, at).with_swap(from, by),
            })
            .unwrap();
    }

    #[test]
    fn fourth_swap_in_window_is_rejected() {
        let store = TaskStore::open_in_memory().unwrap();
        let task = Task::new("Dishes".into(), "alice".into(), day(1));
        store.insert_task(&task).unwrap();

        let policy = SwapPolicy::default();
        for n in 1..=3 {
            policy.check(&store, "bob", day(n)).unwrap();
            record_swap(&store, &task, "alice", "bob", day(n));
        }

        let err = policy.check(&store, "bob", day(4)).unwrap_err();
        match err {
            EngineError::SwapCapExceeded { member, count, cap, .. } => {
                assert_eq!(member, "bob");
                assert_eq!(count, 3);
                assert_eq!(cap, 3);
            }
            other => panic!("expected SwapCapExceeded, got {other:?}"),
        }
    }

    #[test]
    fn cap_frees_up_as_the_window_rolls() {
        let store = TaskStore::open_in_memory().unwrap();
        let task = Task::new("Dishes".into(), "alice".into(), day(1));
        store.insert_task(&task).unwrap();

        let policy = SwapPolicy::default();
        for n in 1..=3 {
            record_swap(&store, &task, "alice", "bob", day(n));
        }
        assert!(policy.check(&store, "bob", day(4)).is_err());

        // Day 9: the day-1 swap has aged out of the trailing 7 days.
        assert!(policy.check(&store, "bob", day(9)).is_ok());
    }

    #[test]
    fn displaced_assignee_consumes_the_cap_too() {
        let store = TaskStore::open_in_memory().unwrap();
        let task = Task::new("Dishes".into(), "alice".into(), day(1));
        store.insert_task(&task).unwrap();

        let policy = SwapPolicy::default();
        record_swap(&store, &task, "alice", "bob", day(1));
        record_swap(&store, &task, "alice", "carol", day(2));
        record_swap(&store, &task, "alice", "dave", day(3));

        // alice was displaced three times; she is capped as well.
        assert!(policy.check(&store, "alice", day(4)).is_err());
        // carol only participated once.
        assert!(policy.check(&store, "carol", day(4)).is_ok());
    }
}
