//! Background driver for the time-based transitions.
//!
//! Wakes on a fixed interval and runs three idempotent sweeps: overdue
//! notices, partner auto-verification, and the rollover safety net for
//! recurring tasks. All durable state lives in the store, so a missed tick
//! (process down, clock skew) is caught up on the next one.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::engine::Engine;

pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;

pub struct Scheduler {
    engine: Arc<Engine>,
    interval: Duration,
}

impl Scheduler {
    pub fn new(engine: Arc<Engine>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Run sweeps until the task is aborted. Sweep failures are logged and
    /// retried on the next tick, never escalated.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            self.tick();
        }
    }

    /// One sweep pass. Public so tests and one-shot CLI runs can drive it
    /// without the timer.
    pub fn tick(&self) {
        let now = Utc::now();
        match self.engine.auto_verify_sweep(now) {
            Ok(n) if n > 0 => tracing::info!(count = n, "auto-verified silent partner claims"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "auto-verify sweep failed"),
        }
        match self.engine.rollover_sweep(now) {
            Ok(n) if n > 0 => tracing::info!(count = n, "rolled over stranded recurring tasks"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "rollover sweep failed"),
        }
        match self.engine.overdue_sweep(now) {
            Ok(n) if n > 0 => tracing::info!(count = n, "overdue tasks notified"),
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "overdue sweep failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NewTask;
    use crate::notify::MemorySink;
    use crate::roster::{Member, Role, StaticRoster};
    use crate::state_machine::{TaskScope, TaskState, VerificationMode};
    use crate::store::TaskStore;
    use chrono::Duration as ChronoDuration;

    fn fixture() -> (Arc<Engine>, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let roster = StaticRoster::new(vec![
            Member::active("alice", Role::Admin),
            Member::active("bob", Role::Regular),
        ]);
        let engine = Arc::new(Engine::new(
            TaskStore::open_in_memory().unwrap(),
            Arc::new(roster),
            sink.clone(),
        ));
        (engine, sink)
    }

    #[test]
    fn tick_runs_all_sweeps_without_panicking() {
        let (engine, _) = fixture();
        Scheduler::new(engine, Duration::from_secs(300)).tick();
    }

    #[test]
    fn tick_picks_up_expired_partner_claims() {
        let (engine, _) = fixture();
        let claimed_at = Utc::now() - ChronoDuration::hours(49);
        let task = engine
            .create_task_at(
                NewTask {
                    title: "Water plants".into(),
                    created_by: "alice".into(),
                    assignee: Some("bob".into()),
                    scope: TaskScope::Shared,
                    verification: VerificationMode::Partner,
                    partner: Some("alice".into()),
                    schedule: None,
                    deadline: None,
                },
                claimed_at,
            )
            .unwrap();
        engine.claim_at(&task.id, "bob", claimed_at).unwrap();

        Scheduler::new(engine.clone(), Duration::from_secs(300)).tick();
        assert_eq!(engine.get_task(&task.id).unwrap().state, TaskState::Completed);
    }
}
