//! The engine facade: one method per lifecycle transition plus reads.
//!
//! External collaborators (chat transport, UI, scheduler) call these
//! methods with a task id and an actor id; the engine validates against the
//! roster, runs the transition table, commits state and audit log as one
//! unit through the store's compare-and-swap, and emits best-effort
//! notifications after the commit. Concurrent calls on the same task are
//! resolved by the first commit winning; the loser gets a stale-state
//! error and no automatic retry.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::EngineError;
use crate::jury::{Jury, Tally};
use crate::notify::{MessageKind, Notification, NotificationSink};
use crate::recurrence::Schedule;
use crate::roster::{Member, RosterProvider};
use crate::state_machine::{
    LogAction, TallyOutcome, Task, TaskEvent, TaskLog, TaskScope, TaskState, TaskStateMachine,
    VerificationMode,
};
use crate::store::{TaskStore, TransitionRequest, VoteRequest};
use crate::swap::{SwapPolicy, resolve_credit};
use crate::verification::{VerificationPolicy, authorize_verifier};

/// Everything needed to create a task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub created_by: String,
    pub assignee: Option<String>,
    pub scope: TaskScope,
    pub verification: VerificationMode,
    pub partner: Option<String>,
    pub schedule: Option<Schedule>,
    pub deadline: Option<DateTime<Utc>>,
}

pub struct Engine {
    store: TaskStore,
    roster: Arc<dyn RosterProvider>,
    notifier: Arc<dyn NotificationSink>,
    swap_policy: SwapPolicy,
    verify_policy: VerificationPolicy,
}

impl Engine {
    pub fn new(
        store: TaskStore,
        roster: Arc<dyn RosterProvider>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            roster,
            notifier,
            swap_policy: SwapPolicy::default(),
            verify_policy: VerificationPolicy::default(),
        }
    }

    pub fn with_policies(mut self, swap: SwapPolicy, verify: VerificationPolicy) -> Self {
        self.swap_policy = swap;
        self.verify_policy = verify;
        self
    }

    // ----- write operations -----

    pub fn create_task(&self, req: NewTask) -> Result<Task, EngineError> {
        self.create_task_at(req, Utc::now())
    }

    pub fn create_task_at(&self, req: NewTask, now: DateTime<Utc>) -> Result<Task, EngineError> {
        self.active_member(&req.created_by)?;
        if let Some(assignee) = &req.assignee {
            self.active_member(assignee)?;
        }
        if let Some(partner) = &req.partner {
            self.active_member(partner)?;
        }

        let mut task = Task::new(req.title, req.created_by, now);
        task.assignee = req.assignee;
        task.scope = req.scope;
        task.verification = req.verification;
        task.partner = req.partner;
        task.schedule = req.schedule;
        task.deadline = req.deadline;
        task.validate_partner()?;

        self.store.insert_task(&task)?;
        Ok(task)
    }

    /// Completion claim by the assignee, or by anyone for a pool task.
    /// Claims by a non-assignee must go through [`Engine::swap_claim`].
    pub fn claim(&self, task_id: &str, actor: &str) -> Result<Task, EngineError> {
        self.claim_at(task_id, actor, Utc::now())
    }

    pub fn claim_at(
        &self,
        task_id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, EngineError> {
        self.active_member(actor)?;
        let task = self.store.get_task(task_id)?;
        if let Some(assignee) = &task.assignee {
            if assignee != actor {
                return Err(EngineError::Unauthorized(format!(
                    "task {task_id} is assigned to {assignee}; use swap-claim to cover it"
                )));
            }
        }

        let event = TaskEvent::Claim {
            verification: task.verification,
        };
        let target = TaskStateMachine::apply(task_id, task.state, &event)?;
        let log = TaskLog::new(task_id, actor, LogAction::Claimed, now);
        let updated = self.store.transition(TransitionRequest {
            task_id: task_id.to_string(),
            expected: task.state,
            new_state: target,
            set_deadline: None,
            log,
        })?;

        match target {
            TaskState::Completed => self.finish_episode(&updated, actor, actor, now),
            _ => {
                self.request_verification(&updated, actor);
                Ok(updated)
            }
        }
    }

    /// Robin-Hood claim: `actor` covers a task assigned to someone else.
    /// Rate-capped before any state transition; credit is settled when the
    /// episode completes, not here.
    pub fn swap_claim(&self, task_id: &str, actor: &str) -> Result<Task, EngineError> {
        self.swap_claim_at(task_id, actor, Utc::now())
    }

    pub fn swap_claim_at(
        &self,
        task_id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, EngineError> {
        self.active_member(actor)?;
        let task = self.store.get_task(task_id)?;
        let assignee = task.assignee.clone().ok_or_else(|| {
            EngineError::InvalidInput(format!("task {task_id} has no assignee; use claim"))
        })?;
        if assignee == actor {
            return Err(EngineError::InvalidInput(format!(
                "{actor} is the assignee of task {task_id}; use claim"
            )));
        }

        // Both sides of the swap consume the cap.
        self.swap_policy.check(&self.store, actor, now)?;
        self.swap_policy.check(&self.store, &assignee, now)?;

        let event = TaskEvent::Claim {
            verification: task.verification,
        };
        let target = TaskStateMachine::apply(task_id, task.state, &event)?;
        let log = TaskLog::new(task_id, actor, LogAction::SwapClaimed, now)
            .with_swap(&assignee, actor);
        let updated = self.store.transition(TransitionRequest {
            task_id: task_id.to_string(),
            expected: task.state,
            new_state: target,
            set_deadline: None,
            log,
        })?;

        self.notify(Notification::new(
            &assignee,
            MessageKind::SwapRecorded,
            format!("{actor} is covering '{}'", updated.title),
        ));

        match target {
            TaskState::Completed => {
                let credit = resolve_credit(&assignee, actor, task.deadline, now);
                self.finish_episode(&updated, actor, &credit, now)
            }
            _ => {
                self.request_verification(&updated, actor);
                Ok(updated)
            }
        }
    }

    pub fn approve(&self, task_id: &str, verifier: &str) -> Result<Task, EngineError> {
        self.approve_at(task_id, verifier, Utc::now())
    }

    pub fn approve_at(
        &self,
        task_id: &str,
        verifier: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, EngineError> {
        let member = self.active_member(verifier)?;
        let task = self.store.get_task(task_id)?;
        let target = TaskStateMachine::apply(task_id, task.state, &TaskEvent::Approve)?;
        let claim = self.episode_claim(&task)?;
        authorize_verifier(&task, &claim.actor, &member)?;

        let log = TaskLog::new(task_id, verifier, LogAction::Approved, now).with_decision(true);
        let updated = self.store.transition(TransitionRequest {
            task_id: task_id.to_string(),
            expected: task.state,
            new_state: target,
            set_deadline: None,
            log,
        })?;

        self.notify(Notification::new(
            &claim.actor,
            MessageKind::Verified,
            format!("{verifier} approved '{}'", updated.title),
        ));

        let credit = self.episode_credit(&task, &claim, now);
        self.finish_episode(&updated, &claim.actor, &credit, now)
    }

    pub fn reject(&self, task_id: &str, verifier: &str, reason: &str) -> Result<Task, EngineError> {
        self.reject_at(task_id, verifier, reason, Utc::now())
    }

    pub fn reject_at(
        &self,
        task_id: &str,
        verifier: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, EngineError> {
        let member = self.active_member(verifier)?;
        let task = self.store.get_task(task_id)?;
        let target = TaskStateMachine::apply(task_id, task.state, &TaskEvent::Reject)?;
        let claim = self.episode_claim(&task)?;
        authorize_verifier(&task, &claim.actor, &member)?;

        let log = TaskLog::new(task_id, verifier, LogAction::Rejected, now)
            .with_decision(false)
            .with_note(reason);
        let updated = self.store.transition(TransitionRequest {
            task_id: task_id.to_string(),
            expected: task.state,
            new_state: target,
            set_deadline: None,
            log,
        })?;

        self.notify(Notification::new(
            &claim.actor,
            MessageKind::ClaimRejected,
            format!("{verifier} disputed '{}': {reason}", updated.title),
        ));
        let jury = Jury::assemble(&self.roster.active_members(), &claim.actor);
        for juror in jury.members() {
            self.notify(Notification::new(
                juror,
                MessageKind::ConflictOpened,
                format!("vote needed on '{}'", updated.title),
            ));
        }

        Ok(updated)
    }

    /// Cast (or change) a vote in the current conflict episode. The vote
    /// row and the resolution it may trigger commit as a single transition.
    pub fn cast_vote(&self, task_id: &str, voter: &str, accept: bool) -> Result<Task, EngineError> {
        self.cast_vote_at(task_id, voter, accept, Utc::now())
    }

    pub fn cast_vote_at(
        &self,
        task_id: &str,
        voter: &str,
        accept: bool,
        now: DateTime<Utc>,
    ) -> Result<Task, EngineError> {
        self.active_member(voter)?;
        let task = self.store.get_task(task_id)?;
        if task.state != TaskState::Conflict {
            return Err(EngineError::InvalidTransition {
                task_id: task_id.to_string(),
                state: task.state,
                event: "vote_cast".into(),
            });
        }
        let claim = self.episode_claim(&task)?;
        if voter == claim.actor {
            return Err(EngineError::Unauthorized(format!(
                "claimant {voter} may not vote on their own claim"
            )));
        }
        let jury = Jury::assemble(&self.roster.active_members(), &claim.actor);
        if !jury.contains(voter) {
            return Err(EngineError::Unauthorized(format!(
                "{voter} is not on the jury for task {task_id}"
            )));
        }

        // The episode's votes are re-read inside the commit so a concurrent
        // vote is either included in this tally or tallied after it; the
        // outcome is recovered from the committed state.
        let vote = TaskLog::new(task_id, voter, LogAction::VoteCast, now).with_decision(accept);
        let updated = self.store.cast_vote(
            VoteRequest {
                task_id: task_id.to_string(),
                expected: TaskState::Conflict,
                since: claim.at,
                log: vote,
            },
            |votes| {
                let outcome = Tally::count(&jury, votes).outcome(&jury);
                TaskStateMachine::apply(task_id, TaskState::Conflict, &TaskEvent::VoteCast {
                    outcome,
                })
            },
        )?;

        let outcome = match updated.state {
            TaskState::Completed => TallyOutcome::Accepted,
            TaskState::Todo => TallyOutcome::Rejected,
            TaskState::Deadlock => TallyOutcome::Tied,
            _ => TallyOutcome::Pending,
        };
        match outcome {
            TallyOutcome::Pending => Ok(updated),
            TallyOutcome::Accepted => {
                let credit = self.episode_credit(&task, &claim, now);
                self.finish_episode(&updated, &claim.actor, &credit, now)
            }
            TallyOutcome::Rejected => {
                self.notify(Notification::new(
                    &claim.actor,
                    MessageKind::ReturnedToTodo,
                    format!("the jury voted down your claim on '{}'", updated.title),
                ));
                Ok(updated)
            }
            TallyOutcome::Tied => {
                for member in jury.members().iter().chain(std::iter::once(&claim.actor)) {
                    self.notify(Notification::new(
                        member,
                        MessageKind::DeadlockEntered,
                        format!("'{}' is deadlocked; an admin must resolve it", updated.title),
                    ));
                }
                Ok(updated)
            }
        }
    }

    /// Manual override of a deadlocked task. Admin only; not subject to
    /// voting.
    pub fn resolve_deadlock(
        &self,
        task_id: &str,
        admin: &str,
        accept: bool,
    ) -> Result<Task, EngineError> {
        self.resolve_deadlock_at(task_id, admin, accept, Utc::now())
    }

    pub fn resolve_deadlock_at(
        &self,
        task_id: &str,
        admin: &str,
        accept: bool,
        now: DateTime<Utc>,
    ) -> Result<Task, EngineError> {
        let member = self.active_member(admin)?;
        if !member.is_admin() {
            return Err(EngineError::Unauthorized(format!(
                "deadlock override requires the admin role; {admin} is regular"
            )));
        }
        let task = self.store.get_task(task_id)?;
        let target =
            TaskStateMachine::apply(task_id, task.state, &TaskEvent::ResolveDeadlock { accept })?;
        let claim = self.episode_claim(&task)?;

        let log = TaskLog::new(task_id, admin, LogAction::DeadlockResolved, now)
            .with_decision(accept);
        let updated = self.store.transition(TransitionRequest {
            task_id: task_id.to_string(),
            expected: task.state,
            new_state: target,
            set_deadline: None,
            log,
        })?;

        self.notify(Notification::new(
            &claim.actor,
            MessageKind::DeadlockResolved,
            format!(
                "{admin} resolved the deadlock on '{}': {}",
                updated.title,
                if accept { "claim accepted" } else { "back to todo" }
            ),
        ));

        if accept {
            let credit = self.episode_credit(&task, &claim, now);
            self.finish_episode(&updated, &claim.actor, &credit, now)
        } else {
            Ok(updated)
        }
    }

    /// Explicit deletion request: any non-terminal state goes to ARCHIVED.
    /// Restricted to the creator or an admin.
    pub fn archive(&self, task_id: &str, actor: &str) -> Result<Task, EngineError> {
        self.archive_at(task_id, actor, Utc::now())
    }

    pub fn archive_at(
        &self,
        task_id: &str,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<Task, EngineError> {
        let member = self.active_member(actor)?;
        let task = self.store.get_task(task_id)?;
        if !member.is_admin() && task.created_by != actor {
            return Err(EngineError::Unauthorized(format!(
                "only the creator or an admin may archive task {task_id}"
            )));
        }
        let target = TaskStateMachine::apply(task_id, task.state, &TaskEvent::Archive)?;
        let updated = self.store.transition(TransitionRequest {
            task_id: task_id.to_string(),
            expected: task.state,
            new_state: target,
            set_deadline: None,
            log: TaskLog::new(task_id, actor, LogAction::Archived, now),
        })?;

        if let Some(assignee) = updated.assignee.as_deref().filter(|a| *a != actor) {
            self.notify(Notification::new(
                assignee,
                MessageKind::TaskArchived,
                format!("{actor} archived '{}'", updated.title),
            ));
        }
        Ok(updated)
    }

    // ----- read operations -----

    pub fn get_task(&self, task_id: &str) -> Result<Task, EngineError> {
        self.store.get_task(task_id)
    }

    pub fn task_history(&self, task_id: &str) -> Result<Vec<TaskLog>, EngineError> {
        self.store.get_task(task_id)?;
        self.store.logs_for(task_id)
    }

    pub fn list_overdue(&self, now: DateTime<Utc>) -> Result<Vec<Task>, EngineError> {
        self.store.list_overdue(now)
    }

    /// Tasks awaiting a decision that `actor` is allowed to make.
    pub fn list_pending_for_actor(&self, actor: &str) -> Result<Vec<Task>, EngineError> {
        let member = self.active_member(actor)?;
        let mut out = Vec::new();
        for task in self.store.list_in_state(TaskState::PendingVerification)? {
            let Some(claim) = self.store.latest_claim(&task.id)? else {
                continue;
            };
            if authorize_verifier(&task, &claim.actor, &member).is_ok() {
                out.push(task);
            }
        }
        Ok(out)
    }

    // ----- scheduler entry points -----

    /// Overdue notification sweep. No state changes; the deadline keeps
    /// floating from whenever the task eventually completes.
    pub fn overdue_sweep(&self, now: DateTime<Utc>) -> Result<usize, EngineError> {
        let overdue = self.store.list_overdue(now)?;
        for task in &overdue {
            let recipients: Vec<String> = match &task.assignee {
                Some(a) => vec![a.clone()],
                None => self
                    .roster
                    .active_members()
                    .into_iter()
                    .map(|m| m.id)
                    .collect(),
            };
            for recipient in recipients {
                self.notify(Notification::new(
                    &recipient,
                    MessageKind::TaskOverdue,
                    format!("'{}' is overdue", task.title),
                ));
            }
        }
        Ok(overdue.len())
    }

    /// Auto-approve partner-mode claims whose partner stayed silent past
    /// the timeout. Per-task errors are logged and skipped, not retried
    /// within the tick.
    pub fn auto_verify_sweep(&self, now: DateTime<Utc>) -> Result<usize, EngineError> {
        let mut fired = 0;
        for task in self.store.list_in_state(TaskState::PendingVerification)? {
            if !self.verify_policy.auto_verifies(&task) {
                continue;
            }
            let Some(claim) = self.store.latest_claim(&task.id)? else {
                continue;
            };
            if !self.verify_policy.is_expired(claim.at, now) {
                continue;
            }
            match self.auto_verify(&task, &claim, now) {
                Ok(()) => fired += 1,
                Err(e) => {
                    tracing::warn!(task = %task.id, error = %e, "auto-verify skipped");
                }
            }
        }
        Ok(fired)
    }

    fn auto_verify(
        &self,
        task: &Task,
        claim: &TaskLog,
        now: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let note = self.verify_policy.auto_note();
        let log = TaskLog::new(&task.id, "scheduler", LogAction::Approved, now)
            .with_decision(true)
            .with_note(note.clone());
        let updated = self.store.transition(TransitionRequest {
            task_id: task.id.clone(),
            expected: TaskState::PendingVerification,
            new_state: TaskState::Completed,
            set_deadline: None,
            log,
        })?;

        for recipient in [Some(claim.actor.as_str()), task.partner.as_deref()]
            .into_iter()
            .flatten()
        {
            self.notify(Notification::new(
                recipient,
                MessageKind::AutoVerified,
                format!("'{}': {note}", updated.title),
            ));
        }

        let credit = self.episode_credit(task, claim, now);
        self.finish_episode(&updated, &claim.actor, &credit, now)?;
        Ok(())
    }

    /// Safety net for recurring tasks that committed COMPLETED but missed
    /// the inline rollover (e.g. a crash between the two writes).
    pub fn rollover_sweep(&self, now: DateTime<Utc>) -> Result<usize, EngineError> {
        let mut rolled = 0;
        for task in self.store.list_in_state(TaskState::Completed)? {
            if task.schedule.is_none() {
                continue;
            }
            match self.roll_over(&task, task.updated_at, now) {
                Ok(_) => rolled += 1,
                Err(e) => {
                    tracing::warn!(task = %task.id, error = %e, "rollover skipped");
                }
            }
        }
        Ok(rolled)
    }

    // ----- internals -----

    fn active_member(&self, id: &str) -> Result<Member, EngineError> {
        self.roster
            .active_member(id)
            .ok_or_else(|| EngineError::MemberNotFound(id.to_string()))
    }

    /// The claim row that opened the current episode.
    fn episode_claim(&self, task: &Task) -> Result<TaskLog, EngineError> {
        self.store
            .latest_claim(&task.id)?
            .ok_or_else(|| EngineError::InvalidInput(format!(
                "task {} has no claim on record for this episode",
                task.id
            )))
    }

    /// Credit for a completing episode: the swap rule when the episode was
    /// opened by a swap, otherwise the claimant.
    fn episode_credit(&self, task: &Task, claim: &TaskLog, completed_at: DateTime<Utc>) -> String {
        match (&claim.swap_from, &claim.swap_by) {
            (Some(from), Some(by)) => resolve_credit(from, by, task.deadline, completed_at),
            _ => claim.actor.clone(),
        }
    }

    /// Post-completion bookkeeping: completion notice plus the floating
    /// rollover for recurring tasks.
    fn finish_episode(
        &self,
        task: &Task,
        claimant: &str,
        credited: &str,
        completed_at: DateTime<Utc>,
    ) -> Result<Task, EngineError> {
        self.notify(Notification::new(
            credited,
            MessageKind::TaskCompleted,
            format!("'{}' completed; credit to {credited}", task.title),
        ));
        if credited != claimant {
            self.notify(Notification::new(
                claimant,
                MessageKind::TaskCompleted,
                format!("'{}' completed; credit went to {credited}", task.title),
            ));
        }

        if task.schedule.is_some() {
            self.roll_over(task, completed_at, completed_at)
        } else {
            Ok(task.clone())
        }
    }

    /// Start the next episode of a recurring task. The new deadline derives
    /// from the completion timestamp only.
    fn roll_over(
        &self,
        task: &Task,
        completed_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Task, EngineError> {
        let schedule = task.schedule.as_ref().ok_or_else(|| {
            EngineError::InvalidInput(format!("task {} has no schedule to roll over", task.id))
        })?;
        let next = schedule.next_deadline(completed_at)?;
        let log = TaskLog::new(&task.id, "scheduler", LogAction::RolledOver, now)
            .with_note(format!("next deadline {next}"));
        self.store.transition(TransitionRequest {
            task_id: task.id.clone(),
            expected: TaskState::Completed,
            new_state: TaskState::Todo,
            set_deadline: Some(Some(next)),
            log,
        })
    }

    fn request_verification(&self, task: &Task, claimant: &str) {
        let recipients: Vec<String> = match task.verification {
            VerificationMode::Partner => task.partner.iter().cloned().collect(),
            _ => self
                .roster
                .active_members()
                .into_iter()
                .filter(|m| m.id != claimant)
                .map(|m| m.id)
                .collect(),
        };
        for recipient in recipients {
            self.notify(Notification::new(
                &recipient,
                MessageKind::VerificationRequested,
                format!("{claimant} claims '{}' is done", task.title),
            ));
        }
    }

    fn notify(&self, notification: Notification) {
        if let Err(e) = self.notifier.deliver(&notification) {
            tracing::warn!(
                recipient = %notification.recipient,
                kind = %notification.kind,
                error = %e,
                "notification dropped"
            );
        }
    }
}
