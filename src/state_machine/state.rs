use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

use super::task::VerificationMode;

/// The six states of a task episode.
///
/// `Todo` is initial for every new or rolled-over task. `Completed` and
/// `Archived` are terminal for the episode; a completed recurring task
/// immediately starts a fresh `Todo` episode with a recomputed deadline.
/// `Deadlock` is terminal except for an explicit admin override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    Todo,
    PendingVerification,
    Conflict,
    Deadlock,
    Completed,
    Archived,
}

impl TaskState {
    /// Terminal states accept no further events except nothing at all.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskState::Completed | TaskState::Archived)
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Todo => write!(f, "TODO"),
            TaskState::PendingVerification => write!(f, "PENDING_VERIFICATION"),
            TaskState::Conflict => write!(f, "CONFLICT"),
            TaskState::Deadlock => write!(f, "DEADLOCK"),
            TaskState::Completed => write!(f, "COMPLETED"),
            TaskState::Archived => write!(f, "ARCHIVED"),
        }
    }
}

impl FromStr for TaskState {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TODO" => Ok(TaskState::Todo),
            "PENDING_VERIFICATION" => Ok(TaskState::PendingVerification),
            "CONFLICT" => Ok(TaskState::Conflict),
            "DEADLOCK" => Ok(TaskState::Deadlock),
            "COMPLETED" => Ok(TaskState::Completed),
            "ARCHIVED" => Ok(TaskState::Archived),
            other => Err(EngineError::InvalidInput(format!(
                "unknown task state: {other}"
            ))),
        }
    }
}

/// The outcome of tallying a conflict episode after a vote lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TallyOutcome {
    /// No majority yet and not everyone has voted.
    Pending,
    /// Strict majority in favor of the claim.
    Accepted,
    /// Strict majority against the claim.
    Rejected,
    /// Even jury, fully voted, exactly split.
    Tied,
}

/// Events that may move a task between states.
///
/// Actor-level guards (verifier is not the claimant, admin role for the
/// deadlock override, swap cap) live in the workflow layer; this table only
/// encodes which event is legal from which state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEvent {
    Claim { verification: VerificationMode },
    Approve,
    Reject,
    VoteCast { outcome: TallyOutcome },
    ResolveDeadlock { accept: bool },
    Archive,
}

impl TaskEvent {
    /// Short name used in invalid-transition errors.
    pub fn name(&self) -> &'static str {
        match self {
            TaskEvent::Claim { .. } => "claim",
            TaskEvent::Approve => "approve",
            TaskEvent::Reject => "reject",
            TaskEvent::VoteCast { .. } => "vote_cast",
            TaskEvent::ResolveDeadlock { .. } => "resolve_deadlock",
            TaskEvent::Archive => "archive",
        }
    }
}

/// The authoritative transition table. All state mutation goes through
/// [`TaskStateMachine::apply`]; the store then commits the result with a
/// compare-and-swap on the prior state.
pub struct TaskStateMachine;

impl TaskStateMachine {
    /// Compute the target state for `event` from `state`, or an
    /// invalid-transition error if the table has no such edge.
    pub fn apply(
        task_id: &str,
        state: TaskState,
        event: &TaskEvent,
    ) -> Result<TaskState, EngineError> {
        let next = match (state, event) {
            (TaskState::Todo, TaskEvent::Claim { verification }) => match verification {
                VerificationMode::None => Some(TaskState::Completed),
                VerificationMode::Peer | VerificationMode::Partner => {
                    Some(TaskState::PendingVerification)
                }
            },
            (TaskState::PendingVerification, TaskEvent::Approve) => Some(TaskState::Completed),
            (TaskState::PendingVerification, TaskEvent::Reject) => Some(TaskState::Conflict),
            (TaskState::Conflict, TaskEvent::VoteCast { outcome }) => match outcome {
                TallyOutcome::Pending => Some(TaskState::Conflict),
                TallyOutcome::Accepted => Some(TaskState::Completed),
                TallyOutcome::Rejected => Some(TaskState::Todo),
                TallyOutcome::Tied => Some(TaskState::Deadlock),
            },
            (TaskState::Deadlock, TaskEvent::ResolveDeadlock { accept }) => {
                if *accept {
                    Some(TaskState::Completed)
                } else {
                    Some(TaskState::Todo)
                }
            }
            (s, TaskEvent::Archive) if !s.is_terminal() => Some(TaskState::Archived),
            _ => None,
        };

        next.ok_or_else(|| EngineError::InvalidTransition {
            task_id: task_id.to_string(),
            state,
            event: event.name().to_string(),
        })
    }
}
