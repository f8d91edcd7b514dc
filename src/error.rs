use thiserror::Error;

use crate::state_machine::TaskState;

/// Typed error surface of the engine.
///
/// Every variant maps to one class of the error taxonomy: invalid
/// transition, stale state, authorization, rate limit, or not-found.
/// Infrastructure failures are wrapped; nothing here is fatal to the
/// process.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid transition: task {task_id} is {state}, cannot {event}")]
    InvalidTransition {
        task_id: String,
        state: TaskState,
        event: String,
    },

    /// Optimistic precondition failed: another transition committed first.
    /// Recoverable by re-reading the task and retrying.
    #[error("stale state: task {task_id} expected {expected}, found {actual}")]
    StaleState {
        task_id: String,
        expected: TaskState,
        actual: TaskState,
    },

    #[error("{0} cannot verify their own claim")]
    SelfVerification(String),

    #[error("not authorized: {0}")]
    Unauthorized(String),

    #[error("swap cap exceeded for {member}: {count} swap episodes in the trailing {window_days} days (cap {cap})")]
    SwapCapExceeded {
        member: String,
        count: u32,
        cap: u32,
        window_days: i64,
    },

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("member not found or inactive: {0}")]
    MemberNotFound(String),

    #[error("invalid schedule rule: {0}")]
    InvalidSchedule(String),

    /// A request or stored value that does not hold together: a partner
    /// constraint violation, a swap on an unassigned task, or a row that
    /// no longer parses.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl EngineError {
    /// Whether the caller may retry the same call after re-reading state.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::StaleState { .. } | EngineError::InvalidTransition { .. }
        )
    }
}
