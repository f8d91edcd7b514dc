use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::recurrence::Schedule;

use super::state::TaskState;

/// Whether a task belongs to the whole household or a single member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskScope {
    Shared,
    Personal,
}

impl fmt::Display for TaskScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskScope::Shared => write!(f, "shared"),
            TaskScope::Personal => write!(f, "personal"),
        }
    }
}

impl FromStr for TaskScope {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "shared" => Ok(TaskScope::Shared),
            "personal" => Ok(TaskScope::Personal),
            other => Err(EngineError::InvalidInput(format!("unknown scope: {other}"))),
        }
    }
}

/// How a completion claim gets trusted.
///
/// `None` completes on claim. `Peer` lets any active member other than the
/// claimant decide; first decision wins. `Partner` restricts the decision to
/// a designated accountability partner and auto-approves after a timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
    None,
    Peer,
    Partner,
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerificationMode::None => write!(f, "none"),
            VerificationMode::Peer => write!(f, "peer"),
            VerificationMode::Partner => write!(f, "partner"),
        }
    }
}

impl FromStr for VerificationMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(VerificationMode::None),
            "peer" => Ok(VerificationMode::Peer),
            "partner" => Ok(VerificationMode::Partner),
            other => Err(EngineError::InvalidInput(format!(
                "unknown verification mode: {other}"
            ))),
        }
    }
}

/// A household task. One row per task; the episode history lives in
/// [`TaskLog`] rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub created_by: String,
    /// `None` means the task sits in the unclaimed pool.
    pub assignee: Option<String>,
    pub scope: TaskScope,
    pub verification: VerificationMode,
    /// Set only when `verification` is `Partner`; never the assignee.
    pub partner: Option<String>,
    /// `None` for one-off tasks.
    pub schedule: Option<Schedule>,
    /// `None` for backlog items with no due date.
    pub deadline: Option<DateTime<Utc>>,
    pub state: TaskState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: String, created_by: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            created_by,
            assignee: None,
            scope: TaskScope::Shared,
            verification: VerificationMode::Peer,
            partner: None,
            schedule: None,
            deadline: None,
            state: TaskState::Todo,
            created_at: now,
            updated_at: now,
        }
    }

    /// Partner mode requires a partner, other modes forbid one, and a
    /// member never partners themselves.
    pub fn validate_partner(&self) -> Result<(), EngineError> {
        match (self.verification, &self.partner) {
            (VerificationMode::Partner, None) => Err(EngineError::InvalidInput(
                "partner verification requires an accountability partner".into(),
            )),
            (VerificationMode::Partner, Some(p)) if Some(p) == self.assignee.as_ref() => {
                Err(EngineError::InvalidInput(
                    "a member may not be their own accountability partner".into(),
                ))
            }
            (VerificationMode::None | VerificationMode::Peer, Some(_)) => {
                Err(EngineError::InvalidInput(
                    "accountability partner is only valid for partner verification".into(),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// What a [`TaskLog`] row records.
///
/// `Claimed`, `Approved`, `Rejected`, `VoteCast` and `SwapClaimed` are the
/// caller-facing actions; `Archived`, `DeadlockResolved` and `RolledOver`
/// exist so that every transition, including engine-internal ones, carries
/// exactly one audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    Claimed,
    Approved,
    Rejected,
    VoteCast,
    SwapClaimed,
    Archived,
    DeadlockResolved,
    RolledOver,
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogAction::Claimed => write!(f, "claimed"),
            LogAction::Approved => write!(f, "approved"),
            LogAction::Rejected => write!(f, "rejected"),
            LogAction::VoteCast => write!(f, "vote_cast"),
            LogAction::SwapClaimed => write!(f, "swap_claimed"),
            LogAction::Archived => write!(f, "archived"),
            LogAction::DeadlockResolved => write!(f, "deadlock_resolved"),
            LogAction::RolledOver => write!(f, "rolled_over"),
        }
    }
}

impl FromStr for LogAction {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claimed" => Ok(LogAction::Claimed),
            "approved" => Ok(LogAction::Approved),
            "rejected" => Ok(LogAction::Rejected),
            "vote_cast" => Ok(LogAction::VoteCast),
            "swap_claimed" => Ok(LogAction::SwapClaimed),
            "archived" => Ok(LogAction::Archived),
            "deadlock_resolved" => Ok(LogAction::DeadlockResolved),
            "rolled_over" => Ok(LogAction::RolledOver),
            other => Err(EngineError::InvalidInput(format!(
                "unknown log action: {other}"
            ))),
        }
    }
}

/// Append-only audit row. One row accompanies every state transition; this
/// is the sole durability guarantee in the absence of multi-record
/// transactions, so rows are never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLog {
    pub id: String,
    pub task_id: String,
    /// Who performed the action. For approve/reject rows this is the
    /// verifier; for vote rows, the voter.
    pub actor: String,
    pub action: LogAction,
    pub note: Option<String>,
    /// Verification decision or vote direction, where applicable.
    pub decision: Option<bool>,
    /// Swap rows only: the displaced assignee.
    pub swap_from: Option<String>,
    /// Swap rows only: the member actually doing the work.
    pub swap_by: Option<String>,
    pub at: DateTime<Utc>,
}

impl TaskLog {
    pub fn new(task_id: &str, actor: &str, action: LogAction, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            task_id: task_id.to_string(),
            actor: actor.to_string(),
            action,
            note: None,
            decision: None,
            swap_from: None,
            swap_by: None,
            at,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_decision(mut self, decision: bool) -> Self {
        self.decision = Some(decision);
        self
    }

    pub fn with_swap(mut self, from: &str, by: &str) -> Self {
        self.swap_from = Some(from.to_string());
        self.swap_by = Some(by.to_string());
        self
    }

    /// Whether this row opened an episode (the task left `TODO`).
    pub fn is_claim(&self) -> bool {
        matches!(self.action, LogAction::Claimed | LogAction::SwapClaimed)
    }
}
