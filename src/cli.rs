//! clap-based command line interface.
//!
//! Defines the [`Cli`] struct with subcommands [`Command`] (add, claim,
//! swap-claim, approve, reject, vote, resolve, archive, show, overdue,
//! pending, run) and the global `--actor` flag identifying the member
//! performing the action.

use clap::{Parser, Subcommand, ValueEnum};

/// hearth: household task accountability engine.
#[derive(Debug, Parser)]
#[command(name = "hearth", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Member id performing the action.
    #[arg(long, global = true)]
    pub actor: Option<String>,

    /// Enable verbose output.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Verification mode accepted by the CLI, mapped to
/// [`VerificationMode`](crate::state_machine::VerificationMode) internally.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum VerifyArg {
    /// Completes on claim, no review.
    None,
    /// Any other active member reviews; first decision wins.
    Peer,
    /// A designated partner reviews, with auto-approval on silence.
    Partner,
}

/// Task scope accepted by the CLI.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ScopeArg {
    Shared,
    Personal,
}

/// A yes/no decision argument for votes and deadlock overrides.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DecisionArg {
    Yes,
    No,
}

impl DecisionArg {
    pub fn accept(self) -> bool {
        matches!(self, DecisionArg::Yes)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a task.
    Add {
        /// Task title.
        title: String,

        /// Member the task is assigned to; omit for the unclaimed pool.
        #[arg(long)]
        assignee: Option<String>,

        #[arg(long, value_enum, default_value = "shared")]
        scope: ScopeArg,

        #[arg(long, value_enum, default_value = "peer")]
        verify: VerifyArg,

        /// Accountability partner (partner verification only).
        #[arg(long)]
        partner: Option<String>,

        /// Repeat every N days, floating from each completion.
        #[arg(long, conflicts_with = "cron")]
        every: Option<u32>,

        /// Cron expression for the recurrence.
        #[arg(long)]
        cron: Option<String>,

        /// First deadline, RFC 3339 (e.g. 2026-09-01T09:00:00Z).
        #[arg(long)]
        deadline: Option<String>,
    },

    /// Claim your task (or a pool task) as done.
    Claim { task_id: String },

    /// Cover a task assigned to someone else.
    SwapClaim { task_id: String },

    /// Approve a pending completion claim.
    Approve { task_id: String },

    /// Dispute a pending completion claim.
    Reject {
        task_id: String,

        /// Why the claim is disputed.
        #[arg(long, default_value = "disputed")]
        reason: String,
    },

    /// Vote on a disputed claim.
    Vote {
        task_id: String,
        decision: DecisionArg,
    },

    /// Resolve a deadlocked task (admin only).
    Resolve {
        task_id: String,
        decision: DecisionArg,
    },

    /// Archive a task.
    Archive { task_id: String },

    /// Show a task and its audit history.
    Show { task_id: String },

    /// List overdue tasks.
    Overdue,

    /// List claims waiting on your decision.
    Pending,

    /// Run the scheduler loop in the foreground.
    Run,
}
