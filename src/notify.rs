//! Outbound notification events.
//!
//! The engine emits one batch of notifications after each committed
//! transition and hands them to a [`NotificationSink`]. Delivery is
//! best-effort: a sink failure is logged and never blocks or rolls back
//! the transition that produced it.

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    VerificationRequested,
    Verified,
    AutoVerified,
    ClaimRejected,
    ConflictOpened,
    TaskCompleted,
    ReturnedToTodo,
    DeadlockEntered,
    DeadlockResolved,
    TaskOverdue,
    SwapRecorded,
    TaskArchived,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageKind::VerificationRequested => "verification_requested",
            MessageKind::Verified => "verified",
            MessageKind::AutoVerified => "auto_verified",
            MessageKind::ClaimRejected => "claim_rejected",
            MessageKind::ConflictOpened => "conflict_opened",
            MessageKind::TaskCompleted => "task_completed",
            MessageKind::ReturnedToTodo => "returned_to_todo",
            MessageKind::DeadlockEntered => "deadlock_entered",
            MessageKind::DeadlockResolved => "deadlock_resolved",
            MessageKind::TaskOverdue => "task_overdue",
            MessageKind::SwapRecorded => "swap_recorded",
            MessageKind::TaskArchived => "task_archived",
        };
        write!(f, "{s}")
    }
}

/// One event for the external notification collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub recipient: String,
    pub kind: MessageKind,
    pub context: String,
}

impl Notification {
    pub fn new(recipient: &str, kind: MessageKind, context: impl Into<String>) -> Self {
        Self {
            recipient: recipient.to_string(),
            kind,
            context: context.into(),
        }
    }
}

/// Delivery boundary. Implementations must not block for unbounded time;
/// errors are reported back so the engine can log and move on.
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification) -> anyhow::Result<()>;
}

/// Default sink: structured log lines only. Useful standalone and as the
/// fallback when no chat transport is wired up.
#[derive(Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn deliver(&self, n: &Notification) -> anyhow::Result<()> {
        tracing::info!(recipient = %n.recipient, kind = %n.kind, context = %n.context, "notify");
        Ok(())
    }
}

/// In-memory sink that records everything delivered to it.
#[derive(Debug, Default)]
pub struct MemorySink {
    delivered: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut self.delivered.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl NotificationSink for MemorySink {
    fn deliver(&self, notification: &Notification) -> anyhow::Result<()> {
        self.delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_and_drains() {
        let sink = MemorySink::new();
        sink.deliver(&Notification::new(
            "alice",
            MessageKind::VerificationRequested,
            "bob claimed Dishes",
        ))
        .unwrap();

        let delivered = sink.drain();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].recipient, "alice");
        assert_eq!(delivered[0].kind, MessageKind::VerificationRequested);
        assert!(sink.drain().is_empty());
    }

    #[test]
    fn kind_display_is_snake_case() {
        assert_eq!(MessageKind::DeadlockEntered.to_string(), "deadlock_entered");
        assert_eq!(MessageKind::AutoVerified.to_string(), "auto_verified");
    }
}
