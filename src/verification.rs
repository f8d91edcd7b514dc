//! Peer and partner verification of completion claims.
//!
//! Moves a claim from "asserted" to "trusted". In peer mode any active
//! member except the claimant decides, once, and the first recorded
//! decision wins. In partner mode only the designated accountability
//! partner decides; if they stay silent past the timeout the scheduler
//! auto-approves with an explicit audit note.

use chrono::{DateTime, Duration, Utc};

use crate::error::EngineError;
use crate::roster::Member;
use crate::state_machine::{Task, VerificationMode};

pub const DEFAULT_VERIFY_TIMEOUT_HOURS: i64 = 48;

#[derive(Debug, Clone, Copy)]
pub struct VerificationPolicy {
    pub timeout_hours: i64,
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            timeout_hours: DEFAULT_VERIFY_TIMEOUT_HOURS,
        }
    }
}

impl VerificationPolicy {
    /// Auto-approval applies to partner mode only. Peer claims wait for a
    /// human decision indefinitely.
    pub fn auto_verifies(&self, task: &Task) -> bool {
        task.verification == VerificationMode::Partner
    }

    pub fn is_expired(&self, claimed_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now - claimed_at >= Duration::hours(self.timeout_hours)
    }

    /// Audit note attached to an auto-approved claim.
    pub fn auto_note(&self) -> String {
        format!(
            "auto-verified: partner did not respond within {}h",
            self.timeout_hours
        )
    }
}

/// Guard for approve/reject: the claimant never verifies their own claim,
/// and in partner mode nobody but the partner decides.
pub fn authorize_verifier(
    task: &Task,
    claimant: &str,
    verifier: &Member,
) -> Result<(), EngineError> {
    if verifier.id == claimant {
        return Err(EngineError::SelfVerification(verifier.id.clone()));
    }
    if task.verification == VerificationMode::Partner
        && task.partner.as_deref() != Some(verifier.id.as_str())
    {
        return Err(EngineError::Unauthorized(format!(
            "only the accountability partner may verify task {}",
            task.id
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Role;
    use chrono::TimeZone;

    fn task(mode: VerificationMode, partner: Option<&str>) -> Task {
        let mut t = Task::new("Dishes".into(), "alice".into(), Utc::now());
        t.verification = mode;
        t.partner = partner.map(String::from);
        t
    }

    #[test]
    fn claimant_cannot_verify_own_claim() {
        let t = task(VerificationMode::Peer, None);
        let err =
            authorize_verifier(&t, "bob", &Member::active("bob", Role::Regular)).unwrap_err();
        assert!(matches!(err, EngineError::SelfVerification(_)));
    }

    #[test]
    fn any_peer_may_verify_in_peer_mode() {
        let t = task(VerificationMode::Peer, None);
        assert!(authorize_verifier(&t, "bob", &Member::active("carol", Role::Regular)).is_ok());
    }

    #[test]
    fn partner_mode_restricts_to_the_partner() {
        let t = task(VerificationMode::Partner, Some("carol"));
        assert!(authorize_verifier(&t, "bob", &Member::active("carol", Role::Regular)).is_ok());

        let err =
            authorize_verifier(&t, "bob", &Member::active("dave", Role::Regular)).unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));
    }

    #[test]
    fn auto_verify_applies_to_partner_mode_only() {
        let policy = VerificationPolicy::default();
        assert!(policy.auto_verifies(&task(VerificationMode::Partner, Some("carol"))));
        assert!(!policy.auto_verifies(&task(VerificationMode::Peer, None)));
        assert!(!policy.auto_verifies(&task(VerificationMode::None, None)));
    }

    #[test]
    fn expiry_at_exactly_the_timeout() {
        let policy = VerificationPolicy { timeout_hours: 48 };
        let claimed = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        assert!(!policy.is_expired(claimed, claimed + Duration::hours(47)));
        assert!(policy.is_expired(claimed, claimed + Duration::hours(48)));
        assert!(policy.is_expired(claimed, claimed + Duration::hours(72)));
    }

    #[test]
    fn auto_note_mentions_silence() {
        let policy = VerificationPolicy::default();
        assert!(policy.auto_note().contains("did not respond"));
        assert!(policy.auto_note().contains("48h"));
    }
}
