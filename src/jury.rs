//! Population-parity conflict resolution.
//!
//! A rejected claim puts the task in `CONFLICT` and every active member
//! except the claimant becomes a juror; the rejecting verifier gets no
//! pre-counted vote and must cast one like anyone else. An odd jury always
//! produces a strict majority, so conflicts terminate. An even jury can
//! split exactly, and when it does the task freezes in `DEADLOCK` to force
//! the household to talk it out. That freeze is a product decision, not a
//! missing tie-break.

use std::collections::HashMap;

use crate::roster::Member;
use crate::state_machine::{TallyOutcome, TaskLog};

/// The voters eligible for one conflict episode.
#[derive(Debug, Clone)]
pub struct Jury {
    members: Vec<String>,
}

impl Jury {
    /// All active members minus the claimant.
    pub fn assemble(active: &[Member], claimant: &str) -> Self {
        Self {
            members: active
                .iter()
                .filter(|m| m.id != claimant)
                .map(|m| m.id.clone())
                .collect(),
        }
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn contains(&self, member: &str) -> bool {
        self.members.iter().any(|m| m == member)
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Votes required to resolve in either direction: floor(N/2) + 1.
    pub fn majority(&self) -> usize {
        self.size() / 2 + 1
    }
}

/// Effective tally of an episode's vote rows.
///
/// A member's latest vote is their only vote; earlier rows from the same
/// member are overwritten, not added. Rows from non-jurors (e.g. a member
/// who was removed from the roster mid-episode) are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    pub yes: usize,
    pub no: usize,
}

impl Tally {
    pub fn count(jury: &Jury, votes: &[TaskLog]) -> Self {
        let mut effective: HashMap<&str, bool> = HashMap::new();
        for vote in votes {
            if !jury.contains(&vote.actor) {
                continue;
            }
            if let Some(decision) = vote.decision {
                // Votes arrive oldest first; the last write wins.
                effective.insert(vote.actor.as_str(), decision);
            }
        }
        let yes = effective.values().filter(|v| **v).count();
        let no = effective.len() - yes;
        Self { yes, no }
    }

    pub fn votes_cast(&self) -> usize {
        self.yes + self.no
    }

    /// Resolve the tally against the jury size.
    ///
    /// Strict majority in either direction resolves immediately, whatever
    /// the parity. An even jury that has fully voted into an exact split is
    /// tied; everything else stays pending.
    pub fn outcome(&self, jury: &Jury) -> TallyOutcome {
        let majority = jury.majority();
        if self.yes >= majority {
            TallyOutcome::Accepted
        } else if self.no >= majority {
            TallyOutcome::Rejected
        } else if self.votes_cast() == jury.size() && self.yes == self.no {
            TallyOutcome::Tied
        } else {
            TallyOutcome::Pending
        }
    }
}
