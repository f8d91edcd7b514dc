//! Read-only view of household membership.
//!
//! Onboarding and approval live in an external collaborator; the engine
//! only ever reads a snapshot of members to build verifier and jury
//! rosters. It never mutates membership.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Regular,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Regular => write!(f, "regular"),
        }
    }
}

impl FromStr for Role {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "regular" => Ok(Role::Regular),
            other => Err(EngineError::InvalidInput(format!("unknown role: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Pending,
    Active,
    Banned,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub status: MemberStatus,
}

impl Member {
    pub fn active(id: &str, role: Role) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            role,
            status: MemberStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == MemberStatus::Active
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Source of the member snapshot. The engine consumes this; how the
/// snapshot is produced (onboarding service, config file, API) is not its
/// concern.
pub trait RosterProvider: Send + Sync {
    /// All currently active members.
    fn active_members(&self) -> Vec<Member>;

    /// Look up one active member.
    fn active_member(&self, id: &str) -> Option<Member> {
        self.active_members().into_iter().find(|m| m.id == id)
    }
}

/// Fixed in-memory roster, built from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticRoster {
    members: Vec<Member>,
}

impl StaticRoster {
    pub fn new(members: Vec<Member>) -> Self {
        Self { members }
    }
}

impl RosterProvider for StaticRoster {
    fn active_members(&self) -> Vec<Member> {
        self.members
            .iter()
            .filter(|m| m.is_active())
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> StaticRoster {
        StaticRoster::new(vec![
            Member::active("alice", Role::Admin),
            Member::active("bob", Role::Regular),
            Member {
                id: "carol".into(),
                name: "Carol".into(),
                role: Role::Regular,
                status: MemberStatus::Pending,
            },
            Member {
                id: "dave".into(),
                name: "Dave".into(),
                role: Role::Regular,
                status: MemberStatus::Banned,
            },
        ])
    }

    #[test]
    fn only_active_members_are_visible() {
        let r = roster();
        let ids: Vec<String> = r.active_members().into_iter().map(|m| m.id).collect();
        assert_eq!(ids, vec!["alice", "bob"]);
    }

    #[test]
    fn lookup_excludes_pending_and_banned() {
        let r = roster();
        assert!(r.active_member("alice").is_some());
        assert!(r.active_member("carol").is_none());
        assert!(r.active_member("dave").is_none());
        assert!(r.active_member("nobody").is_none());
    }

    #[test]
    fn role_parse_roundtrip() {
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert_eq!("regular".parse::<Role>().unwrap(), Role::Regular);
        assert!("owner".parse::<Role>().is_err());
    }
}
