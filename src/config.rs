//! Configuration loaded from `hearth.toml`.
//!
//! [`HearthConfig`] holds every tunable plus the member roster. Values
//! missing from the file fall back to the built-in defaults. The `HEARTH_DB`
//! environment variable takes precedence over the file for the database
//! path.

use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

use crate::roster::{Member, MemberStatus, Role};
use crate::scheduler::DEFAULT_SWEEP_INTERVAL_SECS;
use crate::swap::{DEFAULT_SWAP_CAP, DEFAULT_SWAP_WINDOW_DAYS, SwapPolicy};
use crate::verification::{DEFAULT_VERIFY_TIMEOUT_HOURS, VerificationPolicy};

/// Top-level configuration loaded from `hearth.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct HearthConfig {
    /// SQLite database path.
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Hours a partner may stay silent before a claim auto-approves.
    #[serde(default = "default_verify_timeout_hours")]
    pub verify_timeout_hours: i64,

    /// Swap participations allowed per member in the trailing window.
    #[serde(default = "default_swap_cap")]
    pub swap_cap: u32,

    /// Length of the trailing swap window, in days.
    #[serde(default = "default_swap_window_days")]
    pub swap_window_days: i64,

    /// Seconds between scheduler sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Household members.
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

/// One `[[members]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberEntry {
    pub id: String,

    /// Display name; defaults to the id.
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default = "default_role")]
    pub role: Role,

    #[serde(default = "default_status")]
    pub status: MemberStatus,
}

impl MemberEntry {
    pub fn to_member(&self) -> Member {
        Member {
            id: self.id.clone(),
            name: self.name.clone().unwrap_or_else(|| self.id.clone()),
            role: self.role,
            status: self.status,
        }
    }
}

// Default database path: "hearth.db".
fn default_db_path() -> String {
    "hearth.db".to_string()
}

// Default partner timeout: 48 hours.
fn default_verify_timeout_hours() -> i64 {
    DEFAULT_VERIFY_TIMEOUT_HOURS
}

// Default swap cap: 3 participations.
fn default_swap_cap() -> u32 {
    DEFAULT_SWAP_CAP
}

// Default swap window: 7 days.
fn default_swap_window_days() -> i64 {
    DEFAULT_SWAP_WINDOW_DAYS
}

// Default sweep interval: 300 seconds.
fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

fn default_role() -> Role {
    Role::Regular
}

fn default_status() -> MemberStatus {
    MemberStatus::Active
}

impl Default for HearthConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            verify_timeout_hours: default_verify_timeout_hours(),
            swap_cap: default_swap_cap(),
            swap_window_days: default_swap_window_days(),
            sweep_interval_secs: default_sweep_interval_secs(),
            members: Vec::new(),
        }
    }
}

impl HearthConfig {
    /// Loads configuration from `hearth.toml` in the current directory.
    /// Uses defaults if the file does not exist.
    pub fn load() -> Result<Self> {
        let path = Path::new("hearth.toml");
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str::<HearthConfig>(&contents)?
        } else {
            Self::default()
        };

        // Environment variable takes precedence over the file for the db path.
        if let Ok(db) = std::env::var("HEARTH_DB")
            && !db.is_empty()
        {
            config.db_path = db;
        }

        Ok(config)
    }

    pub fn swap_policy(&self) -> SwapPolicy {
        SwapPolicy {
            cap: self.swap_cap,
            window_days: self.swap_window_days,
        }
    }

    pub fn verify_policy(&self) -> VerificationPolicy {
        VerificationPolicy {
            timeout_hours: self.verify_timeout_hours,
        }
    }

    pub fn roster_members(&self) -> Vec<Member> {
        self.members.iter().map(MemberEntry::to_member).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = HearthConfig::default();
        assert_eq!(config.db_path, "hearth.db");
        assert_eq!(config.verify_timeout_hours, 48);
        assert_eq!(config.swap_cap, 3);
        assert_eq!(config.swap_window_days, 7);
        assert_eq!(config.sweep_interval_secs, 300);
        assert!(config.members.is_empty());
    }

    #[test]
    fn deserialize_partial_toml() {
        let toml_str = r#"
            db_path = "/var/lib/hearth/tasks.db"
            swap_cap = 5

            [[members]]
            id = "alice"
            role = "admin"

            [[members]]
            id = "bob"
            name = "Bob"
        "#;
        let config: HearthConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.db_path, "/var/lib/hearth/tasks.db");
        assert_eq!(config.swap_cap, 5);
        assert_eq!(config.verify_timeout_hours, 48);

        let members = config.roster_members();
        assert_eq!(members.len(), 2);
        assert!(members[0].is_admin());
        assert_eq!(members[0].name, "alice");
        assert_eq!(members[1].name, "Bob");
        assert!(members[1].is_active());
    }

    #[test]
    fn member_status_parses_all_variants() {
        let toml_str = r#"
            [[members]]
            id = "carol"
            status = "pending"

            [[members]]
            id = "dave"
            status = "banned"
        "#;
        let config: HearthConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.members[0].status, MemberStatus::Pending);
        assert_eq!(config.members[1].status, MemberStatus::Banned);
    }

    #[test]
    fn policies_reflect_config() {
        let config: HearthConfig = toml::from_str("verify_timeout_hours = 24").unwrap();
        assert_eq!(config.verify_policy().timeout_hours, 24);
        assert_eq!(config.swap_policy().cap, 3);
    }
}
