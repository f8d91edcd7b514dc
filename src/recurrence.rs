//! Floating-schedule recurrence.
//!
//! The next deadline is always a function of the completion timestamp and
//! the schedule rule, never of the previous deadline. Late completions do
//! not compound drift and early completions do not shorten the next
//! interval.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// A recurrence rule: a fixed interval in days, or a cron expression.
///
/// Stored and serialized as a string: `every:3` or `cron:0 0 9 * * Sat *`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Schedule {
    EveryDays(u32),
    Cron(String),
}

impl Schedule {
    /// Parse an interval rule, rejecting zero-day intervals.
    pub fn every_days(days: u32) -> Result<Self, EngineError> {
        if days == 0 {
            return Err(EngineError::InvalidSchedule(
                "interval must be at least one day".into(),
            ));
        }
        Ok(Schedule::EveryDays(days))
    }

    /// Parse a cron rule, validating the expression up front so a bad rule
    /// fails at task creation rather than at rollover time.
    pub fn cron(expr: &str) -> Result<Self, EngineError> {
        cron::Schedule::from_str(expr)
            .map_err(|e| EngineError::InvalidSchedule(format!("bad cron expression: {e}")))?;
        Ok(Schedule::Cron(expr.to_string()))
    }

    /// Compute the next deadline from the completion timestamp.
    ///
    /// For intervals: `completed_at + days`. For cron: the first occurrence
    /// strictly after `completed_at`.
    pub fn next_deadline(
        &self,
        completed_at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, EngineError> {
        match self {
            Schedule::EveryDays(days) => completed_at
                .checked_add_signed(Duration::days(i64::from(*days)))
                .ok_or_else(|| {
                    EngineError::InvalidSchedule(format!(
                        "interval of {days} days overflows the supported date range"
                    ))
                }),
            Schedule::Cron(expr) => {
                let schedule = cron::Schedule::from_str(expr).map_err(|e| {
                    EngineError::InvalidSchedule(format!("bad cron expression: {e}"))
                })?;
                schedule.after(&completed_at).next().ok_or_else(|| {
                    EngineError::InvalidSchedule(format!(
                        "cron expression has no future occurrence: {expr}"
                    ))
                })
            }
        }
    }
}

impl fmt::Display for Schedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schedule::EveryDays(days) => write!(f, "every:{days}"),
            Schedule::Cron(expr) => write!(f, "cron:{expr}"),
        }
    }
}

impl FromStr for Schedule {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(days) = s.strip_prefix("every:") {
            let days: u32 = days.parse().map_err(|_| {
                EngineError::InvalidSchedule(format!("bad interval rule: {s}"))
            })?;
            Schedule::every_days(days)
        } else if let Some(expr) = s.strip_prefix("cron:") {
            Schedule::cron(expr)
        } else {
            Err(EngineError::InvalidSchedule(format!(
                "expected `every:<days>` or `cron:<expr>`, got: {s}"
            )))
        }
    }
}

impl TryFrom<String> for Schedule {
    type Error = EngineError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Schedule> for String {
    fn from(s: Schedule) -> String {
        s.to_string()
    }
}
