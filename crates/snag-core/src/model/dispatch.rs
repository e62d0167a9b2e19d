use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ticket::ParseEnumError;

/// Status of a dispatch binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStatus {
    Active,
    Closed,
}

impl BindingStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }
}

/// The record binding one ticket to one worker for one assignment.
///
/// Invariant: a ticket has at most one `Active` binding at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub id: i64,
    pub ticket: i64,
    pub worker: i64,
    pub status: BindingStatus,
}

/// Outcome of a repair attempt, filed with the repair record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepairOutcome {
    /// The fault cannot be repaired by this worker.
    CannotRepair,
    /// Partial work done; a follow-up visit is needed.
    FollowUpNeeded,
    /// Repair finished.
    Completed,
}

impl RepairOutcome {
    const fn as_str(self) -> &'static str {
        match self {
            Self::CannotRepair => "cannot_repair",
            Self::FollowUpNeeded => "follow_up_needed",
            Self::Completed => "completed",
        }
    }
}

/// A filed account of a repair attempt against a binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepairRecord {
    pub id: i64,
    pub binding: i64,
    pub outcome: RepairOutcome,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub procedure: String,
}

/// What a worker reports when closing out a repair visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub outcome: RepairOutcome,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub procedure: String,
}

impl fmt::Display for BindingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for RepairOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BindingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseEnumError {
                expected: "binding status",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for RepairOutcome {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cannot_repair" | "cannot-repair" => Ok(Self::CannotRepair),
            "follow_up_needed" | "follow-up" => Ok(Self::FollowUpNeeded),
            "completed" => Ok(Self::Completed),
            _ => Err(ParseEnumError {
                expected: "repair outcome",
                got: s.to_string(),
            }),
        }
    }
}
