use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use super::ticket::ParseEnumError;

/// Status of a resident complaint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Raised,
    InProgress,
    Closed,
}

impl ComplaintStatus {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Raised => "raised",
            Self::InProgress => "in_progress",
            Self::Closed => "closed",
        }
    }
}

/// A typed reference to a staff member involved in a complaint.
///
/// Rendered as `d<id>` for dispatchers and `w<id>` for workers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "role", content = "id")]
pub enum StaffRef {
    Dispatcher(i64),
    Worker(i64),
}

/// A resident complaint about how a ticket was handled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Complaint {
    pub id: i64,
    pub ticket: i64,
    pub content: String,
    pub status: ComplaintStatus,
    pub related_staff: Vec<StaffRef>,
    pub resolution: Option<String>,
}

/// A statement a staff member submits on an open complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub id: i64,
    pub complaint: i64,
    pub submitter: StaffRef,
    pub content: String,
}

impl fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for StaffRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatcher(id) => write!(f, "d{id}"),
            Self::Worker(id) => write!(f, "w{id}"),
        }
    }
}

impl FromStr for ComplaintStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raised" => Ok(Self::Raised),
            "in_progress" | "in-progress" => Ok(Self::InProgress),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseEnumError {
                expected: "complaint status",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for StaffRef {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parse_id = |digits: &str| {
            digits.parse::<i64>().map_err(|_| ParseEnumError {
                expected: "staff reference",
                got: s.to_string(),
            })
        };
        match trimmed.split_at_checked(1) {
            Some(("d", digits)) if !digits.is_empty() => Ok(Self::Dispatcher(parse_id(digits)?)),
            Some(("w", digits)) if !digits.is_empty() => Ok(Self::Worker(parse_id(digits)?)),
            _ => Err(ParseEnumError {
                expected: "staff reference",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ComplaintStatus, StaffRef};
    use std::str::FromStr;

    #[test]
    fn staff_ref_display_parse_roundtrips() {
        for value in [StaffRef::Dispatcher(11), StaffRef::Worker(5)] {
            let rendered = value.to_string();
            assert_eq!(StaffRef::from_str(&rendered).unwrap(), value);
        }
        assert_eq!(StaffRef::Dispatcher(11).to_string(), "d11");
        assert_eq!(StaffRef::Worker(5).to_string(), "w5");
    }

    #[test]
    fn staff_ref_rejects_malformed_input() {
        assert!(StaffRef::from_str("x5").is_err());
        assert!(StaffRef::from_str("d").is_err());
        assert!(StaffRef::from_str("w5x").is_err());
        assert!(StaffRef::from_str("").is_err());
    }

    #[test]
    fn complaint_status_roundtrips() {
        for value in [
            ComplaintStatus::Raised,
            ComplaintStatus::InProgress,
            ComplaintStatus::Closed,
        ] {
            assert_eq!(
                ComplaintStatus::from_str(&value.to_string()).unwrap(),
                value
            );
        }
        assert!(ComplaintStatus::from_str("pending").is_err());
    }
}
