use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// The five lifecycle states of a repair ticket, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Submitted,
    Logged,
    Assigned,
    Repaired,
    Reviewed,
}

impl Status {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::Logged => "logged",
            Self::Assigned => "assigned",
            Self::Repaired => "repaired",
            Self::Reviewed => "reviewed",
        }
    }

    /// Validate whether a transition from self to `target` is allowed.
    ///
    /// The lifecycle is strictly forward, one step at a time:
    /// - `submitted -> logged` (dispatcher intake)
    /// - `logged -> assigned` (worker bound)
    /// - `assigned -> repaired` (repair record filed)
    /// - `assigned -> logged` (repair attempt failed; re-dispatchable)
    /// - `repaired -> reviewed` (resident feedback)
    pub fn can_transition_to(self, target: Self) -> Result<(), InvalidTransition> {
        if self == target {
            return Err(InvalidTransition {
                from: self,
                to: target,
                reason: "no-op transition is not allowed",
            });
        }

        let allowed = matches!(
            (self, target),
            (Self::Submitted, Self::Logged)
                | (Self::Logged, Self::Assigned)
                | (Self::Assigned, Self::Repaired)
                | (Self::Assigned, Self::Logged)
                | (Self::Repaired, Self::Reviewed)
        );

        if allowed {
            Ok(())
        } else {
            Err(InvalidTransition {
                from: self,
                to: target,
                reason: "transition not allowed by lifecycle rules",
            })
        }
    }
}

/// The channel a resident used to submit a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Phone,
    App,
}

impl Channel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::App => "app",
        }
    }
}

/// All persisted fields for a repair ticket (the root aggregate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub fault_type: i64,
    pub description: String,
    pub channel: Channel,
    pub resident: i64,
    /// Bound at intake. Invariant: `Some` iff `status >= Logged`.
    pub dispatcher: Option<i64>,
    pub status: Status,
    pub created_at: DateTime<Utc>,
}

/// Fields a resident provides when submitting a ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub fault_type: i64,
    pub description: String,
    pub channel: Channel,
    pub resident: i64,
}

/// Error returned when a status transition is invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: Status,
    pub to: Status,
    pub reason: &'static str,
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl FromStr for Status {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "submitted" => Ok(Self::Submitted),
            "logged" => Ok(Self::Logged),
            "assigned" => Ok(Self::Assigned),
            "repaired" => Ok(Self::Repaired),
            "reviewed" => Ok(Self::Reviewed),
            _ => Err(ParseEnumError {
                expected: "status",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for Channel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        match normalized.as_str() {
            "phone" => Ok(Self::Phone),
            "app" => Ok(Self::App),
            _ => Err(ParseEnumError {
                expected: "channel",
                got: s.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Channel, InvalidTransition, Status};
    use std::str::FromStr;

    #[test]
    fn enum_json_roundtrips() {
        assert_eq!(
            serde_json::to_string(&Status::Logged).unwrap(),
            "\"logged\""
        );
        assert_eq!(serde_json::to_string(&Channel::App).unwrap(), "\"app\"");

        assert_eq!(
            serde_json::from_str::<Status>("\"assigned\"").unwrap(),
            Status::Assigned
        );
        assert_eq!(
            serde_json::from_str::<Channel>("\"phone\"").unwrap(),
            Channel::Phone
        );
    }

    #[test]
    fn display_parse_roundtrips() {
        for value in [
            Status::Submitted,
            Status::Logged,
            Status::Assigned,
            Status::Repaired,
            Status::Reviewed,
        ] {
            let rendered = value.to_string();
            let reparsed = Status::from_str(&rendered).unwrap();
            assert_eq!(value, reparsed);
        }

        for value in [Channel::Phone, Channel::App] {
            let rendered = value.to_string();
            let reparsed = Channel::from_str(&rendered).unwrap();
            assert_eq!(value, reparsed);
        }
    }

    #[test]
    fn parse_rejects_unknown_values() {
        assert!(Status::from_str("open").is_err());
        assert!(Channel::from_str("fax").is_err());
    }

    #[test]
    fn status_order_matches_lifecycle() {
        assert!(Status::Submitted < Status::Logged);
        assert!(Status::Logged < Status::Assigned);
        assert!(Status::Assigned < Status::Repaired);
        assert!(Status::Repaired < Status::Reviewed);
    }

    #[test]
    fn status_transition_rules() {
        assert!(Status::Submitted.can_transition_to(Status::Logged).is_ok());
        assert!(Status::Logged.can_transition_to(Status::Assigned).is_ok());
        assert!(Status::Assigned.can_transition_to(Status::Repaired).is_ok());
        assert!(Status::Assigned.can_transition_to(Status::Logged).is_ok());
        assert!(Status::Repaired.can_transition_to(Status::Reviewed).is_ok());

        assert!(matches!(
            Status::Submitted.can_transition_to(Status::Assigned),
            Err(InvalidTransition {
                from: Status::Submitted,
                to: Status::Assigned,
                ..
            })
        ));

        assert!(matches!(
            Status::Reviewed.can_transition_to(Status::Submitted),
            Err(InvalidTransition { .. })
        ));

        // Same-state transitions are never a silent no-op.
        assert!(Status::Logged.can_transition_to(Status::Logged).is_err());
    }
}
