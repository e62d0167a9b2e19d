//! Typed outcomes for every core operation.
//!
//! The taxonomy keeps distinct failures distinct: a missing ticket is not an
//! invalid state, and "no eligible worker" is not an error at all (it is
//! [`AssignOutcome::NoWorkerAvailable`](crate::dispatch::AssignOutcome) —
//! a legitimate result the caller may retry). No core operation leaves a
//! partial mutation behind: the store rolls back the whole transaction when
//! one of these surfaces.

use std::fmt;
use thiserror::Error;

use crate::model::Status;

/// The kinds of entity an id can fail to resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Ticket,
    Worker,
    Dispatcher,
    Resident,
    FaultType,
    Binding,
    Complaint,
}

impl Entity {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Ticket => "ticket",
            Self::Worker => "worker",
            Self::Dispatcher => "dispatcher",
            Self::Resident => "resident",
            Self::FaultType => "fault type",
            Self::Binding => "binding",
            Self::Complaint => "complaint",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error type returned by all core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// An id did not resolve to an existing entity.
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    /// The operation is not permitted from the ticket's current status.
    ///
    /// Also returned when a racing caller wins the conditional status
    /// update: the loser observes the ticket no longer in the expected
    /// status, never a silent double transition.
    #[error("ticket {ticket} is {status}, cannot {operation}")]
    InvalidState {
        ticket: i64,
        status: Status,
        operation: &'static str,
    },

    /// A dispatcher tried to assign a ticket it did not log.
    #[error("dispatcher {dispatcher} did not log ticket {ticket}")]
    NotOwner { ticket: i64, dispatcher: i64 },

    /// The operation is not permitted from the complaint's current status.
    #[error("complaint {complaint} is {status}, cannot {operation}")]
    ComplaintClosed {
        complaint: i64,
        status: crate::model::ComplaintStatus,
        operation: &'static str,
    },

    /// Caller-supplied input failed validation before touching the store.
    #[error("{0}")]
    Validation(String),

    /// The persistence layer failed. The operation had no effect and is
    /// safe to retry: every mutation is conditional and transactional.
    #[error("store unavailable: {0}")]
    Store(String),
}

impl From<rusqlite::Error> for Error {
    fn from(error: rusqlite::Error) -> Self {
        Self::Store(error.to_string())
    }
}

/// Result alias used throughout the core.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Machine-readable error codes for CLI and agent-facing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotFound,
    InvalidState,
    NotOwner,
    ComplaintClosed,
    Validation,
    StoreUnavailable,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotFound => "E2001",
            Self::InvalidState => "E2002",
            Self::NotOwner => "E2003",
            Self::ComplaintClosed => "E2004",
            Self::Validation => "E2005",
            Self::StoreUnavailable => "E5001",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotFound => Some("Check the id with `snag list` or `snag show`."),
            Self::InvalidState => {
                Some("Tickets move submitted -> logged -> assigned -> repaired -> reviewed.")
            }
            Self::NotOwner => Some("Only the dispatcher who logged a ticket may assign it."),
            Self::ComplaintClosed => Some("Closed complaints accept no further statements."),
            Self::Validation => None,
            Self::StoreUnavailable => {
                Some("No mutation was applied. Retry once the store is reachable.")
            }
        }
    }
}

impl Error {
    /// The stable code classifying this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::InvalidState { .. } => ErrorCode::InvalidState,
            Self::NotOwner { .. } => ErrorCode::NotOwner,
            Self::ComplaintClosed { .. } => ErrorCode::ComplaintClosed,
            Self::Validation(_) => ErrorCode::Validation,
            Self::Store(_) => ErrorCode::StoreUnavailable,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::{Entity, Error, ErrorCode};
    use crate::model::Status;
    use std::collections::HashSet;

    const ALL_CODES: [ErrorCode; 6] = [
        ErrorCode::NotFound,
        ErrorCode::InvalidState,
        ErrorCode::NotOwner,
        ErrorCode::ComplaintClosed,
        ErrorCode::Validation,
        ErrorCode::StoreUnavailable,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL_CODES {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL_CODES {
            let rendered = code.code();
            assert_eq!(rendered.len(), 5);
            assert!(rendered.starts_with('E'));
            assert!(rendered.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn errors_map_to_codes() {
        let not_found = Error::NotFound {
            entity: Entity::Ticket,
            id: 7,
        };
        assert_eq!(not_found.code(), ErrorCode::NotFound);
        assert_eq!(not_found.to_string(), "ticket 7 not found");

        let invalid = Error::InvalidState {
            ticket: 7,
            status: Status::Assigned,
            operation: "intake",
        };
        assert_eq!(invalid.code(), ErrorCode::InvalidState);
        assert_eq!(invalid.to_string(), "ticket 7 is assigned, cannot intake");

        let not_owner = Error::NotOwner {
            ticket: 7,
            dispatcher: 2,
        };
        assert_eq!(not_owner.code(), ErrorCode::NotOwner);
    }
}
