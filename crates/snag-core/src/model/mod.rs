//! Entity types for the repair-ticket domain.
//!
//! `Ticket` is the root aggregate; `Binding` links one ticket to one worker
//! for the duration of an assignment. Everything else is flat reference or
//! bookkeeping data.

pub mod complaint;
pub mod dispatch;
pub mod ticket;
pub mod worker;

pub use complaint::{Complaint, ComplaintStatus, StaffRef, Statement};
pub use dispatch::{Binding, BindingStatus, RepairOutcome, RepairRecord, RepairReport};
pub use ticket::{Channel, InvalidTransition, NewTicket, ParseEnumError, Status, Ticket};
pub use worker::Worker;

use serde::{Deserialize, Serialize};

/// A category of repairable fault. Static reference data, no lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultType {
    pub id: i64,
    pub name: String,
}

/// A resident who can submit tickets and leave feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
    pub id: i64,
    pub name: String,
    pub address: String,
}

/// A dispatcher who logs and assigns tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dispatcher {
    pub id: i64,
    pub name: String,
}

/// Resident feedback left after a repair, scored 1 (worst) to 5 (best).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub ticket: i64,
    pub response_speed: u8,
    pub service_attitude: u8,
    pub satisfaction: u8,
}

/// Score triple a resident submits with feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedbackScores {
    pub response_speed: u8,
    pub service_attitude: u8,
    pub satisfaction: u8,
}
