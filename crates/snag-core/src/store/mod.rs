//! The persistence seam for the ticket domain.
//!
//! Core operations never talk to a concrete database. They receive a
//! [`Store`] handle and run every state change inside one transaction via
//! [`Store::transaction`]: reads and conditional writes in the same closure
//! see a consistent snapshot, and an `Err` return rolls the whole unit back.
//! This is what keeps multi-field transitions (status + dispatcher, or
//! status + binding + worker flag) atomic.
//!
//! Two implementations ship:
//! - [`SqliteStore`] — rusqlite with WAL and `BEGIN IMMEDIATE` transactions.
//! - [`MemoryStore`] — clone-on-transaction maps, for tests.

pub mod memory;
mod migrations;
mod schema;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::model::{
    Binding, Complaint, ComplaintStatus, Dispatcher, FaultType, Feedback, FeedbackScores,
    NewTicket, RepairRecord, RepairReport, Resident, StaffRef, Statement, Status, Ticket, Worker,
};

/// Filter criteria for ticket listings. Fields combine with AND semantics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicketFilter {
    /// Filter by lifecycle status (exact match).
    pub status: Option<Status>,
    /// Filter by the dispatcher bound at intake.
    pub dispatcher: Option<i64>,
    /// Filter by the submitting resident.
    pub resident: Option<i64>,
}

/// Operations available inside a store transaction.
///
/// Mutating methods that return `bool` are conditional: `false` means the
/// precondition did not hold (row missing or expectation mismatch) and
/// nothing changed. `update_ticket_status` is the compare-and-swap that
/// serializes racing lifecycle transitions.
pub trait StoreTx {
    // Tickets -----------------------------------------------------------

    fn create_ticket(&mut self, new: &NewTicket, created_at: DateTime<Utc>) -> Result<Ticket>;

    fn get_ticket(&self, id: i64) -> Result<Option<Ticket>>;

    fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>>;

    /// Conditionally move a ticket from `expected` to `new`, optionally
    /// binding a dispatcher in the same write. Returns `false` (no
    /// mutation) when the ticket is missing or not in `expected` status.
    fn update_ticket_status(
        &mut self,
        id: i64,
        expected: Status,
        new: Status,
        dispatcher: Option<i64>,
    ) -> Result<bool>;

    // Workers -----------------------------------------------------------

    fn create_worker(&mut self, name: &str, capabilities: &BTreeSet<i64>) -> Result<Worker>;

    fn get_worker(&self, id: i64) -> Result<Option<Worker>>;

    /// Workers in ascending-id order; optionally only those available.
    fn list_workers(&self, available_only: bool) -> Result<Vec<Worker>>;

    /// Returns `false` when the worker does not exist.
    fn set_worker_availability(&mut self, id: i64, available: bool) -> Result<bool>;

    // Dispatch ledger ----------------------------------------------------

    /// Record a new Active binding. Performs no duplicate-Active check;
    /// the assignment engine's status compare-and-swap guarantees the
    /// "at most one Active binding per ticket" precondition.
    fn create_binding(&mut self, ticket: i64, worker: i64) -> Result<Binding>;

    fn active_binding_for(&self, ticket: i64) -> Result<Option<Binding>>;

    /// Returns `false` when the binding does not exist or is already closed.
    fn close_binding(&mut self, id: i64) -> Result<bool>;

    // Reference data ----------------------------------------------------

    fn create_dispatcher(&mut self, name: &str) -> Result<Dispatcher>;

    fn get_dispatcher(&self, id: i64) -> Result<Option<Dispatcher>>;

    fn create_resident(&mut self, name: &str, address: &str) -> Result<Resident>;

    fn get_resident(&self, id: i64) -> Result<Option<Resident>>;

    fn create_fault_type(&mut self, name: &str) -> Result<FaultType>;

    fn get_fault_type(&self, id: i64) -> Result<Option<FaultType>>;

    fn list_fault_types(&self) -> Result<Vec<FaultType>>;

    // Records and feedback ----------------------------------------------

    fn create_record(&mut self, binding: i64, report: &RepairReport) -> Result<RepairRecord>;

    fn create_feedback(&mut self, ticket: i64, scores: FeedbackScores) -> Result<Feedback>;

    // Complaints ----------------------------------------------------------

    fn create_complaint(
        &mut self,
        ticket: i64,
        content: &str,
        related_staff: &[StaffRef],
    ) -> Result<Complaint>;

    fn get_complaint(&self, id: i64) -> Result<Option<Complaint>>;

    /// Returns `false` when the complaint does not exist.
    fn set_complaint_status(
        &mut self,
        id: i64,
        status: ComplaintStatus,
        resolution: Option<&str>,
    ) -> Result<bool>;

    fn create_statement(
        &mut self,
        complaint: i64,
        submitter: StaffRef,
        content: &str,
    ) -> Result<Statement>;

    fn list_statements(&self, complaint: i64) -> Result<Vec<Statement>>;
}

/// A handle to the persistence store.
pub trait Store {
    /// Run `f` as one atomic unit of work. The closure's `Err` rolls back
    /// every mutation it made; `Ok` commits them all.
    fn transaction<T>(&mut self, f: impl FnOnce(&mut dyn StoreTx) -> Result<T>) -> Result<T>;
}
