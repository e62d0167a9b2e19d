//! In-memory store for tests and ephemeral runs.
//!
//! Transactions clone the tables, apply the closure to the clone, and
//! commit by swapping the clone back in. Rollback is simply dropping the
//! clone, which gives the same all-or-nothing visibility as the SQLite
//! implementation.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use super::{Store, StoreTx, TicketFilter};
use crate::error::Result;
use crate::model::{
    Binding, BindingStatus, Complaint, ComplaintStatus, Dispatcher, FaultType, Feedback,
    FeedbackScores, NewTicket, RepairRecord, RepairReport, Resident, StaffRef, Statement, Status,
    Ticket, Worker,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    tickets: BTreeMap<i64, Ticket>,
    workers: BTreeMap<i64, Worker>,
    bindings: BTreeMap<i64, Binding>,
    dispatchers: BTreeMap<i64, Dispatcher>,
    residents: BTreeMap<i64, Resident>,
    fault_types: BTreeMap<i64, FaultType>,
    records: BTreeMap<i64, RepairRecord>,
    feedback: BTreeMap<i64, Feedback>,
    complaints: BTreeMap<i64, Complaint>,
    statements: BTreeMap<i64, Statement>,
}

fn next_id<V>(table: &BTreeMap<i64, V>) -> i64 {
    table.last_key_value().map_or(1, |(id, _)| id + 1)
}

/// A map-backed [`Store`] with transactional semantics.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Tables,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn transaction<T>(&mut self, f: impl FnOnce(&mut dyn StoreTx) -> Result<T>) -> Result<T> {
        let mut draft = self.tables.clone();
        let value = f(&mut draft)?;
        self.tables = draft;
        Ok(value)
    }
}

impl StoreTx for Tables {
    fn create_ticket(&mut self, new: &NewTicket, created_at: DateTime<Utc>) -> Result<Ticket> {
        let id = next_id(&self.tickets);
        let ticket = Ticket {
            id,
            fault_type: new.fault_type,
            description: new.description.clone(),
            channel: new.channel,
            resident: new.resident,
            dispatcher: None,
            status: Status::Submitted,
            created_at,
        };
        self.tickets.insert(id, ticket.clone());
        Ok(ticket)
    }

    fn get_ticket(&self, id: i64) -> Result<Option<Ticket>> {
        Ok(self.tickets.get(&id).cloned())
    }

    fn list_tickets(&self, filter: &TicketFilter) -> Result<Vec<Ticket>> {
        Ok(self
            .tickets
            .values()
            .filter(|t| filter.status.is_none_or(|s| t.status == s))
            .filter(|t| filter.dispatcher.is_none_or(|d| t.dispatcher == Some(d)))
            .filter(|t| filter.resident.is_none_or(|r| t.resident == r))
            .cloned()
            .collect())
    }

    fn update_ticket_status(
        &mut self,
        id: i64,
        expected: Status,
        new: Status,
        dispatcher: Option<i64>,
    ) -> Result<bool> {
        let Some(ticket) = self.tickets.get_mut(&id) else {
            return Ok(false);
        };
        if ticket.status != expected {
            return Ok(false);
        }
        ticket.status = new;
        if dispatcher.is_some() {
            ticket.dispatcher = dispatcher;
        }
        Ok(true)
    }

    fn create_worker(&mut self, name: &str, capabilities: &BTreeSet<i64>) -> Result<Worker> {
        let id = next_id(&self.workers);
        let worker = Worker {
            id,
            name: name.to_string(),
            available: true,
            capabilities: capabilities.clone(),
        };
        self.workers.insert(id, worker.clone());
        Ok(worker)
    }

    fn get_worker(&self, id: i64) -> Result<Option<Worker>> {
        Ok(self.workers.get(&id).cloned())
    }

    fn list_workers(&self, available_only: bool) -> Result<Vec<Worker>> {
        // BTreeMap iteration gives ascending-id order for free.
        Ok(self
            .workers
            .values()
            .filter(|w| !available_only || w.available)
            .cloned()
            .collect())
    }

    fn set_worker_availability(&mut self, id: i64, available: bool) -> Result<bool> {
        match self.workers.get_mut(&id) {
            Some(worker) => {
                worker.available = available;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn create_binding(&mut self, ticket: i64, worker: i64) -> Result<Binding> {
        let id = next_id(&self.bindings);
        let binding = Binding {
            id,
            ticket,
            worker,
            status: BindingStatus::Active,
        };
        self.bindings.insert(id, binding);
        Ok(binding)
    }

    fn active_binding_for(&self, ticket: i64) -> Result<Option<Binding>> {
        Ok(self
            .bindings
            .values()
            .find(|b| b.ticket == ticket && b.status == BindingStatus::Active)
            .copied())
    }

    fn close_binding(&mut self, id: i64) -> Result<bool> {
        match self.bindings.get_mut(&id) {
            Some(binding) if binding.status == BindingStatus::Active => {
                binding.status = BindingStatus::Closed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn create_dispatcher(&mut self, name: &str) -> Result<Dispatcher> {
        let id = next_id(&self.dispatchers);
        let dispatcher = Dispatcher {
            id,
            name: name.to_string(),
        };
        self.dispatchers.insert(id, dispatcher.clone());
        Ok(dispatcher)
    }

    fn get_dispatcher(&self, id: i64) -> Result<Option<Dispatcher>> {
        Ok(self.dispatchers.get(&id).cloned())
    }

    fn create_resident(&mut self, name: &str, address: &str) -> Result<Resident> {
        let id = next_id(&self.residents);
        let resident = Resident {
            id,
            name: name.to_string(),
            address: address.to_string(),
        };
        self.residents.insert(id, resident.clone());
        Ok(resident)
    }

    fn get_resident(&self, id: i64) -> Result<Option<Resident>> {
        Ok(self.residents.get(&id).cloned())
    }

    fn create_fault_type(&mut self, name: &str) -> Result<FaultType> {
        let id = next_id(&self.fault_types);
        let fault_type = FaultType {
            id,
            name: name.to_string(),
        };
        self.fault_types.insert(id, fault_type.clone());
        Ok(fault_type)
    }

    fn get_fault_type(&self, id: i64) -> Result<Option<FaultType>> {
        Ok(self.fault_types.get(&id).cloned())
    }

    fn list_fault_types(&self) -> Result<Vec<FaultType>> {
        Ok(self.fault_types.values().cloned().collect())
    }

    fn create_record(&mut self, binding: i64, report: &RepairReport) -> Result<RepairRecord> {
        let id = next_id(&self.records);
        let record = RepairRecord {
            id,
            binding,
            outcome: report.outcome,
            started_at: report.started_at,
            ended_at: report.ended_at,
            procedure: report.procedure.clone(),
        };
        self.records.insert(id, record.clone());
        Ok(record)
    }

    fn create_feedback(&mut self, ticket: i64, scores: FeedbackScores) -> Result<Feedback> {
        let id = next_id(&self.feedback);
        let feedback = Feedback {
            id,
            ticket,
            response_speed: scores.response_speed,
            service_attitude: scores.service_attitude,
            satisfaction: scores.satisfaction,
        };
        self.feedback.insert(id, feedback);
        Ok(feedback)
    }

    fn create_complaint(
        &mut self,
        ticket: i64,
        content: &str,
        related_staff: &[StaffRef],
    ) -> Result<Complaint> {
        let id = next_id(&self.complaints);
        let mut staff = related_staff.to_vec();
        staff.sort_unstable();
        staff.dedup();
        let complaint = Complaint {
            id,
            ticket,
            content: content.to_string(),
            status: ComplaintStatus::Raised,
            related_staff: staff,
            resolution: None,
        };
        self.complaints.insert(id, complaint.clone());
        Ok(complaint)
    }

    fn get_complaint(&self, id: i64) -> Result<Option<Complaint>> {
        Ok(self.complaints.get(&id).cloned())
    }

    fn set_complaint_status(
        &mut self,
        id: i64,
        status: ComplaintStatus,
        resolution: Option<&str>,
    ) -> Result<bool> {
        let Some(complaint) = self.complaints.get_mut(&id) else {
            return Ok(false);
        };
        complaint.status = status;
        if let Some(resolution) = resolution {
            complaint.resolution = Some(resolution.to_string());
        }
        Ok(true)
    }

    fn create_statement(
        &mut self,
        complaint: i64,
        submitter: StaffRef,
        content: &str,
    ) -> Result<Statement> {
        let id = next_id(&self.statements);
        let statement = Statement {
            id,
            complaint,
            submitter,
            content: content.to_string(),
        };
        self.statements.insert(id, statement.clone());
        Ok(statement)
    }

    fn list_statements(&self, complaint: i64) -> Result<Vec<Statement>> {
        Ok(self
            .statements
            .values()
            .filter(|s| s.complaint == complaint)
            .cloned()
            .collect())
    }
}
