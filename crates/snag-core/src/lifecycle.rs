//! Ticket lifecycle operations.
//!
//! Each operation runs as one store transaction: the status read, the
//! conditional status write, and any side-row writes commit together or not
//! at all. The conditional update doubles as the compare-and-swap that
//! serializes racing callers — whoever loses sees `InvalidState`, never a
//! silent double transition.

use chrono::Utc;
use tracing::{debug, info};

use crate::error::{Entity, Error, Result};
use crate::model::{
    Feedback, FeedbackScores, NewTicket, RepairOutcome, RepairRecord, RepairReport, Status, Ticket,
};
use crate::store::{Store, StoreTx};

fn require_ticket(tx: &dyn StoreTx, id: i64) -> Result<Ticket> {
    tx.get_ticket(id)?.ok_or(Error::NotFound {
        entity: Entity::Ticket,
        id,
    })
}

/// Check the lifecycle table for `ticket.status -> target`.
fn require_transition(ticket: &Ticket, target: Status, operation: &'static str) -> Result<()> {
    ticket
        .status
        .can_transition_to(target)
        .map_err(|_| Error::InvalidState {
            ticket: ticket.id,
            status: ticket.status,
            operation,
        })
}

/// Create a ticket from a resident submission.
///
/// The ticket starts in `Submitted` with no dispatcher bound.
///
/// # Errors
///
/// Returns `NotFound` if the resident or fault type does not exist, and
/// `Validation` if the description is blank.
pub fn submit<S: Store>(store: &mut S, new: &NewTicket) -> Result<Ticket> {
    if new.description.trim().is_empty() {
        return Err(Error::Validation("ticket description is empty".to_string()));
    }

    let ticket = store.transaction(|tx| {
        if tx.get_resident(new.resident)?.is_none() {
            return Err(Error::NotFound {
                entity: Entity::Resident,
                id: new.resident,
            });
        }
        if tx.get_fault_type(new.fault_type)?.is_none() {
            return Err(Error::NotFound {
                entity: Entity::FaultType,
                id: new.fault_type,
            });
        }
        tx.create_ticket(new, Utc::now())
    })?;

    info!(
        ticket = ticket.id,
        fault_type = ticket.fault_type,
        channel = %ticket.channel,
        "ticket submitted"
    );
    Ok(ticket)
}

/// Dispatcher intake: move a `Submitted` ticket to `Logged` and bind the
/// dispatcher, as one conditional write.
///
/// # Errors
///
/// Returns `NotFound` if the ticket or dispatcher is unknown, and
/// `InvalidState` (with no mutation) if the ticket is not `Submitted` —
/// including when a racing intake got there first.
pub fn log_intake<S: Store>(store: &mut S, ticket_id: i64, dispatcher_id: i64) -> Result<Ticket> {
    let ticket = store.transaction(|tx| {
        let ticket = require_ticket(tx, ticket_id)?;
        if tx.get_dispatcher(dispatcher_id)?.is_none() {
            return Err(Error::NotFound {
                entity: Entity::Dispatcher,
                id: dispatcher_id,
            });
        }
        require_transition(&ticket, Status::Logged, "intake")?;

        if !tx.update_ticket_status(
            ticket_id,
            ticket.status,
            Status::Logged,
            Some(dispatcher_id),
        )? {
            // Lost the race between the read above and this write.
            return Err(Error::InvalidState {
                ticket: ticket_id,
                status: ticket.status,
                operation: "intake",
            });
        }
        require_ticket(tx, ticket_id)
    })?;

    info!(ticket = ticket_id, dispatcher = dispatcher_id, "ticket logged");
    Ok(ticket)
}

/// Close out a repair visit on an `Assigned` ticket.
///
/// In one transaction: files the repair record against the active binding,
/// closes the binding, releases the worker, and moves the ticket forward —
/// to `Repaired` when the outcome is `Completed`, back to `Logged`
/// otherwise so the dispatcher can assign again.
///
/// # Errors
///
/// Returns `NotFound` for an unknown ticket, `InvalidState` when the ticket
/// is not `Assigned`, and `Store` if the ledger is missing the active
/// binding an `Assigned` ticket must have.
pub fn complete_repair<S: Store>(
    store: &mut S,
    ticket_id: i64,
    report: &RepairReport,
) -> Result<RepairRecord> {
    if report.ended_at < report.started_at {
        return Err(Error::Validation(
            "repair ended before it started".to_string(),
        ));
    }

    let next = match report.outcome {
        RepairOutcome::Completed => Status::Repaired,
        RepairOutcome::CannotRepair | RepairOutcome::FollowUpNeeded => Status::Logged,
    };

    let record = store.transaction(|tx| {
        let ticket = require_ticket(tx, ticket_id)?;
        require_transition(&ticket, next, "complete repair")?;

        let binding = tx.active_binding_for(ticket_id)?.ok_or_else(|| {
            Error::Store(format!("assigned ticket {ticket_id} has no active binding"))
        })?;

        let record = tx.create_record(binding.id, report)?;
        if !tx.close_binding(binding.id)? {
            return Err(Error::Store(format!("binding {} already closed", binding.id)));
        }
        if !tx.set_worker_availability(binding.worker, true)? {
            return Err(Error::NotFound {
                entity: Entity::Worker,
                id: binding.worker,
            });
        }
        if !tx.update_ticket_status(ticket_id, ticket.status, next, None)? {
            return Err(Error::InvalidState {
                ticket: ticket_id,
                status: ticket.status,
                operation: "complete repair",
            });
        }
        Ok(record)
    })?;

    info!(
        ticket = ticket_id,
        outcome = %report.outcome,
        next_status = %next,
        "repair visit closed"
    );
    Ok(record)
}

/// Record resident feedback on a `Repaired` ticket and move it to
/// `Reviewed`, the terminal state.
///
/// # Errors
///
/// Returns `Validation` for scores outside 1..=5, `NotFound` for an unknown
/// ticket, and `InvalidState` when the ticket is not `Repaired`.
pub fn leave_feedback<S: Store>(
    store: &mut S,
    ticket_id: i64,
    scores: FeedbackScores,
) -> Result<Feedback> {
    for (name, value) in [
        ("response_speed", scores.response_speed),
        ("service_attitude", scores.service_attitude),
        ("satisfaction", scores.satisfaction),
    ] {
        if !(1..=5).contains(&value) {
            return Err(Error::Validation(format!(
                "{name} score {value} outside 1..=5"
            )));
        }
    }

    let feedback = store.transaction(|tx| {
        let ticket = require_ticket(tx, ticket_id)?;
        require_transition(&ticket, Status::Reviewed, "review")?;

        let feedback = tx.create_feedback(ticket_id, scores)?;
        if !tx.update_ticket_status(ticket_id, ticket.status, Status::Reviewed, None)? {
            return Err(Error::InvalidState {
                ticket: ticket_id,
                status: ticket.status,
                operation: "review",
            });
        }
        Ok(feedback)
    })?;

    debug!(ticket = ticket_id, satisfaction = scores.satisfaction, "feedback recorded");
    Ok(feedback)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{complete_repair, leave_feedback, log_intake, submit};
    use crate::error::{Entity, Error};
    use crate::model::{
        Channel, FeedbackScores, NewTicket, RepairOutcome, RepairReport, Status,
    };
    use crate::store::{MemoryStore, Store};

    fn seeded_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store
            .transaction(|tx| {
                tx.create_resident("resident", "4-702")?;
                tx.create_dispatcher("dispatcher")?;
                tx.create_fault_type("plumbing")?;
                Ok(())
            })
            .expect("seed");
        store
    }

    fn new_ticket() -> NewTicket {
        NewTicket {
            fault_type: 1,
            description: "kitchen drain blocked".to_string(),
            channel: Channel::Phone,
            resident: 1,
        }
    }

    #[test]
    fn submit_starts_lifecycle_unbound() {
        let mut store = seeded_store();
        let ticket = submit(&mut store, &new_ticket()).expect("submit");
        assert_eq!(ticket.status, Status::Submitted);
        assert_eq!(ticket.dispatcher, None);
    }

    #[test]
    fn submit_rejects_unknown_references() {
        let mut store = seeded_store();
        let mut bad_resident = new_ticket();
        bad_resident.resident = 99;
        assert!(matches!(
            submit(&mut store, &bad_resident),
            Err(Error::NotFound {
                entity: Entity::Resident,
                id: 99
            })
        ));

        let mut bad_fault = new_ticket();
        bad_fault.fault_type = 42;
        assert!(matches!(
            submit(&mut store, &bad_fault),
            Err(Error::NotFound {
                entity: Entity::FaultType,
                id: 42
            })
        ));
    }

    #[test]
    fn intake_binds_dispatcher_and_logs() {
        let mut store = seeded_store();
        let ticket = submit(&mut store, &new_ticket()).expect("submit");
        let logged = log_intake(&mut store, ticket.id, 1).expect("intake");
        assert_eq!(logged.status, Status::Logged);
        assert_eq!(logged.dispatcher, Some(1));
    }

    #[test]
    fn intake_twice_is_invalid_state_with_no_mutation() {
        let mut store = seeded_store();
        let ticket = submit(&mut store, &new_ticket()).expect("submit");
        log_intake(&mut store, ticket.id, 1).expect("first intake");

        let second = log_intake(&mut store, ticket.id, 1);
        assert!(matches!(
            second,
            Err(Error::InvalidState {
                status: Status::Logged,
                ..
            })
        ));

        store
            .transaction(|tx| {
                let unchanged = tx.get_ticket(ticket.id)?.expect("ticket");
                assert_eq!(unchanged.status, Status::Logged);
                assert_eq!(unchanged.dispatcher, Some(1));
                Ok(())
            })
            .expect("read");
    }

    #[test]
    fn operations_enforce_the_transition_table() {
        let mut store = seeded_store();
        let ticket = submit(&mut store, &new_ticket()).expect("submit");

        // A freshly submitted ticket admits intake only. Repair completion
        // and feedback both sit further down the lifecycle and must refuse.
        let now = Utc::now();
        let report = RepairReport {
            outcome: RepairOutcome::Completed,
            started_at: now,
            ended_at: now,
            procedure: "rodded the drain".to_string(),
        };
        assert!(matches!(
            complete_repair(&mut store, ticket.id, &report),
            Err(Error::InvalidState {
                status: Status::Submitted,
                ..
            })
        ));

        let scores = FeedbackScores {
            response_speed: 5,
            service_attitude: 5,
            satisfaction: 5,
        };
        assert!(matches!(
            leave_feedback(&mut store, ticket.id, scores),
            Err(Error::InvalidState {
                status: Status::Submitted,
                ..
            })
        ));
    }

    #[test]
    fn intake_checks_both_ids() {
        let mut store = seeded_store();
        let ticket = submit(&mut store, &new_ticket()).expect("submit");

        assert!(matches!(
            log_intake(&mut store, 999, 1),
            Err(Error::NotFound {
                entity: Entity::Ticket,
                ..
            })
        ));
        assert!(matches!(
            log_intake(&mut store, ticket.id, 999),
            Err(Error::NotFound {
                entity: Entity::Dispatcher,
                ..
            })
        ));
    }
}
