//! Worker assignment engine.
//!
//! Assignment is first-fit, not optimal-fit: scan available workers in
//! ascending-id order and take the first whose capability set contains the
//! ticket's fault type. That keeps the operation cheap, deterministic, and
//! safe to retry — load balancing and proximity weighting are explicitly
//! out of scope.

use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Entity, Error, Result};
use crate::model::{Binding, Status, Worker};
use crate::store::{Store, StoreTx};

/// The two legitimate results of an assignment attempt.
///
/// `NoWorkerAvailable` is not an error: nothing was mutated and the caller
/// may retry later (for example once a worker frees up) without side
/// effects accumulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AssignOutcome {
    Assigned { binding: Binding },
    NoWorkerAvailable,
}

/// Pick the worker to dispatch for `fault_type` from `candidates`.
///
/// First-fit over ascending ids: the lowest-id candidate that is available
/// and capable wins. Pure function — persistence-free so the search order
/// and tie-break policy are testable without a database.
#[must_use]
pub fn select_worker(fault_type: i64, candidates: &[Worker]) -> Option<&Worker> {
    candidates
        .iter()
        .filter(|w| w.available && w.can_repair(fault_type))
        .min_by_key(|w| w.id)
}

/// Assign a `Logged` ticket to a capable available worker.
///
/// Only the dispatcher who logged the ticket may assign it. On a match,
/// one transaction applies the ticket's `Logged -> Assigned` transition
/// (the compare-and-swap), claims the worker, and records the Active
/// binding — all or nothing. With no eligible worker the ticket stays
/// `Logged` and nothing changes.
///
/// # Errors
///
/// Returns `NotFound` for an unknown ticket or dispatcher, `InvalidState`
/// when the ticket is not `Logged` (including losing a race to another
/// dispatcher), and `NotOwner` when the caller did not log the ticket.
pub fn assign<S: Store>(
    store: &mut S,
    ticket_id: i64,
    dispatcher_id: i64,
) -> Result<AssignOutcome> {
    let outcome = store.transaction(|tx| {
        let ticket = tx.get_ticket(ticket_id)?.ok_or(Error::NotFound {
            entity: Entity::Ticket,
            id: ticket_id,
        })?;
        if tx.get_dispatcher(dispatcher_id)?.is_none() {
            return Err(Error::NotFound {
                entity: Entity::Dispatcher,
                id: dispatcher_id,
            });
        }
        ticket
            .status
            .can_transition_to(Status::Assigned)
            .map_err(|_| Error::InvalidState {
                ticket: ticket_id,
                status: ticket.status,
                operation: "assign",
            })?;
        if ticket.dispatcher != Some(dispatcher_id) {
            return Err(Error::NotOwner {
                ticket: ticket_id,
                dispatcher: dispatcher_id,
            });
        }

        let candidates = tx.list_workers(true)?;
        let Some(worker) = select_worker(ticket.fault_type, &candidates) else {
            debug!(
                ticket = ticket_id,
                fault_type = ticket.fault_type,
                candidates = candidates.len(),
                "no eligible worker"
            );
            return Ok(AssignOutcome::NoWorkerAvailable);
        };
        let worker_id = worker.id;

        // The CAS: a racing assign already moved the ticket out of Logged.
        if !tx.update_ticket_status(ticket_id, ticket.status, Status::Assigned, None)? {
            return Err(Error::InvalidState {
                ticket: ticket_id,
                status: ticket.status,
                operation: "assign",
            });
        }
        if !tx.set_worker_availability(worker_id, false)? {
            return Err(Error::NotFound {
                entity: Entity::Worker,
                id: worker_id,
            });
        }
        let binding = tx.create_binding(ticket_id, worker_id)?;
        Ok(AssignOutcome::Assigned { binding })
    })?;

    match outcome {
        AssignOutcome::Assigned { binding } => {
            info!(
                ticket = ticket_id,
                worker = binding.worker,
                binding = binding.id,
                "ticket assigned"
            );
        }
        AssignOutcome::NoWorkerAvailable => {
            info!(ticket = ticket_id, "assignment deferred: no eligible worker");
        }
    }
    Ok(outcome)
}
