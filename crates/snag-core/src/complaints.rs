//! Complaint desk: bookkeeping around resident complaints.
//!
//! No lifecycle machinery beyond two guards — closed complaints are
//! immutable, and the first staff statement moves a complaint from
//! `Raised` to `InProgress`.

use tracing::info;

use crate::error::{Entity, Error, Result};
use crate::model::{Complaint, ComplaintStatus, StaffRef, Statement};
use crate::store::{Store, StoreTx};

fn require_complaint(tx: &dyn StoreTx, id: i64) -> Result<Complaint> {
    tx.get_complaint(id)?.ok_or(Error::NotFound {
        entity: Entity::Complaint,
        id,
    })
}

fn require_staff(tx: &dyn StoreTx, staff: StaffRef) -> Result<()> {
    match staff {
        StaffRef::Dispatcher(id) => {
            if tx.get_dispatcher(id)?.is_none() {
                return Err(Error::NotFound {
                    entity: Entity::Dispatcher,
                    id,
                });
            }
        }
        StaffRef::Worker(id) => {
            if tx.get_worker(id)?.is_none() {
                return Err(Error::NotFound {
                    entity: Entity::Worker,
                    id,
                });
            }
        }
    }
    Ok(())
}

/// Open a complaint against a ticket, naming the staff involved.
///
/// # Errors
///
/// Returns `NotFound` if the ticket or any referenced staff member is
/// unknown, and `Validation` for empty content.
pub fn open_complaint<S: Store>(
    store: &mut S,
    ticket_id: i64,
    content: &str,
    related_staff: &[StaffRef],
) -> Result<Complaint> {
    if content.trim().is_empty() {
        return Err(Error::Validation("complaint content is empty".to_string()));
    }

    let complaint = store.transaction(|tx| {
        if tx.get_ticket(ticket_id)?.is_none() {
            return Err(Error::NotFound {
                entity: Entity::Ticket,
                id: ticket_id,
            });
        }
        for staff in related_staff {
            require_staff(tx, *staff)?;
        }
        tx.create_complaint(ticket_id, content, related_staff)
    })?;

    info!(complaint = complaint.id, ticket = ticket_id, "complaint opened");
    Ok(complaint)
}

/// Add a staff statement to an open complaint.
///
/// The first statement moves the complaint from `Raised` to `InProgress`.
///
/// # Errors
///
/// Returns `NotFound` for an unknown complaint or submitter, and
/// `ComplaintClosed` when the complaint no longer accepts statements.
pub fn add_statement<S: Store>(
    store: &mut S,
    complaint_id: i64,
    submitter: StaffRef,
    content: &str,
) -> Result<Statement> {
    store.transaction(|tx| {
        let complaint = require_complaint(tx, complaint_id)?;
        if complaint.status == ComplaintStatus::Closed {
            return Err(Error::ComplaintClosed {
                complaint: complaint_id,
                status: complaint.status,
                operation: "add statement",
            });
        }
        require_staff(tx, submitter)?;

        if complaint.status == ComplaintStatus::Raised {
            tx.set_complaint_status(complaint_id, ComplaintStatus::InProgress, None)?;
        }
        tx.create_statement(complaint_id, submitter, content)
    })
}

/// Close a complaint with the agreed resolution.
///
/// # Errors
///
/// Returns `NotFound` for an unknown complaint and `ComplaintClosed` when
/// it was already closed.
pub fn close_complaint<S: Store>(
    store: &mut S,
    complaint_id: i64,
    resolution: &str,
) -> Result<Complaint> {
    let complaint = store.transaction(|tx| {
        let complaint = require_complaint(tx, complaint_id)?;
        if complaint.status == ComplaintStatus::Closed {
            return Err(Error::ComplaintClosed {
                complaint: complaint_id,
                status: complaint.status,
                operation: "close",
            });
        }
        tx.set_complaint_status(complaint_id, ComplaintStatus::Closed, Some(resolution))?;
        require_complaint(tx, complaint_id)
    })?;

    info!(complaint = complaint_id, "complaint closed");
    Ok(complaint)
}
