//! `snag list` — list tickets, optionally filtered by status, dispatcher,
//! or resident.

use std::io::Write as _;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use snag_core::model::{Status, Ticket};
use snag_core::store::{Store, TicketFilter};

use crate::output::{OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Filter by lifecycle status.
    #[arg(long)]
    pub status: Option<Status>,

    /// Filter by the dispatcher bound at intake.
    #[arg(long)]
    pub dispatcher: Option<i64>,

    /// Filter by submitting resident.
    #[arg(long)]
    pub resident: Option<i64>,
}

#[derive(Debug, Serialize)]
struct ListOutput {
    tickets: Vec<Ticket>,
}

pub fn run_list(args: &ListArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    let filter = TicketFilter {
        status: args.status,
        dispatcher: args.dispatcher,
        resident: args.resident,
    };
    let tickets = store
        .transaction(|tx| tx.list_tickets(&filter))
        .map_err(|e| fail(output, &e))?;

    let result = ListOutput { tickets };
    render(output, &result, |v, w| {
        if v.tickets.is_empty() {
            writeln!(w, "no tickets")?;
            return Ok(());
        }
        for ticket in &v.tickets {
            writeln!(
                w,
                "{:>4}  {:<9}  fault {:<3}  {}",
                ticket.id, ticket.status, ticket.fault_type, ticket.description
            )?;
        }
        Ok(())
    })
}
