//! `snag show` — display one ticket with its active binding, if any.

use std::io::Write as _;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use snag_core::error::{Entity, Error};
use snag_core::model::{Binding, Ticket};
use snag_core::store::Store;

use crate::output::{OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Ticket id to show.
    pub ticket: i64,
}

#[derive(Debug, Serialize)]
struct ShowOutput {
    #[serde(flatten)]
    ticket: Ticket,
    #[serde(skip_serializing_if = "Option::is_none")]
    active_binding: Option<Binding>,
}

pub fn run_show(args: &ShowArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    let result = store
        .transaction(|tx| {
            let ticket = tx.get_ticket(args.ticket)?.ok_or(Error::NotFound {
                entity: Entity::Ticket,
                id: args.ticket,
            })?;
            let active_binding = tx.active_binding_for(args.ticket)?;
            Ok(ShowOutput {
                ticket,
                active_binding,
            })
        })
        .map_err(|e| fail(output, &e))?;

    render(output, &result, |v, w| {
        writeln!(w, "ticket {}", v.ticket.id)?;
        writeln!(w, "  status:      {}", v.ticket.status)?;
        writeln!(w, "  fault type:  {}", v.ticket.fault_type)?;
        writeln!(w, "  channel:     {}", v.ticket.channel)?;
        writeln!(w, "  resident:    {}", v.ticket.resident)?;
        match v.ticket.dispatcher {
            Some(dispatcher) => writeln!(w, "  dispatcher:  {dispatcher}")?,
            None => writeln!(w, "  dispatcher:  (awaiting intake)")?,
        }
        writeln!(w, "  description: {}", v.ticket.description)?;
        if let Some(binding) = &v.active_binding {
            writeln!(w, "  worker:      {} (binding {})", binding.worker, binding.id)?;
        }
        Ok(())
    })
}
