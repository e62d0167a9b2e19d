//! `snag intake` — a dispatcher logs a submitted ticket, binding
//! themselves to it.

use std::io::Write as _;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use snag_core::lifecycle;

use crate::output::{OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct IntakeArgs {
    /// Ticket id to log.
    pub ticket: i64,

    /// Dispatcher performing intake.
    #[arg(long)]
    pub dispatcher: i64,
}

#[derive(Debug, Serialize)]
struct IntakeOutput {
    id: i64,
    status: String,
    dispatcher: i64,
}

pub fn run_intake(args: &IntakeArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    let ticket = lifecycle::log_intake(&mut store, args.ticket, args.dispatcher)
        .map_err(|e| fail(output, &e))?;

    let result = IntakeOutput {
        id: ticket.id,
        status: ticket.status.to_string(),
        dispatcher: args.dispatcher,
    };
    render(output, &result, |v, w| {
        writeln!(w, "ticket {} logged by dispatcher {}", v.id, v.dispatcher)
    })
}
