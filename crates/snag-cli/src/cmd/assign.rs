//! `snag assign` — dispatch a logged ticket to the first available worker
//! capable of its fault type.
//!
//! "No eligible worker" exits successfully: the ticket stays logged and the
//! dispatcher can retry once a capable worker frees up.

use std::io::Write as _;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use snag_core::dispatch::{self, AssignOutcome};

use crate::output::{OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct AssignArgs {
    /// Ticket id to assign.
    pub ticket: i64,

    /// Dispatcher requesting the assignment (must be the one who logged
    /// the ticket).
    #[arg(long)]
    pub dispatcher: i64,
}

#[derive(Debug, Serialize)]
struct AssignedOutput {
    ticket: i64,
    outcome: &'static str,
    worker: i64,
    binding: i64,
}

#[derive(Debug, Serialize)]
struct DeferredOutput {
    ticket: i64,
    outcome: &'static str,
}

pub fn run_assign(args: &AssignArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    let outcome = dispatch::assign(&mut store, args.ticket, args.dispatcher)
        .map_err(|e| fail(output, &e))?;

    match outcome {
        AssignOutcome::Assigned { binding } => {
            let result = AssignedOutput {
                ticket: args.ticket,
                outcome: "assigned",
                worker: binding.worker,
                binding: binding.id,
            };
            render(output, &result, |v, w| {
                writeln!(
                    w,
                    "ticket {} assigned to worker {} (binding {})",
                    v.ticket, v.worker, v.binding
                )
            })
        }
        AssignOutcome::NoWorkerAvailable => {
            let result = DeferredOutput {
                ticket: args.ticket,
                outcome: "no_worker_available",
            };
            render(output, &result, |v, w| {
                writeln!(
                    w,
                    "no eligible worker for ticket {}; it remains logged, retry later",
                    v.ticket
                )
            })
        }
    }
}
