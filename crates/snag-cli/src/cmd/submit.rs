//! `snag submit` — a resident reports a fault, creating a `submitted`
//! ticket.

use std::io::Write as _;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use snag_core::lifecycle;
use snag_core::model::{Channel, NewTicket};

use crate::output::{OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Fault type id (see `snag fault-type list`).
    #[arg(long = "fault-type")]
    pub fault_type: i64,

    /// Free-text description of the fault.
    #[arg(long)]
    pub description: String,

    /// Submission channel: phone or app.
    #[arg(long, default_value = "phone")]
    pub channel: Channel,

    /// Submitting resident id.
    #[arg(long)]
    pub resident: i64,
}

#[derive(Debug, Serialize)]
struct SubmitOutput {
    id: i64,
    status: String,
    fault_type: i64,
    channel: String,
}

pub fn run_submit(args: &SubmitArgs, output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    let ticket = lifecycle::submit(
        &mut store,
        &NewTicket {
            fault_type: args.fault_type,
            description: args.description.clone(),
            channel: args.channel,
            resident: args.resident,
        },
    )
    .map_err(|e| fail(output, &e))?;

    let result = SubmitOutput {
        id: ticket.id,
        status: ticket.status.to_string(),
        fault_type: ticket.fault_type,
        channel: ticket.channel.to_string(),
    };
    render(output, &result, |v, w| {
        writeln!(w, "ticket {} submitted (fault type {})", v.id, v.fault_type)
    })
}
