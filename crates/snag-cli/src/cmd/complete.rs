//! `snag complete` — file a repair record for an assigned ticket, closing
//! the binding and releasing the worker.

use std::io::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use snag_core::lifecycle;
use snag_core::model::{RepairOutcome, RepairReport};

use crate::output::{OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct CompleteArgs {
    /// Ticket id being closed out.
    pub ticket: i64,

    /// Visit outcome: completed, cannot_repair, or follow_up_needed.
    #[arg(long, default_value = "completed")]
    pub outcome: RepairOutcome,

    /// What was done during the visit.
    #[arg(long)]
    pub procedure: String,

    /// Visit start time (RFC 3339). Defaults to now.
    #[arg(long)]
    pub started: Option<DateTime<Utc>>,

    /// Visit end time (RFC 3339). Defaults to now.
    #[arg(long)]
    pub ended: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct CompleteOutput {
    ticket: i64,
    record: i64,
    outcome: String,
}

pub fn run_complete(
    args: &CompleteArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    let now = Utc::now();
    let report = RepairReport {
        outcome: args.outcome,
        started_at: args.started.unwrap_or(now),
        ended_at: args.ended.unwrap_or(now),
        procedure: args.procedure.clone(),
    };

    let record = lifecycle::complete_repair(&mut store, args.ticket, &report)
        .map_err(|e| fail(output, &e))?;

    let result = CompleteOutput {
        ticket: args.ticket,
        record: record.id,
        outcome: record.outcome.to_string(),
    };
    render(output, &result, |v, w| {
        writeln!(
            w,
            "repair record {} filed for ticket {} ({})",
            v.record, v.ticket, v.outcome
        )
    })
}
