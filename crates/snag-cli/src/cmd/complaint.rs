//! `snag complaint` — open, annotate, and close resident complaints.

use std::io::Write as _;
use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;
use snag_core::complaints;
use snag_core::model::{Complaint, StaffRef, Statement};

use crate::output::{OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Subcommand, Debug)]
pub enum ComplaintCommand {
    /// Open a complaint against a ticket.
    Open(OpenArgs),
    /// Add a staff statement to an open complaint.
    Statement(StatementArgs),
    /// Close a complaint with its resolution.
    Close(CloseArgs),
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Ticket the complaint is about.
    pub ticket: i64,

    /// Complaint content.
    #[arg(long)]
    pub content: String,

    /// Staff involved, as `d<id>` / `w<id>` refs, comma separated.
    #[arg(long, value_delimiter = ',')]
    pub staff: Vec<StaffRef>,
}

#[derive(Args, Debug)]
pub struct StatementArgs {
    /// Complaint id.
    pub complaint: i64,

    /// Submitting staff member (`d<id>` or `w<id>`).
    #[arg(long = "by")]
    pub submitter: StaffRef,

    /// Statement content.
    #[arg(long)]
    pub content: String,
}

#[derive(Args, Debug)]
pub struct CloseArgs {
    /// Complaint id.
    pub complaint: i64,

    /// Agreed resolution.
    #[arg(long)]
    pub resolution: String,
}

#[derive(Debug, Serialize)]
struct ComplaintOutput {
    #[serde(flatten)]
    complaint: Complaint,
}

#[derive(Debug, Serialize)]
struct StatementOutput {
    #[serde(flatten)]
    statement: Statement,
}

pub fn run_complaint(
    command: &ComplaintCommand,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    match command {
        ComplaintCommand::Open(args) => {
            let complaint =
                complaints::open_complaint(&mut store, args.ticket, &args.content, &args.staff)
                    .map_err(|e| fail(output, &e))?;
            let result = ComplaintOutput { complaint };
            render(output, &result, |v, w| {
                writeln!(
                    w,
                    "complaint {} opened against ticket {}",
                    v.complaint.id, v.complaint.ticket
                )
            })
        }
        ComplaintCommand::Statement(args) => {
            let statement =
                complaints::add_statement(&mut store, args.complaint, args.submitter, &args.content)
                    .map_err(|e| fail(output, &e))?;
            let result = StatementOutput { statement };
            render(output, &result, |v, w| {
                writeln!(
                    w,
                    "statement {} recorded on complaint {} by {}",
                    v.statement.id, v.statement.complaint, v.statement.submitter
                )
            })
        }
        ComplaintCommand::Close(args) => {
            let complaint =
                complaints::close_complaint(&mut store, args.complaint, &args.resolution)
                    .map_err(|e| fail(output, &e))?;
            let result = ComplaintOutput { complaint };
            render(output, &result, |v, w| {
                writeln!(w, "complaint {} closed", v.complaint.id)
            })
        }
    }
}
