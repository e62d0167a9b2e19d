//! `snag feedback` — record resident scores for a repaired ticket, moving
//! it to the terminal `reviewed` state.

use std::io::Write as _;
use std::path::Path;

use clap::Args;
use serde::Serialize;
use snag_core::lifecycle;
use snag_core::model::FeedbackScores;

use crate::output::{OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Args, Debug)]
pub struct FeedbackArgs {
    /// Ticket id being reviewed.
    pub ticket: i64,

    /// Response speed score, 1-5.
    #[arg(long = "response-speed")]
    pub response_speed: u8,

    /// Service attitude score, 1-5.
    #[arg(long = "service-attitude")]
    pub service_attitude: u8,

    /// Overall satisfaction score, 1-5.
    #[arg(long)]
    pub satisfaction: u8,
}

#[derive(Debug, Serialize)]
struct FeedbackOutput {
    ticket: i64,
    feedback: i64,
    satisfaction: u8,
}

pub fn run_feedback(
    args: &FeedbackArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    let feedback = lifecycle::leave_feedback(
        &mut store,
        args.ticket,
        FeedbackScores {
            response_speed: args.response_speed,
            service_attitude: args.service_attitude,
            satisfaction: args.satisfaction,
        },
    )
    .map_err(|e| fail(output, &e))?;

    let result = FeedbackOutput {
        ticket: args.ticket,
        feedback: feedback.id,
        satisfaction: feedback.satisfaction,
    };
    render(output, &result, |v, w| {
        writeln!(w, "feedback recorded for ticket {}; ticket reviewed", v.ticket)
    })
}
