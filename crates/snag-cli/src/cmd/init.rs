//! `snag init` — create the `.snag` workspace and store in the current
//! directory.

use std::io::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::output::{OutputMode, render};
use crate::workspace::Workspace;

#[derive(Debug, Serialize)]
struct InitOutput {
    ok: bool,
    snag_dir: String,
}

pub fn run_init(output: OutputMode, project_root: &Path) -> anyhow::Result<()> {
    let workspace = Workspace::init(project_root)?;
    let result = InitOutput {
        ok: true,
        snag_dir: workspace.snag_dir.display().to_string(),
    };
    render(output, &result, |v, w| {
        writeln!(w, "initialized snag workspace at {}", v.snag_dir)
    })
}
