//! Reference-data commands: workers, fault types, dispatchers, residents.

use std::collections::BTreeSet;
use std::io::Write as _;
use std::path::Path;

use clap::{Args, Subcommand};
use serde::Serialize;
use snag_core::error::{Entity, Error};
use snag_core::model::Worker;
use snag_core::store::Store;

use crate::output::{OutputMode, fail, render};
use crate::workspace::Workspace;

#[derive(Subcommand, Debug)]
pub enum WorkerCommand {
    /// Register a worker with their capability set.
    Add(WorkerAddArgs),
    /// List workers in ascending-id order.
    List(WorkerListArgs),
}

#[derive(Args, Debug)]
pub struct WorkerAddArgs {
    /// Worker name.
    #[arg(long)]
    pub name: String,

    /// Fault type ids this worker can repair, comma separated.
    #[arg(long, value_delimiter = ',', required = true)]
    pub capabilities: Vec<i64>,
}

#[derive(Args, Debug)]
pub struct WorkerListArgs {
    /// Only list workers currently available for dispatch.
    #[arg(long)]
    pub available: bool,
}

#[derive(Subcommand, Debug)]
pub enum FaultTypeCommand {
    /// Register a fault type.
    Add {
        /// Fault type name.
        #[arg(long)]
        name: String,
    },
    /// List registered fault types.
    List,
}

#[derive(Debug, Serialize)]
struct CreatedOutput {
    id: i64,
    name: String,
}

#[derive(Debug, Serialize)]
struct WorkerListOutput {
    workers: Vec<Worker>,
}

pub fn run_worker(
    command: &WorkerCommand,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    match command {
        WorkerCommand::Add(args) => {
            let capabilities: BTreeSet<i64> = args.capabilities.iter().copied().collect();
            let worker = store
                .transaction(|tx| {
                    for fault_type in &capabilities {
                        if tx.get_fault_type(*fault_type)?.is_none() {
                            return Err(Error::NotFound {
                                entity: Entity::FaultType,
                                id: *fault_type,
                            });
                        }
                    }
                    tx.create_worker(&args.name, &capabilities)
                })
                .map_err(|e| fail(output, &e))?;

            let result = CreatedOutput {
                id: worker.id,
                name: worker.name,
            };
            render(output, &result, |v, w| {
                writeln!(w, "worker {} registered (id {})", v.name, v.id)
            })
        }
        WorkerCommand::List(args) => {
            let workers = store
                .transaction(|tx| tx.list_workers(args.available))
                .map_err(|e| fail(output, &e))?;
            let result = WorkerListOutput { workers };
            render(output, &result, |v, w| {
                for worker in &v.workers {
                    let capabilities: Vec<String> =
                        worker.capabilities.iter().map(ToString::to_string).collect();
                    writeln!(
                        w,
                        "{:>4}  {:<20}  {}  [{}]",
                        worker.id,
                        worker.name,
                        if worker.available { "idle" } else { "busy" },
                        capabilities.join(",")
                    )?;
                }
                Ok(())
            })
        }
    }
}

pub fn run_fault_type(
    command: &FaultTypeCommand,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    match command {
        FaultTypeCommand::Add { name } => {
            let fault_type = store
                .transaction(|tx| tx.create_fault_type(name))
                .map_err(|e| fail(output, &e))?;
            let result = CreatedOutput {
                id: fault_type.id,
                name: fault_type.name,
            };
            render(output, &result, |v, w| {
                writeln!(w, "fault type {} registered (id {})", v.name, v.id)
            })
        }
        FaultTypeCommand::List => {
            let fault_types = store
                .transaction(|tx| tx.list_fault_types())
                .map_err(|e| fail(output, &e))?;
            #[derive(Debug, Serialize)]
            struct FaultTypesOutput {
                fault_types: Vec<snag_core::model::FaultType>,
            }
            let result = FaultTypesOutput { fault_types };
            render(output, &result, |v, w| {
                for fault_type in &v.fault_types {
                    writeln!(w, "{:>4}  {}", fault_type.id, fault_type.name)?;
                }
                Ok(())
            })
        }
    }
}

#[derive(Args, Debug)]
pub struct DispatcherAddArgs {
    /// Dispatcher name.
    #[arg(long)]
    pub name: String,
}

pub fn run_dispatcher_add(
    args: &DispatcherAddArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    let dispatcher = store
        .transaction(|tx| tx.create_dispatcher(&args.name))
        .map_err(|e| fail(output, &e))?;
    let result = CreatedOutput {
        id: dispatcher.id,
        name: dispatcher.name,
    };
    render(output, &result, |v, w| {
        writeln!(w, "dispatcher {} registered (id {})", v.name, v.id)
    })
}

#[derive(Args, Debug)]
pub struct ResidentAddArgs {
    /// Resident name.
    #[arg(long)]
    pub name: String,

    /// Resident address (building-unit).
    #[arg(long)]
    pub address: String,
}

pub fn run_resident_add(
    args: &ResidentAddArgs,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let workspace = Workspace::discover(project_root)?;
    let mut store = workspace.open_store()?;

    let resident = store
        .transaction(|tx| tx.create_resident(&args.name, &args.address))
        .map_err(|e| fail(output, &e))?;
    let result = CreatedOutput {
        id: resident.id,
        name: resident.name,
    };
    render(output, &result, |v, w| {
        writeln!(w, "resident {} registered (id {})", v.name, v.id)
    })
}
