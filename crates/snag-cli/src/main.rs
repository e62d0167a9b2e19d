#![forbid(unsafe_code)]

mod cmd;
mod output;
mod workspace;

use clap::{Parser, Subcommand};
use output::OutputMode;
use std::env;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "snag: property-maintenance repair ticket tracker",
    long_about = None
)]
struct Cli {
    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    const fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Initialize a snag workspace in the current directory")]
    Init,

    #[command(next_help_heading = "Lifecycle", about = "Submit a ticket as a resident")]
    Submit(cmd::submit::SubmitArgs),

    #[command(about = "Log a submitted ticket as a dispatcher")]
    Intake(cmd::intake::IntakeArgs),

    #[command(about = "Assign a logged ticket to a capable available worker")]
    Assign(cmd::assign::AssignArgs),

    #[command(about = "File a repair record and release the worker")]
    Complete(cmd::complete::CompleteArgs),

    #[command(about = "Record resident feedback on a repaired ticket")]
    Feedback(cmd::feedback::FeedbackArgs),

    #[command(next_help_heading = "Queries", about = "Show one ticket")]
    Show(cmd::show::ShowArgs),

    #[command(about = "List tickets")]
    List(cmd::list::ListArgs),

    #[command(next_help_heading = "Reference data", about = "Manage workers")]
    Worker {
        #[command(subcommand)]
        command: cmd::setup::WorkerCommand,
    },

    #[command(name = "fault-type", about = "Manage fault types")]
    FaultType {
        #[command(subcommand)]
        command: cmd::setup::FaultTypeCommand,
    },

    #[command(about = "Register a dispatcher")]
    Dispatcher(cmd::setup::DispatcherAddArgs),

    #[command(about = "Register a resident")]
    Resident(cmd::setup::ResidentAddArgs),

    #[command(about = "Open, annotate, or close complaints")]
    Complaint {
        #[command(subcommand)]
        command: cmd::complaint::ComplaintCommand,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("SNAG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "snag=debug,info"
        } else {
            "snag=info,warn"
        })
    });

    let format = env::var("SNAG_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let output = cli.output_mode();
    let project_root = std::env::current_dir()?;

    match cli.command {
        Commands::Init => cmd::init::run_init(output, &project_root),
        Commands::Submit(ref args) => cmd::submit::run_submit(args, output, &project_root),
        Commands::Intake(ref args) => cmd::intake::run_intake(args, output, &project_root),
        Commands::Assign(ref args) => cmd::assign::run_assign(args, output, &project_root),
        Commands::Complete(ref args) => cmd::complete::run_complete(args, output, &project_root),
        Commands::Feedback(ref args) => cmd::feedback::run_feedback(args, output, &project_root),
        Commands::Show(ref args) => cmd::show::run_show(args, output, &project_root),
        Commands::List(ref args) => cmd::list::run_list(args, output, &project_root),
        Commands::Worker { ref command } => cmd::setup::run_worker(command, output, &project_root),
        Commands::FaultType { ref command } => {
            cmd::setup::run_fault_type(command, output, &project_root)
        }
        Commands::Dispatcher(ref args) => {
            cmd::setup::run_dispatcher_add(args, output, &project_root)
        }
        Commands::Resident(ref args) => cmd::setup::run_resident_add(args, output, &project_root),
        Commands::Complaint { ref command } => {
            cmd::complaint::run_complaint(command, output, &project_root)
        }
    }
}
