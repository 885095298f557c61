//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    board::BoardCommands, capa::CapaCommands, completions::CompletionsArgs,
    control::ControlCommands, framework::FrameworkCommands, init::InitArgs,
    member::MemberCommands, report::ReportCommands, risk::RiskCommands, seed::SeedArgs,
    snapshot::SnapshotCommands, status::StatusArgs, task::TaskCommands,
    training::TrainingCommands,
};

#[derive(Parser)]
#[command(name = "grc")]
#[command(author, version, about = "GRC Workbench")]
#[command(long_about = "Track regulatory frameworks, control implementation, risks, CAPAs, training, and compliance tasks in a project-local database.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Project root (default: auto-detect by finding .grc/)
    #[arg(long, global = true)]
    pub project: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new workspace
    Init(InitArgs),

    /// Load framework catalogs into the database
    Seed(SeedArgs),

    /// Seeded frameworks and their clause trees
    #[command(subcommand, alias = "fw")]
    Framework(FrameworkCommands),

    /// Controls and their implementation status
    #[command(subcommand, alias = "ctrl")]
    Control(ControlCommands),

    /// Compliance task management
    #[command(subcommand)]
    Task(TaskCommands),

    /// Kanban board over tasks
    #[command(subcommand)]
    Board(BoardCommands),

    /// Risk register
    #[command(subcommand)]
    Risk(RiskCommands),

    /// Corrective/preventive action management
    #[command(subcommand)]
    Capa(CapaCommands),

    /// Training programs
    #[command(subcommand, alias = "trn")]
    Training(TrainingCommands),

    /// Workspace members and roles
    #[command(subcommand)]
    Member(MemberCommands),

    /// Export, publish, and import framework snapshots
    #[command(subcommand)]
    Snapshot(SnapshotCommands),

    /// Show the workspace dashboard
    Status(StatusArgs),

    /// Generate reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Automatically detect based on context (yaml for show, tsv for list)
    #[default]
    Auto,
    /// YAML format (full fidelity)
    Yaml,
    /// Tab-separated values (for piping)
    Tsv,
    /// JSON format (for programming)
    Json,
    /// CSV format (for spreadsheets)
    Csv,
    /// Markdown tables
    Md,
    /// Just IDs, one per line
    Id,
}

impl OutputFormat {
    /// Replace `Auto` with the format a command prefers
    pub fn or(self, default: OutputFormat) -> OutputFormat {
        match self {
            OutputFormat::Auto => default,
            f => f,
        }
    }
}
