//! `grc training` command - recurring training programs

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{confirm, or_dash, parse_date, print_record, success, today, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::access::Action;
use crate::core::identity::EntityPrefix;
use crate::entities::training::{Frequency, TrainingProgram, TrainingStatus};

#[derive(Subcommand, Debug)]
pub enum TrainingCommands {
    /// Create a training program
    New(NewArgs),

    /// List programs by next due date
    List {
        /// Include retired programs
        #[arg(long)]
        all: bool,

        /// Only programs due on or before this date (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        due_by: Option<NaiveDate>,
    },

    /// Show a program's details
    Show {
        /// Program ID or short ID (TRN@N)
        id: String,
    },

    /// Record a completed cycle and schedule the next one
    Complete {
        /// Program ID or short ID (TRN@N)
        id: String,

        /// Completion date (default: today)
        #[arg(long, value_parser = parse_date)]
        on: Option<NaiveDate>,
    },

    /// Retire a program so it no longer comes due
    Retire {
        /// Program ID or short ID (TRN@N)
        id: String,
    },

    /// Delete a program
    Delete {
        /// Program ID or short ID (TRN@N)
        id: String,

        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    #[arg(long, short = 't')]
    pub title: String,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// once, monthly, quarterly, or annual
    #[arg(long, default_value = "annual")]
    pub frequency: Frequency,

    /// Required for all staff
    #[arg(long)]
    pub mandatory: bool,

    /// Framework the program supports (e.g., HIPAA)
    #[arg(long = "framework", short = 'F')]
    pub framework: Option<String>,

    /// First due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub due: Option<NaiveDate>,
}

const TRAINING_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("title", "TITLE", 40),
    ColumnDef::new("frequency", "FREQUENCY", 10),
    ColumnDef::new("mandatory", "MANDATORY", 10),
    ColumnDef::new("framework", "FRAMEWORK", 10),
    ColumnDef::new("status", "STATUS", 8),
    ColumnDef::new("next_due", "NEXT DUE", 11),
];

pub fn run(cmd: TrainingCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        TrainingCommands::New(args) => run_new(args, global),
        TrainingCommands::List { all, due_by } => run_list(all, due_by, global),
        TrainingCommands::Show { id } => run_show(&id, global),
        TrainingCommands::Complete { id, on } => run_complete(&id, on, global),
        TrainingCommands::Retire { id } => run_retire(&id, global),
        TrainingCommands::Delete { id, yes } => run_delete(&id, yes, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditRecords)?;

    let mut program = TrainingProgram::new(args.title, args.frequency, ws.user());
    program.description = args.description;
    program.mandatory = args.mandatory;
    program.framework_code = args.framework.map(|c| c.to_uppercase());
    program.next_due = args.due;

    let short_id = ws.store.insert_training(&program).into_diagnostic()?;
    if global.format == OutputFormat::Id {
        println!("{}", program.id);
    } else {
        success(
            global,
            format!("Created training program {}: {}", style(&short_id).cyan(), program.title),
        );
    }
    Ok(())
}

fn run_list(all: bool, due_by: Option<NaiveDate>, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let mut programs = ws.store.list_training().into_diagnostic()?;
    if !all {
        programs.retain(|p| p.status == TrainingStatus::Active);
    }
    if let Some(horizon) = due_by {
        programs.retain(|p| p.is_due_by(horizon));
    }

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&programs, global.format),
        _ => {}
    }

    let now = today();
    let short_ids = ws.store.short_ids(EntityPrefix::Trn).into_diagnostic()?;
    let rows = programs
        .iter()
        .map(|p| {
            let late = p.status == TrainingStatus::Active && p.next_due.is_some_and(|d| d < now);
            TableRow::new(p.id.to_string(), &short_ids)
                .cell("title", CellValue::Text(p.title.clone()))
                .cell("frequency", CellValue::Text(p.frequency.to_string()))
                .cell("mandatory", CellValue::Flag(p.mandatory))
                .cell("framework", CellValue::opt_text(p.framework_code.as_deref()))
                .cell("status", CellValue::Text(p.status.to_string()))
                .cell("next_due", CellValue::opt_date(p.next_due, late))
        })
        .collect();
    TableFormatter::new(TRAINING_COLUMNS, "program", "TRN").output(
        rows,
        global.format.or(OutputFormat::Tsv),
        &[],
    );
    Ok(())
}

fn run_show(reference: &str, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let id = ws.resolve(reference, EntityPrefix::Trn)?;
    let program = ws.store.get_training(&id).into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&program, global.format),
        _ => {}
    }

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(ws.display_id(&program.id)).cyan());
    println!("{}: {}", style("Title").bold(), style(&program.title).yellow());
    println!("{}: {}", style("Frequency").bold(), program.frequency);
    println!(
        "{}: {}",
        style("Mandatory").bold(),
        if program.mandatory { "yes" } else { "no" }
    );
    println!(
        "{}: {}",
        style("Framework").bold(),
        or_dash(program.framework_code.as_deref())
    );
    println!("{}: {}", style("Status").bold(), program.status);
    println!(
        "{}: {}",
        style("Next due").bold(),
        program.next_due.map_or("-".to_string(), |d| d.to_string())
    );
    println!(
        "{}: {}",
        style("Last completed").bold(),
        program.last_completed.map_or("-".to_string(), |d| d.to_string())
    );
    println!("{}", style("─".repeat(60)).dim());
    if let Some(description) = &program.description {
        println!();
        println!("{}", description.trim());
    }
    Ok(())
}

fn run_complete(reference: &str, on: Option<NaiveDate>, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditRecords)?;
    let id = ws.resolve(reference, EntityPrefix::Trn)?;
    let program = ws
        .store
        .complete_training(&id, on.unwrap_or_else(today))
        .into_diagnostic()?;

    let next = match (program.status, program.next_due) {
        (TrainingStatus::Retired, _) => "program retired".to_string(),
        (_, Some(due)) => format!("next due {}", due),
        (_, None) => "no next date".to_string(),
    };
    success(
        global,
        format!(
            "Recorded completion of {} ({})",
            style(ws.display_id(&program.id)).cyan(),
            next
        ),
    );
    Ok(())
}

fn run_retire(reference: &str, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditRecords)?;
    let id = ws.resolve(reference, EntityPrefix::Trn)?;
    let mut program = ws.store.get_training(&id).into_diagnostic()?;
    program.status = TrainingStatus::Retired;
    program.next_due = None;
    ws.store.update_training(&program).into_diagnostic()?;
    success(
        global,
        format!("Retired {}", style(ws.display_id(&program.id)).cyan()),
    );
    Ok(())
}

fn run_delete(reference: &str, yes: bool, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditRecords)?;
    let id = ws.resolve(reference, EntityPrefix::Trn)?;
    let program = ws.store.get_training(&id).into_diagnostic()?;

    if !confirm(&format!("Delete training program '{}'?", program.title), yes)? {
        println!("Cancelled");
        return Ok(());
    }
    let label = ws.display_id(&id);
    ws.store.delete_training(&id).into_diagnostic()?;
    success(global, format!("Deleted training program {}", style(label).cyan()));
    Ok(())
}
