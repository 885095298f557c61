//! `grc control` command - controls and their implementation records

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{print_record, success, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::access::Action;
use crate::core::identity::EntityPrefix;
use crate::core::store::{ControlFilter, TaskFilter};
use crate::entities::implementation::ImplementationStatus;

#[derive(Subcommand, Debug)]
pub enum ControlCommands {
    /// List controls
    List(ListArgs),

    /// Show a control with its implementation record and linked tasks
    Show {
        /// Control reference (CODE:REF, CTRL@N, or full ID)
        control: String,
    },

    /// Record how a control is implemented
    Implement {
        /// Control reference (CODE:REF, CTRL@N, or full ID)
        control: String,

        /// Implementation status
        #[arg(long, short = 's')]
        status: ImplementationStatus,

        /// Person accountable for the control
        #[arg(long)]
        owner: Option<String>,

        /// How the control is met
        #[arg(long)]
        notes: Option<String>,

        /// Pointer to evidence (document, ticket, URL)
        #[arg(long)]
        evidence: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Framework code
    #[arg(long = "framework", short = 'F')]
    pub framework: Option<String>,

    /// Clause or control ref prefix (e.g., "A.5")
    #[arg(long)]
    pub clause: Option<String>,

    /// Search in title and objective
    #[arg(long)]
    pub search: Option<String>,

    /// Filter by implementation status
    #[arg(long, short = 's')]
    pub status: Option<ImplementationStatus>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show count only
    #[arg(long)]
    pub count: bool,
}

const CONTROL_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("ref", "REF", 28),
    ColumnDef::new("title", "TITLE", 56),
    ColumnDef::new("status", "STATUS", 16),
];

pub fn run(cmd: ControlCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ControlCommands::List(args) => run_list(args, global),
        ControlCommands::Show { control } => run_show(&control, global),
        ControlCommands::Implement {
            control,
            status,
            owner,
            notes,
            evidence,
        } => run_implement(&control, status, owner, notes, evidence, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let filter = ControlFilter {
        framework: args.framework,
        clause_prefix: args.clause,
        search: args.search,
        status: args.status,
    };
    let mut controls = ws.store.list_controls(&filter).into_diagnostic()?;
    if let Some(limit) = args.limit {
        controls.truncate(limit);
    }

    if args.count {
        println!("{}", controls.len());
        return Ok(());
    }

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&controls, global.format),
        _ => {}
    }

    let short_ids = ws.store.short_ids(EntityPrefix::Ctrl).into_diagnostic()?;
    let rows = controls
        .iter()
        .map(|c| {
            TableRow::new(c.control.id.to_string(), &short_ids)
                .cell("ref", CellValue::ShortId(c.qualified_ref()))
                .cell("title", CellValue::Text(c.control.title.clone()))
                .cell("status", CellValue::ImplStatus(c.implementation_status))
        })
        .collect();
    TableFormatter::new(CONTROL_COLUMNS, "control", "CTRL").output(
        rows,
        global.format.or(OutputFormat::Tsv),
        &[],
    );
    Ok(())
}

fn run_show(reference: &str, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let id = ws.resolve(reference, EntityPrefix::Ctrl)?;
    let view = ws.store.get_control(&id).into_diagnostic()?;
    let implementation = ws.store.get_implementation(&id).into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let record = serde_json::json!({
                "control": view,
                "implementation": implementation,
            });
            return print_record(&record, global.format);
        }
        _ => {}
    }

    let clause = ws.store.get_clause(&view.control.clause_id).into_diagnostic()?;
    let tasks = ws
        .store
        .list_tasks(&TaskFilter {
            control_id: Some(id.clone()),
            ..Default::default()
        })
        .into_diagnostic()?;

    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {} ({})",
        style("Control").bold(),
        style(view.qualified_ref()).cyan(),
        style(ws.display_id(&id)).dim()
    );
    println!("{}: {}", style("Title").bold(), style(&view.control.title).yellow());
    println!(
        "{}: {} {}",
        style("Clause").bold(),
        clause.reference,
        clause.title
    );
    println!(
        "{}: {}",
        style("Status").bold(),
        view.implementation_status
    );
    if let Some(record) = &implementation {
        if let Some(owner) = &record.owner {
            println!("{}: {}", style("Owner").bold(), owner);
        }
        if let Some(evidence) = &record.evidence {
            println!("{}: {}", style("Evidence").bold(), evidence);
        }
        println!(
            "{}: {} by {}",
            style("Updated").bold(),
            record.updated.format("%Y-%m-%d %H:%M"),
            record.updated_by
        );
    }
    println!("{}", style("─".repeat(60)).dim());

    if let Some(objective) = &view.control.objective {
        println!();
        println!("{}", style("Objective:").bold());
        println!("{}", objective.trim());
    }
    if let Some(guidance) = &view.control.guidance {
        println!();
        println!("{}", style("Guidance:").bold());
        println!("{}", guidance.trim());
    }
    if let Some(notes) = implementation.as_ref().and_then(|r| r.notes.as_ref()) {
        println!();
        println!("{}", style("Implementation notes:").bold());
        println!("{}", notes.trim());
    }
    if !tasks.is_empty() {
        println!();
        println!("{}", style("Tasks:").bold());
        for task in &tasks {
            println!(
                "  {} {} [{}]",
                style(ws.display_id(&task.id)).cyan(),
                task.title,
                task.status
            );
        }
    }
    Ok(())
}

fn run_implement(
    reference: &str,
    status: ImplementationStatus,
    owner: Option<String>,
    notes: Option<String>,
    evidence: Option<String>,
    global: &GlobalOpts,
) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditRecords)?;
    let id = ws.resolve(reference, EntityPrefix::Ctrl)?;
    let record = ws
        .store
        .set_implementation(&id, status, owner, notes, evidence, &ws.user())
        .into_diagnostic()?;
    let view = ws.store.get_control(&id).into_diagnostic()?;

    success(
        global,
        format!(
            "{} is now {}",
            style(view.qualified_ref()).cyan(),
            style(record.status).yellow()
        ),
    );
    Ok(())
}
