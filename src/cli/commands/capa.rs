//! `grc capa` command - corrective and preventive actions

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{confirm, or_dash, parse_date, print_record, success, today, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::access::Action;
use crate::core::entity::Priority;
use crate::core::identity::EntityPrefix;
use crate::core::store::{CapaFilter, TaskFilter};
use crate::entities::capa::{Capa, CapaSource, CapaStatus, CapaType};

#[derive(Subcommand, Debug)]
pub enum CapaCommands {
    /// Open a new CAPA
    New(NewArgs),

    /// List CAPAs
    List(ListArgs),

    /// Show a CAPA's details
    Show {
        /// CAPA ID or short ID (CAPA@N)
        id: String,
    },

    /// Change CAPA fields
    Edit(EditArgs),

    /// Close a CAPA
    Close {
        /// CAPA ID or short ID (CAPA@N)
        id: String,

        /// Closure date (default: today)
        #[arg(long, value_parser = parse_date)]
        on: Option<NaiveDate>,
    },

    /// Delete a CAPA
    Delete {
        /// CAPA ID or short ID (CAPA@N)
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

    /// corrective or preventive
    #[arg(long = "type", short = 'T', default_value = "corrective")]
    pub capa_type: CapaType,

    /// audit, incident, risk, control_failure, or complaint
    #[arg(long, short = 's', default_value = "audit")]
    pub source: CapaSource,

    #[arg(long, short = 'p', default_value = "medium")]
    pub priority: Priority,

    /// What went wrong or could go wrong
    #[arg(long)]
    pub problem: Option<String>,

    #[arg(long)]
    pub owner: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub due: Option<NaiveDate>,

    /// Risk addressed (RISK@N)
    #[arg(long)]
    pub risk: Option<String>,

    /// Deficient control (CODE:REF or CTRL@N)
    #[arg(long)]
    pub control: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// CAPA ID or short ID (CAPA@N)
    pub id: String,

    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// open, investigation, implementation, or verification
    #[arg(long)]
    pub status: Option<CapaStatus>,

    #[arg(long, short = 'p')]
    pub priority: Option<Priority>,

    #[arg(long)]
    pub problem: Option<String>,

    #[arg(long)]
    pub root_cause: Option<String>,

    #[arg(long)]
    pub owner: Option<String>,

    #[arg(long, value_parser = parse_date)]
    pub due: Option<NaiveDate>,

    #[arg(long)]
    pub risk: Option<String>,

    #[arg(long)]
    pub control: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's')]
    pub status: Option<CapaStatus>,

    /// Hide closed CAPAs
    #[arg(long)]
    pub open: bool,

    /// Only CAPAs open past their due date
    #[arg(long)]
    pub overdue: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show count only
    #[arg(long)]
    pub count: bool,
}

const CAPA_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("title", "TITLE", 40),
    ColumnDef::new("type", "TYPE", 11),
    ColumnDef::new("source", "SOURCE", 16),
    ColumnDef::new("status", "STATUS", 15),
    ColumnDef::new("priority", "PRIORITY", 9),
    ColumnDef::new("due", "DUE", 11),
];

pub fn run(cmd: CapaCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CapaCommands::New(args) => run_new(args, global),
        CapaCommands::List(args) => run_list(args, global),
        CapaCommands::Show { id } => run_show(&id, global),
        CapaCommands::Edit(args) => run_edit(args, global),
        CapaCommands::Close { id, on } => run_close(&id, on, global),
        CapaCommands::Delete { id, yes } => run_delete(&id, yes, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditRecords)?;

    let mut capa = Capa::new(args.title, args.capa_type, args.source, ws.user());
    capa.priority = args.priority;
    capa.problem_statement = args.problem;
    capa.owner = args.owner;
    capa.due_date = args.due;
    capa.risk_id = ws.resolve_opt(args.risk.as_deref(), EntityPrefix::Risk)?;
    capa.control_id = ws.resolve_opt(args.control.as_deref(), EntityPrefix::Ctrl)?;

    let short_id = ws.store.insert_capa(&capa).into_diagnostic()?;
    if global.format == OutputFormat::Id {
        println!("{}", capa.id);
    } else {
        success(
            global,
            format!("Opened CAPA {}: {}", style(&short_id).cyan(), capa.title),
        );
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let now = today();
    let filter = CapaFilter {
        status: args.status,
        open_only: args.open,
        overdue_on: args.overdue.then_some(now),
    };
    let mut capas = ws.store.list_capas(&filter).into_diagnostic()?;
    if let Some(limit) = args.limit {
        capas.truncate(limit);
    }

    if args.count {
        println!("{}", capas.len());
        return Ok(());
    }

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&capas, global.format),
        _ => {}
    }

    let short_ids = ws.store.short_ids(EntityPrefix::Capa).into_diagnostic()?;
    let rows = capas
        .iter()
        .map(|c| {
            TableRow::new(c.id.to_string(), &short_ids)
                .cell("title", CellValue::Text(c.title.clone()))
                .cell("type", CellValue::Text(c.capa_type.to_string()))
                .cell("source", CellValue::Text(c.source.to_string()))
                .cell("status", CellValue::Text(c.status.to_string()))
                .cell("priority", CellValue::Priority(c.priority))
                .cell("due", CellValue::opt_date(c.due_date, c.is_overdue(now)))
        })
        .collect();
    TableFormatter::new(CAPA_COLUMNS, "CAPA", "CAPA").output(
        rows,
        global.format.or(OutputFormat::Tsv),
        &[],
    );
    Ok(())
}

fn run_show(reference: &str, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let id = ws.resolve(reference, EntityPrefix::Capa)?;
    let capa = ws.store.get_capa(&id).into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&capa, global.format),
        _ => {}
    }

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(ws.display_id(&capa.id)).cyan());
    println!("{}: {}", style("Title").bold(), style(&capa.title).yellow());
    println!("{}: {}", style("Type").bold(), capa.capa_type);
    println!("{}: {}", style("Source").bold(), capa.source);
    println!("{}: {}", style("Status").bold(), capa.status);
    println!("{}: {}", style("Priority").bold(), capa.priority);
    println!("{}: {}", style("Owner").bold(), or_dash(capa.owner.as_deref()));
    if let Some(due) = capa.due_date {
        let late = if capa.is_overdue(today()) {
            style(" (overdue)").red().to_string()
        } else {
            String::new()
        };
        println!("{}: {}{}", style("Due").bold(), due, late);
    }
    if let (Some(date), Some(by)) = (capa.closed_date, &capa.closed_by) {
        println!("{}: {} by {}", style("Closed").bold(), date, by);
    }
    if let Some(risk_id) = &capa.risk_id {
        println!("{}: {}", style("Risk").bold(), style(ws.display_id(risk_id)).cyan());
    }
    if let Some(control_id) = &capa.control_id {
        let label = ws
            .store
            .get_control(control_id)
            .map(|c| c.qualified_ref())
            .unwrap_or_else(|_| control_id.to_string());
        println!("{}: {}", style("Control").bold(), style(label).cyan());
    }
    println!("{}", style("─".repeat(60)).dim());

    if let Some(problem) = &capa.problem_statement {
        println!();
        println!("{}", style("Problem Statement:").bold());
        println!("{}", problem.trim());
    }
    if let Some(cause) = &capa.root_cause {
        println!();
        println!("{}", style("Root Cause:").bold());
        println!("{}", cause.trim());
    }

    let tasks = ws
        .store
        .list_tasks(&TaskFilter {
            capa_id: Some(capa.id.clone()),
            ..Default::default()
        })
        .into_diagnostic()?;
    if !tasks.is_empty() {
        println!();
        println!("{}", style("Actions:").bold());
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

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditRecords)?;
    let id = ws.resolve(&args.id, EntityPrefix::Capa)?;
    let mut capa = ws.store.get_capa(&id).into_diagnostic()?;

    if let Some(status) = args.status {
        if status == CapaStatus::Closed {
            return Err(miette::miette!(
                help = format!("run `grc capa close {}`", args.id),
                "closing records the closure date and closer; use the close command"
            ));
        }
        capa.reopen_as(status);
    }
    if let Some(title) = args.title {
        capa.title = title;
    }
    if let Some(priority) = args.priority {
        capa.priority = priority;
    }
    if let Some(problem) = args.problem {
        capa.problem_statement = Some(problem);
    }
    if let Some(cause) = args.root_cause {
        capa.root_cause = Some(cause);
    }
    if let Some(owner) = args.owner {
        capa.owner = Some(owner);
    }
    if args.due.is_some() {
        capa.due_date = args.due;
    }
    if let Some(risk) = ws.resolve_opt(args.risk.as_deref(), EntityPrefix::Risk)? {
        capa.risk_id = Some(risk);
    }
    if let Some(control) = ws.resolve_opt(args.control.as_deref(), EntityPrefix::Ctrl)? {
        capa.control_id = Some(control);
    }

    ws.store.update_capa(&capa).into_diagnostic()?;
    success(
        global,
        format!("Updated CAPA {}", style(ws.display_id(&capa.id)).cyan()),
    );
    Ok(())
}

fn run_close(reference: &str, on: Option<NaiveDate>, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditRecords)?;
    let id = ws.resolve(reference, EntityPrefix::Capa)?;
    let capa = ws
        .store
        .close_capa(&id, on.unwrap_or_else(today), &ws.user())
        .into_diagnostic()?;
    success(
        global,
        format!(
            "Closed CAPA {} on {}",
            style(ws.display_id(&capa.id)).cyan(),
            capa.closed_date.map(|d| d.to_string()).unwrap_or_default()
        ),
    );
    Ok(())
}

fn run_delete(reference: &str, yes: bool, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditRecords)?;
    let id = ws.resolve(reference, EntityPrefix::Capa)?;
    let capa = ws.store.get_capa(&id).into_diagnostic()?;

    if !confirm(&format!("Delete CAPA '{}'?", capa.title), yes)? {
        println!("Cancelled");
        return Ok(());
    }
    let label = ws.display_id(&id);
    ws.store.delete_capa(&id).into_diagnostic()?;
    success(global, format!("Deleted CAPA {}", style(label).cyan()));
    Ok(())
}
