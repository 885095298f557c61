//! `grc task` command - compliance task management

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
use crate::core::store::TaskFilter;
use crate::entities::task::{Task, TaskStatus};

#[derive(Subcommand, Debug)]
pub enum TaskCommands {
    /// Create a new task
    New(NewArgs),

    /// List tasks
    List(ListArgs),

    /// Show a task's details
    Show {
        /// Task ID or short ID (TASK@N)
        id: String,
    },

    /// Change task fields
    Edit(EditArgs),

    /// Set a task's status (any status to any status)
    Status {
        /// Task ID or short ID (TASK@N)
        id: String,

        /// New status (todo, in_progress, in_review, completed, overdue, cancelled)
        status: TaskStatus,
    },

    /// Delete a task
    Delete {
        /// Task ID or short ID (TASK@N)
        id: String,

        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },

    /// Flag open tasks past their due date as OVERDUE
    Sweep {
        /// Treat this date as today (YYYY-MM-DD)
        #[arg(long, value_parser = parse_date)]
        on: Option<NaiveDate>,
    },
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Task title
    #[arg(long, short = 't')]
    pub title: String,

    /// Longer description
    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Priority (low/medium/high/critical)
    #[arg(long, short = 'p', default_value = "medium")]
    pub priority: Priority,

    /// Person doing the work
    #[arg(long, short = 'a')]
    pub assignee: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub due: Option<NaiveDate>,

    /// Control this task works toward (CODE:REF or CTRL@N)
    #[arg(long)]
    pub control: Option<String>,

    /// Risk this task treats (RISK@N)
    #[arg(long)]
    pub risk: Option<String>,

    /// CAPA this task carries out (CAPA@N)
    #[arg(long)]
    pub capa: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Task ID or short ID (TASK@N)
    pub id: String,

    #[arg(long, short = 't')]
    pub title: Option<String>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, short = 'p')]
    pub priority: Option<Priority>,

    #[arg(long, short = 'a')]
    pub assignee: Option<String>,

    /// Due date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, conflicts_with = "clear_due")]
    pub due: Option<NaiveDate>,

    /// Remove the due date
    #[arg(long)]
    pub clear_due: bool,

    #[arg(long)]
    pub control: Option<String>,

    #[arg(long)]
    pub risk: Option<String>,

    #[arg(long)]
    pub capa: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's')]
    pub status: Option<TaskStatus>,

    /// Filter by assignee
    #[arg(long, short = 'a')]
    pub assignee: Option<String>,

    /// Only tasks linked to this control
    #[arg(long)]
    pub control: Option<String>,

    /// Only tasks linked to this risk
    #[arg(long)]
    pub risk: Option<String>,

    /// Only tasks linked to this CAPA
    #[arg(long)]
    pub capa: Option<String>,

    /// Hide completed and cancelled tasks
    #[arg(long)]
    pub open: bool,

    /// Columns to display
    #[arg(long, value_delimiter = ',')]
    pub columns: Vec<String>,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show count only
    #[arg(long)]
    pub count: bool,
}

const TASK_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("title", "TITLE", 44),
    ColumnDef::new("status", "STATUS", 12),
    ColumnDef::new("priority", "PRIORITY", 9),
    ColumnDef::new("assignee", "ASSIGNEE", 16),
    ColumnDef::new("due", "DUE", 11),
];

pub fn run(cmd: TaskCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        TaskCommands::New(args) => run_new(args, global),
        TaskCommands::List(args) => run_list(args, global),
        TaskCommands::Show { id } => run_show(&id, global),
        TaskCommands::Edit(args) => run_edit(args, global),
        TaskCommands::Status { id, status } => run_status(&id, status, global),
        TaskCommands::Delete { id, yes } => run_delete(&id, yes, global),
        TaskCommands::Sweep { on } => run_sweep(on, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditTasks)?;

    let mut task = Task::new(args.title, ws.user());
    task.description = args.description;
    task.priority = args.priority;
    task.assignee = args.assignee;
    task.due_date = args.due;
    task.control_id = ws.resolve_opt(args.control.as_deref(), EntityPrefix::Ctrl)?;
    task.risk_id = ws.resolve_opt(args.risk.as_deref(), EntityPrefix::Risk)?;
    task.capa_id = ws.resolve_opt(args.capa.as_deref(), EntityPrefix::Capa)?;

    let short_id = ws.store.insert_task(&task).into_diagnostic()?;

    if global.format == OutputFormat::Id {
        println!("{}", task.id);
    } else {
        success(
            global,
            format!("Created task {}: {}", style(&short_id).cyan(), task.title),
        );
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let filter = TaskFilter {
        status: args.status,
        assignee: args.assignee,
        control_id: ws.resolve_opt(args.control.as_deref(), EntityPrefix::Ctrl)?,
        risk_id: ws.resolve_opt(args.risk.as_deref(), EntityPrefix::Risk)?,
        capa_id: ws.resolve_opt(args.capa.as_deref(), EntityPrefix::Capa)?,
        open_only: args.open,
    };
    let mut tasks = ws.store.list_tasks(&filter).into_diagnostic()?;
    if let Some(limit) = args.limit {
        tasks.truncate(limit);
    }

    if args.count {
        println!("{}", tasks.len());
        return Ok(());
    }

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&tasks, global.format),
        _ => {}
    }

    let now = today();
    let short_ids = ws.store.short_ids(EntityPrefix::Task).into_diagnostic()?;
    let rows = tasks
        .iter()
        .map(|t| {
            TableRow::new(t.id.to_string(), &short_ids)
                .cell("title", CellValue::Text(t.title.clone()))
                .cell("status", CellValue::TaskStatus(t.status))
                .cell("priority", CellValue::Priority(t.priority))
                .cell("assignee", CellValue::opt_text(t.assignee.as_deref()))
                .cell("due", CellValue::opt_date(t.due_date, t.is_past_due(now)))
        })
        .collect();

    let visible: Vec<&str> = args.columns.iter().map(String::as_str).collect();
    TableFormatter::new(TASK_COLUMNS, "task", "TASK").output(
        rows,
        global.format.or(OutputFormat::Tsv),
        &visible,
    );
    Ok(())
}

fn run_show(reference: &str, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let id = ws.resolve(reference, EntityPrefix::Task)?;
    let task = ws.store.get_task(&id).into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&task, global.format),
        OutputFormat::Id => {
            println!("{}", task.id);
            return Ok(());
        }
        _ => {}
    }

    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {}",
        style("ID").bold(),
        style(ws.display_id(&task.id)).cyan()
    );
    println!("{}: {}", style("Title").bold(), style(&task.title).yellow());
    println!("{}: {}", style("Status").bold(), task.status);
    println!("{}: {}", style("Priority").bold(), task.priority);
    println!(
        "{}: {}",
        style("Assignee").bold(),
        or_dash(task.assignee.as_deref())
    );
    if let Some(due) = task.due_date {
        let late = if task.is_past_due(today()) {
            style(" (past due)").red().to_string()
        } else {
            String::new()
        };
        println!("{}: {}{}", style("Due").bold(), due, late);
    }
    if let Some(control_id) = &task.control_id {
        let label = ws
            .store
            .get_control(control_id)
            .map(|c| c.qualified_ref())
            .unwrap_or_else(|_| control_id.to_string());
        println!("{}: {}", style("Control").bold(), style(label).cyan());
    }
    if let Some(risk_id) = &task.risk_id {
        println!("{}: {}", style("Risk").bold(), style(ws.display_id(risk_id)).cyan());
    }
    if let Some(capa_id) = &task.capa_id {
        println!("{}: {}", style("CAPA").bold(), style(ws.display_id(capa_id)).cyan());
    }
    println!("{}", style("─".repeat(60)).dim());
    if let Some(description) = &task.description {
        println!();
        println!("{}", description.trim());
    }
    println!();
    println!(
        "{} {} | {} {}",
        style("Created:").dim(),
        task.created.format("%Y-%m-%d %H:%M"),
        style("By:").dim(),
        task.author
    );
    Ok(())
}

fn run_edit(args: EditArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditTasks)?;
    let id = ws.resolve(&args.id, EntityPrefix::Task)?;
    let mut task = ws.store.get_task(&id).into_diagnostic()?;

    if let Some(title) = args.title {
        task.title = title;
    }
    if let Some(description) = args.description {
        task.description = Some(description);
    }
    if let Some(priority) = args.priority {
        task.priority = priority;
    }
    if let Some(assignee) = args.assignee {
        task.assignee = Some(assignee);
    }
    if args.clear_due {
        task.due_date = None;
    } else if args.due.is_some() {
        task.due_date = args.due;
    }
    if let Some(control) = ws.resolve_opt(args.control.as_deref(), EntityPrefix::Ctrl)? {
        task.control_id = Some(control);
    }
    if let Some(risk) = ws.resolve_opt(args.risk.as_deref(), EntityPrefix::Risk)? {
        task.risk_id = Some(risk);
    }
    if let Some(capa) = ws.resolve_opt(args.capa.as_deref(), EntityPrefix::Capa)? {
        task.capa_id = Some(capa);
    }

    ws.store.update_task(&task).into_diagnostic()?;
    success(
        global,
        format!("Updated task {}", style(ws.display_id(&task.id)).cyan()),
    );
    Ok(())
}

fn run_status(reference: &str, status: TaskStatus, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditTasks)?;
    let id = ws.resolve(reference, EntityPrefix::Task)?;
    ws.store.set_task_status(&id, status).into_diagnostic()?;
    success(
        global,
        format!(
            "{} is now {}",
            style(ws.display_id(&id)).cyan(),
            style(status).yellow()
        ),
    );
    Ok(())
}

fn run_delete(reference: &str, yes: bool, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditTasks)?;
    let id = ws.resolve(reference, EntityPrefix::Task)?;
    let task = ws.store.get_task(&id).into_diagnostic()?;

    if !confirm(&format!("Delete task '{}'?", task.title), yes)? {
        println!("Cancelled");
        return Ok(());
    }
    let label = ws.display_id(&id);
    ws.store.delete_task(&id).into_diagnostic()?;
    success(global, format!("Deleted task {}", style(label).cyan()));
    Ok(())
}

fn run_sweep(on: Option<NaiveDate>, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditTasks)?;
    let date = on.unwrap_or_else(today);
    let changed = ws.store.mark_overdue(date).into_diagnostic()?;
    success(global, format!("Marked {} task(s) overdue", changed));
    Ok(())
}
