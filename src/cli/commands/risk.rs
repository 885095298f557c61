//! `grc risk` command - risk register

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{confirm, or_dash, parse_rating, print_record, success, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::access::Action;
use crate::core::identity::EntityPrefix;
use crate::core::store::{RiskFilter, TaskFilter};
use crate::entities::risk::{validate_rating, Risk, RiskLevel, RiskStatus, Treatment};

#[derive(Subcommand, Debug)]
pub enum RiskCommands {
    /// Register a new risk
    New(NewArgs),

    /// List risks, highest score first
    List(ListArgs),

    /// Show a risk's details
    Show {
        /// Risk ID or short ID (RISK@N)
        id: String,
    },

    /// Change risk fields
    Edit(EditArgs),

    /// Delete a risk (linked tasks and CAPAs keep existing, unlinked)
    Delete {
        /// Risk ID or short ID (RISK@N)
        id: String,

        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Risk title
    #[arg(long, short = 't')]
    pub title: String,

    /// Likelihood rating (1-5)
    #[arg(long, short = 'l', value_parser = parse_rating)]
    pub likelihood: u8,

    /// Impact rating (1-5)
    #[arg(long, short = 'i', value_parser = parse_rating)]
    pub impact: u8,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    /// Free-form category (e.g., security, privacy, operational)
    #[arg(long, short = 'c')]
    pub category: Option<String>,

    /// Treatment (mitigate/accept/transfer/avoid)
    #[arg(long, default_value = "mitigate")]
    pub treatment: Treatment,

    #[arg(long)]
    pub owner: Option<String>,

    /// Mitigating control (CODE:REF or CTRL@N)
    #[arg(long)]
    pub control: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct EditArgs {
    /// Risk ID or short ID (RISK@N)
    pub id: String,

    #[arg(long, short = 't')]
    pub title: Option<String>,

    #[arg(long, short = 'l', value_parser = parse_rating)]
    pub likelihood: Option<u8>,

    #[arg(long, short = 'i', value_parser = parse_rating)]
    pub impact: Option<u8>,

    #[arg(long, short = 'd')]
    pub description: Option<String>,

    #[arg(long, short = 'c')]
    pub category: Option<String>,

    #[arg(long)]
    pub treatment: Option<Treatment>,

    /// Status (identified/assessed/treating/accepted/closed)
    #[arg(long, short = 's')]
    pub status: Option<RiskStatus>,

    #[arg(long)]
    pub owner: Option<String>,

    #[arg(long)]
    pub control: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Filter by status
    #[arg(long, short = 's')]
    pub status: Option<RiskStatus>,

    /// Only risks at or above this level (low/medium/high/critical)
    #[arg(long)]
    pub min_level: Option<RiskLevel>,

    #[arg(long)]
    pub owner: Option<String>,

    /// Hide closed risks
    #[arg(long)]
    pub open: bool,

    /// Limit number of results
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Show count only
    #[arg(long)]
    pub count: bool,
}

const RISK_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("title", "TITLE", 40),
    ColumnDef::new("score", "SCORE", 6),
    ColumnDef::new("level", "LEVEL", 9),
    ColumnDef::new("treatment", "TREATMENT", 10),
    ColumnDef::new("status", "STATUS", 11),
    ColumnDef::new("owner", "OWNER", 16),
];

pub fn run(cmd: RiskCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        RiskCommands::New(args) => run_new(args, global),
        RiskCommands::List(args) => run_list(args, global),
        RiskCommands::Show { id } => run_show(&id, global),
        RiskCommands::Edit(args) => run_edit(args, global),
        RiskCommands::Delete { id, yes } => run_delete(&id, yes, global),
    }
}

fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditRecords)?;

    let mut risk = Risk::new(args.title, args.likelihood, args.impact, ws.user())
        .map_err(|e| miette::miette!("{}", e))?;
    risk.description = args.description;
    risk.category = args.category;
    risk.treatment = args.treatment;
    risk.owner = args.owner;
    risk.control_id = ws.resolve_opt(args.control.as_deref(), EntityPrefix::Ctrl)?;

    let short_id = ws.store.insert_risk(&risk).into_diagnostic()?;
    if global.format == OutputFormat::Id {
        println!("{}", risk.id);
    } else {
        success(
            global,
            format!(
                "Registered risk {}: {} (score {}, {})",
                style(&short_id).cyan(),
                risk.title,
                risk.score(),
                risk.level()
            ),
        );
    }
    Ok(())
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let filter = RiskFilter {
        status: args.status,
        min_level: args.min_level,
        owner: args.owner,
        open_only: args.open,
    };
    let mut risks = ws.store.list_risks(&filter).into_diagnostic()?;
    if let Some(limit) = args.limit {
        risks.truncate(limit);
    }

    if args.count {
        println!("{}", risks.len());
        return Ok(());
    }

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&risks, global.format),
        _ => {}
    }

    let short_ids = ws.store.short_ids(EntityPrefix::Risk).into_diagnostic()?;
    let rows = risks
        .iter()
        .map(|r| {
            TableRow::new(r.id.to_string(), &short_ids)
                .cell("title", CellValue::Text(r.title.clone()))
                .cell("score", CellValue::Number(r.score() as i64))
                .cell("level", CellValue::RiskLevel(r.level()))
                .cell("treatment", CellValue::Text(r.treatment.to_string()))
                .cell("status", CellValue::Text(r.status.to_string()))
                .cell("owner", CellValue::opt_text(r.owner.as_deref()))
        })
        .collect();
    TableFormatter::new(RISK_COLUMNS, "risk", "RISK").output(
        rows,
        global.format.or(OutputFormat::Tsv),
        &[],
    );
    Ok(())
}

fn run_show(reference: &str, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let id = ws.resolve(reference, EntityPrefix::Risk)?;
    let risk = ws.store.get_risk(&id).into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&risk, global.format),
        _ => {}
    }

    let level = risk.level();
    let level_styled = match level {
        RiskLevel::Critical => style(level.to_string()).red().bold(),
        RiskLevel::High => style(level.to_string()).yellow(),
        _ => style(level.to_string()).white(),
    };

    println!("{}", style("─".repeat(60)).dim());
    println!("{}: {}", style("ID").bold(), style(ws.display_id(&risk.id)).cyan());
    println!("{}: {}", style("Title").bold(), style(&risk.title).yellow());
    println!(
        "{}: {} x {} = {} ({})",
        style("Score").bold(),
        risk.likelihood,
        risk.impact,
        risk.score(),
        level_styled
    );
    println!("{}: {}", style("Treatment").bold(), risk.treatment);
    println!("{}: {}", style("Status").bold(), risk.status);
    println!("{}: {}", style("Owner").bold(), or_dash(risk.owner.as_deref()));
    if let Some(category) = &risk.category {
        println!("{}: {}", style("Category").bold(), category);
    }
    if let Some(control_id) = &risk.control_id {
        let label = ws
            .store
            .get_control(control_id)
            .map(|c| c.qualified_ref())
            .unwrap_or_else(|_| control_id.to_string());
        println!("{}: {}", style("Control").bold(), style(label).cyan());
    }
    println!("{}", style("─".repeat(60)).dim());
    if let Some(description) = &risk.description {
        println!();
        println!("{}", description.trim());
    }

    let tasks = ws
        .store
        .list_tasks(&TaskFilter {
            risk_id: Some(risk.id.clone()),
            ..Default::default()
        })
        .into_diagnostic()?;
    if !tasks.is_empty() {
        println!();
        println!("{}", style("Treatment tasks:").bold());
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
    let id = ws.resolve(&args.id, EntityPrefix::Risk)?;
    let mut risk = ws.store.get_risk(&id).into_diagnostic()?;

    if let Some(title) = args.title {
        risk.title = title;
    }
    if let Some(likelihood) = args.likelihood {
        risk.likelihood = validate_rating(likelihood).map_err(|e| miette::miette!("{}", e))?;
    }
    if let Some(impact) = args.impact {
        risk.impact = validate_rating(impact).map_err(|e| miette::miette!("{}", e))?;
    }
    if let Some(description) = args.description {
        risk.description = Some(description);
    }
    if let Some(category) = args.category {
        risk.category = Some(category);
    }
    if let Some(treatment) = args.treatment {
        risk.treatment = treatment;
    }
    if let Some(status) = args.status {
        risk.status = status;
    }
    if let Some(owner) = args.owner {
        risk.owner = Some(owner);
    }
    if let Some(control) = ws.resolve_opt(args.control.as_deref(), EntityPrefix::Ctrl)? {
        risk.control_id = Some(control);
    }

    let risk = ws.store.update_risk(&risk).into_diagnostic()?;
    success(
        global,
        format!(
            "Updated risk {} (score {}, {})",
            style(ws.display_id(&risk.id)).cyan(),
            risk.score(),
            risk.level()
        ),
    );
    Ok(())
}

fn run_delete(reference: &str, yes: bool, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::EditRecords)?;
    let id = ws.resolve(reference, EntityPrefix::Risk)?;
    let risk = ws.store.get_risk(&id).into_diagnostic()?;

    if !confirm(&format!("Delete risk '{}'?", risk.title), yes)? {
        println!("Cancelled");
        return Ok(());
    }
    let label = ws.display_id(&id);
    ws.store.delete_risk(&id).into_diagnostic()?;
    success(global, format!("Deleted risk {}", style(label).cyan()));
    Ok(())
}
