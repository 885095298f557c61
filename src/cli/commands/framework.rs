//! `grc framework` command - seeded frameworks and their clause trees

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{confirm, print_record, success, truncate_str, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::access::Action;
use crate::core::identity::EntityPrefix;
use crate::entities::framework::ClauseNode;
use crate::entities::implementation::ImplementationStatus;

#[derive(Subcommand, Debug)]
pub enum FrameworkCommands {
    /// List seeded frameworks
    List,

    /// Show one framework's metadata
    Show {
        /// Framework code or FW@N
        framework: String,
    },

    /// Print the clause tree with controls and their status
    Tree {
        /// Framework code or FW@N
        framework: String,

        /// Hide controls, show clauses only
        #[arg(long)]
        clauses_only: bool,
    },

    /// Delete a framework with its clauses, controls, and implementation records
    Delete {
        /// Framework code or FW@N
        framework: String,

        /// Skip confirmation
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

const LIST_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 12),
    ColumnDef::new("name", "NAME", 48),
    ColumnDef::new("version", "VERSION", 10),
    ColumnDef::new("clauses", "CLAUSES", 8),
    ColumnDef::new("controls", "CONTROLS", 9),
    ColumnDef::new("seeded", "SEEDED", 17),
];

pub fn run(cmd: FrameworkCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        FrameworkCommands::List => run_list(global),
        FrameworkCommands::Show { framework } => run_show(&framework, global),
        FrameworkCommands::Tree {
            framework,
            clauses_only,
        } => run_tree(&framework, clauses_only, global),
        FrameworkCommands::Delete { framework, yes } => run_delete(&framework, yes, global),
    }
}

/// Framework code from a code or FW@N reference
pub(crate) fn framework_code(ws: &Workspace, reference: &str) -> Result<String> {
    if reference.contains('@') {
        let id = ws.resolve(reference, EntityPrefix::Fw)?;
        let code = ws
            .store
            .list_frameworks()
            .into_diagnostic()?
            .into_iter()
            .find(|f| f.framework.id == id)
            .map(|f| f.framework.code)
            .ok_or_else(|| miette::miette!("framework {} not found", reference))?;
        Ok(code)
    } else {
        Ok(reference.to_string())
    }
}

fn run_list(global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let frameworks = ws.store.list_frameworks().into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&frameworks, global.format),
        _ => {}
    }

    if frameworks.is_empty() && !global.quiet {
        println!("No frameworks seeded. Run {} to load the catalogs.", style("grc seed").yellow());
        return Ok(());
    }

    let short_ids = ws.store.short_ids(EntityPrefix::Fw).into_diagnostic()?;
    let rows = frameworks
        .iter()
        .map(|f| {
            TableRow::new(f.framework.id.to_string(), &short_ids)
                .cell("code", CellValue::ShortId(f.framework.code.clone()))
                .cell("name", CellValue::Text(f.framework.name.clone()))
                .cell("version", CellValue::Text(f.framework.version.clone()))
                .cell("clauses", CellValue::Number(f.clause_count as i64))
                .cell("controls", CellValue::Number(f.control_count as i64))
                .cell("seeded", CellValue::DateTime(f.framework.seeded_at))
        })
        .collect();
    TableFormatter::new(LIST_COLUMNS, "framework", "FW").output(rows, global.format.or(OutputFormat::Tsv), &[]);
    Ok(())
}

fn run_show(reference: &str, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let code = framework_code(&ws, reference)?;
    let framework = ws.store.get_framework(&code).into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&framework, global.format),
        _ => {}
    }

    println!("{}", style("─".repeat(60)).dim());
    println!(
        "{}: {}",
        style("Framework").bold(),
        style(&framework.code).cyan()
    );
    println!("{}: {}", style("Name").bold(), framework.name);
    println!("{}: {}", style("Version").bold(), framework.version);
    if let Some(publisher) = &framework.publisher {
        println!("{}: {}", style("Publisher").bold(), publisher);
    }
    println!(
        "{}: {}",
        style("Seeded").bold(),
        framework.seeded_at.format("%Y-%m-%d %H:%M UTC")
    );
    println!("{}: {}", style("Content hash").bold(), style(&framework.content_hash).dim());
    println!("{}", style("─".repeat(60)).dim());
    if let Some(description) = &framework.description {
        println!();
        println!("{}", description.trim());
    }
    Ok(())
}

fn run_tree(reference: &str, clauses_only: bool, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;
    let code = framework_code(&ws, reference)?;
    let framework = ws.store.get_framework(&code).into_diagnostic()?;
    let tree = ws.store.clause_tree(&framework.code).into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&tree, global.format),
        _ => {}
    }

    println!(
        "{} {} ({})",
        style(&framework.code).cyan().bold(),
        framework.name,
        framework.version
    );
    for node in &tree {
        print_node(node, 1, clauses_only);
    }
    Ok(())
}

fn print_node(node: &ClauseNode, depth: usize, clauses_only: bool) {
    let indent = "  ".repeat(depth);
    println!(
        "{}{} {} {}",
        indent,
        style(&node.clause.reference).bold(),
        node.clause.title,
        style(format!("[{}]", node.control_count())).dim()
    );
    if !clauses_only {
        for control in &node.controls {
            let marker = match control.implementation_status {
                ImplementationStatus::Implemented => style("●").green(),
                ImplementationStatus::InProgress => style("◐").yellow(),
                ImplementationStatus::NotApplicable => style("-").dim(),
                ImplementationStatus::NotStarted => style("○").dim(),
            };
            println!(
                "{}  {} {} {}",
                indent,
                marker,
                style(&control.control.reference).cyan(),
                truncate_str(&control.control.title, 70)
            );
        }
    }
    for child in &node.children {
        print_node(child, depth + 1, clauses_only);
    }
}

fn run_delete(reference: &str, yes: bool, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::SeedCatalog)?;
    let code = framework_code(&ws, reference)?;
    let framework = ws.store.get_framework(&code).into_diagnostic()?;

    let prompt = format!(
        "Delete {} and all of its controls and implementation records?",
        framework.code
    );
    if !confirm(&prompt, yes)? {
        println!("Cancelled");
        return Ok(());
    }

    let removed = ws.store.delete_framework(&framework.code).into_diagnostic()?;
    success(
        global,
        format!(
            "Deleted framework {} ({} control(s))",
            style(&framework.code).cyan(),
            removed
        ),
    );
    Ok(())
}
