//! `grc seed` command - load framework catalogs into the database

use console::style;
use miette::{IntoDiagnostic, Result};

use crate::catalog::Catalog;
use crate::cli::helpers::{print_record, Workspace};
use crate::cli::table::{CellValue, ColumnDef, TableFormatter, TableRow};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::access::Action;
use crate::core::seed::{seed_all, SeedOutcome};

#[derive(clap::Args, Debug)]
pub struct SeedArgs {
    /// Seed only these frameworks (repeatable; default: all built-in)
    #[arg(long = "framework", short = 'F', value_name = "CODE")]
    pub frameworks: Vec<String>,

    /// Also seed organization catalogs from .grc/catalogs/
    #[arg(long)]
    pub custom: bool,

    /// Re-apply catalogs even when their content is unchanged
    #[arg(long)]
    pub force: bool,

    /// List the available catalogs without seeding
    #[arg(long)]
    pub list: bool,
}

const LIST_COLUMNS: &[ColumnDef] = &[
    ColumnDef::new("code", "CODE", 12),
    ColumnDef::new("name", "NAME", 48),
    ColumnDef::new("version", "VERSION", 10),
    ColumnDef::new("clauses", "CLAUSES", 8),
    ColumnDef::new("controls", "CONTROLS", 9),
];

pub fn run(args: SeedArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;

    let mut catalogs = if args.frameworks.is_empty() {
        Catalog::builtin()?
    } else {
        let mut selected = Vec::new();
        for code in &args.frameworks {
            selected.push(Catalog::builtin_by_code(code)?);
        }
        selected
    };
    if args.custom {
        catalogs.extend(Catalog::load_dir(&ws.project.catalog_dir())?);
    }

    if args.list {
        let rows = catalogs
            .iter()
            .map(|c| {
                TableRow::new(c.code.clone(), &Default::default())
                    .cell("code", CellValue::ShortId(c.code.clone()))
                    .cell("name", CellValue::Text(c.name.clone()))
                    .cell("version", CellValue::Text(c.version.clone()))
                    .cell("clauses", CellValue::Number(c.clause_count() as i64))
                    .cell("controls", CellValue::Number(c.control_count() as i64))
            })
            .collect();
        TableFormatter::new(LIST_COLUMNS, "catalog", "FW")
            .without_summary()
            .output(rows, global.format.or(OutputFormat::Tsv), &[]);
        return Ok(());
    }

    ws.authorize(Action::SeedCatalog)?;
    let reports = seed_all(&ws.store, &catalogs, args.force).into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&reports, global.format),
        _ => {}
    }

    if !global.quiet {
        for report in &reports {
            let marker = match report.outcome {
                SeedOutcome::Created => style("+").green(),
                SeedOutcome::Updated => style("~").yellow(),
                SeedOutcome::Unchanged => style("=").dim(),
            };
            println!(
                "{} {:<10} {:<9} {} clause(s), {} control(s) (+{} ~{} -{})",
                marker,
                style(&report.code).cyan(),
                report.outcome,
                report.clauses,
                report.controls,
                report.inserted,
                report.updated,
                report.removed
            );
        }
        let changed = reports
            .iter()
            .filter(|r| r.outcome != SeedOutcome::Unchanged)
            .count();
        println!();
        println!(
            "{} Seeded {} framework(s), {} changed",
            style("✓").green(),
            reports.len(),
            changed
        );
    }
    Ok(())
}
