//! `grc snapshot` command - export, publish, and import framework snapshots

use std::path::PathBuf;

use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::commands::framework::framework_code;
use crate::cli::helpers::{print_record, success, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::access::Action;
use crate::core::snapshot::{
    build_snapshot, configured_store, import_snapshot, publish_snapshot, write_snapshot,
};

#[derive(Subcommand, Debug)]
pub enum SnapshotCommands {
    /// Write a framework snapshot as JSON
    Export {
        /// Framework code
        framework: String,

        /// Output file (default: stdout)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Include the implementation status of each control
        #[arg(long)]
        with_status: bool,
    },

    /// Upload a framework snapshot to the configured object store
    Publish {
        /// Framework code
        framework: String,

        /// Include the implementation status of each control
        #[arg(long)]
        with_status: bool,

        /// Object store URL (default: GRC_SNAPSHOT_STORE / snapshot_store)
        #[arg(long)]
        store: Option<String>,

        /// Key prefix inside the store (default: snapshot_prefix or "snapshots")
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Seed a framework from a snapshot file
    Import {
        /// Snapshot JSON file
        file: PathBuf,

        /// Re-apply even when the content hash is unchanged
        #[arg(long)]
        force: bool,

        /// Also restore recorded implementation status
        #[arg(long)]
        restore_status: bool,
    },
}

pub fn run(cmd: SnapshotCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SnapshotCommands::Export {
            framework,
            output,
            with_status,
        } => run_export(&framework, output, with_status, global),
        SnapshotCommands::Publish {
            framework,
            with_status,
            store,
            prefix,
        } => run_publish(&framework, with_status, store, prefix, global),
        SnapshotCommands::Import {
            file,
            force,
            restore_status,
        } => run_import(file, force, restore_status, global),
    }
}

fn run_export(
    code: &str,
    output: Option<PathBuf>,
    with_status: bool,
    global: &GlobalOpts,
) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::ExportSnapshot)?;
    let code = framework_code(&ws, code)?;
    let snapshot = build_snapshot(&ws.store, &code, &ws.config.organization(), with_status)
        .into_diagnostic()?;

    match output {
        Some(path) => {
            write_snapshot(&snapshot, &path).into_diagnostic()?;
            success(
                global,
                format!(
                    "Wrote {} snapshot to {}",
                    style(&snapshot.framework.code).cyan(),
                    style(path.display()).cyan()
                ),
            );
        }
        None => println!("{}", snapshot.to_json().into_diagnostic()?),
    }
    Ok(())
}

fn run_publish(
    code: &str,
    with_status: bool,
    store: Option<String>,
    prefix: Option<String>,
    global: &GlobalOpts,
) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::ExportSnapshot)?;

    let url = store.or_else(|| ws.config.snapshot_store.clone());
    let url = configured_store(url.as_deref()).into_diagnostic()?;
    let prefix = prefix.unwrap_or_else(|| ws.config.snapshot_prefix().to_string());

    let code = framework_code(&ws, code)?;
    let snapshot = build_snapshot(&ws.store, &code, &ws.config.organization(), with_status)
        .into_diagnostic()?;
    let keys = publish_snapshot(&snapshot, url, &prefix).into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&keys, global.format),
        _ => {}
    }
    success(
        global,
        format!(
            "Published {} to {}",
            style(&snapshot.framework.code).cyan(),
            style(url).cyan()
        ),
    );
    if !global.quiet {
        for key in &keys {
            println!("  {}", style(key).dim());
        }
    }
    Ok(())
}

fn run_import(file: PathBuf, force: bool, restore_status: bool, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::SeedCatalog)?;
    if restore_status {
        ws.authorize(Action::EditRecords)?;
    }

    let json = std::fs::read_to_string(&file)
        .map_err(|e| miette::miette!("failed to read {}: {}", file.display(), e))?;
    let user = ws.user();
    let report = import_snapshot(&ws.store, &json, force, restore_status.then_some(user.as_str()))
        .into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => return print_record(&report, global.format),
        _ => {}
    }
    success(
        global,
        format!(
            "Imported {} ({}, {} control(s), +{} ~{} -{})",
            style(&report.seed.code).cyan(),
            report.seed.outcome,
            report.seed.controls,
            report.seed.inserted,
            report.seed.updated,
            report.seed.removed
        ),
    );
    if restore_status && !global.quiet {
        println!("  restored {} implementation record(s)", report.implementations);
    }
    Ok(())
}
