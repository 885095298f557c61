//! `grc report` command - Generate compliance reports

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Subcommand;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{parse_date, today, Workspace};
use crate::cli::GlobalOpts;
use crate::core::access::Action;
use crate::core::report::ReportGenerator;

#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Markdown summary of coverage, risks, CAPAs, tasks, and training
    Compliance(ComplianceArgs),
}

#[derive(clap::Args, Debug)]
pub struct ComplianceArgs {
    /// Output to file instead of stdout
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Evaluate due dates as of this day (YYYY-MM-DD, default: today)
    #[arg(long, value_parser = parse_date)]
    pub on: Option<NaiveDate>,
}

pub fn run(cmd: ReportCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ReportCommands::Compliance(args) => run_compliance(args, global),
    }
}

fn run_compliance(args: ComplianceArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;

    let content = ReportGenerator::new()
        .and_then(|generator| {
            generator.compliance_report(
                &ws.store,
                &ws.config.organization(),
                args.on.unwrap_or_else(today),
            )
        })
        .map_err(|e| miette::miette!("{}", e))?;

    write_output(&content, args.output, global)
}

fn write_output(content: &str, output_path: Option<PathBuf>, global: &GlobalOpts) -> Result<()> {
    if let Some(path) = output_path {
        let file = File::create(&path).into_diagnostic()?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes()).into_diagnostic()?;
        writer.flush().into_diagnostic()?;
        if !global.quiet {
            println!(
                "{} Report written to {}",
                style("✓").green(),
                style(path.display()).cyan()
            );
        }
    } else {
        print!("{}", content);
    }
    Ok(())
}
