//! `grc status` command - Workspace compliance dashboard

use chrono::NaiveDate;
use console::style;
use miette::{IntoDiagnostic, Result};

use crate::cli::helpers::{parse_date, print_record, today, Workspace};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::access::Action;
use crate::core::coverage::{dashboard, Dashboard, TRAINING_HORIZON_DAYS};
use crate::entities::risk::RiskLevel;
use crate::entities::task::TaskStatus;

#[derive(clap::Args, Debug)]
pub struct StatusArgs {
    /// Evaluate due dates as of this day (YYYY-MM-DD, default: today)
    #[arg(long, value_parser = parse_date)]
    pub on: Option<NaiveDate>,
}

pub fn run(args: StatusArgs, global: &GlobalOpts) -> Result<()> {
    let ws = Workspace::open(global)?;
    ws.authorize(Action::Read)?;

    let summary = dashboard(&ws.store, args.on.unwrap_or_else(today)).into_diagnostic()?;

    match global.format {
        OutputFormat::Json | OutputFormat::Yaml => print_record(&summary, global.format),
        _ => {
            print_dashboard(&summary, &ws.config.organization());
            Ok(())
        }
    }
}

fn print_dashboard(summary: &Dashboard, organization: &str) {
    let width = 68;

    println!(
        "{}",
        style(format!("{} Compliance Status", organization))
            .bold()
            .underlined()
    );
    println!("{}", "═".repeat(width));
    println!();

    print_section("FRAMEWORK COVERAGE", &format_coverage(summary));
    println!();

    print_two_columns(
        "TASKS",
        &format_tasks(summary),
        "RISKS",
        &format_risks(summary),
    );
    println!();

    print_two_columns(
        "CAPAS",
        &format_capas(summary),
        &format!("TRAINING (next {} days)", TRAINING_HORIZON_DAYS),
        &format_training(summary),
    );

    println!();
    println!("{}", "═".repeat(width));

    let health = calculate_health(summary);
    let health_style = match health {
        "Healthy" => style(health).green().bold(),
        "Warning" => style(health).yellow().bold(),
        _ => style(health).red().bold(),
    };
    println!("Compliance Health: {}", health_style);
}

fn format_coverage(summary: &Dashboard) -> Vec<String> {
    if summary.coverage.is_empty() {
        return vec!["No frameworks seeded. Run 'grc seed'.".to_string()];
    }
    summary
        .coverage
        .iter()
        .map(|c| {
            format!(
                "{:<10} {} {:>5.1}%  ({}/{} implemented, {} in progress)",
                c.code,
                progress_bar(c.percent, 20),
                c.percent,
                c.implemented,
                c.total - c.not_applicable,
                c.in_progress
            )
        })
        .collect()
}

fn format_tasks(summary: &Dashboard) -> Vec<String> {
    let mut lines: Vec<String> = TaskStatus::all()
        .iter()
        .map(|s| format!("{}: {}", s.label(), summary.task_count(*s)))
        .collect();
    if summary.overdue_tasks > 0 {
        lines.push(format!("Past due: {}", summary.overdue_tasks));
    }
    lines
}

fn format_risks(summary: &Dashboard) -> Vec<String> {
    let mut lines = vec![format!("Open: {}", summary.open_risk_count())];
    lines.extend(
        summary
            .open_risks
            .iter()
            .filter(|l| l.count > 0)
            .map(|l| format!("  {}: {}", l.level, l.count)),
    );
    lines
}

fn format_capas(summary: &Dashboard) -> Vec<String> {
    vec![
        format!("Open: {}", summary.open_capas),
        format!("Past due: {}", summary.overdue_capas),
    ]
}

fn format_training(summary: &Dashboard) -> Vec<String> {
    if summary.training_due.is_empty() {
        return vec!["Nothing due".to_string()];
    }
    summary
        .training_due
        .iter()
        .map(|p| {
            let due = p.next_due.map(|d| d.to_string()).unwrap_or_default();
            format!("{} {}", due, p.title)
        })
        .collect()
}

fn progress_bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}

fn print_two_columns(title1: &str, lines1: &[String], title2: &str, lines2: &[String]) {
    let col_width = 32;

    println!("{:<col_width$} {}", style(title1).bold(), style(title2).bold());
    println!("{:-<col_width$} {:-<col_width$}", "", "");

    let max_lines = lines1.len().max(lines2.len());
    for i in 0..max_lines {
        let l1 = lines1.get(i).map(|s| s.as_str()).unwrap_or("");
        let l2 = lines2.get(i).map(|s| s.as_str()).unwrap_or("");
        println!("  {:<30} {}", l1, l2);
    }
}

fn print_section(title: &str, lines: &[String]) {
    println!("{}", style(title).bold());
    println!("{:-<64}", "");
    for line in lines {
        println!("  {}", line);
    }
}

fn calculate_health(summary: &Dashboard) -> &'static str {
    let mut score = 100i32;

    let implemented: usize = summary.coverage.iter().map(|c| c.implemented).sum();
    let applicable: usize = summary
        .coverage
        .iter()
        .map(|c| c.total - c.not_applicable)
        .sum();
    if applicable > 0 {
        let pct = implemented as f64 / applicable as f64 * 100.0;
        if pct < 50.0 {
            score -= 20;
        } else if pct < 80.0 {
            score -= 10;
        }
    }

    let critical = summary
        .open_risks
        .iter()
        .find(|l| l.level == RiskLevel::Critical)
        .map_or(0, |l| l.count);
    score -= 15 * critical as i32;

    if summary.overdue_tasks > 0 {
        score -= 10;
    }
    if summary.overdue_capas > 0 {
        score -= 15;
    }

    match score {
        s if s >= 80 => "Healthy",
        s if s >= 50 => "Warning",
        _ => "Critical",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::coverage::{FrameworkCoverage, LevelCount, StatusCount};

    fn empty() -> Dashboard {
        Dashboard {
            today: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            coverage: Vec::new(),
            tasks: TaskStatus::all()
                .iter()
                .map(|s| StatusCount { status: *s, count: 0 })
                .collect(),
            overdue_tasks: 0,
            open_risks: Vec::new(),
            open_capas: 0,
            overdue_capas: 0,
            training_due: Vec::new(),
        }
    }

    #[test]
    fn test_progress_bar() {
        assert_eq!(progress_bar(0.0, 4), "[░░░░]");
        assert_eq!(progress_bar(50.0, 4), "[██░░]");
        assert_eq!(progress_bar(100.0, 4), "[████]");
    }

    #[test]
    fn test_empty_workspace_is_healthy() {
        assert_eq!(calculate_health(&empty()), "Healthy");
    }

    #[test]
    fn test_critical_risks_and_late_capas_degrade_health() {
        let mut summary = empty();
        summary.coverage.push(FrameworkCoverage {
            code: "DEMO".to_string(),
            name: "Demo".to_string(),
            total: 10,
            implemented: 2,
            in_progress: 0,
            not_applicable: 0,
            not_started: 8,
            percent: 20.0,
        });
        summary.open_risks.push(LevelCount {
            level: RiskLevel::Critical,
            count: 2,
        });
        summary.overdue_capas = 1;
        assert_eq!(calculate_health(&summary), "Critical");
    }
}
