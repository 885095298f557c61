//! Markdown compliance report rendered from an embedded Tera template

use chrono::{NaiveDate, Utc};
use rust_embed::Embed;
use tabled::{builder::Builder, settings::Style};
use tera::Tera;
use thiserror::Error;

use crate::core::coverage::{dashboard, TRAINING_HORIZON_DAYS};
use crate::core::store::{CapaFilter, RiskFilter, Store, StoreError};
use crate::entities::risk::RiskLevel;
use crate::entities::task::TaskStatus;

#[derive(Embed)]
#[folder = "templates/"]
struct EmbeddedTemplates;

const COMPLIANCE_TEMPLATE: &str = "compliance_report.md.tera";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Template not found: {0}")]
    NotFound(String),

    #[error("Template rendering error: {0}")]
    RenderError(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Renders reports from the embedded templates
pub struct ReportGenerator {
    tera: Tera,
}

fn markdown_table<const N: usize>(header: [&str; N], rows: Vec<[String; N]>) -> String {
    let mut builder = Builder::default();
    builder.push_record(header);
    for row in rows {
        builder.push_record(row);
    }
    builder.build().with(Style::markdown()).to_string()
}

impl ReportGenerator {
    pub fn new() -> Result<Self, ReportError> {
        let mut tera = Tera::default();
        for file in EmbeddedTemplates::iter() {
            let filename = file.as_ref();
            if let Some(content) = EmbeddedTemplates::get(filename) {
                if let Ok(template_str) = std::str::from_utf8(&content.data) {
                    tera.add_raw_template(filename, template_str)
                        .map_err(|e| ReportError::RenderError(e.to_string()))?;
                }
            }
        }
        Ok(Self { tera })
    }

    /// Coverage, risks, CAPAs, tasks, and upcoming training in one document
    pub fn compliance_report(
        &self,
        store: &Store,
        organization: &str,
        today: NaiveDate,
    ) -> Result<String, ReportError> {
        if !self.tera.get_template_names().any(|n| n == COMPLIANCE_TEMPLATE) {
            return Err(ReportError::NotFound(COMPLIANCE_TEMPLATE.to_string()));
        }

        let summary = dashboard(store, today)?;

        let implemented: usize = summary.coverage.iter().map(|c| c.implemented).sum();
        let applicable: usize = summary
            .coverage
            .iter()
            .map(|c| c.total - c.not_applicable)
            .sum();
        let overall = if applicable == 0 {
            0.0
        } else {
            implemented as f64 / applicable as f64 * 100.0
        };

        let coverage_table = markdown_table(
            ["Framework", "Name", "Controls", "Implemented", "In Progress", "N/A", "Coverage"],
            summary
                .coverage
                .iter()
                .map(|c| {
                    [
                        c.code.clone(),
                        c.name.clone(),
                        c.total.to_string(),
                        c.implemented.to_string(),
                        c.in_progress.to_string(),
                        c.not_applicable.to_string(),
                        format!("{:.1}%", c.percent),
                    ]
                })
                .collect(),
        );

        let risks = store.list_risks(&RiskFilter {
            open_only: true,
            ..Default::default()
        })?;
        let risk_table = markdown_table(
            ["Risk", "Score", "Level", "Treatment", "Status", "Owner"],
            risks
                .iter()
                .map(|r| {
                    [
                        r.title.clone(),
                        r.score().to_string(),
                        r.level().to_string(),
                        r.treatment.to_string(),
                        r.status.to_string(),
                        r.owner.clone().unwrap_or_else(|| "-".to_string()),
                    ]
                })
                .collect(),
        );
        let high_risks = risks.iter().filter(|r| r.level() >= RiskLevel::High).count();

        let capas = store.list_capas(&CapaFilter {
            open_only: true,
            ..Default::default()
        })?;
        let capa_table = markdown_table(
            ["CAPA", "Type", "Source", "Status", "Due"],
            capas
                .iter()
                .map(|c| {
                    let due = match c.due_date {
                        Some(d) if c.is_overdue(today) => format!("{} (overdue)", d),
                        Some(d) => d.to_string(),
                        None => "-".to_string(),
                    };
                    [
                        c.title.clone(),
                        c.capa_type.to_string(),
                        c.source.to_string(),
                        c.status.to_string(),
                        due,
                    ]
                })
                .collect(),
        );

        let task_table = markdown_table(
            ["Status", "Tasks"],
            TaskStatus::all()
                .iter()
                .map(|s| [s.label().to_string(), summary.task_count(*s).to_string()])
                .collect(),
        );

        let training_table = markdown_table(
            ["Program", "Frequency", "Mandatory", "Next Due"],
            summary
                .training_due
                .iter()
                .map(|p| {
                    [
                        p.title.clone(),
                        p.frequency.to_string(),
                        if p.mandatory { "yes" } else { "no" }.to_string(),
                        p.next_due.map(|d| d.to_string()).unwrap_or_default(),
                    ]
                })
                .collect(),
        );

        let mut context = tera::Context::new();
        context.insert("organization", organization);
        context.insert("generated", &Utc::now().format("%Y-%m-%d %H:%M UTC").to_string());
        context.insert("today", &today.to_string());
        context.insert("frameworks", &summary.coverage.len());
        context.insert("coverage_table", &coverage_table);
        context.insert("implemented", &implemented);
        context.insert("applicable", &applicable);
        context.insert("overall_percent", &format!("{:.1}", overall));
        context.insert("open_risks", &risks.len());
        context.insert("high_risks", &high_risks);
        context.insert("risk_table", &risk_table);
        context.insert("open_capas", &capas.len());
        context.insert("overdue_capas", &summary.overdue_capas);
        context.insert("capa_table", &capa_table);
        context.insert("task_table", &task_table);
        context.insert("overdue_tasks", &summary.overdue_tasks);
        context.insert("horizon_days", &TRAINING_HORIZON_DAYS);
        context.insert("training_due", &summary.training_due.len());
        context.insert("training_table", &training_table);

        self.tera
            .render(COMPLIANCE_TEMPLATE, &context)
            .map_err(|e| ReportError::RenderError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::capa::{Capa, CapaSource, CapaType};
    use crate::entities::risk::Risk;

    #[test]
    fn test_empty_workspace_report() {
        let store = Store::open_in_memory().unwrap();
        let report = ReportGenerator::new()
            .unwrap()
            .compliance_report(&store, "Acme", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .unwrap();

        assert!(report.starts_with("# Compliance Report: Acme"));
        assert!(report.contains("No frameworks have been seeded"));
        assert!(report.contains("No open risks."));
        assert!(report.contains("| To Do"));
    }

    #[test]
    fn test_report_lists_risks_and_capas() {
        let store = Store::open_in_memory().unwrap();
        let risk = Risk::new("Unpatched VPN".to_string(), 4, 5, "a".to_string()).unwrap();
        store.insert_risk(&risk).unwrap();
        let mut capa = Capa::new(
            "Rotate leaked keys".to_string(),
            CapaType::Corrective,
            CapaSource::Incident,
            "a".to_string(),
        );
        capa.due_date = NaiveDate::from_ymd_opt(2025, 12, 1);
        store.insert_capa(&capa).unwrap();

        let report = ReportGenerator::new()
            .unwrap()
            .compliance_report(&store, "Acme", NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
            .unwrap();

        assert!(report.contains("1 open risk(s), 1 rated high or critical."));
        assert!(report.contains("Unpatched VPN"));
        assert!(report.contains("2025-12-01 (overdue)"));
        assert!(report.contains("1 open CAPA(s), 1 past due."));
    }
}
