//! Table formatting utilities for CLI list commands
//!
//! Every list command builds [`TableRow`]s of typed [`CellValue`]s and hands
//! them to a [`TableFormatter`], which renders TSV (colored on a terminal),
//! CSV, Markdown, or bare IDs.

use std::collections::HashMap;

use chrono::{DateTime, Local, NaiveDate, Utc};
use console::style;
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::truncate_str;
use crate::cli::OutputFormat;
use crate::core::entity::Priority;
use crate::entities::implementation::ImplementationStatus;
use crate::entities::membership::Role;
use crate::entities::risk::RiskLevel;
use crate::entities::task::TaskStatus;

/// A typed cell value with semantic meaning for formatting
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Entity ID (cyan, truncated in TSV)
    Id(String),
    /// Short ID or natural reference (e.g., "TASK@1", "ISO27001:A.5.1")
    ShortId(String),
    /// Plain text, truncated to the column width
    Text(String),
    TaskStatus(TaskStatus),
    ImplStatus(ImplementationStatus),
    RiskLevel(RiskLevel),
    Priority(Priority),
    Role(Role),
    /// Calendar date; `true` highlights it as overdue
    Date(NaiveDate, bool),
    DateTime(DateTime<Utc>),
    Number(i64),
    /// Percentage with one decimal
    Percent(f64),
    /// yes/no
    Flag(bool),
    Empty,
}

impl CellValue {
    /// Text when present, Empty otherwise
    pub fn opt_text(value: Option<&str>) -> Self {
        value.map_or(CellValue::Empty, |v| CellValue::Text(v.to_string()))
    }

    /// Date when present, Empty otherwise
    pub fn opt_date(value: Option<NaiveDate>, overdue: bool) -> Self {
        value.map_or(CellValue::Empty, |d| CellValue::Date(d, overdue))
    }

    /// Format for TSV output (with colors if terminal)
    pub fn format_tsv(&self, width: usize) -> String {
        match self {
            CellValue::Id(id) => {
                let display = truncate_str(id, 16);
                format!("{:<width$}", style(display).cyan(), width = width)
            }
            CellValue::ShortId(sid) => format!("{:<width$}", style(sid).cyan(), width = width),
            CellValue::Text(s) => {
                format!("{:<width$}", truncate_str(s, width.saturating_sub(2)), width = width)
            }
            CellValue::TaskStatus(status) => {
                let s = status.to_string();
                let styled = match status {
                    TaskStatus::Todo => style(s).white(),
                    TaskStatus::InProgress => style(s).yellow(),
                    TaskStatus::InReview => style(s).magenta(),
                    TaskStatus::Completed => style(s).green(),
                    TaskStatus::Overdue => style(s).red().bold(),
                    TaskStatus::Cancelled => style(s).dim(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::ImplStatus(status) => {
                let s = status.to_string();
                let styled = match status {
                    ImplementationStatus::NotStarted => style(s).dim(),
                    ImplementationStatus::InProgress => style(s).yellow(),
                    ImplementationStatus::Implemented => style(s).green(),
                    ImplementationStatus::NotApplicable => style(s).cyan().dim(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::RiskLevel(level) => {
                let s = level.to_string();
                let styled = match level {
                    RiskLevel::Low => style(s).dim(),
                    RiskLevel::Medium => style(s).white(),
                    RiskLevel::High => style(s).yellow(),
                    RiskLevel::Critical => style(s).red().bold(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Priority(priority) => {
                let s = priority.to_string();
                let styled = match priority {
                    Priority::Low => style(s).dim(),
                    Priority::Medium => style(s).white(),
                    Priority::High => style(s).yellow(),
                    Priority::Critical => style(s).red().bold(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Role(role) => {
                let s = role.to_string();
                let styled = match role {
                    Role::Owner => style(s).magenta().bold(),
                    Role::Admin => style(s).yellow(),
                    _ => style(s).white(),
                };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Date(date, overdue) => {
                let s = date.format("%Y-%m-%d").to_string();
                if *overdue {
                    format!("{:<width$}", style(s).red(), width = width)
                } else {
                    format!("{:<width$}", s, width = width)
                }
            }
            CellValue::DateTime(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                format!("{:<width$}", local.format("%Y-%m-%d %H:%M"), width = width)
            }
            CellValue::Number(n) => format!("{:>width$}", n, width = width),
            CellValue::Percent(p) => {
                let s = format!("{:.1}%", p);
                let styled = if *p >= 80.0 {
                    style(s).green()
                } else if *p >= 40.0 {
                    style(s).yellow()
                } else {
                    style(s).red()
                };
                format!("{:>width$}", styled, width = width)
            }
            CellValue::Flag(b) => {
                let styled = if *b { style("yes").bold() } else { style("no").dim() };
                format!("{:<width$}", styled, width = width)
            }
            CellValue::Empty => format!("{:<width$}", "-", width = width),
        }
    }

    /// Get raw string value (no formatting)
    pub fn raw(&self) -> String {
        match self {
            CellValue::Id(s) | CellValue::ShortId(s) | CellValue::Text(s) => s.clone(),
            CellValue::TaskStatus(s) => s.to_string(),
            CellValue::ImplStatus(s) => s.to_string(),
            CellValue::RiskLevel(l) => l.to_string(),
            CellValue::Priority(p) => p.to_string(),
            CellValue::Role(r) => r.to_string(),
            CellValue::Date(d, _) => d.format("%Y-%m-%d").to_string(),
            CellValue::DateTime(dt) => {
                let local: DateTime<Local> = dt.with_timezone(&Local);
                local.format("%Y-%m-%dT%H:%M:%S").to_string()
            }
            CellValue::Number(n) => n.to_string(),
            CellValue::Percent(p) => format!("{:.1}", p),
            CellValue::Flag(b) => if *b { "yes" } else { "no" }.to_string(),
            CellValue::Empty => String::new(),
        }
    }

    /// Format for Markdown output (escaped pipes)
    pub fn format_md(&self) -> String {
        let raw = match self {
            CellValue::Percent(p) => format!("{:.1}%", p),
            CellValue::Date(d, true) => format!("**{}**", d.format("%Y-%m-%d")),
            CellValue::Empty => "-".to_string(),
            other => other.raw(),
        };
        raw.replace('|', "\\|")
    }

    /// Get the display width of this cell's content (for dynamic column sizing)
    pub fn display_width(&self) -> usize {
        match self {
            CellValue::Id(id) => id.chars().count().min(16),
            CellValue::Date(..) => 10,
            CellValue::DateTime(_) => 16,
            CellValue::Percent(p) => format!("{:.1}%", p).len(),
            CellValue::Empty => 1,
            other => other.raw().chars().count(),
        }
    }
}

/// Column definition with header label and maximum width
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub key: &'static str,
    pub header: &'static str,
    pub width: usize,
}

impl ColumnDef {
    pub const fn new(key: &'static str, header: &'static str, width: usize) -> Self {
        Self { key, header, width }
    }
}

/// A row of cell values for table output
pub struct TableRow {
    pub short_id: String,
    pub full_id: String,
    pub cells: Vec<(&'static str, CellValue)>,
}

impl TableRow {
    /// `short_ids` maps full IDs to short IDs, as returned by `Store::short_ids`
    pub fn new(full_id: String, short_ids: &HashMap<String, String>) -> Self {
        let short_id = short_ids.get(&full_id).cloned().unwrap_or_default();
        Self {
            short_id,
            full_id,
            cells: Vec::new(),
        }
    }

    pub fn cell(mut self, key: &'static str, value: CellValue) -> Self {
        self.cells.push((key, value));
        self
    }

    pub fn get(&self, key: &str) -> Option<&CellValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }
}

/// Table formatter that outputs rows in various formats
pub struct TableFormatter<'a> {
    columns: &'a [ColumnDef],
    entity_name: &'static str,
    entity_prefix: &'static str,
    show_summary: bool,
}

impl<'a> TableFormatter<'a> {
    pub fn new(columns: &'a [ColumnDef], entity_name: &'static str, entity_prefix: &'static str) -> Self {
        Self {
            columns,
            entity_name,
            entity_prefix,
            show_summary: true,
        }
    }

    /// Drop the trailing "N found" line
    pub fn without_summary(mut self) -> Self {
        self.show_summary = false;
        self
    }

    fn visible<'c>(&'c self, visible_columns: &'c [&str]) -> impl Iterator<Item = &'c ColumnDef> {
        self.columns
            .iter()
            .filter(move |c| visible_columns.is_empty() || visible_columns.contains(&c.key))
    }

    /// Output rows in the specified format. An empty `visible_columns`
    /// shows every column.
    pub fn output(&self, rows: Vec<TableRow>, format: OutputFormat, visible_columns: &[&str]) {
        match format {
            OutputFormat::Csv => self.output_csv(&rows, visible_columns),
            OutputFormat::Md => println!("{}", self.render_md(&rows, visible_columns)),
            OutputFormat::Id => {
                for row in &rows {
                    println!("{}", row.full_id);
                }
            }
            _ => self.output_tsv(&rows, visible_columns),
        }
    }

    fn calculate_widths(&self, rows: &[TableRow], visible_columns: &[&str]) -> Vec<usize> {
        let short_width = rows
            .iter()
            .map(|r| r.short_id.len())
            .max()
            .unwrap_or(5)
            .max(5);
        let mut widths = vec![short_width];

        for col in self.visible(visible_columns) {
            let max_content = rows
                .iter()
                .filter_map(|r| r.get(col.key))
                .map(|v| v.display_width())
                .max()
                .unwrap_or(0);
            let natural = col.header.len().max(max_content.saturating_add(2));
            widths.push(natural.min(col.width));
        }
        widths
    }

    fn output_tsv(&self, rows: &[TableRow], visible_columns: &[&str]) {
        let widths = self.calculate_widths(rows, visible_columns);

        let mut header = vec![format!("{:<width$}", style("SHORT").bold().dim(), width = widths[0])];
        for (col, width) in self.visible(visible_columns).zip(&widths[1..]) {
            header.push(format!("{:<width$}", style(col.header).bold(), width = width));
        }
        println!("{}", header.join(" "));

        let total_width: usize = widths.iter().sum::<usize>() + widths.len() - 1;
        println!("{}", "-".repeat(total_width));

        for row in rows {
            let mut parts = vec![format!("{:<width$}", style(&row.short_id).cyan(), width = widths[0])];
            for (col, width) in self.visible(visible_columns).zip(&widths[1..]) {
                match row.get(col.key) {
                    Some(value) => parts.push(value.format_tsv(*width)),
                    None => parts.push(format!("{:<width$}", "-", width = width)),
                }
            }
            println!("{}", parts.join(" "));
        }

        if self.show_summary {
            println!();
            println!(
                "{} {}(s) found. Use {} to reference by short ID.",
                style(rows.len()).cyan(),
                self.entity_name,
                style(format!("{}@N", self.entity_prefix)).cyan()
            );
        }
    }

    fn output_csv(&self, rows: &[TableRow], visible_columns: &[&str]) {
        let mut writer = csv::Writer::from_writer(std::io::stdout());
        let mut header = vec!["short_id", "id"];
        header.extend(self.visible(visible_columns).map(|c| c.key));
        if let Err(e) = writer.write_record(&header) {
            tracing::warn!(error = %e, "failed to write csv header");
            return;
        }
        for row in rows {
            let mut record = vec![row.short_id.clone(), row.full_id.clone()];
            record.extend(
                self.visible(visible_columns)
                    .map(|c| row.get(c.key).map(CellValue::raw).unwrap_or_default()),
            );
            if let Err(e) = writer.write_record(&record) {
                tracing::warn!(error = %e, "failed to write csv row");
                return;
            }
        }
        let _ = writer.flush();
    }

    /// Markdown table via tabled
    pub fn render_md(&self, rows: &[TableRow], visible_columns: &[&str]) -> String {
        let mut builder = Builder::default();
        let mut header = vec!["Short".to_string()];
        header.extend(self.visible(visible_columns).map(|c| c.header.to_string()));
        builder.push_record(header);

        for row in rows {
            let mut record = vec![row.short_id.clone()];
            record.extend(self.visible(visible_columns).map(|c| {
                row.get(c.key)
                    .map(CellValue::format_md)
                    .unwrap_or_else(|| "-".to_string())
            }));
            builder.push_record(record);
        }
        builder.build().with(Style::markdown()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COLUMNS: &[ColumnDef] = &[
        ColumnDef::new("title", "TITLE", 30),
        ColumnDef::new("status", "STATUS", 12),
    ];

    #[test]
    fn test_cell_raw_values() {
        assert_eq!(CellValue::TaskStatus(TaskStatus::InReview).raw(), "IN_REVIEW");
        assert_eq!(
            CellValue::ImplStatus(ImplementationStatus::NotApplicable).raw(),
            "not_applicable"
        );
        assert_eq!(CellValue::Percent(66.666).raw(), "66.7");
        assert_eq!(CellValue::Flag(true).raw(), "yes");
        assert_eq!(CellValue::Empty.raw(), "");
    }

    #[test]
    fn test_md_escapes_pipes_and_marks_overdue() {
        assert_eq!(CellValue::Text("a|b".to_string()).format_md(), "a\\|b");
        let due = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        assert_eq!(CellValue::Date(due, true).format_md(), "**2026-01-05**");
        assert_eq!(CellValue::Empty.format_md(), "-");
    }

    #[test]
    fn test_table_row_uses_short_id_map() {
        let mut ids = HashMap::new();
        ids.insert("TASK-01ABC".to_string(), "TASK@3".to_string());
        let row = TableRow::new("TASK-01ABC".to_string(), &ids)
            .cell("title", CellValue::Text("Rotate keys".to_string()));
        assert_eq!(row.short_id, "TASK@3");
        assert!(row.get("title").is_some());
        assert!(row.get("status").is_none());
    }

    #[test]
    fn test_render_md_respects_visible_columns() {
        let rows = vec![TableRow::new("TASK-1".to_string(), &HashMap::new())
            .cell("title", CellValue::Text("Review access".to_string()))
            .cell("status", CellValue::TaskStatus(TaskStatus::Todo))];
        let formatter = TableFormatter::new(COLUMNS, "task", "TASK");

        let all = formatter.render_md(&rows, &[]);
        assert!(all.contains("TITLE"));
        assert!(all.contains("TODO"));

        let only_title = formatter.render_md(&rows, &["title"]);
        assert!(only_title.contains("Review access"));
        assert!(!only_title.contains("STATUS"));
    }
}
