//! Shared helper functions for CLI commands
//!
//! Every command that touches the database goes through [`Workspace`], which
//! finds the project, opens the store, loads config, and runs access checks.

use chrono::{Local, NaiveDate};
use console::style;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::access::{AccessPolicy, Action};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::{Config, Project, Store};

/// An opened workspace: project, database, and effective config
pub struct Workspace {
    pub project: Project,
    pub store: Store,
    pub config: Config,
}

impl Workspace {
    /// Find the project (honoring `--project`) and open its database
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let project = match &global.project {
            Some(path) => Project::discover_from(path),
            None => Project::discover(),
        }
        .map_err(|e| miette::miette!("{}", e))?;

        let store = Store::open(&project.db_path()).into_diagnostic()?;
        let config = Config::load_for(&project);
        Ok(Self {
            project,
            store,
            config,
        })
    }

    /// Acting user name
    pub fn user(&self) -> String {
        self.config.user()
    }

    pub fn policy(&self) -> Result<AccessPolicy> {
        AccessPolicy::load(&self.store).into_diagnostic()
    }

    /// Fail unless the acting user may perform `action`
    pub fn authorize(&self, action: Action) -> Result<()> {
        self.policy()?.check(&self.user(), action)?;
        Ok(())
    }

    /// Resolve a user reference (short ID, full ID, or natural key)
    pub fn resolve(&self, reference: &str, prefix: EntityPrefix) -> Result<EntityId> {
        self.store.resolve(reference, prefix).into_diagnostic()
    }

    /// Resolve an optional link argument
    pub fn resolve_opt(
        &self,
        reference: Option<&str>,
        prefix: EntityPrefix,
    ) -> Result<Option<EntityId>> {
        reference.map(|r| self.resolve(r, prefix)).transpose()
    }

    /// Short ID for display, falling back to the full ID
    pub fn display_id(&self, id: &EntityId) -> String {
        self.store.short_id(id).unwrap_or_else(|| id.to_string())
    }
}

/// Print a record as YAML or JSON
pub fn print_record<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
        }
        _ => {
            print!("{}", serde_yml::to_string(value).into_diagnostic()?);
        }
    }
    Ok(())
}

/// Ask before a destructive action; `--yes` skips the prompt
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .into_diagnostic()
}

/// Print a success line unless quiet
pub fn success(global: &GlobalOpts, message: impl std::fmt::Display) {
    if !global.quiet {
        println!("{} {}", style("✓").green(), message);
    }
}

/// Local calendar date
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a `YYYY-MM-DD` date (clap value parser)
pub fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", s))
}

/// Parse a 1-5 rating (clap value parser)
pub fn parse_rating(s: &str) -> std::result::Result<u8, String> {
    let value: u8 = s
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", s))?;
    crate::entities::risk::validate_rating(value)
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Optional text shown as "-" when missing
pub fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hi", 2), "hi");
        assert_eq!(truncate_str("Überwachung", 6), "Übe...");
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-03-31").unwrap(),
            NaiveDate::from_ymd_opt(2026, 3, 31).unwrap()
        );
        assert!(parse_date("31/03/2026").is_err());
    }

    #[test]
    fn test_parse_rating() {
        assert_eq!(parse_rating("3").unwrap(), 3);
        assert!(parse_rating("0").is_err());
        assert!(parse_rating("6").is_err());
        assert!(parse_rating("high").is_err());
    }
}
