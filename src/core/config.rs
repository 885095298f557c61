//! Configuration management with layered hierarchy

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::core::Project;

/// Default key prefix for published snapshots
pub const DEFAULT_SNAPSHOT_PREFIX: &str = "snapshots";

/// GRC configuration with layered hierarchy
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Acting user for access checks
    pub user: Option<String>,

    /// Organization name for reports and snapshots
    pub organization: Option<String>,

    /// Default output format
    pub default_format: Option<String>,

    /// Object store URL snapshots are published to
    pub snapshot_store: Option<String>,

    /// Key prefix inside the snapshot store
    pub snapshot_prefix: Option<String>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        match Project::discover() {
            Ok(project) => Self::load_for(&project),
            Err(_) => Self::load_layers(None),
        }
    }

    /// Load configuration for a specific project
    pub fn load_for(project: &Project) -> Self {
        Self::load_layers(Some(&project.grc_dir().join("config.yaml")))
    }

    fn load_layers(project_config: Option<&Path>) -> Self {
        let mut config = Config::default();

        // Global user config (~/.config/grc/config.yaml)
        if let Some(global) = Self::global_config_path().and_then(|p| Self::read_file(&p)) {
            config.merge(global);
        }

        // Project config (.grc/config.yaml)
        if let Some(project) = project_config.and_then(Self::read_file) {
            config.merge(project);
        }

        // Environment variables
        if let Ok(user) = std::env::var("GRC_USER") {
            config.user = Some(user);
        }
        if let Ok(org) = std::env::var("GRC_ORGANIZATION") {
            config.organization = Some(org);
        }
        if let Ok(store) = std::env::var("GRC_SNAPSHOT_STORE") {
            config.snapshot_store = Some(store);
        }

        config
    }

    fn read_file(path: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        let contents = std::fs::read_to_string(path).ok()?;
        match serde_yml::from_str::<Config>(&contents) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                None
            }
        }
    }

    /// Get the path to the global config file
    fn global_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "grc")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.user.is_some() {
            self.user = other.user;
        }
        if other.organization.is_some() {
            self.organization = other.organization;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
        if other.snapshot_store.is_some() {
            self.snapshot_store = other.snapshot_store;
        }
        if other.snapshot_prefix.is_some() {
            self.snapshot_prefix = other.snapshot_prefix;
        }
    }

    /// Get the acting user name, falling back to git config or username
    pub fn user(&self) -> String {
        if let Some(ref user) = self.user {
            return user.clone();
        }

        if let Ok(output) = std::process::Command::new("git")
            .args(["config", "user.name"])
            .output()
        {
            if output.status.success() {
                let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !name.is_empty() {
                    return name;
                }
            }
        }

        std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string())
    }

    /// Organization name, or a neutral placeholder
    pub fn organization(&self) -> String {
        self.organization
            .clone()
            .filter(|o| !o.trim().is_empty())
            .unwrap_or_else(|| "Unnamed organization".to_string())
    }

    /// Snapshot key prefix
    pub fn snapshot_prefix(&self) -> &str {
        self.snapshot_prefix
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_SNAPSHOT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_later_layer() {
        let mut base = Config {
            user: Some("alice".to_string()),
            organization: Some("Acme".to_string()),
            ..Default::default()
        };
        base.merge(Config {
            user: Some("bob".to_string()),
            ..Default::default()
        });

        assert_eq!(base.user.as_deref(), Some("bob"));
        assert_eq!(base.organization.as_deref(), Some("Acme"));
    }

    #[test]
    fn test_snapshot_prefix_default() {
        let config = Config::default();
        assert_eq!(config.snapshot_prefix(), DEFAULT_SNAPSHOT_PREFIX);

        let config = Config {
            snapshot_prefix: Some("grc/exports".to_string()),
            ..Default::default()
        };
        assert_eq!(config.snapshot_prefix(), "grc/exports");
    }

    #[test]
    fn test_parse_project_config() {
        let yaml = "organization: Acme Health\nsnapshot_store: file:///tmp/snaps\n";
        let config: Config = serde_yml::from_str(yaml).unwrap();
        assert_eq!(config.organization(), "Acme Health");
        assert_eq!(config.snapshot_store.as_deref(), Some("file:///tmp/snaps"));
    }
}
