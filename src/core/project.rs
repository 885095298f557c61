//! Project discovery and structure

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project metadata directory
pub const PROJECT_DIR: &str = ".grc";

/// Represents a GRC workspace rooted at the parent of `.grc/`
#[derive(Debug)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Find project root by walking up from the current directory
    pub fn discover() -> Result<Self, ProjectError> {
        let current = std::env::current_dir().map_err(|e| ProjectError::IoError(e.to_string()))?;
        Self::discover_from(&current)
    }

    /// Find project root by walking up from the given directory
    pub fn discover_from(start: &Path) -> Result<Self, ProjectError> {
        let mut current = start
            .canonicalize()
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        loop {
            if current.join(PROJECT_DIR).is_dir() {
                return Ok(Self { root: current });
            }

            if !current.pop() {
                return Err(ProjectError::NotFound {
                    searched_from: start.to_path_buf(),
                });
            }
        }
    }

    /// Create a new project structure at the given path
    pub fn init(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        if root.join(PROJECT_DIR).exists() {
            return Err(ProjectError::AlreadyExists(root));
        }

        Self::create_structure(&root)?;
        Ok(Self { root })
    }

    /// Force initialization even if .grc/ exists (rewrites the default config,
    /// leaves the database alone)
    pub fn init_force(path: &Path) -> Result<Self, ProjectError> {
        let root = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        Self::create_structure(&root)?;
        Ok(Self { root })
    }

    fn create_structure(root: &Path) -> Result<(), ProjectError> {
        let grc_dir = root.join(PROJECT_DIR);
        std::fs::create_dir_all(grc_dir.join("catalogs"))
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(grc_dir.join("config.yaml"), Self::default_config())
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        std::fs::write(grc_dir.join(".gitignore"), "grc.db\ngrc.db-wal\ngrc.db-shm\n")
            .map_err(|e| ProjectError::IoError(e.to_string()))?;

        Ok(())
    }

    fn default_config() -> &'static str {
        r#"# GRC Workbench Project Configuration

# Organization name shown in reports and snapshots
# organization: ""

# Acting user for access checks (default: $GRC_USER, git user.name, $USER)
# user: ""

# Default output format (auto, yaml, tsv, json, csv, md, id)
# default_format: auto

# Object store URL for `grc snapshot publish` (s3://bucket/path, file:///dir)
# Publishing is disabled unless this or GRC_SNAPSHOT_STORE is set.
# snapshot_store: ""
# snapshot_prefix: snapshots
"#
    }

    /// Get the project root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the .grc configuration directory
    pub fn grc_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR)
    }

    /// Path of the SQLite database
    pub fn db_path(&self) -> PathBuf {
        self.grc_dir().join("grc.db")
    }

    /// Directory scanned for organization-specific catalogs
    pub fn catalog_dir(&self) -> PathBuf {
        self.grc_dir().join("catalogs")
    }
}

/// Errors that can occur during project operations
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("not a GRC project (searched from {searched_from:?}). Run 'grc init' to create one.")]
    NotFound { searched_from: PathBuf },

    #[error("GRC project already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("IO error: {0}")]
    IoError(String),
}
