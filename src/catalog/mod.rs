//! Regulatory framework catalogs
//!
//! A catalog is the static content of one framework: its clause tree and the
//! control objectives attached to each clause. Ten catalogs ship embedded in
//! the binary (see `catalogs/`); organizations can add their own YAML files
//! under `.grc/catalogs/`.
//!
//! Catalogs are only ever *read* here. Loading them into the database is the
//! job of [`crate::core::seed`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Embed)]
#[folder = "catalogs/"]
struct EmbeddedCatalogs;

/// One framework's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Stable identifier used as the framework key (e.g., "ISO27001")
    pub code: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub clauses: Vec<CatalogClause>,
}

/// A clause and everything nested under it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogClause {
    #[serde(rename = "ref")]
    pub reference: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clauses: Vec<CatalogClause>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<CatalogControl>,
}

/// A control objective with implementation guidance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogControl {
    #[serde(rename = "ref")]
    pub reference: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

/// Errors raised while loading or validating catalogs
#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("failed to parse catalog {source_name}: {message}")]
    #[diagnostic(
        code(grc::catalog::parse),
        help("catalogs are YAML documents with code, name, version, and a clauses list")
    )]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("catalog {code}: {message}")]
    #[diagnostic(code(grc::catalog::invalid))]
    Invalid { code: String, message: String },

    #[error("unknown framework '{0}'")]
    #[diagnostic(
        code(grc::catalog::unknown),
        help("run `grc seed --list` to see the available frameworks")
    )]
    Unknown(String),

    #[error("failed to read {path}: {source}")]
    #[diagnostic(code(grc::catalog::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Catalog {
    /// Parse a catalog from YAML text
    pub fn from_yaml(source_name: &str, text: &str) -> Result<Self, CatalogError> {
        serde_yml::from_str(text).map_err(|e| CatalogError::Parse {
            source_name: source_name.to_string(),
            message: e.to_string(),
        })
    }

    /// All embedded catalogs, sorted by code
    pub fn builtin() -> Result<Vec<Catalog>, CatalogError> {
        let mut catalogs = Vec::new();
        for name in EmbeddedCatalogs::iter() {
            let Some(file) = EmbeddedCatalogs::get(&name) else {
                continue;
            };
            let text = String::from_utf8_lossy(&file.data);
            catalogs.push(Self::from_yaml(&name, &text)?);
        }
        catalogs.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(catalogs)
    }

    /// Find an embedded catalog by code (case-insensitive)
    pub fn builtin_by_code(code: &str) -> Result<Catalog, CatalogError> {
        Self::builtin()?
            .into_iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
            .ok_or_else(|| CatalogError::Unknown(code.to_string()))
    }

    /// Load every `*.yaml` / `*.yml` catalog below `dir`
    pub fn load_dir(dir: &Path) -> Result<Vec<Catalog>, CatalogError> {
        let mut catalogs = Vec::new();
        if !dir.exists() {
            return Ok(catalogs);
        }

        for entry in WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
        {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e == "yaml" || e == "yml");
            if !is_yaml {
                continue;
            }

            let text = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            catalogs.push(Self::from_yaml(&path.display().to_string(), &text)?);
        }

        Ok(catalogs)
    }

    /// Check structural rules: non-empty identity, titles, and unique refs
    pub fn validate(&self) -> Result<(), CatalogError> {
        let invalid = |message: String| CatalogError::Invalid {
            code: self.code.clone(),
            message,
        };

        if self.code.trim().is_empty() {
            return Err(invalid("code must not be empty".to_string()));
        }
        if self.code.contains(':') || self.code.contains('/') {
            return Err(invalid("code must not contain ':' or '/'".to_string()));
        }
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }

        let mut clause_refs = HashSet::new();
        let mut control_refs = HashSet::new();
        let mut stack: Vec<&CatalogClause> = self.clauses.iter().collect();

        while let Some(clause) = stack.pop() {
            if clause.reference.trim().is_empty() {
                return Err(invalid(format!("clause '{}' has an empty ref", clause.title)));
            }
            if clause.title.trim().is_empty() {
                return Err(invalid(format!("clause {} has an empty title", clause.reference)));
            }
            if !clause_refs.insert(clause.reference.as_str()) {
                return Err(invalid(format!("duplicate clause ref {}", clause.reference)));
            }

            for control in &clause.controls {
                if control.reference.trim().is_empty() || control.title.trim().is_empty() {
                    return Err(invalid(format!(
                        "control under clause {} needs a ref and a title",
                        clause.reference
                    )));
                }
                if !control_refs.insert(control.reference.as_str()) {
                    return Err(invalid(format!("duplicate control ref {}", control.reference)));
                }
            }

            stack.extend(clause.clauses.iter());
        }

        Ok(())
    }

    /// SHA-256 over the canonical JSON form
    pub fn content_hash(&self) -> String {
        // Struct field order is fixed, so serialization is deterministic
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(&canonical);
        format!("{:x}", hasher.finalize())
    }

    pub fn clause_count(&self) -> usize {
        fn count(clauses: &[CatalogClause]) -> usize {
            clauses.iter().map(|c| 1 + count(&c.clauses)).sum()
        }
        count(&self.clauses)
    }

    pub fn control_count(&self) -> usize {
        fn count(clauses: &[CatalogClause]) -> usize {
            clauses
                .iter()
                .map(|c| c.controls.len() + count(&c.clauses))
                .sum()
        }
        count(&self.clauses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
code: DEMO
name: Demo Standard
version: "1.0"
clauses:
  - ref: "1"
    title: Governance
    clauses:
      - ref: "1.1"
        title: Policy
        controls:
          - ref: "1.1.1"
            title: Policy approved
            objective: Management approves the policy.
  - ref: "2"
    title: Operations
    controls:
      - ref: "2.1"
        title: Backups
"#;

    #[test]
    fn test_parse_and_count() {
        let catalog = Catalog::from_yaml("sample", SAMPLE).unwrap();
        assert_eq!(catalog.code, "DEMO");
        assert_eq!(catalog.clause_count(), 3);
        assert_eq!(catalog.control_count(), 2);
        catalog.validate().unwrap();
    }

    #[test]
    fn test_duplicate_control_ref_rejected() {
        let mut catalog = Catalog::from_yaml("sample", SAMPLE).unwrap();
        catalog.clauses[1].controls.push(CatalogControl {
            reference: "1.1.1".to_string(),
            title: "Duplicate".to_string(),
            objective: None,
            guidance: None,
        });
        let err = catalog.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate control ref 1.1.1"));
    }

    #[test]
    fn test_duplicate_clause_ref_rejected() {
        let mut catalog = Catalog::from_yaml("sample", SAMPLE).unwrap();
        catalog.clauses[1].reference = "1".to_string();
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_content_hash_tracks_changes() {
        let a = Catalog::from_yaml("sample", SAMPLE).unwrap();
        let mut b = a.clone();
        assert_eq!(a.content_hash(), b.content_hash());

        b.clauses[0].title = "Leadership".to_string();
        assert_ne!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }

    #[test]
    fn test_builtin_catalogs_are_valid() {
        let catalogs = Catalog::builtin().unwrap();
        let codes: Vec<&str> = catalogs.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(
            codes,
            vec![
                "DORA", "GDPR", "HIPAA", "ISO22301", "ISO27001", "ISO9001", "NIS2", "NISTCSF",
                "PCIDSS", "SOC2"
            ]
        );
        for catalog in &catalogs {
            catalog.validate().unwrap();
            assert!(catalog.control_count() > 0, "{} has no controls", catalog.code);
        }
    }

    #[test]
    fn test_builtin_by_code_is_case_insensitive() {
        let catalog = Catalog::builtin_by_code("iso27001").unwrap();
        assert_eq!(catalog.code, "ISO27001");
        assert!(matches!(
            Catalog::builtin_by_code("SOX"),
            Err(CatalogError::Unknown(_))
        ));
    }

    #[test]
    fn test_load_dir_reads_yaml_only() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("demo.yaml"), SAMPLE).unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "not a catalog").unwrap();

        let catalogs = Catalog::load_dir(tmp.path()).unwrap();
        assert_eq!(catalogs.len(), 1);
        assert_eq!(catalogs[0].name, "Demo Standard");
    }
}
