//! Framework snapshots: JSON export, object store publishing, and import
//!
//! A snapshot is a self-contained JSON document holding one framework's
//! clause tree and controls, optionally with the organization's
//! implementation status per control. Snapshots can be written to disk,
//! published to an object store (S3, local filesystem, or memory), and
//! imported into another workspace, where they are seeded like a catalog.

use std::path::Path as FsPath;

use chrono::{DateTime, Utc};
use object_store::path::{Path as StorePath, PathPart};
use object_store::{ObjectStore, PutPayload};
use rusqlite::{params, Connection, OptionalExtension};
use rust_embed::Embed;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::catalog::{Catalog, CatalogClause, CatalogControl};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::seed::{seed_in, SeedError, SeedReport};
use crate::core::store::{upsert_implementation, ImplementationUpdate, Store, StoreError};
use crate::entities::framework::ClauseNode;
use crate::entities::implementation::ImplementationStatus;

/// Snapshot document version written by this build
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Embed)]
#[folder = "schemas/"]
struct EmbeddedSchemas;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("no snapshot store configured; set GRC_SNAPSHOT_STORE or snapshot_store in config.yaml")]
    StoreNotConfigured,

    #[error("invalid snapshot store URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("snapshot does not match the schema:\n  {}", .0.join("\n  "))]
    Schema(Vec<String>),

    #[error("snapshot schema is unavailable: {0}")]
    SchemaUnavailable(String),

    #[error("snapshot of {code} records content hash {recorded} but its content hashes to {actual}; re-export it or pass --force")]
    HashMismatch {
        code: String,
        recorded: String,
        actual: String,
    },

    #[error("invalid snapshot JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The whole snapshot document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkSnapshot {
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub organization: String,
    pub framework: SnapshotFramework,
    pub clauses: Vec<SnapshotClause>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFramework {
    pub code: String,
    pub name: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub content_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotClause {
    #[serde(rename = "ref")]
    pub reference: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<SnapshotControl>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub clauses: Vec<SnapshotClause>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotControl {
    #[serde(rename = "ref")]
    pub reference: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implementation: Option<SnapshotImplementation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotImplementation {
    pub status: ImplementationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    pub updated: DateTime<Utc>,
}

impl FrameworkSnapshot {
    /// Convert back into a catalog (implementation data is dropped)
    pub fn to_catalog(&self) -> Catalog {
        fn clause(c: &SnapshotClause) -> CatalogClause {
            CatalogClause {
                reference: c.reference.clone(),
                title: c.title.clone(),
                description: c.description.clone(),
                clauses: c.clauses.iter().map(clause).collect(),
                controls: c
                    .controls
                    .iter()
                    .map(|ctrl| CatalogControl {
                        reference: ctrl.reference.clone(),
                        title: ctrl.title.clone(),
                        objective: ctrl.objective.clone(),
                        guidance: ctrl.guidance.clone(),
                    })
                    .collect(),
            }
        }

        Catalog {
            code: self.framework.code.clone(),
            name: self.framework.name.clone(),
            version: self.framework.version.clone(),
            publisher: self.framework.publisher.clone(),
            description: self.framework.description.clone(),
            clauses: self.clauses.iter().map(clause).collect(),
        }
    }

    /// Every control carrying implementation data, as `(ref, implementation)`
    pub fn implementations(&self) -> Vec<(&str, &SnapshotImplementation)> {
        fn walk<'a>(
            clauses: &'a [SnapshotClause],
            out: &mut Vec<(&'a str, &'a SnapshotImplementation)>,
        ) {
            for clause in clauses {
                for control in &clause.controls {
                    if let Some(implementation) = &control.implementation {
                        out.push((control.reference.as_str(), implementation));
                    }
                }
                walk(&clause.clauses, out);
            }
        }

        let mut out = Vec::new();
        walk(&self.clauses, &mut out);
        out
    }

    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build a snapshot of a seeded framework
pub fn build_snapshot(
    store: &Store,
    code: &str,
    organization: &str,
    include_status: bool,
) -> Result<FrameworkSnapshot, SnapshotError> {
    let framework = store.get_framework(code)?;
    let tree = store.clause_tree(&framework.code)?;

    fn convert(
        store: &Store,
        node: &ClauseNode,
        include_status: bool,
    ) -> Result<SnapshotClause, StoreError> {
        let mut controls = Vec::with_capacity(node.controls.len());
        for view in &node.controls {
            let implementation = if include_status {
                store
                    .get_implementation(&view.control.id)?
                    .map(|record| SnapshotImplementation {
                        status: record.status,
                        owner: record.owner,
                        notes: record.notes,
                        evidence: record.evidence,
                        updated: record.updated,
                    })
            } else {
                None
            };
            controls.push(SnapshotControl {
                reference: view.control.reference.clone(),
                title: view.control.title.clone(),
                objective: view.control.objective.clone(),
                guidance: view.control.guidance.clone(),
                implementation,
            });
        }

        Ok(SnapshotClause {
            reference: node.clause.reference.clone(),
            title: node.clause.title.clone(),
            description: node.clause.description.clone(),
            controls,
            clauses: node
                .children
                .iter()
                .map(|child| convert(store, child, include_status))
                .collect::<Result<_, _>>()?,
        })
    }

    let clauses = tree
        .iter()
        .map(|node| convert(store, node, include_status))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FrameworkSnapshot {
        schema_version: SNAPSHOT_VERSION,
        generated_at: Utc::now(),
        organization: organization.to_string(),
        framework: SnapshotFramework {
            code: framework.code,
            name: framework.name,
            version: framework.version,
            publisher: framework.publisher,
            description: framework.description,
            content_hash: framework.content_hash,
        },
        clauses,
    })
}

/// Write pretty JSON to `path`
pub fn write_snapshot(snapshot: &FrameworkSnapshot, path: &FsPath) -> Result<(), SnapshotError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, snapshot.to_json()? + "\n")?;
    Ok(())
}

/// Parse and schema-check a snapshot document
pub fn parse_snapshot(json: &str) -> Result<FrameworkSnapshot, SnapshotError> {
    let instance: serde_json::Value = serde_json::from_str(json)?;

    let file = EmbeddedSchemas::get("snapshot.schema.json")
        .ok_or_else(|| SnapshotError::SchemaUnavailable("snapshot.schema.json".to_string()))?;
    let schema: serde_json::Value = serde_json::from_slice(&file.data)?;
    let validator = jsonschema::validator_for(&schema)
        .map_err(|e| SnapshotError::SchemaUnavailable(e.to_string()))?;

    let errors: Vec<String> = validator
        .iter_errors(&instance)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();
    if !errors.is_empty() {
        return Err(SnapshotError::Schema(errors));
    }

    Ok(serde_json::from_value(instance)?)
}

/// What an import changed
#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub seed: SeedReport,
    /// Implementation records restored from the snapshot
    pub implementations: usize,
}

/// Seed a snapshot's framework into `store`. With `restore_as`, recorded
/// implementation status is written back under that user name. Seeding and
/// restoring commit together or not at all.
///
/// The framework's recorded content hash must match the snapshot content.
/// With `force` a mismatch is logged and the import goes ahead.
pub fn import_snapshot(
    store: &Store,
    json: &str,
    force: bool,
    restore_as: Option<&str>,
) -> Result<ImportReport, SnapshotError> {
    let snapshot = parse_snapshot(json)?;
    let catalog = snapshot.to_catalog();
    catalog.validate().map_err(SeedError::from)?;

    let actual = catalog.content_hash();
    if actual != snapshot.framework.content_hash {
        if !force {
            return Err(SnapshotError::HashMismatch {
                code: snapshot.framework.code.clone(),
                recorded: snapshot.framework.content_hash.clone(),
                actual,
            });
        }
        tracing::warn!(
            code = %snapshot.framework.code,
            recorded = %snapshot.framework.content_hash,
            actual = %actual,
            "snapshot content hash mismatch, importing anyway"
        );
    }

    let (seed_report, restored) = store.transaction(|tx| {
        let seed_report = seed_in(tx, &catalog, force)?;

        let mut restored = 0;
        if let Some(user) = restore_as {
            for (reference, implementation) in snapshot.implementations() {
                let control_id = control_in(tx, &catalog.code, reference)?;
                upsert_implementation(
                    tx,
                    ImplementationUpdate {
                        control_id: &control_id,
                        status: implementation.status,
                        owner: implementation.owner.clone(),
                        notes: implementation.notes.clone(),
                        evidence: implementation.evidence.clone(),
                        updated_by: user,
                    },
                )?;
                restored += 1;
            }
        }
        Ok((seed_report, restored))
    })?;

    tracing::info!(
        code = %snapshot.framework.code,
        outcome = %seed_report.outcome,
        restored,
        "imported snapshot"
    );
    Ok(ImportReport {
        seed: seed_report,
        implementations: restored,
    })
}

fn control_in(tx: &Connection, code: &str, reference: &str) -> Result<EntityId, StoreError> {
    tx.query_row(
        r#"SELECT c.id FROM controls c JOIN frameworks f ON f.id = c.framework_id
           WHERE f.code = ?1 COLLATE NOCASE AND c.ref = ?2"#,
        params![code, reference],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found(EntityPrefix::Ctrl, format!("{}:{}", code, reference)))
}

/// Object store URL to publish to. Publishing is disabled without one.
pub fn configured_store(url: Option<&str>) -> Result<&str, SnapshotError> {
    url.map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or(SnapshotError::StoreNotConfigured)
}

fn snapshot_key(base: &StorePath, prefix: &str, code: &str, file: &str) -> StorePath {
    let mut parts: Vec<PathPart<'_>> = base.parts().collect();
    parts.extend(
        prefix
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| PathPart::from(s.to_string())),
    );
    parts.push(PathPart::from(code.to_string()));
    parts.push(PathPart::from(file.to_string()));
    StorePath::from_iter(parts)
}

/// Upload a snapshot as `<prefix>/<code>/<version>.json` and
/// `<prefix>/<code>/latest.json`. Returns the keys written.
pub async fn put_snapshot(
    store: &dyn ObjectStore,
    base: &StorePath,
    prefix: &str,
    snapshot: &FrameworkSnapshot,
) -> Result<Vec<StorePath>, SnapshotError> {
    let body = snapshot.to_json()?.into_bytes();
    let code = &snapshot.framework.code;
    let version_file = format!("{}.json", snapshot.framework.version);

    let mut written = Vec::new();
    for file in [version_file.as_str(), "latest.json"] {
        let key = snapshot_key(base, prefix, code, file);
        store.put(&key, PutPayload::from(body.clone())).await?;
        tracing::debug!(%key, bytes = body.len(), "uploaded snapshot object");
        written.push(key);
    }
    Ok(written)
}

/// Publish to the object store at `url` (`s3://`, `file://`, `memory://`).
/// S3 credentials come from the usual `AWS_*` environment variables.
pub fn publish_snapshot(
    snapshot: &FrameworkSnapshot,
    url: &str,
    prefix: &str,
) -> Result<Vec<String>, SnapshotError> {
    let parsed = Url::parse(url).map_err(|source| SnapshotError::InvalidUrl {
        url: url.to_string(),
        source,
    })?;
    let options = std::env::vars()
        .filter(|(key, _)| key.starts_with("AWS_"))
        .map(|(key, value)| (key.to_ascii_lowercase(), value));
    let (store, base) = object_store::parse_url_opts(&parsed, options)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let keys = runtime.block_on(put_snapshot(store.as_ref(), &base, prefix, snapshot))?;

    tracing::info!(
        code = %snapshot.framework.code,
        store = %parsed,
        objects = keys.len(),
        "published snapshot"
    );
    Ok(keys.iter().map(|k| k.to_string()).collect())
}
