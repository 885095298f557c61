//! Framework, clause, and control records seeded from catalogs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::EntityId;
use crate::entities::implementation::ImplementationStatus;

/// A regulatory framework or standard (e.g., ISO 27001)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Framework {
    pub id: EntityId,

    /// Stable catalog code (e.g., "ISO27001")
    pub code: String,

    pub name: String,

    /// Edition or version of the document (e.g., "2022")
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// SHA-256 of the catalog this framework was last seeded from
    pub content_hash: String,

    pub seeded_at: DateTime<Utc>,
}

/// A framework with tree sizes, as listed by `grc framework list`
#[derive(Debug, Clone, Serialize)]
pub struct FrameworkSummary {
    #[serde(flatten)]
    pub framework: Framework,
    pub clause_count: usize,
    pub control_count: usize,
}

/// A node in a framework's clause tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clause {
    pub id: EntityId,
    pub framework_id: EntityId,

    /// Parent clause; None for top-level chapters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<EntityId>,

    /// Clause reference within the framework (e.g., "A.5", "Art. 32")
    #[serde(rename = "ref")]
    pub reference: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Depth-first order within the framework
    pub position: u32,
}

/// A control objective attached to a clause
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Control {
    pub id: EntityId,
    pub framework_id: EntityId,
    pub clause_id: EntityId,

    #[serde(rename = "ref")]
    pub reference: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objective: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,

    /// Catalog order within the framework
    pub position: u32,
}

/// A control joined with its framework code and implementation status
#[derive(Debug, Clone, Serialize)]
pub struct ControlView {
    #[serde(flatten)]
    pub control: Control,
    pub framework_code: String,
    pub implementation_status: ImplementationStatus,
}

impl ControlView {
    /// Human reference of the form `CODE:REF`
    pub fn qualified_ref(&self) -> String {
        format!("{}:{}", self.framework_code, self.control.reference)
    }
}

/// A clause with its controls and nested clauses
#[derive(Debug, Clone, Serialize)]
pub struct ClauseNode {
    #[serde(flatten)]
    pub clause: Clause,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub controls: Vec<ControlView>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ClauseNode>,
}

impl ClauseNode {
    /// Total controls in this subtree
    pub fn control_count(&self) -> usize {
        self.controls.len() + self.children.iter().map(|c| c.control_count()).sum::<usize>()
    }
}
