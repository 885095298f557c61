//! Control implementation records - how the organization satisfies a control

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};

/// Implementation state of a control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImplementationStatus {
    #[default]
    NotStarted,
    InProgress,
    Implemented,
    NotApplicable,
}

impl ImplementationStatus {
    pub fn all() -> &'static [ImplementationStatus] {
        &[
            ImplementationStatus::NotStarted,
            ImplementationStatus::InProgress,
            ImplementationStatus::Implemented,
            ImplementationStatus::NotApplicable,
        ]
    }
}

impl std::fmt::Display for ImplementationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImplementationStatus::NotStarted => write!(f, "not_started"),
            ImplementationStatus::InProgress => write!(f, "in_progress"),
            ImplementationStatus::Implemented => write!(f, "implemented"),
            ImplementationStatus::NotApplicable => write!(f, "not_applicable"),
        }
    }
}

impl std::str::FromStr for ImplementationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "not_started" | "notstarted" => Ok(ImplementationStatus::NotStarted),
            "in_progress" | "inprogress" => Ok(ImplementationStatus::InProgress),
            "implemented" | "done" => Ok(ImplementationStatus::Implemented),
            "not_applicable" | "notapplicable" | "n/a" | "na" => {
                Ok(ImplementationStatus::NotApplicable)
            }
            _ => Err(format!(
                "Invalid implementation status: {}. Use not_started, in_progress, implemented, or not_applicable",
                s
            )),
        }
    }
}

/// The organization's record for one control
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlImplementation {
    pub id: EntityId,
    pub control_id: EntityId,

    #[serde(default)]
    pub status: ImplementationStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// How the control is met
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,

    /// Pointer to evidence (document, ticket, URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,

    pub updated: DateTime<Utc>,
    pub updated_by: String,
}

impl ControlImplementation {
    pub fn new(control_id: EntityId, status: ImplementationStatus, updated_by: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Impl),
            control_id,
            status,
            owner: None,
            notes: None,
            evidence: None,
            updated: Utc::now(),
            updated_by,
        }
    }
}
