//! CAPA entity type - Corrective and Preventive Actions

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Priority};
use crate::core::identity::{EntityId, EntityPrefix};

/// CAPA type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapaType {
    #[default]
    Corrective,
    Preventive,
}

impl std::fmt::Display for CapaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapaType::Corrective => write!(f, "corrective"),
            CapaType::Preventive => write!(f, "preventive"),
        }
    }
}

impl std::str::FromStr for CapaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "corrective" => Ok(CapaType::Corrective),
            "preventive" => Ok(CapaType::Preventive),
            _ => Err(format!(
                "Invalid CAPA type: {}. Use corrective or preventive",
                s
            )),
        }
    }
}

/// Finding that triggered the CAPA
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapaSource {
    #[default]
    Audit,
    Incident,
    Risk,
    ControlFailure,
    Complaint,
}

impl std::fmt::Display for CapaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapaSource::Audit => write!(f, "audit"),
            CapaSource::Incident => write!(f, "incident"),
            CapaSource::Risk => write!(f, "risk"),
            CapaSource::ControlFailure => write!(f, "control_failure"),
            CapaSource::Complaint => write!(f, "complaint"),
        }
    }
}

impl std::str::FromStr for CapaSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "audit" => Ok(CapaSource::Audit),
            "incident" => Ok(CapaSource::Incident),
            "risk" => Ok(CapaSource::Risk),
            "control_failure" | "controlfailure" => Ok(CapaSource::ControlFailure),
            "complaint" => Ok(CapaSource::Complaint),
            _ => Err(format!(
                "Invalid CAPA source: {}. Use audit, incident, risk, control_failure, or complaint",
                s
            )),
        }
    }
}

/// CAPA workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CapaStatus {
    #[default]
    Open,
    Investigation,
    Implementation,
    Verification,
    Closed,
}

impl std::fmt::Display for CapaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CapaStatus::Open => write!(f, "open"),
            CapaStatus::Investigation => write!(f, "investigation"),
            CapaStatus::Implementation => write!(f, "implementation"),
            CapaStatus::Verification => write!(f, "verification"),
            CapaStatus::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for CapaStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(CapaStatus::Open),
            "investigation" => Ok(CapaStatus::Investigation),
            "implementation" => Ok(CapaStatus::Implementation),
            "verification" => Ok(CapaStatus::Verification),
            "closed" => Ok(CapaStatus::Closed),
            _ => Err(format!(
                "Invalid CAPA status: {}. Use open, investigation, implementation, verification, or closed",
                s
            )),
        }
    }
}

/// A CAPA entity - Corrective/Preventive Action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capa {
    pub id: EntityId,

    pub title: String,

    #[serde(default)]
    pub capa_type: CapaType,

    #[serde(default)]
    pub source: CapaSource,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_statement: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_cause: Option<String>,

    #[serde(default)]
    pub status: CapaStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// Risk the CAPA addresses
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_id: Option<EntityId>,

    /// Control found deficient
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_id: Option<EntityId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_date: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_by: Option<String>,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub author: String,
}

impl Entity for Capa {
    const PREFIX: EntityPrefix = EntityPrefix::Capa;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> String {
        self.status.to_string()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl Capa {
    /// Create a new CAPA with the given parameters
    pub fn new(title: String, capa_type: CapaType, source: CapaSource, author: String) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Capa),
            title,
            capa_type,
            source,
            priority: Priority::default(),
            problem_statement: None,
            root_cause: None,
            status: CapaStatus::default(),
            owner: None,
            due_date: None,
            risk_id: None,
            control_id: None,
            closed_date: None,
            closed_by: None,
            created: now,
            updated: now,
            author,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status != CapaStatus::Closed
    }

    /// Open with a due date before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date.is_some_and(|d| d < today)
    }

    /// Move to a non-closed stage. Leaving `Closed` clears the closure record.
    pub fn reopen_as(&mut self, status: CapaStatus) {
        if self.status == CapaStatus::Closed && status != CapaStatus::Closed {
            self.closed_date = None;
            self.closed_by = None;
        }
        self.status = status;
    }

    /// Mark closed on `date` by `by`
    pub fn close(&mut self, date: NaiveDate, by: String) {
        self.status = CapaStatus::Closed;
        self.closed_date = Some(date);
        self.closed_by = Some(by);
        self.updated = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capa_creation() {
        let capa = Capa::new(
            "MFA gap found in internal audit".to_string(),
            CapaType::Corrective,
            CapaSource::Audit,
            "test".to_string(),
        );

        assert!(capa.id.to_string().starts_with("CAPA-"));
        assert_eq!(capa.status, CapaStatus::Open);
        assert!(capa.is_open());
    }

    #[test]
    fn test_capa_overdue_and_close() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let mut capa = Capa::new(
            "Backup restore failed".to_string(),
            CapaType::Corrective,
            CapaSource::ControlFailure,
            "test".to_string(),
        );
        capa.due_date = NaiveDate::from_ymd_opt(2026, 1, 1);
        assert!(capa.is_overdue(today));

        capa.close(today, "qa-lead".to_string());
        assert!(!capa.is_overdue(today));
        assert_eq!(capa.closed_by.as_deref(), Some("qa-lead"));
        assert_eq!(capa.status(), "closed");
    }

    #[test]
    fn test_reopening_clears_closure() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let mut capa = Capa::new(
            "Phishing drill failure rate".to_string(),
            CapaType::Preventive,
            CapaSource::Incident,
            "test".to_string(),
        );
        capa.close(today, "qa-lead".to_string());

        capa.reopen_as(CapaStatus::Investigation);
        assert!(capa.is_open());
        assert_eq!(capa.status, CapaStatus::Investigation);
        assert_eq!(capa.closed_date, None);
        assert_eq!(capa.closed_by, None);
    }

    #[test]
    fn test_capa_source_from_str() {
        assert_eq!(
            "control_failure".parse::<CapaSource>().unwrap(),
            CapaSource::ControlFailure
        );
        assert!("rumor".parse::<CapaSource>().is_err());
    }
}
