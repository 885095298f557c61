//! Risk entity type - risk register entries scored by likelihood and impact

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// Risk level derived from the likelihood x impact score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Map a 1..=25 score onto a level
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=4 => RiskLevel::Low,
            5..=9 => RiskLevel::Medium,
            10..=16 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }

    pub fn all() -> &'static [RiskLevel] {
        &[
            RiskLevel::Low,
            RiskLevel::Medium,
            RiskLevel::High,
            RiskLevel::Critical,
        ]
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
            RiskLevel::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            _ => Err(format!("Unknown risk level: {}", s)),
        }
    }
}

/// Risk register status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RiskStatus {
    #[default]
    Identified,
    Assessed,
    Treating,
    Accepted,
    Closed,
}

impl RiskStatus {
    /// Open risks still count toward exposure
    pub fn is_open(&self) -> bool {
        !matches!(self, RiskStatus::Closed)
    }
}

impl std::fmt::Display for RiskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskStatus::Identified => write!(f, "identified"),
            RiskStatus::Assessed => write!(f, "assessed"),
            RiskStatus::Treating => write!(f, "treating"),
            RiskStatus::Accepted => write!(f, "accepted"),
            RiskStatus::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for RiskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "identified" => Ok(RiskStatus::Identified),
            "assessed" => Ok(RiskStatus::Assessed),
            "treating" => Ok(RiskStatus::Treating),
            "accepted" => Ok(RiskStatus::Accepted),
            "closed" => Ok(RiskStatus::Closed),
            _ => Err(format!(
                "Invalid risk status: {}. Use identified, assessed, treating, accepted, or closed",
                s
            )),
        }
    }
}

/// Risk treatment option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Treatment {
    #[default]
    Mitigate,
    Accept,
    Transfer,
    Avoid,
}

impl std::fmt::Display for Treatment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Treatment::Mitigate => write!(f, "mitigate"),
            Treatment::Accept => write!(f, "accept"),
            Treatment::Transfer => write!(f, "transfer"),
            Treatment::Avoid => write!(f, "avoid"),
        }
    }
}

impl std::str::FromStr for Treatment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mitigate" => Ok(Treatment::Mitigate),
            "accept" => Ok(Treatment::Accept),
            "transfer" => Ok(Treatment::Transfer),
            "avoid" => Ok(Treatment::Avoid),
            _ => Err(format!(
                "Invalid treatment: {}. Use mitigate, accept, transfer, or avoid",
                s
            )),
        }
    }
}

/// Validate a likelihood or impact rating
pub fn validate_rating(value: u8) -> Result<u8, String> {
    if (1..=5).contains(&value) {
        Ok(value)
    } else {
        Err(format!("rating must be between 1 and 5, got {}", value))
    }
}

/// A risk register entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Risk {
    pub id: EntityId,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Free-form category (e.g., "security", "privacy", "operational")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Likelihood rating (1-5)
    pub likelihood: u8,

    /// Impact rating (1-5)
    pub impact: u8,

    #[serde(default)]
    pub treatment: Treatment,

    #[serde(default)]
    pub status: RiskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    /// Control that mitigates this risk
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_id: Option<EntityId>,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub author: String,
}

impl Entity for Risk {
    const PREFIX: EntityPrefix = EntityPrefix::Risk;

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

impl Risk {
    /// Create a new risk; ratings must be 1..=5
    pub fn new(title: String, likelihood: u8, impact: u8, author: String) -> Result<Self, String> {
        let now = Utc::now();
        Ok(Self {
            id: EntityId::new(EntityPrefix::Risk),
            title,
            description: None,
            category: None,
            likelihood: validate_rating(likelihood)?,
            impact: validate_rating(impact)?,
            treatment: Treatment::default(),
            status: RiskStatus::default(),
            owner: None,
            control_id: None,
            created: now,
            updated: now,
            author,
        })
    }

    /// Inherent risk score (likelihood x impact)
    pub fn score(&self) -> u8 {
        self.likelihood * self.impact
    }

    pub fn level(&self) -> RiskLevel {
        RiskLevel::from_score(self.score())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(RiskLevel::from_score(1), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(4), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(5), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(9), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(10), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(16), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(20), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(25), RiskLevel::Critical);
    }

    #[test]
    fn test_risk_score() {
        let risk = Risk::new("Ransomware on file servers".to_string(), 4, 5, "a".to_string()).unwrap();
        assert_eq!(risk.score(), 20);
        assert_eq!(risk.level(), RiskLevel::Critical);
        assert_eq!(risk.status(), "identified");
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Risk::new("x".to_string(), 0, 3, "a".to_string()).is_err());
        assert!(Risk::new("x".to_string(), 3, 6, "a".to_string()).is_err());
    }

    #[test]
    fn test_treatment_from_str() {
        assert_eq!("Transfer".parse::<Treatment>().unwrap(), Treatment::Transfer);
        assert!("ignore".parse::<Treatment>().is_err());
    }
}
