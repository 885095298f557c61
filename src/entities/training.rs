//! Training program entity - recurring awareness and competence training

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::Entity;
use crate::core::identity::{EntityId, EntityPrefix};

/// How often a program must be repeated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Once,
    Monthly,
    Quarterly,
    #[default]
    Annual,
}

impl Frequency {
    /// Months between cycles; None for one-off programs
    pub fn months(&self) -> Option<u32> {
        match self {
            Frequency::Once => None,
            Frequency::Monthly => Some(1),
            Frequency::Quarterly => Some(3),
            Frequency::Annual => Some(12),
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Once => write!(f, "once"),
            Frequency::Monthly => write!(f, "monthly"),
            Frequency::Quarterly => write!(f, "quarterly"),
            Frequency::Annual => write!(f, "annual"),
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "once" => Ok(Frequency::Once),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "annual" | "annually" | "yearly" => Ok(Frequency::Annual),
            _ => Err(format!(
                "Invalid frequency: {}. Use once, monthly, quarterly, or annual",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    #[default]
    Active,
    Retired,
}

impl std::fmt::Display for TrainingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrainingStatus::Active => write!(f, "active"),
            TrainingStatus::Retired => write!(f, "retired"),
        }
    }
}

impl std::str::FromStr for TrainingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(TrainingStatus::Active),
            "retired" => Ok(TrainingStatus::Retired),
            _ => Err(format!("Invalid training status: {}", s)),
        }
    }
}

/// A training program the organization runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingProgram {
    pub id: EntityId,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub frequency: Frequency,

    /// Required for all staff
    #[serde(default)]
    pub mandatory: bool,

    /// Framework the program supports (e.g., "HIPAA")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_code: Option<String>,

    #[serde(default)]
    pub status: TrainingStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_due: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_completed: Option<NaiveDate>,

    pub created: DateTime<Utc>,
    pub author: String,
}

impl Entity for TrainingProgram {
    const PREFIX: EntityPrefix = EntityPrefix::Trn;

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

impl TrainingProgram {
    pub fn new(title: String, frequency: Frequency, author: String) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Trn),
            title,
            description: None,
            frequency,
            mandatory: false,
            framework_code: None,
            status: TrainingStatus::Active,
            next_due: None,
            last_completed: None,
            created: Utc::now(),
            author,
        }
    }

    /// Record a completed cycle on `on` and schedule the next one.
    /// One-off programs retire instead.
    pub fn complete_cycle(&mut self, on: NaiveDate) {
        self.last_completed = Some(on);
        match self.frequency.months() {
            Some(months) => {
                let base = self.next_due.map_or(on, |due| due.max(on));
                self.next_due = base.checked_add_months(Months::new(months));
            }
            None => {
                self.next_due = None;
                self.status = TrainingStatus::Retired;
            }
        }
    }

    /// Active and due on or before `horizon`
    pub fn is_due_by(&self, horizon: NaiveDate) -> bool {
        self.status == TrainingStatus::Active && self.next_due.is_some_and(|d| d <= horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_complete_cycle_advances_from_due_date() {
        let mut program = TrainingProgram::new(
            "Security awareness".to_string(),
            Frequency::Annual,
            "hr".to_string(),
        );
        program.next_due = Some(date(2026, 3, 1));

        // Completed early: next cycle is a year after the scheduled date
        program.complete_cycle(date(2026, 2, 20));
        assert_eq!(program.next_due, Some(date(2027, 3, 1)));
        assert_eq!(program.last_completed, Some(date(2026, 2, 20)));
    }

    #[test]
    fn test_complete_cycle_late_uses_completion_date() {
        let mut program =
            TrainingProgram::new("Phishing drill".to_string(), Frequency::Quarterly, "it".to_string());
        program.next_due = Some(date(2026, 1, 31));

        program.complete_cycle(date(2026, 2, 10));
        assert_eq!(program.next_due, Some(date(2026, 5, 10)));
    }

    #[test]
    fn test_once_program_retires() {
        let mut program =
            TrainingProgram::new("GDPR onboarding".to_string(), Frequency::Once, "dpo".to_string());
        program.complete_cycle(date(2026, 4, 1));
        assert_eq!(program.status, TrainingStatus::Retired);
        assert_eq!(program.next_due, None);
        assert!(!program.is_due_by(date(2030, 1, 1)));
    }
}
