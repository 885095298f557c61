//! Task entity - units of work tracked on the kanban board

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::core::entity::{Entity, Priority};
use crate::core::identity::{EntityId, EntityPrefix};

/// Task lifecycle status
///
/// The normal flow is TODO -> IN_PROGRESS -> IN_REVIEW -> COMPLETED.
/// OVERDUE and CANCELLED are reachable from any state; no transition is
/// guarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    InReview,
    Completed,
    Overdue,
    Cancelled,
}

impl TaskStatus {
    /// All statuses in board column order
    pub fn all() -> &'static [TaskStatus] {
        &[
            TaskStatus::Todo,
            TaskStatus::InProgress,
            TaskStatus::InReview,
            TaskStatus::Completed,
            TaskStatus::Overdue,
            TaskStatus::Cancelled,
        ]
    }

    /// Completed and cancelled tasks no longer need work
    pub fn is_closed(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Human column heading
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To Do",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::InReview => "In Review",
            TaskStatus::Completed => "Completed",
            TaskStatus::Overdue => "Overdue",
            TaskStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "TODO"),
            TaskStatus::InProgress => write!(f, "IN_PROGRESS"),
            TaskStatus::InReview => write!(f, "IN_REVIEW"),
            TaskStatus::Completed => write!(f, "COMPLETED"),
            TaskStatus::Overdue => write!(f, "OVERDUE"),
            TaskStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().replace('-', "_").as_str() {
            "TODO" | "TO_DO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" | "INPROGRESS" | "DOING" => Ok(TaskStatus::InProgress),
            "IN_REVIEW" | "INREVIEW" | "REVIEW" => Ok(TaskStatus::InReview),
            "COMPLETED" | "DONE" => Ok(TaskStatus::Completed),
            "OVERDUE" => Ok(TaskStatus::Overdue),
            "CANCELLED" | "CANCELED" => Ok(TaskStatus::Cancelled),
            _ => Err(format!(
                "Invalid task status: {}. Use todo, in_progress, in_review, completed, overdue, or cancelled",
                s
            )),
        }
    }
}

/// A unit of compliance work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: EntityId,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// Control this task works toward
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub control_id: Option<EntityId>,

    /// Risk this task treats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_id: Option<EntityId>,

    /// CAPA this task carries out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capa_id: Option<EntityId>,

    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub author: String,
}

impl Entity for Task {
    const PREFIX: EntityPrefix = EntityPrefix::Task;

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn status(&self) -> String {
        self.status.to_string().to_lowercase()
    }

    fn created(&self) -> DateTime<Utc> {
        self.created
    }
}

impl Task {
    /// Create a new TODO task
    pub fn new(title: String, author: String) -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new(EntityPrefix::Task),
            title,
            description: None,
            status: TaskStatus::Todo,
            priority: Priority::default(),
            assignee: None,
            due_date: None,
            control_id: None,
            risk_id: None,
            capa_id: None,
            created: now,
            updated: now,
            author,
        }
    }

    /// Whether the task is open with a due date before `today`
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        !self.status.is_closed() && self.due_date.is_some_and(|d| d < today)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new("Draft access control policy".to_string(), "alice".to_string());
        assert!(task.id.to_string().starts_with("TASK-"));
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.status(), "todo");
    }

    #[test]
    fn test_status_serde_uses_screaming_case() {
        let json = serde_json::to_string(&TaskStatus::InReview).unwrap();
        assert_eq!(json, "\"IN_REVIEW\"");
        let parsed: TaskStatus = serde_json::from_str("\"CANCELLED\"").unwrap();
        assert_eq!(parsed, TaskStatus::Cancelled);
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
        assert_eq!("done".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
        assert!("blocked".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_past_due() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let mut task = Task::new("Rotate keys".to_string(), "bob".to_string());
        assert!(!task.is_past_due(today));

        task.due_date = NaiveDate::from_ymd_opt(2026, 3, 9);
        assert!(task.is_past_due(today));

        task.status = TaskStatus::Completed;
        assert!(!task.is_past_due(today));
    }
}
