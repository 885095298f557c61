//! Kanban board over tasks
//!
//! Moving a card is optimistic: the card moves locally first, then the new
//! status is written through a [`StatusSink`]. If the write fails the card
//! goes back to exactly where it was and the error is returned. There is no
//! retry and no merging with concurrent edits.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::core::access::{AccessPolicy, Action};
use crate::core::entity::Priority;
use crate::core::identity::EntityId;
use crate::core::store::Store;
use crate::entities::task::{Task, TaskStatus};

type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// Persists a card's new status
pub trait StatusSink {
    fn update_status(&mut self, id: &EntityId, status: TaskStatus) -> Result<(), SinkError>;
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error("no card {0} on the board")]
    UnknownCard(String),

    #[error("failed to move {id}: {source}")]
    Rejected {
        id: String,
        #[source]
        source: SinkError,
    },
}

/// A task as shown on the board
#[derive(Debug, Clone, Serialize)]
pub struct Card {
    pub id: EntityId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
    pub title: String,
    pub status: TaskStatus,
    pub priority: Priority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(skip)]
    created: DateTime<Utc>,
}

impl Card {
    pub fn from_task(task: &Task, short_id: Option<String>) -> Self {
        Self {
            id: task.id.clone(),
            short_id,
            title: task.title.clone(),
            status: task.status,
            priority: task.priority,
            assignee: task.assignee.clone(),
            due_date: task.due_date,
            created: task.created,
        }
    }

    /// Short ID when known, full ID otherwise
    pub fn display_id(&self) -> String {
        self.short_id.clone().unwrap_or_else(|| self.id.to_string())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Column {
    pub status: TaskStatus,
    pub cards: Vec<Card>,
}

/// Columns in lifecycle order, one per task status
#[derive(Debug, Clone, Serialize)]
pub struct Board {
    pub columns: Vec<Column>,
}

impl Board {
    /// Group cards by status; highest priority first, then oldest first
    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        let mut columns: Vec<Column> = TaskStatus::all()
            .iter()
            .map(|status| Column {
                status: *status,
                cards: Vec::new(),
            })
            .collect();

        for card in cards {
            if let Some(column) = columns.iter_mut().find(|c| c.status == card.status) {
                column.cards.push(card);
            }
        }
        for column in &mut columns {
            column
                .cards
                .sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created.cmp(&b.created)));
        }

        Self { columns }
    }

    pub fn from_tasks(tasks: &[Task]) -> Self {
        Self::from_cards(tasks.iter().map(|t| Card::from_task(t, None)))
    }

    pub fn column(&self, status: TaskStatus) -> Option<&Column> {
        self.columns.iter().find(|c| c.status == status)
    }

    /// Column and index of a card
    pub fn locate(&self, id: &EntityId) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(ci, column)| {
            column
                .cards
                .iter()
                .position(|card| &card.id == id)
                .map(|idx| (ci, idx))
        })
    }

    fn column_index(&self, status: TaskStatus) -> usize {
        self.columns
            .iter()
            .position(|c| c.status == status)
            .unwrap_or(self.columns.len() - 1)
    }

    /// Move a card to another column and persist the change through `sink`.
    /// On failure the card is restored to its original column and position.
    pub fn move_card(
        &mut self,
        id: &EntityId,
        to: TaskStatus,
        sink: &mut dyn StatusSink,
    ) -> Result<(), BoardError> {
        let (from_col, from_idx) = self
            .locate(id)
            .ok_or_else(|| BoardError::UnknownCard(id.to_string()))?;
        let from = self.columns[from_col].status;
        if from == to {
            return Ok(());
        }

        let mut card = self.columns[from_col].cards.remove(from_idx);
        card.status = to;
        let to_col = self.column_index(to);
        self.columns[to_col].cards.push(card);

        match sink.update_status(id, to) {
            Ok(()) => {
                tracing::debug!(card = %id, %from, %to, "moved card");
                Ok(())
            }
            Err(source) => {
                if let Some(mut card) = self.columns[to_col].cards.pop() {
                    card.status = from;
                    self.columns[from_col].cards.insert(from_idx, card);
                }
                tracing::warn!(card = %id, %from, %to, error = %source, "move rejected, reverted");
                Err(BoardError::Rejected {
                    id: id.to_string(),
                    source,
                })
            }
        }
    }
}

/// Writes card moves to the store after an access check
pub struct TaskStatusWriter<'a> {
    store: &'a Store,
    policy: &'a AccessPolicy,
    user: &'a str,
}

impl<'a> TaskStatusWriter<'a> {
    pub fn new(store: &'a Store, policy: &'a AccessPolicy, user: &'a str) -> Self {
        Self {
            store,
            policy,
            user,
        }
    }
}

impl StatusSink for TaskStatusWriter<'_> {
    fn update_status(&mut self, id: &EntityId, status: TaskStatus) -> Result<(), SinkError> {
        self.policy.check(self.user, Action::EditTasks)?;
        self.store.set_task_status(id, status)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::membership::{Membership, Role};

    struct CountingSink {
        calls: Vec<(EntityId, TaskStatus)>,
    }

    impl StatusSink for CountingSink {
        fn update_status(&mut self, id: &EntityId, status: TaskStatus) -> Result<(), SinkError> {
            self.calls.push((id.clone(), status));
            Ok(())
        }
    }

    struct FailingSink;

    impl StatusSink for FailingSink {
        fn update_status(&mut self, _: &EntityId, _: TaskStatus) -> Result<(), SinkError> {
            Err("database is locked".into())
        }
    }

    fn task(title: &str, status: TaskStatus, priority: Priority) -> Task {
        let mut task = Task::new(title.to_string(), "test".to_string());
        task.status = status;
        task.priority = priority;
        task
    }

    fn titles(board: &Board, status: TaskStatus) -> Vec<String> {
        board
            .column(status)
            .unwrap()
            .cards
            .iter()
            .map(|c| c.title.clone())
            .collect()
    }

    #[test]
    fn test_columns_follow_lifecycle_and_priority() {
        let tasks = vec![
            task("a", TaskStatus::Todo, Priority::Low),
            task("b", TaskStatus::Todo, Priority::Critical),
            task("c", TaskStatus::Completed, Priority::Medium),
        ];
        let board = Board::from_tasks(&tasks);

        let order: Vec<TaskStatus> = board.columns.iter().map(|c| c.status).collect();
        assert_eq!(order, TaskStatus::all().to_vec());
        assert_eq!(titles(&board, TaskStatus::Todo), vec!["b", "a"]);
        assert_eq!(titles(&board, TaskStatus::Completed), vec!["c"]);
    }

    #[test]
    fn test_move_calls_sink_once() {
        let tasks = vec![task("a", TaskStatus::Todo, Priority::Medium)];
        let mut board = Board::from_tasks(&tasks);
        let mut sink = CountingSink { calls: Vec::new() };

        board
            .move_card(&tasks[0].id, TaskStatus::InProgress, &mut sink)
            .unwrap();

        assert_eq!(sink.calls, vec![(tasks[0].id.clone(), TaskStatus::InProgress)]);
        assert!(titles(&board, TaskStatus::Todo).is_empty());
        let moved = &board.column(TaskStatus::InProgress).unwrap().cards[0];
        assert_eq!(moved.status, TaskStatus::InProgress);
    }

    #[test]
    fn test_same_column_move_skips_sink() {
        let tasks = vec![task("a", TaskStatus::InReview, Priority::Medium)];
        let mut board = Board::from_tasks(&tasks);
        let mut sink = CountingSink { calls: Vec::new() };

        board
            .move_card(&tasks[0].id, TaskStatus::InReview, &mut sink)
            .unwrap();
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_failed_move_reverts_to_original_position() {
        let tasks = vec![
            task("first", TaskStatus::Todo, Priority::High),
            task("middle", TaskStatus::Todo, Priority::Medium),
            task("last", TaskStatus::Todo, Priority::Low),
            task("done", TaskStatus::Completed, Priority::Low),
        ];
        let mut board = Board::from_tasks(&tasks);

        let err = board
            .move_card(&tasks[1].id, TaskStatus::Completed, &mut FailingSink)
            .unwrap_err();
        assert!(matches!(err, BoardError::Rejected { .. }));

        assert_eq!(titles(&board, TaskStatus::Todo), vec!["first", "middle", "last"]);
        assert_eq!(titles(&board, TaskStatus::Completed), vec!["done"]);
        assert_eq!(
            board.column(TaskStatus::Todo).unwrap().cards[1].status,
            TaskStatus::Todo
        );
    }

    #[test]
    fn test_unknown_card() {
        let mut board = Board::from_tasks(&[]);
        let err = board
            .move_card(
                &EntityId::new(crate::core::identity::EntityPrefix::Task),
                TaskStatus::Completed,
                &mut FailingSink,
            )
            .unwrap_err();
        assert!(matches!(err, BoardError::UnknownCard(_)));
    }

    #[test]
    fn test_store_writer_persists_and_enforces_access() {
        let store = Store::open_in_memory().unwrap();
        let t = task("encrypt laptops", TaskStatus::Todo, Priority::High);
        store.insert_task(&t).unwrap();
        let mut board = Board::from_tasks(&store.list_tasks(&Default::default()).unwrap());

        let policy = AccessPolicy::from_members(vec![
            Membership::new("olga".to_string(), Role::Owner),
            Membership::new("vic".to_string(), Role::Viewer),
        ]);

        let mut denied = TaskStatusWriter::new(&store, &policy, "vic");
        assert!(board
            .move_card(&t.id, TaskStatus::Completed, &mut denied)
            .is_err());
        assert_eq!(store.get_task(&t.id).unwrap().status, TaskStatus::Todo);
        assert_eq!(titles(&board, TaskStatus::Todo), vec!["encrypt laptops"]);

        let mut allowed = TaskStatusWriter::new(&store, &policy, "olga");
        board
            .move_card(&t.id, TaskStatus::Completed, &mut allowed)
            .unwrap();
        assert_eq!(store.get_task(&t.id).unwrap().status, TaskStatus::Completed);
    }
}
