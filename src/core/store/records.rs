//! Task, risk, CAPA, and training program queries

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};

use super::shortid::{assign_short_id, table_for};
use super::{opt_text, parse_column, Store, StoreError};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::capa::{Capa, CapaStatus};
use crate::entities::risk::{Risk, RiskLevel, RiskStatus};
use crate::entities::task::{Task, TaskStatus};
use crate::entities::training::{TrainingProgram, TrainingStatus};

/// Filter for listing tasks
#[derive(Debug, Default, Clone)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assignee: Option<String>,
    pub control_id: Option<EntityId>,
    pub risk_id: Option<EntityId>,
    pub capa_id: Option<EntityId>,
    /// Exclude completed and cancelled tasks
    pub open_only: bool,
}

/// Filter for listing risks
#[derive(Debug, Default, Clone)]
pub struct RiskFilter {
    pub status: Option<RiskStatus>,
    pub min_level: Option<RiskLevel>,
    pub owner: Option<String>,
    /// Exclude closed risks
    pub open_only: bool,
}

/// Filter for listing CAPAs
#[derive(Debug, Default, Clone)]
pub struct CapaFilter {
    pub status: Option<CapaStatus>,
    pub open_only: bool,
    /// Only CAPAs open past their due date as of this day
    pub overdue_on: Option<NaiveDate>,
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        description: opt_text(row.get("description")?),
        status: parse_column(row, "status")?,
        priority: parse_column(row, "priority")?,
        assignee: opt_text(row.get("assignee")?),
        due_date: row.get("due_date")?,
        control_id: row.get("control_id")?,
        risk_id: row.get("risk_id")?,
        capa_id: row.get("capa_id")?,
        created: row.get("created")?,
        updated: row.get("updated")?,
        author: row.get("author")?,
    })
}

fn risk_from_row(row: &Row<'_>) -> rusqlite::Result<Risk> {
    Ok(Risk {
        id: row.get("id")?,
        title: row.get("title")?,
        description: opt_text(row.get("description")?),
        category: opt_text(row.get("category")?),
        likelihood: row.get("likelihood")?,
        impact: row.get("impact")?,
        treatment: parse_column(row, "treatment")?,
        status: parse_column(row, "status")?,
        owner: opt_text(row.get("owner")?),
        control_id: row.get("control_id")?,
        created: row.get("created")?,
        updated: row.get("updated")?,
        author: row.get("author")?,
    })
}

fn capa_from_row(row: &Row<'_>) -> rusqlite::Result<Capa> {
    Ok(Capa {
        id: row.get("id")?,
        title: row.get("title")?,
        capa_type: parse_column(row, "capa_type")?,
        source: parse_column(row, "source")?,
        priority: parse_column(row, "priority")?,
        problem_statement: opt_text(row.get("problem_statement")?),
        root_cause: opt_text(row.get("root_cause")?),
        status: parse_column(row, "status")?,
        owner: opt_text(row.get("owner")?),
        due_date: row.get("due_date")?,
        risk_id: row.get("risk_id")?,
        control_id: row.get("control_id")?,
        closed_date: row.get("closed_date")?,
        closed_by: opt_text(row.get("closed_by")?),
        created: row.get("created")?,
        updated: row.get("updated")?,
        author: row.get("author")?,
    })
}

fn training_from_row(row: &Row<'_>) -> rusqlite::Result<TrainingProgram> {
    Ok(TrainingProgram {
        id: row.get("id")?,
        title: row.get("title")?,
        description: opt_text(row.get("description")?),
        frequency: parse_column(row, "frequency")?,
        mandatory: row.get("mandatory")?,
        framework_code: opt_text(row.get("framework_code")?),
        status: parse_column(row, "status")?,
        next_due: row.get("next_due")?,
        last_completed: row.get("last_completed")?,
        created: row.get("created")?,
        author: row.get("author")?,
    })
}

impl Store {
    fn get_by_id<T>(
        &self,
        prefix: EntityPrefix,
        id: &EntityId,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        self.conn
            .query_row(
                &format!("SELECT * FROM {} WHERE id = ?1", table_for(prefix)),
                params![id],
                map,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(prefix, id.to_string()))
    }

    /// Delete one record and its short ID alias
    fn delete_by_id(&self, prefix: EntityPrefix, id: &EntityId) -> Result<(), StoreError> {
        self.transaction(|tx| {
            let deleted = tx.execute(
                &format!("DELETE FROM {} WHERE id = ?1", table_for(prefix)),
                params![id],
            )?;
            if deleted == 0 {
                return Err(StoreError::not_found(prefix, id.to_string()));
            }
            tx.execute("DELETE FROM short_ids WHERE entity_id = ?1", params![id])?;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // Tasks
    // ------------------------------------------------------------------

    /// Insert a task, returning its short ID
    pub fn insert_task(&self, task: &Task) -> Result<String, StoreError> {
        self.transaction(|tx| {
            tx.execute(
                r#"INSERT INTO tasks (id, title, description, status, priority, assignee,
                       due_date, control_id, risk_id, capa_id, created, updated, author)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
                params![
                    task.id,
                    task.title,
                    task.description,
                    task.status.to_string(),
                    task.priority.to_string(),
                    task.assignee,
                    task.due_date,
                    task.control_id,
                    task.risk_id,
                    task.capa_id,
                    task.created,
                    task.updated,
                    task.author,
                ],
            )?;
            assign_short_id(tx, &task.id)
        })
    }

    pub fn get_task(&self, id: &EntityId) -> Result<Task, StoreError> {
        self.get_by_id(EntityPrefix::Task, id, task_from_row)
    }

    /// Tasks matching a filter, oldest first
    pub fn list_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT * FROM tasks
               WHERE (?1 IS NULL OR status = ?1)
                 AND (?2 IS NULL OR assignee = ?2 COLLATE NOCASE)
                 AND (?3 IS NULL OR control_id = ?3)
                 AND (?4 IS NULL OR risk_id = ?4)
                 AND (?5 IS NULL OR capa_id = ?5)
                 AND (?6 = 0 OR status NOT IN ('COMPLETED', 'CANCELLED'))
               ORDER BY created"#,
        )?;
        let rows = stmt.query_map(
            params![
                filter.status.map(|s| s.to_string()),
                filter.assignee,
                filter.control_id,
                filter.risk_id,
                filter.capa_id,
                filter.open_only,
            ],
            task_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Write back every editable field of a task
    pub fn update_task(&self, task: &Task) -> Result<Task, StoreError> {
        let mut task = task.clone();
        task.updated = Utc::now();
        let changed = self.conn.execute(
            r#"UPDATE tasks SET title = ?2, description = ?3, status = ?4, priority = ?5,
                   assignee = ?6, due_date = ?7, control_id = ?8, risk_id = ?9,
                   capa_id = ?10, updated = ?11
               WHERE id = ?1"#,
            params![
                task.id,
                task.title,
                task.description,
                task.status.to_string(),
                task.priority.to_string(),
                task.assignee,
                task.due_date,
                task.control_id,
                task.risk_id,
                task.capa_id,
                task.updated,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(EntityPrefix::Task, task.id.to_string()));
        }
        Ok(task)
    }

    /// Set a task's status. Any status may follow any other.
    pub fn set_task_status(&self, id: &EntityId, status: TaskStatus) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            "UPDATE tasks SET status = ?2, updated = ?3 WHERE id = ?1",
            params![id, status.to_string(), Utc::now()],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(EntityPrefix::Task, id.to_string()));
        }
        tracing::debug!(task = %id, %status, "task status updated");
        Ok(())
    }

    /// Flag open tasks whose due date has passed. Returns how many changed.
    pub fn mark_overdue(&self, today: NaiveDate) -> Result<usize, StoreError> {
        let changed = self.conn.execute(
            r#"UPDATE tasks SET status = 'OVERDUE', updated = ?2
               WHERE due_date IS NOT NULL AND due_date < ?1
                 AND status NOT IN ('COMPLETED', 'CANCELLED', 'OVERDUE')"#,
            params![today, Utc::now()],
        )?;
        if changed > 0 {
            tracing::info!(changed, %today, "marked tasks overdue");
        }
        Ok(changed)
    }

    pub fn delete_task(&self, id: &EntityId) -> Result<(), StoreError> {
        self.delete_by_id(EntityPrefix::Task, id)
    }

    // ------------------------------------------------------------------
    // Risks
    // ------------------------------------------------------------------

    pub fn insert_risk(&self, risk: &Risk) -> Result<String, StoreError> {
        self.transaction(|tx| {
            tx.execute(
                r#"INSERT INTO risks (id, title, description, category, likelihood, impact,
                       treatment, status, owner, control_id, created, updated, author)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"#,
                params![
                    risk.id,
                    risk.title,
                    risk.description,
                    risk.category,
                    risk.likelihood,
                    risk.impact,
                    risk.treatment.to_string(),
                    risk.status.to_string(),
                    risk.owner,
                    risk.control_id,
                    risk.created,
                    risk.updated,
                    risk.author,
                ],
            )?;
            assign_short_id(tx, &risk.id)
        })
    }

    pub fn get_risk(&self, id: &EntityId) -> Result<Risk, StoreError> {
        self.get_by_id(EntityPrefix::Risk, id, risk_from_row)
    }

    /// Risks matching a filter, highest score first
    pub fn list_risks(&self, filter: &RiskFilter) -> Result<Vec<Risk>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT * FROM risks
               WHERE (?1 IS NULL OR status = ?1)
                 AND (?2 IS NULL OR owner = ?2 COLLATE NOCASE)
                 AND (?3 = 0 OR status != 'closed')
               ORDER BY likelihood * impact DESC, created"#,
        )?;
        let rows = stmt.query_map(
            params![
                filter.status.map(|s| s.to_string()),
                filter.owner,
                filter.open_only,
            ],
            risk_from_row,
        )?;
        let mut risks = rows.collect::<Result<Vec<_>, _>>()?;
        if let Some(min) = filter.min_level {
            risks.retain(|r| r.level() >= min);
        }
        Ok(risks)
    }

    pub fn update_risk(&self, risk: &Risk) -> Result<Risk, StoreError> {
        let mut risk = risk.clone();
        risk.updated = Utc::now();
        let changed = self.conn.execute(
            r#"UPDATE risks SET title = ?2, description = ?3, category = ?4, likelihood = ?5,
                   impact = ?6, treatment = ?7, status = ?8, owner = ?9, control_id = ?10,
                   updated = ?11
               WHERE id = ?1"#,
            params![
                risk.id,
                risk.title,
                risk.description,
                risk.category,
                risk.likelihood,
                risk.impact,
                risk.treatment.to_string(),
                risk.status.to_string(),
                risk.owner,
                risk.control_id,
                risk.updated,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(EntityPrefix::Risk, risk.id.to_string()));
        }
        Ok(risk)
    }

    pub fn delete_risk(&self, id: &EntityId) -> Result<(), StoreError> {
        self.delete_by_id(EntityPrefix::Risk, id)
    }

    // ------------------------------------------------------------------
    // CAPAs
    // ------------------------------------------------------------------

    pub fn insert_capa(&self, capa: &Capa) -> Result<String, StoreError> {
        self.transaction(|tx| {
            tx.execute(
                r#"INSERT INTO capas (id, title, capa_type, source, priority, problem_statement,
                       root_cause, status, owner, due_date, risk_id, control_id, closed_date,
                       closed_by, created, updated, author)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                       ?16, ?17)"#,
                params![
                    capa.id,
                    capa.title,
                    capa.capa_type.to_string(),
                    capa.source.to_string(),
                    capa.priority.to_string(),
                    capa.problem_statement,
                    capa.root_cause,
                    capa.status.to_string(),
                    capa.owner,
                    capa.due_date,
                    capa.risk_id,
                    capa.control_id,
                    capa.closed_date,
                    capa.closed_by,
                    capa.created,
                    capa.updated,
                    capa.author,
                ],
            )?;
            assign_short_id(tx, &capa.id)
        })
    }

    pub fn get_capa(&self, id: &EntityId) -> Result<Capa, StoreError> {
        self.get_by_id(EntityPrefix::Capa, id, capa_from_row)
    }

    pub fn list_capas(&self, filter: &CapaFilter) -> Result<Vec<Capa>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT * FROM capas
               WHERE (?1 IS NULL OR status = ?1)
                 AND (?2 = 0 OR status != 'closed')
               ORDER BY created"#,
        )?;
        let rows = stmt.query_map(
            params![filter.status.map(|s| s.to_string()), filter.open_only],
            capa_from_row,
        )?;
        let mut capas = rows.collect::<Result<Vec<_>, _>>()?;
        if let Some(today) = filter.overdue_on {
            capas.retain(|c| c.is_overdue(today));
        }
        Ok(capas)
    }

    pub fn update_capa(&self, capa: &Capa) -> Result<Capa, StoreError> {
        let mut capa = capa.clone();
        capa.updated = Utc::now();
        let changed = self.conn.execute(
            r#"UPDATE capas SET title = ?2, capa_type = ?3, source = ?4, priority = ?5,
                   problem_statement = ?6, root_cause = ?7, status = ?8, owner = ?9,
                   due_date = ?10, risk_id = ?11, control_id = ?12, closed_date = ?13,
                   closed_by = ?14, updated = ?15
               WHERE id = ?1"#,
            params![
                capa.id,
                capa.title,
                capa.capa_type.to_string(),
                capa.source.to_string(),
                capa.priority.to_string(),
                capa.problem_statement,
                capa.root_cause,
                capa.status.to_string(),
                capa.owner,
                capa.due_date,
                capa.risk_id,
                capa.control_id,
                capa.closed_date,
                capa.closed_by,
                capa.updated,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(EntityPrefix::Capa, capa.id.to_string()));
        }
        Ok(capa)
    }

    /// Close a CAPA, recording the closure date and who closed it
    pub fn close_capa(&self, id: &EntityId, on: NaiveDate, by: &str) -> Result<Capa, StoreError> {
        let mut capa = self.get_capa(id)?;
        if !capa.is_open() {
            return Err(StoreError::Conflict(format!("{} is already closed", id)));
        }
        capa.close(on, by.to_string());
        self.update_capa(&capa)
    }

    pub fn delete_capa(&self, id: &EntityId) -> Result<(), StoreError> {
        self.delete_by_id(EntityPrefix::Capa, id)
    }

    // ------------------------------------------------------------------
    // Training programs
    // ------------------------------------------------------------------

    pub fn insert_training(&self, program: &TrainingProgram) -> Result<String, StoreError> {
        self.transaction(|tx| {
            tx.execute(
                r#"INSERT INTO training_programs (id, title, description, frequency, mandatory,
                       framework_code, status, next_due, last_completed, created, author)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"#,
                params![
                    program.id,
                    program.title,
                    program.description,
                    program.frequency.to_string(),
                    program.mandatory,
                    program.framework_code,
                    program.status.to_string(),
                    program.next_due,
                    program.last_completed,
                    program.created,
                    program.author,
                ],
            )?;
            assign_short_id(tx, &program.id)
        })
    }

    pub fn get_training(&self, id: &EntityId) -> Result<TrainingProgram, StoreError> {
        self.get_by_id(EntityPrefix::Trn, id, training_from_row)
    }

    /// Training programs ordered by next due date (unscheduled last)
    pub fn list_training(&self) -> Result<Vec<TrainingProgram>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM training_programs ORDER BY next_due IS NULL, next_due, title",
        )?;
        let rows = stmt.query_map([], training_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update_training(&self, program: &TrainingProgram) -> Result<(), StoreError> {
        let changed = self.conn.execute(
            r#"UPDATE training_programs SET title = ?2, description = ?3, frequency = ?4,
                   mandatory = ?5, framework_code = ?6, status = ?7, next_due = ?8,
                   last_completed = ?9
               WHERE id = ?1"#,
            params![
                program.id,
                program.title,
                program.description,
                program.frequency.to_string(),
                program.mandatory,
                program.framework_code,
                program.status.to_string(),
                program.next_due,
                program.last_completed,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(EntityPrefix::Trn, program.id.to_string()));
        }
        Ok(())
    }

    /// Record a completed cycle and advance the next due date
    pub fn complete_training(
        &self,
        id: &EntityId,
        on: NaiveDate,
    ) -> Result<TrainingProgram, StoreError> {
        let mut program = self.get_training(id)?;
        if program.status == TrainingStatus::Retired {
            return Err(StoreError::Conflict(format!("{} is retired", id)));
        }
        program.complete_cycle(on);
        self.update_training(&program)?;
        Ok(program)
    }

    pub fn delete_training(&self, id: &EntityId) -> Result<(), StoreError> {
        self.delete_by_id(EntityPrefix::Trn, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::capa::{CapaSource, CapaType};
    use crate::entities::training::Frequency;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_task_roundtrip_and_short_id() {
        let store = Store::open_in_memory().unwrap();
        let mut task = Task::new("Write incident response plan".to_string(), "alice".to_string());
        task.due_date = Some(date(2026, 6, 30));
        task.assignee = Some("bob".to_string());

        let short = store.insert_task(&task).unwrap();
        assert_eq!(short, "TASK@1");

        let loaded = store.get_task(&task.id).unwrap();
        assert_eq!(loaded.title, task.title);
        assert_eq!(loaded.due_date, task.due_date);
        assert_eq!(loaded.assignee.as_deref(), Some("bob"));
        assert_eq!(store.resolve("TASK@1", EntityPrefix::Task).unwrap(), task.id);
    }

    #[test]
    fn test_every_status_transition_persists() {
        let store = Store::open_in_memory().unwrap();
        let task = Task::new("Review vendor SOC 2 report".to_string(), "a".to_string());
        store.insert_task(&task).unwrap();

        for from in TaskStatus::all() {
            for to in TaskStatus::all() {
                store.set_task_status(&task.id, *from).unwrap();
                store.set_task_status(&task.id, *to).unwrap();
                assert_eq!(store.get_task(&task.id).unwrap().status, *to);
            }
        }
    }

    #[test]
    fn test_set_status_unknown_task() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .set_task_status(&EntityId::new(EntityPrefix::Task), TaskStatus::Completed)
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn test_mark_overdue_skips_closed_tasks() {
        let store = Store::open_in_memory().unwrap();
        let today = date(2026, 5, 1);

        let mut late = Task::new("late".to_string(), "a".to_string());
        late.due_date = Some(date(2026, 4, 1));
        let mut done = Task::new("done".to_string(), "a".to_string());
        done.due_date = Some(date(2026, 4, 1));
        done.status = TaskStatus::Completed;
        let mut future = Task::new("future".to_string(), "a".to_string());
        future.due_date = Some(date(2026, 5, 2));

        for t in [&late, &done, &future] {
            store.insert_task(t).unwrap();
        }

        assert_eq!(store.mark_overdue(today).unwrap(), 1);
        assert_eq!(store.get_task(&late.id).unwrap().status, TaskStatus::Overdue);
        assert_eq!(store.get_task(&done.id).unwrap().status, TaskStatus::Completed);
        assert_eq!(store.get_task(&future.id).unwrap().status, TaskStatus::Todo);
        // Second sweep changes nothing
        assert_eq!(store.mark_overdue(today).unwrap(), 0);
    }

    #[test]
    fn test_task_link_must_exist() {
        let store = Store::open_in_memory().unwrap();
        let mut task = Task::new("orphan".to_string(), "a".to_string());
        task.risk_id = Some(EntityId::new(EntityPrefix::Risk));
        assert!(matches!(
            store.insert_task(&task),
            Err(StoreError::Sqlite(_))
        ));
    }

    #[test]
    fn test_deleting_risk_unlinks_task() {
        let store = Store::open_in_memory().unwrap();
        let risk = Risk::new("Laptop theft".to_string(), 3, 3, "a".to_string()).unwrap();
        store.insert_risk(&risk).unwrap();

        let mut task = Task::new("Enable disk encryption".to_string(), "a".to_string());
        task.risk_id = Some(risk.id.clone());
        store.insert_task(&task).unwrap();

        store.delete_risk(&risk.id).unwrap();
        assert_eq!(store.get_task(&task.id).unwrap().risk_id, None);
        assert!(store.resolve("RISK@1", EntityPrefix::Risk).is_err());
    }

    #[test]
    fn test_list_risks_by_level() {
        let store = Store::open_in_memory().unwrap();
        for (title, l, i) in [("low", 1, 2), ("high", 3, 4), ("critical", 5, 5)] {
            let risk = Risk::new(title.to_string(), l, i, "a".to_string()).unwrap();
            store.insert_risk(&risk).unwrap();
        }

        let risks = store
            .list_risks(&RiskFilter {
                min_level: Some(RiskLevel::High),
                ..Default::default()
            })
            .unwrap();
        let titles: Vec<&str> = risks.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["critical", "high"]);
    }

    #[test]
    fn test_capa_overdue_filter() {
        let store = Store::open_in_memory().unwrap();
        let mut capa = Capa::new(
            "Patch SLA missed".to_string(),
            CapaType::Corrective,
            CapaSource::Audit,
            "a".to_string(),
        );
        capa.due_date = Some(date(2026, 1, 1));
        store.insert_capa(&capa).unwrap();

        let overdue = store
            .list_capas(&CapaFilter {
                overdue_on: Some(date(2026, 2, 1)),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(overdue.len(), 1);

        let closed = store.close_capa(&capa.id, date(2026, 2, 1), "qa").unwrap();
        assert_eq!(closed.closed_by.as_deref(), Some("qa"));
        assert!(matches!(
            store.close_capa(&capa.id, date(2026, 2, 2), "qa"),
            Err(StoreError::Conflict(_))
        ));
        let open = store
            .list_capas(&CapaFilter {
                open_only: true,
                ..Default::default()
            })
            .unwrap();
        assert!(open.is_empty());
    }

    #[test]
    fn test_training_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let mut program = TrainingProgram::new(
            "HIPAA privacy basics".to_string(),
            Frequency::Annual,
            "hr".to_string(),
        );
        program.mandatory = true;
        program.framework_code = Some("HIPAA".to_string());
        program.next_due = Some(date(2026, 9, 1));
        store.insert_training(&program).unwrap();

        assert!(store.get_training(&program.id).unwrap().mandatory);
        store.complete_training(&program.id, date(2026, 8, 15)).unwrap();

        let again = store.get_training(&program.id).unwrap();
        assert_eq!(again.next_due, Some(date(2027, 9, 1)));
    }
}
