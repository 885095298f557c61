//! Framework, clause, control, and implementation queries

use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::shortid::{assign_short_id, prune_short_ids};
use super::{opt_text, parse_column, Store, StoreError};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::framework::{
    Clause, ClauseNode, Control, ControlView, Framework, FrameworkSummary,
};
use crate::entities::implementation::{ControlImplementation, ImplementationStatus};

/// Filter for listing controls
#[derive(Debug, Default, Clone)]
pub struct ControlFilter {
    /// Framework code
    pub framework: Option<String>,
    /// Only controls whose own ref or clause ref starts with this
    pub clause_prefix: Option<String>,
    /// Case-insensitive match on title and objective
    pub search: Option<String>,
    pub status: Option<ImplementationStatus>,
}

pub(crate) fn framework_from_row(row: &Row<'_>) -> rusqlite::Result<Framework> {
    Ok(Framework {
        id: row.get("id")?,
        code: row.get("code")?,
        name: row.get("name")?,
        version: row.get("version")?,
        publisher: opt_text(row.get("publisher")?),
        description: opt_text(row.get("description")?),
        content_hash: row.get("content_hash")?,
        seeded_at: row.get("seeded_at")?,
    })
}

pub(crate) fn clause_from_row(row: &Row<'_>) -> rusqlite::Result<Clause> {
    Ok(Clause {
        id: row.get("id")?,
        framework_id: row.get("framework_id")?,
        parent_id: row.get("parent_id")?,
        reference: row.get("ref")?,
        title: row.get("title")?,
        description: opt_text(row.get("description")?),
        position: row.get("position")?,
    })
}

fn control_view_from_row(row: &Row<'_>) -> rusqlite::Result<ControlView> {
    Ok(ControlView {
        control: Control {
            id: row.get("id")?,
            framework_id: row.get("framework_id")?,
            clause_id: row.get("clause_id")?,
            reference: row.get("ref")?,
            title: row.get("title")?,
            objective: opt_text(row.get("objective")?),
            guidance: opt_text(row.get("guidance")?),
            position: row.get("position")?,
        },
        framework_code: row.get("framework_code")?,
        implementation_status: parse_column(row, "impl_status")?,
    })
}

fn implementation_from_row(row: &Row<'_>) -> rusqlite::Result<ControlImplementation> {
    Ok(ControlImplementation {
        id: row.get("id")?,
        control_id: row.get("control_id")?,
        status: parse_column(row, "status")?,
        owner: opt_text(row.get("owner")?),
        notes: opt_text(row.get("notes")?),
        evidence: opt_text(row.get("evidence")?),
        updated: row.get("updated")?,
        updated_by: row.get("updated_by")?,
    })
}

/// New values for a control's implementation record
pub(crate) struct ImplementationUpdate<'a> {
    pub control_id: &'a EntityId,
    pub status: ImplementationStatus,
    pub owner: Option<String>,
    pub notes: Option<String>,
    pub evidence: Option<String>,
    pub updated_by: &'a str,
}

/// Insert or update an implementation record inside an open transaction
pub(crate) fn upsert_implementation(
    tx: &Connection,
    update: ImplementationUpdate<'_>,
) -> Result<ControlImplementation, StoreError> {
    let existing = tx
        .query_row(
            "SELECT * FROM control_implementations WHERE control_id = ?1",
            params![update.control_id],
            implementation_from_row,
        )
        .optional()?;

    let mut record = existing.unwrap_or_else(|| {
        ControlImplementation::new(
            update.control_id.clone(),
            update.status,
            update.updated_by.to_string(),
        )
    });
    record.status = update.status;
    if update.owner.is_some() {
        record.owner = update.owner;
    }
    if update.notes.is_some() {
        record.notes = update.notes;
    }
    if update.evidence.is_some() {
        record.evidence = update.evidence;
    }
    record.updated = Utc::now();
    record.updated_by = update.updated_by.to_string();

    tx.execute(
        r#"INSERT INTO control_implementations
               (id, control_id, status, owner, notes, evidence, updated, updated_by)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
           ON CONFLICT(control_id) DO UPDATE SET
               status = excluded.status, owner = excluded.owner,
               notes = excluded.notes, evidence = excluded.evidence,
               updated = excluded.updated, updated_by = excluded.updated_by"#,
        params![
            record.id,
            record.control_id,
            record.status.to_string(),
            record.owner,
            record.notes,
            record.evidence,
            record.updated,
            record.updated_by,
        ],
    )?;
    assign_short_id(tx, &record.id)?;
    Ok(record)
}

const CONTROL_VIEW_SELECT: &str = r#"
    SELECT c.id, c.framework_id, c.clause_id, c.ref, c.title, c.objective, c.guidance,
           c.position, f.code AS framework_code,
           COALESCE(i.status, 'not_started') AS impl_status
    FROM controls c
    JOIN frameworks f ON f.id = c.framework_id
    JOIN clauses cl ON cl.id = c.clause_id
    LEFT JOIN control_implementations i ON i.control_id = c.id
"#;

impl Store {
    /// All seeded frameworks with clause and control counts
    pub fn list_frameworks(&self) -> Result<Vec<FrameworkSummary>, StoreError> {
        let mut stmt = self.conn.prepare(
            r#"SELECT f.*,
                      (SELECT COUNT(*) FROM clauses WHERE framework_id = f.id) AS clause_count,
                      (SELECT COUNT(*) FROM controls WHERE framework_id = f.id) AS control_count
               FROM frameworks f ORDER BY f.code"#,
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(FrameworkSummary {
                framework: framework_from_row(row)?,
                clause_count: row.get::<_, i64>("clause_count")? as usize,
                control_count: row.get::<_, i64>("control_count")? as usize,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Look up a framework by code
    pub fn get_framework(&self, code: &str) -> Result<Framework, StoreError> {
        self.conn
            .query_row(
                "SELECT * FROM frameworks WHERE code = ?1 COLLATE NOCASE",
                params![code],
                framework_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(EntityPrefix::Fw, code))
    }

    /// Nested clause tree of a framework, in catalog order
    pub fn clause_tree(&self, code: &str) -> Result<Vec<ClauseNode>, StoreError> {
        let framework = self.get_framework(code)?;

        let mut stmt = self
            .conn
            .prepare("SELECT * FROM clauses WHERE framework_id = ?1 ORDER BY position")?;
        let clauses = stmt
            .query_map(params![framework.id], clause_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut controls_by_clause: HashMap<String, Vec<ControlView>> = HashMap::new();
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE c.framework_id = ?1 ORDER BY c.position",
            CONTROL_VIEW_SELECT
        ))?;
        for view in stmt.query_map(params![framework.id], control_view_from_row)? {
            let view = view?;
            controls_by_clause
                .entry(view.control.clause_id.to_string())
                .or_default()
                .push(view);
        }

        let mut by_parent: HashMap<Option<String>, Vec<Clause>> = HashMap::new();
        for clause in clauses {
            by_parent
                .entry(clause.parent_id.as_ref().map(|p| p.to_string()))
                .or_default()
                .push(clause);
        }

        fn build(
            parent: Option<String>,
            by_parent: &mut HashMap<Option<String>, Vec<Clause>>,
            controls: &mut HashMap<String, Vec<ControlView>>,
        ) -> Vec<ClauseNode> {
            let Some(children) = by_parent.remove(&parent) else {
                return Vec::new();
            };
            children
                .into_iter()
                .map(|clause| {
                    let key = clause.id.to_string();
                    ClauseNode {
                        controls: controls.remove(&key).unwrap_or_default(),
                        children: build(Some(key), by_parent, controls),
                        clause,
                    }
                })
                .collect()
        }

        Ok(build(None, &mut by_parent, &mut controls_by_clause))
    }

    /// List controls matching a filter, in framework then catalog order
    pub fn list_controls(&self, filter: &ControlFilter) -> Result<Vec<ControlView>, StoreError> {
        let sql = format!(
            r#"{}
            WHERE (?1 IS NULL OR f.code = ?1 COLLATE NOCASE)
              AND (?2 IS NULL OR c.ref LIKE ?2 || '%' OR cl.ref LIKE ?2 || '%')
              AND (?3 IS NULL OR c.title LIKE '%' || ?3 || '%' OR c.objective LIKE '%' || ?3 || '%')
              AND (?4 IS NULL OR COALESCE(i.status, 'not_started') = ?4)
            ORDER BY f.code, c.position"#,
            CONTROL_VIEW_SELECT
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![
                filter.framework,
                filter.clause_prefix,
                filter.search,
                filter.status.map(|s| s.to_string()),
            ],
            control_view_from_row,
        )?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Get one control with its framework code and status
    pub fn get_control(&self, id: &EntityId) -> Result<ControlView, StoreError> {
        self.conn
            .query_row(
                &format!("{} WHERE c.id = ?1", CONTROL_VIEW_SELECT),
                params![id],
                control_view_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found(EntityPrefix::Ctrl, id.to_string()))
    }

    /// The clause a control hangs under
    pub fn get_clause(&self, id: &EntityId) -> Result<Clause, StoreError> {
        self.conn
            .query_row("SELECT * FROM clauses WHERE id = ?1", params![id], clause_from_row)
            .optional()?
            .ok_or_else(|| StoreError::not_found(EntityPrefix::Cls, id.to_string()))
    }

    /// Implementation record of a control, if one was ever recorded
    pub fn get_implementation(
        &self,
        control_id: &EntityId,
    ) -> Result<Option<ControlImplementation>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM control_implementations WHERE control_id = ?1",
                params![control_id],
                implementation_from_row,
            )
            .optional()?)
    }

    /// Create or update the implementation record of a control.
    /// Fields passed as None keep their stored value.
    pub fn set_implementation(
        &self,
        control_id: &EntityId,
        status: ImplementationStatus,
        owner: Option<String>,
        notes: Option<String>,
        evidence: Option<String>,
        updated_by: &str,
    ) -> Result<ControlImplementation, StoreError> {
        // Surface a friendly NotFound before the foreign key does
        self.get_control(control_id)?;

        self.transaction(|tx| {
            upsert_implementation(
                tx,
                ImplementationUpdate {
                    control_id,
                    status,
                    owner,
                    notes,
                    evidence,
                    updated_by,
                },
            )
        })
    }

    /// Delete a framework and everything seeded under it.
    /// Returns the number of controls removed.
    pub fn delete_framework(&self, code: &str) -> Result<usize, StoreError> {
        let framework = self.get_framework(code)?;
        self.transaction(|tx| {
            let controls: i64 = tx.query_row(
                "SELECT COUNT(*) FROM controls WHERE framework_id = ?1",
                params![framework.id],
                |row| row.get(0),
            )?;
            tx.execute("DELETE FROM frameworks WHERE id = ?1", params![framework.id])?;
            prune_short_ids(tx)?;
            tracing::info!(code = %framework.code, controls, "deleted framework");
            Ok(controls as usize)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::core::seed::seed;
    use crate::entities::task::Task;

    const MINI: &str = r#"
code: MINI
name: Mini Standard
version: "1"
clauses:
  - ref: "A"
    title: Access
    clauses:
      - ref: "A.1"
        title: Accounts
        controls:
          - ref: "A.1.1"
            title: Joiner and leaver process
  - ref: "B"
    title: Backup
    controls:
      - ref: "B.1"
        title: Nightly backups
"#;

    fn seeded() -> Store {
        let store = Store::open_in_memory().unwrap();
        seed(&store, &Catalog::from_yaml("mini", MINI).unwrap(), false).unwrap();
        store
    }

    fn count(store: &Store, table: &str) -> i64 {
        store
            .connection()
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_delete_framework_cascades() {
        let store = seeded();
        let control = store.resolve("MINI:A.1.1", EntityPrefix::Ctrl).unwrap();
        let record = store
            .set_implementation(
                &control,
                ImplementationStatus::Implemented,
                None,
                None,
                None,
                "alice",
            )
            .unwrap();

        let mut task = Task::new("Automate leaver tickets".to_string(), "alice".to_string());
        task.control_id = Some(control.clone());
        store.insert_task(&task).unwrap();
        assert!(store.short_id(&control).is_some());

        assert_eq!(store.delete_framework("mini").unwrap(), 2);

        assert!(store.list_frameworks().unwrap().is_empty());
        assert_eq!(count(&store, "clauses"), 0);
        assert_eq!(count(&store, "controls"), 0);
        assert_eq!(count(&store, "control_implementations"), 0);

        let task = store.get_task(&task.id).unwrap();
        assert_eq!(task.control_id, None);

        assert_eq!(store.short_id(&control), None);
        assert_eq!(store.short_id(&record.id), None);
        assert!(store.resolve("FW@1", EntityPrefix::Fw).is_err());
        assert!(store.resolve("CLS@1", EntityPrefix::Cls).is_err());
        assert_eq!(store.resolve("TASK@1", EntityPrefix::Task).unwrap(), task.id);
    }

    #[test]
    fn test_delete_unknown_framework() {
        let store = seeded();
        assert!(matches!(
            store.delete_framework("NOPE"),
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(count(&store, "controls"), 2);
    }
}
