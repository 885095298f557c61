//! Seeding framework catalogs into the store
//!
//! Seeding is idempotent. Frameworks match by code, clauses and controls by
//! `(framework, ref)`, so re-running a seed updates text in place and keeps
//! every ID and short ID stable. Entries that disappeared from the catalog
//! are removed so the stored tree always mirrors the catalog.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{Catalog, CatalogClause, CatalogControl, CatalogError};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::store::{assign_short_id, prune_short_ids, Store, StoreError};

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a seed run did to the framework as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SeedOutcome {
    Created,
    Updated,
    Unchanged,
}

impl std::fmt::Display for SeedOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SeedOutcome::Created => write!(f, "created"),
            SeedOutcome::Updated => write!(f, "updated"),
            SeedOutcome::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// Result of seeding one framework
#[derive(Debug, Clone, Serialize)]
pub struct SeedReport {
    pub code: String,
    pub outcome: SeedOutcome,
    /// Clauses in the framework after seeding
    pub clauses: usize,
    /// Controls in the framework after seeding
    pub controls: usize,
    /// Clauses and controls inserted
    pub inserted: usize,
    /// Clauses and controls whose text or placement changed
    pub updated: usize,
    /// Clauses and controls removed because the catalog dropped them
    pub removed: usize,
}

struct StoredClause {
    id: EntityId,
    parent_id: Option<EntityId>,
    title: String,
    description: Option<String>,
    position: u32,
}

struct StoredControl {
    id: EntityId,
    clause_id: EntityId,
    title: String,
    objective: Option<String>,
    guidance: Option<String>,
    position: u32,
}

/// Depth-first walk of one catalog against the stored tree
struct Seeder<'a> {
    tx: &'a Connection,
    framework_id: EntityId,
    clauses: HashMap<String, StoredClause>,
    controls: HashMap<String, StoredControl>,
    seen_clauses: HashSet<String>,
    seen_controls: HashSet<String>,
    clause_position: u32,
    control_position: u32,
    inserted: usize,
    updated: usize,
}

impl<'a> Seeder<'a> {
    fn load(tx: &'a Connection, framework_id: EntityId) -> Result<Self, StoreError> {
        let mut stmt = tx.prepare(
            "SELECT ref, id, parent_id, title, description, position FROM clauses WHERE framework_id = ?1",
        )?;
        let clauses = stmt
            .query_map(params![framework_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    StoredClause {
                        id: row.get(1)?,
                        parent_id: row.get(2)?,
                        title: row.get(3)?,
                        description: row.get(4)?,
                        position: row.get(5)?,
                    },
                ))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;

        let mut stmt = tx.prepare(
            "SELECT ref, id, clause_id, title, objective, guidance, position FROM controls WHERE framework_id = ?1",
        )?;
        let controls = stmt
            .query_map(params![framework_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    StoredControl {
                        id: row.get(1)?,
                        clause_id: row.get(2)?,
                        title: row.get(3)?,
                        objective: row.get(4)?,
                        guidance: row.get(5)?,
                        position: row.get(6)?,
                    },
                ))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;

        Ok(Self {
            tx,
            framework_id,
            clauses,
            controls,
            seen_clauses: HashSet::new(),
            seen_controls: HashSet::new(),
            clause_position: 0,
            control_position: 0,
            inserted: 0,
            updated: 0,
        })
    }

    fn clause(&mut self, clause: &CatalogClause, parent: Option<&EntityId>) -> Result<(), StoreError> {
        let position = self.clause_position;
        self.clause_position += 1;
        self.seen_clauses.insert(clause.reference.clone());

        let id = match self.clauses.get(&clause.reference) {
            Some(stored) => {
                let changed = stored.parent_id.as_ref() != parent
                    || stored.title != clause.title
                    || stored.description != clause.description
                    || stored.position != position;
                if changed {
                    self.tx.execute(
                        r#"UPDATE clauses SET parent_id = ?2, title = ?3, description = ?4,
                               position = ?5 WHERE id = ?1"#,
                        params![stored.id, parent, clause.title, clause.description, position],
                    )?;
                    self.updated += 1;
                }
                stored.id.clone()
            }
            None => {
                let id = EntityId::new(EntityPrefix::Cls);
                self.tx.execute(
                    r#"INSERT INTO clauses (id, framework_id, parent_id, ref, title, description, position)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
                    params![
                        id,
                        self.framework_id,
                        parent,
                        clause.reference,
                        clause.title,
                        clause.description,
                        position,
                    ],
                )?;
                assign_short_id(self.tx, &id)?;
                self.inserted += 1;
                id
            }
        };

        for control in &clause.controls {
            self.control(control, &id)?;
        }
        for child in &clause.clauses {
            self.clause(child, Some(&id))?;
        }
        Ok(())
    }

    fn control(&mut self, control: &CatalogControl, clause_id: &EntityId) -> Result<(), StoreError> {
        let position = self.control_position;
        self.control_position += 1;
        self.seen_controls.insert(control.reference.clone());

        match self.controls.get(&control.reference) {
            Some(stored) => {
                let changed = &stored.clause_id != clause_id
                    || stored.title != control.title
                    || stored.objective != control.objective
                    || stored.guidance != control.guidance
                    || stored.position != position;
                if changed {
                    self.tx.execute(
                        r#"UPDATE controls SET clause_id = ?2, title = ?3, objective = ?4,
                               guidance = ?5, position = ?6 WHERE id = ?1"#,
                        params![
                            stored.id,
                            clause_id,
                            control.title,
                            control.objective,
                            control.guidance,
                            position,
                        ],
                    )?;
                    self.updated += 1;
                }
            }
            None => {
                let id = EntityId::new(EntityPrefix::Ctrl);
                self.tx.execute(
                    r#"INSERT INTO controls (id, framework_id, clause_id, ref, title, objective, guidance, position)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                    params![
                        id,
                        self.framework_id,
                        clause_id,
                        control.reference,
                        control.title,
                        control.objective,
                        control.guidance,
                        position,
                    ],
                )?;
                assign_short_id(self.tx, &id)?;
                self.inserted += 1;
            }
        }
        Ok(())
    }

    /// Delete stored entries the catalog no longer lists. The count comes
    /// from the refs, since a clause delete cascades to its subtree.
    fn remove_unseen(&self) -> Result<usize, StoreError> {
        let dropped_controls: Vec<&EntityId> = self
            .controls
            .iter()
            .filter(|(reference, _)| !self.seen_controls.contains(*reference))
            .map(|(_, stored)| &stored.id)
            .collect();
        let dropped_clauses: Vec<&EntityId> = self
            .clauses
            .iter()
            .filter(|(reference, _)| !self.seen_clauses.contains(*reference))
            .map(|(_, stored)| &stored.id)
            .collect();

        for id in &dropped_controls {
            self.tx
                .execute("DELETE FROM controls WHERE id = ?1", params![id])?;
        }
        for id in &dropped_clauses {
            self.tx
                .execute("DELETE FROM clauses WHERE id = ?1", params![id])?;
        }
        Ok(dropped_controls.len() + dropped_clauses.len())
    }
}

/// Seed one catalog. Skips the work when the stored content hash matches,
/// unless `force` is set.
pub fn seed(store: &Store, catalog: &Catalog, force: bool) -> Result<SeedReport, SeedError> {
    catalog.validate()?;
    let report = store.transaction(|tx| seed_in(tx, catalog, force))?;

    tracing::info!(
        code = %report.code,
        outcome = %report.outcome,
        inserted = report.inserted,
        updated = report.updated,
        removed = report.removed,
        "seeded framework"
    );
    Ok(report)
}

/// Seed a validated catalog inside a transaction the caller owns
pub(crate) fn seed_in(
    tx: &Connection,
    catalog: &Catalog,
    force: bool,
) -> Result<SeedReport, StoreError> {
    let hash = catalog.content_hash();
    let existing: Option<(EntityId, String)> = tx
        .query_row(
            "SELECT id, content_hash FROM frameworks WHERE code = ?1 COLLATE NOCASE",
            params![catalog.code],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let report = |outcome, inserted, updated, removed| SeedReport {
        code: catalog.code.clone(),
        outcome,
        clauses: catalog.clause_count(),
        controls: catalog.control_count(),
        inserted,
        updated,
        removed,
    };

    if let Some((_, stored_hash)) = &existing {
        if !force && *stored_hash == hash {
            return Ok(report(SeedOutcome::Unchanged, 0, 0, 0));
        }
    }

    let (framework_id, outcome) = match existing {
        Some((id, _)) => {
            tx.execute(
                r#"UPDATE frameworks SET name = ?2, version = ?3, publisher = ?4,
                       description = ?5, content_hash = ?6, seeded_at = ?7
                   WHERE id = ?1"#,
                params![
                    id,
                    catalog.name,
                    catalog.version,
                    catalog.publisher,
                    catalog.description,
                    hash,
                    Utc::now(),
                ],
            )?;
            (id, SeedOutcome::Updated)
        }
        None => {
            let id = EntityId::new(EntityPrefix::Fw);
            tx.execute(
                r#"INSERT INTO frameworks (id, code, name, version, publisher, description,
                       content_hash, seeded_at)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                params![
                    id,
                    catalog.code,
                    catalog.name,
                    catalog.version,
                    catalog.publisher,
                    catalog.description,
                    hash,
                    Utc::now(),
                ],
            )?;
            assign_short_id(tx, &id)?;
            (id, SeedOutcome::Created)
        }
    };

    let mut seeder = Seeder::load(tx, framework_id)?;
    for clause in &catalog.clauses {
        seeder.clause(clause, None)?;
    }
    let removed = seeder.remove_unseen()?;
    if removed > 0 {
        prune_short_ids(tx)?;
    }

    Ok(report(outcome, seeder.inserted, seeder.updated, removed))
}

/// Seed several catalogs, one transaction each
pub fn seed_all(
    store: &Store,
    catalogs: &[Catalog],
    force: bool,
) -> Result<Vec<SeedReport>, SeedError> {
    catalogs.iter().map(|c| seed(store, c, force)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::ControlFilter;
    use crate::entities::implementation::ImplementationStatus;

    const DEMO: &str = r#"
code: DEMO
name: Demo Standard
version: "1"
clauses:
  - ref: "1"
    title: Governance
    clauses:
      - ref: "1.1"
        title: Policy
        controls:
          - ref: "1.1.1"
            title: Policy approved
  - ref: "2"
    title: Operations
    controls:
      - ref: "2.1"
        title: Backups
      - ref: "2.2"
        title: Logging
"#;

    fn demo() -> Catalog {
        Catalog::from_yaml("demo", DEMO).unwrap()
    }

    fn control_ids(store: &Store) -> Vec<String> {
        store
            .list_controls(&ControlFilter::default())
            .unwrap()
            .into_iter()
            .map(|c| c.control.id.to_string())
            .collect()
    }

    #[test]
    fn test_seed_creates_tree() {
        let store = Store::open_in_memory().unwrap();
        let report = seed(&store, &demo(), false).unwrap();

        assert_eq!(report.outcome, SeedOutcome::Created);
        assert_eq!(report.clauses, 3);
        assert_eq!(report.controls, 3);
        assert_eq!(report.inserted, 6);

        let tree = store.clause_tree("DEMO").unwrap();
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children[0].clause.reference, "1.1");
        assert_eq!(tree[0].control_count(), 1);
        assert_eq!(tree[1].controls[1].control.reference, "2.2");
    }

    #[test]
    fn test_seed_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        seed(&store, &demo(), false).unwrap();
        let before = control_ids(&store);

        let again = seed(&store, &demo(), false).unwrap();
        assert_eq!(again.outcome, SeedOutcome::Unchanged);

        let forced = seed(&store, &demo(), true).unwrap();
        assert_eq!(forced.outcome, SeedOutcome::Updated);
        assert_eq!(forced.inserted, 0);
        assert_eq!(forced.updated, 0);
        assert_eq!(control_ids(&store), before);

        let summary = &store.list_frameworks().unwrap()[0];
        assert_eq!(summary.clause_count, 3);
        assert_eq!(summary.control_count, 3);
    }

    #[test]
    fn test_reseed_updates_in_place_and_removes_dropped() {
        let store = Store::open_in_memory().unwrap();
        seed(&store, &demo(), false).unwrap();
        let backups = store.resolve("DEMO:2.1", EntityPrefix::Ctrl).unwrap();
        let short = store.short_id(&backups).unwrap();

        let mut changed = demo();
        changed.clauses[1].controls[0].title = "Backups tested".to_string();
        changed.clauses[1].controls.remove(1);

        let report = seed(&store, &changed, false).unwrap();
        assert_eq!(report.outcome, SeedOutcome::Updated);
        assert_eq!(report.updated, 1);
        assert_eq!(report.removed, 1);

        let view = store.get_control(&backups).unwrap();
        assert_eq!(view.control.title, "Backups tested");
        assert_eq!(store.short_id(&backups).unwrap(), short);
        assert!(store.resolve("DEMO:2.2", EntityPrefix::Ctrl).is_err());
    }

    #[test]
    fn test_dropping_nested_clauses_counts_every_entry() {
        let nested = r#"
code: NEST
name: Nested
version: "1"
clauses:
  - ref: "1"
    title: Kept
    controls:
      - ref: "1.c"
        title: Kept control
  - ref: "2"
    title: Parent
    clauses:
      - ref: "2.1"
        title: Child
        clauses:
          - ref: "2.1.1"
            title: Grandchild
            controls:
              - ref: "2.1.1.c"
                title: Deep control
"#;
        let trimmed = r#"
code: NEST
name: Nested
version: "2"
clauses:
  - ref: "1"
    title: Kept
    controls:
      - ref: "1.c"
        title: Kept control
"#;
        let full = Catalog::from_yaml("nest", nested).unwrap();
        let small = Catalog::from_yaml("nest", trimmed).unwrap();

        for _ in 0..25 {
            let store = Store::open_in_memory().unwrap();
            seed(&store, &full, false).unwrap();
            let report = seed(&store, &small, false).unwrap();
            assert_eq!(report.removed, 4);
            assert_eq!(store.clause_tree("NEST").unwrap().len(), 1);
            assert!(store.resolve("NEST:2.1.1.c", EntityPrefix::Ctrl).is_err());
        }
    }

    #[test]
    fn test_reseed_removal_drops_implementations() {
        let store = Store::open_in_memory().unwrap();
        seed(&store, &demo(), false).unwrap();
        let logging = store.resolve("DEMO:2.2", EntityPrefix::Ctrl).unwrap();
        let backups = store.resolve("DEMO:2.1", EntityPrefix::Ctrl).unwrap();
        for control in [&logging, &backups] {
            store
                .set_implementation(
                    control,
                    ImplementationStatus::InProgress,
                    None,
                    None,
                    None,
                    "alice",
                )
                .unwrap();
        }
        let dropped = store.get_implementation(&logging).unwrap().unwrap();

        let mut changed = demo();
        changed.clauses[1].controls.remove(1);
        seed(&store, &changed, false).unwrap();

        assert!(store.get_implementation(&logging).unwrap().is_none());
        assert_eq!(store.short_id(&dropped.id), None);
        let kept = store.get_implementation(&backups).unwrap().unwrap();
        assert_eq!(kept.status, ImplementationStatus::InProgress);
    }

    #[test]
    fn test_invalid_catalog_is_not_seeded() {
        let store = Store::open_in_memory().unwrap();
        let mut catalog = demo();
        catalog.clauses[1].controls[1].reference = "2.1".to_string();
        assert!(matches!(
            seed(&store, &catalog, false),
            Err(SeedError::Catalog(_))
        ));
        assert!(store.list_frameworks().unwrap().is_empty());
    }

    #[test]
    fn test_seed_all_builtin_twice() {
        let store = Store::open_in_memory().unwrap();
        let catalogs = Catalog::builtin().unwrap();
        let first = seed_all(&store, &catalogs, false).unwrap();
        assert_eq!(first.len(), 10);
        assert!(first.iter().all(|r| r.outcome == SeedOutcome::Created));

        let second = seed_all(&store, &catalogs, false).unwrap();
        assert!(second.iter().all(|r| r.outcome == SeedOutcome::Unchanged));

        for (summary, catalog) in store.list_frameworks().unwrap().iter().zip(&catalogs) {
            assert_eq!(summary.framework.code, catalog.code);
            assert_eq!(summary.control_count, catalog.control_count());
        }
    }
}
