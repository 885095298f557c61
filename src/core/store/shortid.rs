//! Short ID assignment and reference resolution
//!
//! Every record gets a `PREFIX@N` alias when it is inserted. Counters only
//! grow, so a deleted record's alias is never handed to another record.

use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension};

use super::{Store, StoreError};
use crate::core::identity::{EntityId, EntityPrefix};

/// Table holding records of the given prefix
pub(crate) fn table_for(prefix: EntityPrefix) -> &'static str {
    match prefix {
        EntityPrefix::Fw => "frameworks",
        EntityPrefix::Cls => "clauses",
        EntityPrefix::Ctrl => "controls",
        EntityPrefix::Impl => "control_implementations",
        EntityPrefix::Task => "tasks",
        EntityPrefix::Risk => "risks",
        EntityPrefix::Capa => "capas",
        EntityPrefix::Trn => "training_programs",
        EntityPrefix::Mbr => "memberships",
    }
}

/// Assign the next short ID for `id`, or return the existing one
pub(crate) fn assign_short_id(conn: &Connection, id: &EntityId) -> Result<String, StoreError> {
    let existing: Option<String> = conn
        .query_row(
            "SELECT short_id FROM short_ids WHERE entity_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;
    if let Some(short) = existing {
        return Ok(short);
    }

    let prefix = id.prefix().as_str();
    conn.execute(
        "INSERT OR IGNORE INTO short_id_counters (prefix, next_id) VALUES (?1, 1)",
        params![prefix],
    )?;
    let next: i64 = conn.query_row(
        "SELECT next_id FROM short_id_counters WHERE prefix = ?1",
        params![prefix],
        |row| row.get(0),
    )?;
    conn.execute(
        "UPDATE short_id_counters SET next_id = next_id + 1 WHERE prefix = ?1",
        params![prefix],
    )?;

    let short = format!("{}@{}", prefix, next);
    conn.execute(
        "INSERT INTO short_ids (short_id, entity_id, prefix) VALUES (?1, ?2, ?3)",
        params![short, id, prefix],
    )?;
    Ok(short)
}

/// Drop aliases whose records are gone (after cascading deletes)
pub(crate) fn prune_short_ids(conn: &Connection) -> Result<usize, StoreError> {
    let mut removed = 0;
    for prefix in EntityPrefix::all() {
        removed += conn.execute(
            &format!(
                "DELETE FROM short_ids WHERE prefix = ?1 AND entity_id NOT IN (SELECT id FROM {})",
                table_for(*prefix)
            ),
            params![prefix.as_str()],
        )?;
    }
    Ok(removed)
}

impl Store {
    /// Short ID for a record, if assigned
    pub fn short_id(&self, id: &EntityId) -> Option<String> {
        self.conn
            .query_row(
                "SELECT short_id FROM short_ids WHERE entity_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()
            .ok()
            .flatten()
    }

    /// All short IDs of one prefix, keyed by full entity ID
    pub fn short_ids(&self, prefix: EntityPrefix) -> Result<HashMap<String, String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT entity_id, short_id FROM short_ids WHERE prefix = ?1")?;
        let rows = stmt.query_map(params![prefix.as_str()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<Result<HashMap<_, _>, _>>()?)
    }

    /// Resolve a user-supplied reference to an existing record's ID
    ///
    /// Accepts:
    /// - `PREFIX@N` or `@N` short IDs
    /// - full IDs (`TASK-01J...`)
    /// - `CODE:REF` for controls (e.g., `ISO27001:A.5.1`)
    /// - framework codes for frameworks, usernames for memberships
    pub fn resolve(&self, reference: &str, prefix: EntityPrefix) -> Result<EntityId, StoreError> {
        let reference = reference.trim();
        let invalid = || StoreError::InvalidReference {
            expected: prefix,
            reference: reference.to_string(),
        };

        // "alice@example.com" is a username, not a short ID
        let short_form = reference
            .split_once('@')
            .filter(|(head, _)| head.is_empty() || head.parse::<EntityPrefix>().is_ok());

        if let Some((head, num)) = short_form {
            if !head.is_empty() && !head.eq_ignore_ascii_case(prefix.as_str()) {
                return Err(invalid());
            }
            if num.is_empty() || !num.chars().all(|c| c.is_ascii_digit()) {
                return Err(invalid());
            }
            let short = format!("{}@{}", prefix.as_str(), num);
            let id: Option<EntityId> = self
                .conn
                .query_row(
                    "SELECT entity_id FROM short_ids WHERE short_id = ?1",
                    params![short],
                    |row| row.get(0),
                )
                .optional()?;
            return id.ok_or_else(|| StoreError::not_found(prefix, reference));
        }

        if let Ok(id) = EntityId::parse(reference) {
            if id.prefix() != prefix {
                return Err(invalid());
            }
            let exists: bool = self.conn.query_row(
                &format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = ?1)", table_for(prefix)),
                params![id],
                |row| row.get(0),
            )?;
            return if exists {
                Ok(id)
            } else {
                Err(StoreError::not_found(prefix, reference))
            };
        }

        let natural: Option<EntityId> = match prefix {
            EntityPrefix::Ctrl => {
                let (code, control_ref) = reference.split_once(':').ok_or_else(invalid)?;
                self.conn
                    .query_row(
                        "SELECT c.id FROM controls c JOIN frameworks f ON f.id = c.framework_id
                         WHERE f.code = ?1 COLLATE NOCASE AND c.ref = ?2",
                        params![code.trim(), control_ref.trim()],
                        |row| row.get(0),
                    )
                    .optional()?
            }
            EntityPrefix::Cls => {
                let (code, clause_ref) = reference.split_once(':').ok_or_else(invalid)?;
                self.conn
                    .query_row(
                        "SELECT c.id FROM clauses c JOIN frameworks f ON f.id = c.framework_id
                         WHERE f.code = ?1 COLLATE NOCASE AND c.ref = ?2",
                        params![code.trim(), clause_ref.trim()],
                        |row| row.get(0),
                    )
                    .optional()?
            }
            EntityPrefix::Fw => self
                .conn
                .query_row(
                    "SELECT id FROM frameworks WHERE code = ?1 COLLATE NOCASE",
                    params![reference],
                    |row| row.get(0),
                )
                .optional()?,
            EntityPrefix::Mbr => self
                .conn
                .query_row(
                    "SELECT id FROM memberships WHERE username = ?1 COLLATE NOCASE",
                    params![reference],
                    |row| row.get(0),
                )
                .optional()?,
            _ => return Err(invalid()),
        };

        natural.ok_or_else(|| StoreError::not_found(prefix, reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_ids_are_sequential_per_prefix() {
        let store = Store::open_in_memory().unwrap();
        let conn = store.connection();

        let t1 = EntityId::new(EntityPrefix::Task);
        let t2 = EntityId::new(EntityPrefix::Task);
        let r1 = EntityId::new(EntityPrefix::Risk);

        assert_eq!(assign_short_id(conn, &t1).unwrap(), "TASK@1");
        assert_eq!(assign_short_id(conn, &t2).unwrap(), "TASK@2");
        assert_eq!(assign_short_id(conn, &r1).unwrap(), "RISK@1");
        // Re-assigning returns the existing alias
        assert_eq!(assign_short_id(conn, &t1).unwrap(), "TASK@1");
    }

    #[test]
    fn test_resolve_rejects_wrong_prefix() {
        let store = Store::open_in_memory().unwrap();
        let err = store.resolve("RISK@1", EntityPrefix::Task).unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference { .. }));

        let err = store.resolve("TASK@x", EntityPrefix::Task).unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference { .. }));
    }

    #[test]
    fn test_resolve_unknown_short_id() {
        let store = Store::open_in_memory().unwrap();
        let err = store.resolve("@7", EntityPrefix::Task).unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
