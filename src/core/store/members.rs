//! Membership queries

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::shortid::assign_short_id;
use super::{opt_text, parse_column, Store, StoreError};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::entities::membership::{Membership, Role};

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<Membership> {
    Ok(Membership {
        id: row.get("id")?,
        username: row.get("username")?,
        email: opt_text(row.get("email")?),
        role: parse_column(row, "role")?,
        active: row.get("active")?,
        created: row.get("created")?,
    })
}

fn active_owner_count(conn: &Connection) -> Result<i64, StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM memberships WHERE role = 'owner' AND active = 1",
        [],
        |row| row.get(0),
    )?)
}

fn member_in(conn: &Connection, id: &EntityId) -> Result<Membership, StoreError> {
    conn.query_row(
        "SELECT * FROM memberships WHERE id = ?1",
        params![id],
        member_from_row,
    )
    .optional()?
    .ok_or_else(|| StoreError::not_found(EntityPrefix::Mbr, id.to_string()))
}

/// Fail if changing `member` would leave no active owner
fn guard_last_owner(conn: &Connection, member: &Membership) -> Result<(), StoreError> {
    if member.active && member.role == Role::Owner && active_owner_count(conn)? <= 1 {
        return Err(StoreError::Conflict(format!(
            "{} is the last active owner; promote another owner first",
            member.username
        )));
    }
    Ok(())
}

impl Store {
    /// Add a member, returning its short ID. Usernames are unique
    /// case-insensitively.
    pub fn add_member(&self, member: &Membership) -> Result<String, StoreError> {
        self.transaction(|tx| {
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM memberships WHERE username = ?1 COLLATE NOCASE)",
                params![member.username],
                |row| row.get(0),
            )?;
            if taken {
                return Err(StoreError::Conflict(format!(
                    "member '{}' already exists",
                    member.username
                )));
            }
            tx.execute(
                r#"INSERT INTO memberships (id, username, email, role, active, created)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6)"#,
                params![
                    member.id,
                    member.username,
                    member.email,
                    member.role.to_string(),
                    member.active,
                    member.created,
                ],
            )?;
            tracing::info!(username = %member.username, role = %member.role, "added member");
            assign_short_id(tx, &member.id)
        })
    }

    pub fn get_member(&self, id: &EntityId) -> Result<Membership, StoreError> {
        member_in(&self.conn, id)
    }

    /// Look up a member by username, ignoring case
    pub fn find_member(&self, username: &str) -> Result<Option<Membership>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT * FROM memberships WHERE username = ?1 COLLATE NOCASE",
                params![username.trim()],
                member_from_row,
            )
            .optional()?)
    }

    /// Members ordered by role (most privileged first), then username
    pub fn list_members(&self, include_inactive: bool) -> Result<Vec<Membership>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT * FROM memberships WHERE (?1 = 1 OR active = 1) ORDER BY username COLLATE NOCASE",
        )?;
        let rows = stmt.query_map(params![include_inactive], member_from_row)?;
        let mut members = rows.collect::<Result<Vec<_>, _>>()?;
        members.sort_by(|a, b| b.role.cmp(&a.role));
        Ok(members)
    }

    /// Whether any membership was ever recorded
    pub fn has_members(&self) -> Result<bool, StoreError> {
        Ok(self
            .conn
            .query_row("SELECT EXISTS(SELECT 1 FROM memberships)", [], |row| row.get(0))?)
    }

    /// Change a member's role. Demoting the last active owner is refused.
    pub fn set_role(&self, id: &EntityId, role: Role) -> Result<Membership, StoreError> {
        self.transaction(|tx| {
            let mut member = member_in(tx, id)?;
            if member.role == role {
                return Ok(member);
            }
            if role != Role::Owner {
                guard_last_owner(tx, &member)?;
            }
            tx.execute(
                "UPDATE memberships SET role = ?2 WHERE id = ?1",
                params![id, role.to_string()],
            )?;
            tracing::info!(username = %member.username, from = %member.role, to = %role, "changed role");
            member.role = role;
            Ok(member)
        })
    }

    /// Deactivate a member. Deactivating the last active owner is refused.
    pub fn deactivate_member(&self, id: &EntityId) -> Result<Membership, StoreError> {
        self.transaction(|tx| {
            let mut member = member_in(tx, id)?;
            if !member.active {
                return Ok(member);
            }
            guard_last_owner(tx, &member)?;
            tx.execute("UPDATE memberships SET active = 0 WHERE id = ?1", params![id])?;
            tracing::info!(username = %member.username, "deactivated member");
            member.active = false;
            Ok(member)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add(store: &Store, name: &str, role: Role) -> Membership {
        let member = Membership::new(name.to_string(), role);
        store.add_member(&member).unwrap();
        member
    }

    #[test]
    fn test_usernames_unique_ignoring_case() {
        let store = Store::open_in_memory().unwrap();
        add(&store, "alice", Role::Owner);
        let dup = Membership::new("ALICE".to_string(), Role::Viewer);
        assert!(matches!(store.add_member(&dup), Err(StoreError::Conflict(_))));
        assert!(store.find_member("Alice").unwrap().is_some());
    }

    #[test]
    fn test_last_owner_cannot_be_demoted_or_deactivated() {
        let store = Store::open_in_memory().unwrap();
        let owner = add(&store, "alice", Role::Owner);

        assert!(matches!(
            store.set_role(&owner.id, Role::Admin),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            store.deactivate_member(&owner.id),
            Err(StoreError::Conflict(_))
        ));

        let second = add(&store, "bob", Role::Member);
        store.set_role(&second.id, Role::Owner).unwrap();
        let demoted = store.set_role(&owner.id, Role::Admin).unwrap();
        assert_eq!(demoted.role, Role::Admin);
    }

    #[test]
    fn test_list_members_orders_by_role() {
        let store = Store::open_in_memory().unwrap();
        add(&store, "carol", Role::Viewer);
        add(&store, "alice", Role::Owner);
        let bob = add(&store, "bob", Role::Member);
        store.deactivate_member(&bob.id).unwrap();

        let names: Vec<String> = store
            .list_members(false)
            .unwrap()
            .into_iter()
            .map(|m| m.username)
            .collect();
        assert_eq!(names, vec!["alice", "carol"]);
        assert_eq!(store.list_members(true).unwrap().len(), 3);
    }
}
