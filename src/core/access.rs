//! Role-based access control over mutations
//!
//! Access is open until the first membership is recorded, so a fresh
//! workspace can bootstrap its owner. From then on every mutating command
//! checks the acting user's active membership against the action's minimum
//! role.

use miette::Diagnostic;
use thiserror::Error;

use crate::core::store::{Store, StoreError};
use crate::entities::membership::{Membership, Role};

/// Things a user can try to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    ExportSnapshot,
    EditTasks,
    EditRecords,
    SeedCatalog,
    ManageMembers,
}

impl Action {
    /// Least privileged role allowed to perform the action
    pub fn min_role(&self) -> Role {
        match self {
            Action::Read => Role::Viewer,
            Action::ExportSnapshot => Role::Auditor,
            Action::EditTasks | Action::EditRecords => Role::Member,
            Action::SeedCatalog | Action::ManageMembers => Role::Admin,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::Read => write!(f, "read"),
            Action::ExportSnapshot => write!(f, "export snapshots"),
            Action::EditTasks => write!(f, "edit tasks"),
            Action::EditRecords => write!(f, "edit records"),
            Action::SeedCatalog => write!(f, "seed catalogs"),
            Action::ManageMembers => write!(f, "manage members"),
        }
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum AccessError {
    #[error("'{user}' is not an active member of this workspace")]
    #[diagnostic(
        code(grc::access::not_a_member),
        help("ask an admin to run `grc member add {user}`, or set GRC_USER")
    )]
    NotAMember { user: String },

    #[error("'{user}' is a {role}, but {action} requires {required} or above")]
    #[diagnostic(code(grc::access::forbidden))]
    Forbidden {
        user: String,
        role: Role,
        action: Action,
        required: Role,
    },

    #[error(transparent)]
    #[diagnostic(code(grc::access::store))]
    Store(#[from] StoreError),
}

/// Membership snapshot used to authorize actions
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    members: Vec<Membership>,
}

impl AccessPolicy {
    /// Load every membership, active or not
    pub fn load(store: &Store) -> Result<Self, StoreError> {
        Ok(Self {
            members: store.list_members(true)?,
        })
    }

    pub fn from_members(members: Vec<Membership>) -> Self {
        Self { members }
    }

    /// No memberships recorded yet
    pub fn is_open(&self) -> bool {
        self.members.is_empty()
    }

    /// Active membership of `user`, matched case-insensitively
    pub fn member(&self, user: &str) -> Option<&Membership> {
        self.members
            .iter()
            .find(|m| m.active && m.username.eq_ignore_ascii_case(user.trim()))
    }

    /// Authorize `user` for `action`
    pub fn check(&self, user: &str, action: Action) -> Result<(), AccessError> {
        if self.is_open() {
            return Ok(());
        }

        let Some(member) = self.member(user) else {
            tracing::warn!(user, %action, "access denied: not a member");
            return Err(AccessError::NotAMember {
                user: user.to_string(),
            });
        };

        let required = action.min_role();
        if !member.has_at_least(required) {
            tracing::warn!(user, role = %member.role, %action, "access denied");
            return Err(AccessError::Forbidden {
                user: user.to_string(),
                role: member.role,
                action,
                required,
            });
        }
        Ok(())
    }

    /// Authorize granting or revoking a role. Owner changes need an owner.
    pub fn check_role_change(&self, user: &str, from: Option<Role>, to: Role) -> Result<(), AccessError> {
        self.check(user, Action::ManageMembers)?;
        if self.is_open() {
            return Ok(());
        }
        let touches_owner = to == Role::Owner || from == Some(Role::Owner);
        if touches_owner {
            if let Some(member) = self.member(user) {
                if member.role < Role::Owner {
                    tracing::warn!(user, "access denied: owner change requires owner");
                    return Err(AccessError::Forbidden {
                        user: user.to_string(),
                        role: member.role,
                        action: Action::ManageMembers,
                        required: Role::Owner,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(members: &[(&str, Role, bool)]) -> AccessPolicy {
        AccessPolicy::from_members(
            members
                .iter()
                .map(|(name, role, active)| {
                    let mut m = Membership::new(name.to_string(), *role);
                    m.active = *active;
                    m
                })
                .collect(),
        )
    }

    #[test]
    fn test_open_without_members() {
        let policy = AccessPolicy::default();
        assert!(policy.check("anyone", Action::SeedCatalog).is_ok());
        assert!(policy.check_role_change("anyone", None, Role::Owner).is_ok());
    }

    #[test]
    fn test_viewer_cannot_mutate() {
        let policy = policy(&[("olga", Role::Owner, true), ("vic", Role::Viewer, true)]);
        assert!(policy.check("vic", Action::Read).is_ok());
        assert!(matches!(
            policy.check("vic", Action::EditTasks),
            Err(AccessError::Forbidden { required: Role::Member, .. })
        ));
        assert!(policy.check("vic", Action::ExportSnapshot).is_err());
    }

    #[test]
    fn test_member_edits_tasks_but_cannot_seed() {
        let policy = policy(&[("olga", Role::Owner, true), ("mia", Role::Member, true)]);
        assert!(policy.check("MIA", Action::EditTasks).is_ok());
        assert!(policy.check("mia", Action::EditRecords).is_ok());
        assert!(policy.check("mia", Action::SeedCatalog).is_err());
    }

    #[test]
    fn test_unknown_and_inactive_users_are_rejected() {
        let policy = policy(&[("olga", Role::Owner, true), ("ian", Role::Admin, false)]);
        assert!(matches!(
            policy.check("stranger", Action::Read),
            Err(AccessError::NotAMember { .. })
        ));
        assert!(matches!(
            policy.check("ian", Action::Read),
            Err(AccessError::NotAMember { .. })
        ));
    }

    #[test]
    fn test_owner_changes_require_owner() {
        let policy = policy(&[("olga", Role::Owner, true), ("ada", Role::Admin, true)]);
        assert!(policy.check_role_change("ada", None, Role::Member).is_ok());
        assert!(policy.check_role_change("ada", None, Role::Owner).is_err());
        assert!(policy
            .check_role_change("ada", Some(Role::Owner), Role::Admin)
            .is_err());
        assert!(policy.check_role_change("olga", None, Role::Owner).is_ok());
    }

    #[test]
    fn test_min_roles() {
        assert_eq!(Action::Read.min_role(), Role::Viewer);
        assert_eq!(Action::ExportSnapshot.min_role(), Role::Auditor);
        assert_eq!(Action::EditTasks.min_role(), Role::Member);
        assert_eq!(Action::ManageMembers.min_role(), Role::Admin);
    }
}
