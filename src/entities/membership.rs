//! Organization membership and roles

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};

/// Membership roles, ordered from least to most privileged
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Viewer,
    Auditor,
    Member,
    Admin,
    Owner,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Viewer => write!(f, "viewer"),
            Role::Auditor => write!(f, "auditor"),
            Role::Member => write!(f, "member"),
            Role::Admin => write!(f, "admin"),
            Role::Owner => write!(f, "owner"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "viewer" => Ok(Role::Viewer),
            "auditor" => Ok(Role::Auditor),
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            _ => Err(format!("Unknown role: {}", s)),
        }
    }
}

/// A user's membership in the organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: EntityId,

    /// Matched case-insensitively against the acting user
    pub username: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    pub role: Role,

    #[serde(default = "default_active")]
    pub active: bool,

    pub created: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl Membership {
    pub fn new(username: String, role: Role) -> Self {
        Self {
            id: EntityId::new(EntityPrefix::Mbr),
            username,
            email: None,
            role,
            active: true,
            created: Utc::now(),
        }
    }

    pub fn has_at_least(&self, role: Role) -> bool {
        self.active && self.role >= role
    }
}
