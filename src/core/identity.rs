//! Entity identity system using type-prefixed ULIDs

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use ulid::Ulid;

/// Entity type prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EntityPrefix {
    /// Regulatory framework or standard
    Fw,
    /// Clause within a framework
    Cls,
    /// Control objective attached to a clause
    Ctrl,
    /// Organization's implementation of a control
    Impl,
    /// Kanban task
    Task,
    /// Risk register entry
    Risk,
    /// Corrective/preventive action
    Capa,
    /// Training program
    Trn,
    /// Organization membership
    Mbr,
}

impl EntityPrefix {
    /// Get the string representation of the prefix
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityPrefix::Fw => "FW",
            EntityPrefix::Cls => "CLS",
            EntityPrefix::Ctrl => "CTRL",
            EntityPrefix::Impl => "IMPL",
            EntityPrefix::Task => "TASK",
            EntityPrefix::Risk => "RISK",
            EntityPrefix::Capa => "CAPA",
            EntityPrefix::Trn => "TRN",
            EntityPrefix::Mbr => "MBR",
        }
    }

    /// Get all valid prefixes
    pub fn all() -> &'static [EntityPrefix] {
        &[
            EntityPrefix::Fw,
            EntityPrefix::Cls,
            EntityPrefix::Ctrl,
            EntityPrefix::Impl,
            EntityPrefix::Task,
            EntityPrefix::Risk,
            EntityPrefix::Capa,
            EntityPrefix::Trn,
            EntityPrefix::Mbr,
        ]
    }
}

impl fmt::Display for EntityPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityPrefix {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "FW" => Ok(EntityPrefix::Fw),
            "CLS" => Ok(EntityPrefix::Cls),
            "CTRL" => Ok(EntityPrefix::Ctrl),
            "IMPL" => Ok(EntityPrefix::Impl),
            "TASK" => Ok(EntityPrefix::Task),
            "RISK" => Ok(EntityPrefix::Risk),
            "CAPA" => Ok(EntityPrefix::Capa),
            "TRN" => Ok(EntityPrefix::Trn),
            "MBR" => Ok(EntityPrefix::Mbr),
            _ => Err(IdParseError::InvalidPrefix(s.to_string())),
        }
    }
}

/// A unique entity identifier combining a type prefix and ULID
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId {
    prefix: EntityPrefix,
    ulid: Ulid,
}

impl EntityId {
    /// Create a new EntityId with the given prefix
    pub fn new(prefix: EntityPrefix) -> Self {
        Self {
            prefix,
            ulid: Ulid::new(),
        }
    }

    /// Get the entity prefix
    pub fn prefix(&self) -> EntityPrefix {
        self.prefix
    }

    /// Parse an EntityId from a string
    pub fn parse(s: &str) -> Result<Self, IdParseError> {
        s.parse()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.prefix, self.ulid)
    }
}

impl FromStr for EntityId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (prefix_str, ulid_str) = s
            .split_once('-')
            .ok_or_else(|| IdParseError::MissingDelimiter(s.to_string()))?;

        let prefix = prefix_str.parse()?;
        let ulid = Ulid::from_string(ulid_str)
            .map_err(|e| IdParseError::InvalidUlid(ulid_str.to_string(), e.to_string()))?;

        Ok(Self { prefix, ulid })
    }
}

impl Serialize for EntityId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for EntityId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl rusqlite::ToSql for EntityId {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        Ok(rusqlite::types::ToSqlOutput::from(self.to_string()))
    }
}

impl rusqlite::types::FromSql for EntityId {
    fn column_result(value: rusqlite::types::ValueRef<'_>) -> rusqlite::types::FromSqlResult<Self> {
        let s = value.as_str()?;
        s.parse()
            .map_err(|e: IdParseError| rusqlite::types::FromSqlError::Other(Box::new(e)))
    }
}

/// Errors that can occur when parsing entity IDs
#[derive(Debug, Error)]
pub enum IdParseError {
    #[error("invalid entity prefix: '{0}' (valid: FW, CLS, CTRL, IMPL, TASK, RISK, CAPA, TRN, MBR)")]
    InvalidPrefix(String),

    #[error("missing '-' delimiter in entity ID: '{0}'")]
    MissingDelimiter(String),

    #[error("invalid ULID '{0}': {1}")]
    InvalidUlid(String, String),
}
