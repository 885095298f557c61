//! Core module - identity, storage, seeding, and the operations built on them

pub mod access;
pub mod board;
pub mod config;
pub mod coverage;
pub mod entity;
pub mod identity;
pub mod project;
pub mod report;
pub mod seed;
pub mod snapshot;
pub mod store;

pub use access::{AccessError, AccessPolicy, Action};
pub use board::{Board, BoardError, Card, Column, StatusSink, TaskStatusWriter};
pub use config::Config;
pub use entity::{Entity, Priority};
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use project::{Project, ProjectError};
pub use seed::{seed, seed_all, SeedError, SeedOutcome, SeedReport};
pub use snapshot::{FrameworkSnapshot, SnapshotError};
pub use store::{Store, StoreError};
