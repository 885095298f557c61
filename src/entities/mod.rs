//! Entity type definitions
//!
//! **Seeded reference data:**
//! - [`Framework`], [`Clause`], [`Control`] - regulatory catalogs loaded by `grc seed`
//!
//! **Organization records:**
//! - [`ControlImplementation`] - how a control is satisfied
//! - [`Task`] - kanban work items
//! - [`Risk`] - risk register entries
//! - [`Capa`] - corrective/preventive actions
//! - [`TrainingProgram`] - recurring training
//! - [`Membership`] - users and roles

pub mod capa;
pub mod framework;
pub mod implementation;
pub mod membership;
pub mod risk;
pub mod task;
pub mod training;

pub use capa::Capa;
pub use framework::{Clause, ClauseNode, Control, ControlView, Framework, FrameworkSummary};
pub use implementation::{ControlImplementation, ImplementationStatus};
pub use membership::{Membership, Role};
pub use risk::Risk;
pub use task::{Task, TaskStatus};
pub use training::TrainingProgram;
