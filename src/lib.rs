//! GRC Workbench
//!
//! Tracks an organization's adherence to regulatory frameworks. Framework
//! catalogs (clauses and controls) ship embedded and are seeded into a
//! project-local SQLite database, alongside the organization's own records:
//! control implementations, tasks, risks, CAPAs, training, and members.

pub mod catalog;
pub mod cli;
pub mod core;
pub mod entities;
