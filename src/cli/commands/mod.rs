//! CLI command implementations

pub mod board;
pub mod capa;
pub mod completions;
pub mod control;
pub mod framework;
pub mod init;
pub mod member;
pub mod report;
pub mod risk;
pub mod seed;
pub mod snapshot;
pub mod status;
pub mod task;
pub mod training;
