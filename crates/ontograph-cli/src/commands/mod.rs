//! CLI command implementations

pub mod analyze;
pub mod completions;
pub mod config;
pub mod entity;
pub mod relation;
pub mod schema;
