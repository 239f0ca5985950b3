//! CLI subcommand implementations.

pub mod index;
pub mod query;
pub mod remove;
pub mod status;
