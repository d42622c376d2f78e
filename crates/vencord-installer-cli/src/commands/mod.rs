//! Subcommand implementations.

pub mod config;
pub mod list;
pub mod serve;
