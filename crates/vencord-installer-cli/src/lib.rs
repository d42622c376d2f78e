//! Command-line front end for the Vencord installer.
//!
//! This crate provides the `vencord-installer` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use error::{ClientError, ClientResult};
