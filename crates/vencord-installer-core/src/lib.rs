//! Core types: release branches, tracing setup

pub mod branch;
pub mod tracing;

pub use branch::Branch;
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
