//! # Tether Config
//!
//! TOML configuration for the `tether` binary: the worker thread, logging
//! and the scheduled jobs.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationIssue, ValidationResult};
