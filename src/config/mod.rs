//! TOML rule files.
//!
//! Each top-level table is one named rule; rules run in file order.

pub mod loader;
pub mod schema;

pub use loader::{load_from_path, load_from_str, ConfigError};
pub use schema::{FixRegex, RuleFile, RuleSpec, Severity, ValidationError, ValidationIssue};
