//! Match template compilation.
//!
//! A template is plain source text with holes (`:[x]`, `:[[x]]`, `:[x:e]`,
//! `...`). Compilation is a single left-to-right scan producing a tree of
//! [`PatternNode`]s: literal runs, holes, balanced delimiter groups and
//! quoted strings that contain holes. [`Syntax::Semgrep`] templates spell
//! holes as `$X` metavariables and are normalized before compiling.

pub mod ast;
mod compiler;
pub mod errors;
pub(crate) mod hole;
pub mod syntax;

pub use ast::{Hole, HoleKind, Occurrence, Pattern, PatternNode, QuotedPart};
pub use errors::CompileError;
pub use syntax::Syntax;
