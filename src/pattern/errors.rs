use crate::pattern::ast::HoleKind;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("malformed hole at offset {offset}: {reason}")]
    MalformedHole { offset: usize, reason: String },

    #[error("hole '{name}' used as {first} and as {second}")]
    HoleKindConflict {
        name: String,
        first: HoleKind,
        second: HoleKind,
    },

    #[error("unbalanced delimiter at offset {offset}: found {}, expected {}", describe(.found), describe(.expected))]
    UnbalancedDelimiter {
        offset: usize,
        found: Option<char>,
        expected: Option<char>,
    },

    #[error("fresh identifier at offset {offset} can only appear in a rewrite template")]
    FreshIdInPattern { offset: usize },

    #[error("match template is empty")]
    EmptyPattern,

    #[error("chained properties are not supported: .{first}.{second} at offset {offset}")]
    ChainedProperty {
        offset: usize,
        first: String,
        second: String,
    },
}

fn describe(c: &Option<char>) -> String {
    match c {
        Some(c) => format!("'{c}'"),
        None => "end of template".to_string(),
    }
}
