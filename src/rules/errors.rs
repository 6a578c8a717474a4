use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("empty rule")]
    Empty,

    #[error("unexpected '{found}' at offset {offset}, expected {expected}")]
    UnexpectedToken {
        offset: usize,
        found: String,
        expected: &'static str,
    },

    #[error("rule ended early, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("malformed hole reference at offset {offset}")]
    MalformedHole { offset: usize },

    #[error("match expression at offset {offset} has no arms")]
    NoArms { offset: usize },
}
