use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewriteError {
    #[error("rewrite template references :[{name}], which the match does not bind")]
    UnboundHole { name: String },

    #[error("matches overlap at byte {offset}; rewrites need ascending, disjoint matches")]
    OverlappingMatches { offset: usize },
}
