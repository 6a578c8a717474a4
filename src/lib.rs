//! Holepunch: structural match and rewrite for source code
//!
//! Patterns are source text with holes. `foo(:[args])` matches any call to
//! `foo` and binds whatever sits between the parentheses to `args`, as long
//! as the delimiters inside it balance. No grammar is needed: a lexer driven
//! by a per-language [`LanguageProfile`] knows just enough (strings,
//! comments, delimiters) for holes to stop in the right places.
//!
//! # Architecture
//!
//! Source text is tokenized, a [`Pattern`] is lowered to a flat program and
//! run against the tokens by a memoizing backtracking matcher. Matches come
//! out lazily, in order, and pass through the [`Query`] filters (`where`
//! rules, pattern-all, pattern-not, pattern-inside). A [`RewriteTemplate`]
//! renders each match's environment into replacement text, or a
//! [`RegexFix`] substitutes inside the matched text; in-place rewrites are
//! written through verified, atomic [`Edit`]s.
//!
//! # Example
//!
//! ```
//! use holepunch::{apply_rewrite, find_matches, FreshIds, LanguageProfile, Pattern, Query, RewriteTemplate};
//!
//! let source = "a = oldFunc(1, 2)";
//! let profile = LanguageProfile::generic();
//! let query = Query::new(Pattern::compile("oldFunc(:[args])", profile)?);
//! let matches: Vec<_> = find_matches(source, profile, &query).collect();
//!
//! let template = RewriteTemplate::compile("newFunc(:[args])")?;
//! let rewritten = apply_rewrite(source, &matches, &template, &FreshIds::new())?;
//! assert_eq!(rewritten.text, "a = newFunc(1, 2)");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cache;
pub mod config;
pub mod driver;
pub mod edit;
pub mod lang;
pub mod lexer;
pub mod matcher;
pub mod output;
pub mod pattern;
pub mod pool;
pub mod position;
pub mod query;
pub mod rewrite;
pub mod rules;
pub mod telemetry;

// Re-exports
pub use config::{
    load_from_path, load_from_str, ConfigError, FixRegex, RuleFile, RuleSpec, Severity,
};
pub use driver::{process_source, run_batch, FileError, Job, JobError};
pub use edit::{Edit, EditError, EditVerification};
pub use lang::{LanguageProfile, LanguageProfileError};
pub use matcher::{find_all, Binding, Environment, Match, Matches};
pub use pattern::{CompileError, Pattern, Syntax};
pub use position::{Position, Range};
pub use query::{find_matches, Query, QueryError};
pub use rewrite::{
    apply_regex_fix, apply_rewrite, Fix, FreshIds, RegexFix, Replacement, RewriteError,
    RewriteTemplate, Rewritten,
};
pub use rules::{evaluate, Rule, RuleError};
