//! Structural matching of compiled patterns against source text.
//!
//! A [`Pattern`] is lowered against a language profile into a flat program
//! of token, hole and quoted-string instructions. The source is indexed once
//! (significant tokens, delimiter partners, gap facts) and the program is
//! run at each candidate start token with memoized backtracking.
//!
//! # Hole extents
//!
//! - `:[x]` takes the shortest balanced span that lets the rest match. At
//!   the top level of the pattern it stays on one line.
//! - `...` is the same but unbound, and may cross lines.
//! - `:[[x]]` takes exactly one identifier.
//! - `:[x:e]` takes a non-empty run of adjacent tokens and groups, ending
//!   before `,` or `;`.
//! - A hole ending the pattern takes the longest span instead: the rest of
//!   the line, or for `...` in Python the indented block that follows.
//! - A named hole written against word characters (`get_:[name]`,
//!   `:[kind]Error`) matches part of one identifier: `get_:[name]` binds
//!   `name` to `user` in `get_user`. Separate the hole with a space to match
//!   whole tokens instead.
//!
//! Holes never run past a close delimiter they did not open.

mod engine;
mod environment;
mod program;
mod scan;
mod source;

pub use environment::{Binding, Environment, Match};
pub use scan::Matches;
pub use source::SourceIndex;

pub(crate) use program::Program;
pub(crate) use scan::Accept;

use crate::lang::LanguageProfile;
use crate::pattern::Pattern;

/// Matches a single pattern at explicit start positions.
///
/// Most callers want [`find_all`] or [`crate::query::find_matches`]; this
/// type exposes the per-position primitive the scanners are built on.
pub struct Matcher {
    program: Program,
    state: engine::State,
}

impl Matcher {
    pub fn new(pattern: &Pattern, profile: &LanguageProfile) -> Self {
        let program = Program::lower(pattern, profile);
        let state = engine::State::new(&program);
        Self { program, state }
    }

    /// Try to match starting at significant token `token`.
    ///
    /// Returns the match and the index of the first token after it, which
    /// is where a non-overlapping scan resumes.
    pub fn match_at(&mut self, src: &SourceIndex<'_>, token: usize) -> Option<(Match, usize)> {
        engine::match_at(&self.program, src, &mut self.state, token)
    }
}

/// Every non-overlapping match of `pattern` in `text`, lazily.
pub fn find_all<'a>(text: &'a str, profile: &LanguageProfile, pattern: &Pattern) -> Matches<'a> {
    Matches::new(
        SourceIndex::new(text, profile),
        vec![Program::lower(pattern, profile)],
        Box::new(|_: &mut Match| true),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generic(pattern: &str) -> Pattern {
        Pattern::compile_generic(pattern).unwrap()
    }

    #[test]
    fn scan_is_non_overlapping_and_ordered() {
        let text = "f(a); f(f(b)); g(c)";
        let found: Vec<_> = find_all(text, LanguageProfile::generic(), &generic("f(:[x])"))
            .map(|m| m.matched)
            .collect();
        assert_eq!(found, ["f(a)", "f(f(b))"]);
    }

    #[test]
    fn scan_stops_early() {
        let text = "a; a; a; a";
        let mut matches = find_all(text, LanguageProfile::generic(), &generic("a"));
        assert_eq!(matches.next().map(|m| m.byte_start()), Some(0));
        assert_eq!(matches.next().map(|m| m.byte_start()), Some(3));
    }

    #[test]
    fn matcher_reports_resume_token() {
        let profile = LanguageProfile::generic();
        let src = SourceIndex::new("x = foo(1) + 2", profile);
        let mut matcher = Matcher::new(&generic("foo(:[a])"), profile);
        assert!(matcher.match_at(&src, 0).is_none());
        let (m, next) = matcher.match_at(&src, 2).unwrap();
        assert_eq!(m.environment.value("a"), Some("1"));
        assert_eq!(src.tokens()[next].text, "+");
    }

    #[test]
    fn comment_contents_are_not_matched() {
        let c = LanguageProfile::from_name("c").unwrap();
        let pattern = Pattern::compile("free(:[p])", c).unwrap();
        let text = "// free(a)\nfree(b);";
        let found: Vec<_> = find_all(text, c, &pattern).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].environment.value("p"), Some("b"));
        assert_eq!(found[0].range.start.line, 2);
    }
}
