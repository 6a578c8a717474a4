//! Pattern composition: alternatives, `where` rules, exclusion and nesting.
//!
//! A [`Query`] bundles everything that decides whether a candidate match is
//! reported:
//!
//! - alternatives (pattern-either), tried in declaration order at each
//!   start token,
//! - conjuncts (pattern-all): patterns that must match the candidate's
//!   exact range with agreeing holes; their other holes join the
//!   candidate's environment,
//! - `where` rules over the candidate's environment,
//! - `not` patterns: a candidate enclosed by one of their matches is dropped,
//! - `inside` patterns: a candidate must be enclosed by a match of each.

use crate::lang::LanguageProfile;
use crate::matcher::{Accept, Environment, Match, Matcher, Matches, Program, SourceIndex};
use crate::pattern::{CompileError, Pattern};
use crate::position::Range;
use crate::rules::{evaluate, Rule, RuleError};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("rule references :[{name}], which pattern '{pattern}' does not bind")]
    UnboundHole { name: String, pattern: String },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] CompileError),

    #[error("invalid rule: {0}")]
    Rule(#[from] RuleError),
}

#[derive(Debug, Clone)]
pub struct Query {
    alternatives: Vec<Pattern>,
    all: Vec<Pattern>,
    rules: Vec<Rule>,
    not: Vec<Pattern>,
    inside: Vec<Pattern>,
}

impl Query {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            alternatives: vec![pattern],
            all: Vec::new(),
            rules: Vec::new(),
            not: Vec::new(),
            inside: Vec::new(),
        }
    }

    /// Add a pattern-either alternative, tried after the existing ones.
    pub fn either(mut self, pattern: Pattern) -> Self {
        self.alternatives.push(pattern);
        self
    }

    /// Require `pattern` to match the same range as well.
    pub fn all(mut self, pattern: Pattern) -> Self {
        self.all.push(pattern);
        self
    }

    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn not(mut self, pattern: Pattern) -> Self {
        self.not.push(pattern);
        self
    }

    pub fn inside(mut self, pattern: Pattern) -> Self {
        self.inside.push(pattern);
        self
    }

    pub fn alternatives(&self) -> &[Pattern] {
        &self.alternatives
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Names bound in every accepted match: those bound by every
    /// alternative, in the first alternative's order, then those bound by
    /// conjuncts.
    pub fn variables(&self) -> Vec<&str> {
        let Some((first, rest)) = self.alternatives.split_first() else {
            return Vec::new();
        };
        let mut names: Vec<&str> = first
            .variables()
            .iter()
            .filter(|name| rest.iter().all(|p| p.binds(name)))
            .map(String::as_str)
            .collect();
        for name in self.all.iter().flat_map(|p| p.variables()) {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }

    /// Check that every hole a rule references is bound by every
    /// alternative or by a conjunct.
    pub fn validate(&self) -> Result<(), QueryError> {
        for rule in &self.rules {
            for name in rule.holes() {
                if self.all.iter().any(|p| p.binds(name)) {
                    continue;
                }
                if let Some(pattern) = self.alternatives.iter().find(|p| !p.binds(name)) {
                    return Err(QueryError::UnboundHole {
                        name: name.to_string(),
                        pattern: pattern.source().to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Ranges of all non-overlapping matches of `pattern` in `src`.
fn match_ranges(src: &SourceIndex<'_>, pattern: &Pattern, profile: &LanguageProfile) -> Vec<Range> {
    let mut matcher = Matcher::new(pattern, profile);
    let mut ranges = Vec::new();
    let mut t = 0;
    while t < src.len() {
        match matcher.match_at(src, t) {
            Some((m, end)) => {
                ranges.push(m.range);
                t = end;
            }
            None => t += 1,
        }
    }
    ranges
}

/// Matches of `pattern` at every start token, overlapping ones included.
fn every_match(src: &SourceIndex<'_>, pattern: &Pattern, profile: &LanguageProfile) -> Vec<Match> {
    let mut matcher = Matcher::new(pattern, profile);
    (0..src.len())
        .filter_map(|t| matcher.match_at(src, t).map(|(m, _)| m))
        .collect()
}

/// Find a conjunct match spanning exactly `m` whose shared holes agree with
/// it, and copy its other bindings into `m`. `found` is sorted by start.
fn join(m: &mut Match, found: &[Match]) -> bool {
    let from = found.partition_point(|o| o.byte_start() < m.byte_start());
    let Some(other) = found[from..]
        .iter()
        .take_while(|o| o.byte_start() == m.byte_start())
        .find(|o| o.range == m.range && agrees(&m.environment, &o.environment))
    else {
        return false;
    };
    for binding in &other.environment {
        m.environment.insert(binding.clone());
    }
    true
}

fn agrees(ours: &Environment, theirs: &Environment) -> bool {
    theirs
        .iter()
        .all(|b| ours.value(&b.variable).map_or(true, |v| v == b.value))
}

/// Lazily find the matches of `query` in `source`.
///
/// Conjunct, `not` and `inside` patterns are resolved up front;
/// alternatives are matched on demand as the iterator advances.
pub fn find_matches<'a>(source: &'a str, profile: &LanguageProfile, query: &Query) -> Matches<'a> {
    let src = SourceIndex::new(source, profile);

    let conjuncts: Vec<Vec<Match>> = query
        .all
        .iter()
        .map(|p| every_match(&src, p, profile))
        .collect();

    let excluded: Vec<Range> = query
        .not
        .iter()
        .flat_map(|p| match_ranges(&src, p, profile))
        .collect();
    let enclosing: Vec<Vec<Range>> = query
        .inside
        .iter()
        .map(|p| match_ranges(&src, p, profile))
        .collect();
    if !query.not.is_empty() || !query.inside.is_empty() {
        debug!(
            excluded = excluded.len(),
            enclosing = enclosing.iter().map(Vec::len).sum::<usize>(),
            "resolved composition ranges"
        );
    }

    let rules = query.rules.clone();
    let accept: Accept<'a> = Box::new(move |m: &mut Match| {
        conjuncts.iter().all(|found| join(m, found))
            && rules.iter().all(|rule| evaluate(rule, &m.environment))
            && !excluded.iter().any(|r| r.encloses(&m.range))
            && enclosing
                .iter()
                .all(|ranges| ranges.iter().any(|r| r.encloses(&m.range)))
    });

    let programs = query
        .alternatives
        .iter()
        .map(|p| Program::lower(p, profile))
        .collect();
    Matches::new(src, programs, accept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(text: &str) -> Pattern {
        Pattern::compile_generic(text).unwrap()
    }

    fn matched(text: &str, query: &Query) -> Vec<String> {
        find_matches(text, LanguageProfile::generic(), query)
            .map(|m| m.matched)
            .collect()
    }

    #[test]
    fn rules_filter_candidates() {
        let query = Query::new(pattern("if (:[x] == :[y])")).rule(Rule::parse(":[x] == :[y]").unwrap());
        assert_eq!(matched("if (x == x) {}\nif (a == b) {}", &query), ["if (x == x)"]);
    }

    #[test]
    fn rejected_candidates_do_not_consume_input() {
        let query = Query::new(pattern("f(:[x])")).rule(Rule::parse(":[x] == b").unwrap());
        assert_eq!(matched("f(a) f(b)", &query), ["f(b)"]);
    }

    #[test]
    fn first_alternative_wins() {
        let query = Query::new(pattern("foo(:[a])")).either(pattern("foo(:[a], :[b])"));
        let found: Vec<_> = find_matches("foo(1, 2)", LanguageProfile::generic(), &query).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].environment.value("a"), Some("1, 2"));
    }

    #[test]
    fn later_alternatives_fill_gaps() {
        let query = Query::new(pattern("foo(:[a])")).either(pattern("bar(:[a])"));
        assert_eq!(matched("bar(1); foo(2)", &query), ["bar(1)", "foo(2)"]);
    }

    #[test]
    fn not_excludes_enclosed_matches() {
        let query = Query::new(pattern("unwrap()")).not(pattern("test.unwrap()"));
        assert_eq!(matched("a.unwrap(); test.unwrap()", &query), ["unwrap()"]);
    }

    #[test]
    fn inside_requires_enclosing_match() {
        let query = Query::new(pattern("log(:[m])")).inside(pattern("fn debug() {...}"));
        let text = "fn debug() { log(1) }\nfn main() { log(2) }";
        let found: Vec<_> = find_matches(text, LanguageProfile::generic(), &query).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].environment.value("m"), Some("1"));
    }

    #[test]
    fn conjuncts_must_cover_the_same_range() {
        let query = Query::new(pattern("log(:[a])")).all(pattern("log(:[first], :[rest])"));
        let found: Vec<_> =
            find_matches("log(1); log(2, 3)", LanguageProfile::generic(), &query).collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched, "log(2, 3)");
        assert_eq!(found[0].environment.value("a"), Some("2, 3"));
        assert_eq!(found[0].environment.value("first"), Some("2"));
        assert_eq!(found[0].environment.value("rest"), Some("3"));
    }

    #[test]
    fn conjuncts_agree_on_shared_holes() {
        let query = Query::new(pattern("f(:[x], :[y])")).all(pattern("f(:[y], :[x])"));
        assert_eq!(matched("f(1, 2) f(3, 3)", &query), ["f(3, 3)"]);
    }

    #[test]
    fn rules_may_use_conjunct_holes() {
        let query = Query::new(pattern(":[[lhs]] = :[rhs];"))
            .all(pattern(":[[target]] = :[[source]];"))
            .rule(Rule::parse(":[source] == :[target]").unwrap());
        assert!(query.validate().is_ok());
        assert_eq!(matched("a = b; c = c; d = f(d);", &query), ["c = c;"]);
        assert_eq!(query.variables(), ["lhs", "rhs", "target", "source"]);
    }

    #[test]
    fn validate_rejects_unbound_rule_holes() {
        let query = Query::new(pattern("f(:[x])"))
            .either(pattern("g(:[y])"))
            .rule(Rule::parse(":[x] == a").unwrap());
        assert_eq!(
            query.validate(),
            Err(QueryError::UnboundHole {
                name: "x".into(),
                pattern: "g(:[y])".into()
            })
        );
        assert!(Query::new(pattern("f(:[x])"))
            .rule(Rule::parse(":[x] == a").unwrap())
            .validate()
            .is_ok());
    }

    #[test]
    fn variables_are_common_to_all_alternatives() {
        let query = Query::new(pattern(":[a] + :[b]")).either(pattern(":[b] - :[a] * :[c]"));
        assert_eq!(query.variables(), ["a", "b"]);
    }
}
