//! Rendering of matches and rewrites for the command line.
//!
//! Three shapes are produced: one JSON record per file (`--json-lines`),
//! `uri:line:text` lines (`--match-only`) and unified diffs (`--diff`).

use crate::config::Severity;
use crate::matcher::{Environment, Match};
use crate::position::Range;
use colored::Colorize;
use serde::Serialize;
use similar::TextDiff;

/// JSON record of the matches in one file.
#[derive(Debug, Serialize)]
pub struct MatchRecord<'a> {
    pub uri: &'a str,
    pub matches: &'a [Match],
}

/// One replacement as it appears in the rewritten source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Substitution {
    /// Range of the replacement text in the rewritten source
    pub range: Range,
    pub replacement_content: String,
    pub environment: Environment,
}

/// JSON record of one rewritten file.
#[derive(Debug, Serialize)]
pub struct RewriteRecord<'a> {
    pub uri: &'a str,
    pub rewritten_source: &'a str,
    pub in_place_substitutions: &'a [Substitution],
    pub diff: String,
}

impl MatchRecord<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl RewriteRecord<'_> {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// `uri:line:matched`, with newlines in the match written as `\n`.
pub fn match_line(uri: &str, m: &Match) -> String {
    format!(
        "{}:{}:{}",
        uri,
        m.range.start.line,
        m.matched.replace('\n', "\\n")
    )
}

/// `uri:line:column: severity [rule] message` for rules that report.
pub fn diagnostic_line(uri: &str, m: &Match, rule: &str, severity: Severity, message: &str) -> String {
    format!(
        "{}:{}:{}: {} [{}] {}",
        uri, m.range.start.line, m.range.start.column, severity, rule, message
    )
}

/// Unified diff with `a/` and `b/` headers; empty when nothing changed.
///
/// A leading `/` is dropped so absolute paths read `a/tmp/x.py` as `git
/// diff` would print them.
pub fn unified_diff(uri: &str, before: &str, after: &str) -> String {
    if before == after {
        return String::new();
    }
    let path = uri.trim_start_matches('/');
    TextDiff::from_lines(before, after)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}

/// [`unified_diff`] coloured for a terminal.
pub fn colored_diff(uri: &str, before: &str, after: &str) -> String {
    let mut out = String::new();
    for line in unified_diff(uri, before, after).split_inclusive('\n') {
        let (body, newline) = match line.strip_suffix('\n') {
            Some(body) => (body, "\n"),
            None => (line, ""),
        };
        let painted = if body.starts_with("---") || body.starts_with("+++") {
            body.bold().to_string()
        } else if body.starts_with("@@") {
            body.cyan().to_string()
        } else if body.starts_with('-') {
            body.red().to_string()
        } else if body.starts_with('+') {
            body.green().to_string()
        } else {
            body.to_string()
        };
        out.push_str(&painted);
        out.push_str(newline);
    }
    out
}
