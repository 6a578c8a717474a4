//! Template dialects.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// How holes are written in match and rewrite templates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Syntax {
    /// `:[x]`, `:[[x]]`, `:[x:e]` and `...`
    #[default]
    Comby,
    /// Also `$X` and `$...X` metavariables, read as `:[X]`
    Semgrep,
}

impl Syntax {
    /// `text` with every hole written the `:[x]` way.
    pub fn normalize(self, text: &str) -> Cow<'_, str> {
        match self {
            Syntax::Semgrep if text.contains('$') => Cow::Owned(metavariables_to_holes(text)),
            _ => Cow::Borrowed(text),
        }
    }
}

impl FromStr for Syntax {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "comby" => Ok(Syntax::Comby),
            "semgrep" => Ok(Syntax::Semgrep),
            other => Err(format!(
                "unknown template syntax '{other}' (expected comby or semgrep)"
            )),
        }
    }
}

impl fmt::Display for Syntax {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Syntax::Comby => "comby",
            Syntax::Semgrep => "semgrep",
        })
    }
}

/// `$X`, `$FOO_1` and `$...ARGS` become `:[X]`, `:[FOO_1]` and `:[ARGS]`;
/// `$_` becomes the anonymous `:[_]`.
///
/// A metavariable name starts with an uppercase letter or `_`. Any other
/// `$` stays as written, so `$el` in JavaScript or `$this` in PHP still
/// mean themselves.
fn metavariables_to_holes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        let name_at = after.strip_prefix("...").unwrap_or(after);
        let len = metavariable_len(name_at);
        if len == 0 {
            out.push('$');
            rest = after;
            continue;
        }
        out.push_str(":[");
        out.push_str(&name_at[..len]);
        out.push(']');
        rest = &name_at[len..];
    }
    out.push_str(rest);
    out
}

fn metavariable_len(s: &str) -> usize {
    if !s.starts_with(|c: char| c.is_ascii_uppercase() || c == '_') {
        return 0;
    }
    s.find(|c: char| !(c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'))
        .unwrap_or(s.len())
}
