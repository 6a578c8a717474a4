use regex::Regex;

/// A `fix-regex` rewrite: a regular expression substitution run over the
/// text of each match.
#[derive(Debug, Clone)]
pub struct RegexFix {
    regex: Regex,
    replacement: String,
    count: Option<usize>,
}

impl RegexFix {
    /// Group references in `replacement` may be written `$1`, `${name}` or
    /// `\1`. `count` caps the substitutions made inside one match; `None`
    /// (or zero) replaces every occurrence.
    pub fn compile(
        pattern: &str,
        replacement: &str,
        count: Option<usize>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            regex: Regex::new(pattern)?,
            replacement: backslash_groups(replacement),
            count,
        })
    }

    /// `matched` with the substitution applied.
    pub fn apply(&self, matched: &str) -> String {
        self.regex
            .replacen(matched, self.count.unwrap_or(0), self.replacement.as_str())
            .into_owned()
    }
}

/// `\1` becomes `${1}`.
fn backslash_groups(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' && chars.peek().is_some_and(char::is_ascii_digit) {
            out.push_str("${");
            while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                out.push(digit);
            }
            out.push('}');
        } else {
            out.push(c);
        }
    }
    out
}
