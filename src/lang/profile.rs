use crate::lang::errors::LanguageProfileError;
use std::fmt;
use std::path::Path;

/// Lexical description of a source language.
///
/// A single lexer is parameterized by this data; there is no per-language
/// lexer code. Profiles are static and cheap to copy around by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageProfile {
    /// Canonical name (`"python"`, `"rust"`, ...)
    pub name: &'static str,
    /// File extensions without the leading dot
    pub extensions: &'static [&'static str],
    /// Markers that start a comment running to end of line
    pub line_comments: &'static [&'static str],
    /// Block comment (open, close) pairs
    pub block_comments: &'static [(&'static str, &'static str)],
    /// Characters that open and close string literals with escapes
    pub quotes: &'static [char],
    /// Characters that open and close string literals without escapes
    pub raw_quotes: &'static [char],
    /// Escape character inside escaped strings
    pub escape: Option<char>,
    /// Whether `"""` / `'''` strings exist
    pub triple_quotes: bool,
    /// Delimiter pairs tracked for balance
    pub delimiters: &'static [(char, char)],
    /// Extra characters allowed inside identifiers
    pub identifier_extras: &'static [char],
    /// Top-level tokens that end a `:[x:e]` expression hole
    pub expression_separators: &'static [&'static str],
    /// Whether blocks are delimited by indentation
    pub offside: bool,
}

const BRACKETS: &[(char, char)] = &[('(', ')'), ('[', ']'), ('{', '}')];
const SEPARATORS: &[&str] = &[",", ";"];

const GENERIC: LanguageProfile = LanguageProfile {
    name: "generic",
    extensions: &["generic", "txt"],
    line_comments: &[],
    block_comments: &[],
    quotes: &['"'],
    raw_quotes: &[],
    escape: Some('\\'),
    triple_quotes: false,
    delimiters: BRACKETS,
    identifier_extras: &[],
    expression_separators: SEPARATORS,
    offside: false,
};

const HASH_COMMENTS: LanguageProfile = LanguageProfile {
    name: "hash",
    extensions: &["sh", "bash", "conf", "rb", "pl", "yaml", "yml", "toml", "dockerfile"],
    line_comments: &["#"],
    block_comments: &[],
    quotes: &['"', '\''],
    raw_quotes: &[],
    escape: Some('\\'),
    triple_quotes: false,
    delimiters: BRACKETS,
    identifier_extras: &[],
    expression_separators: SEPARATORS,
    offside: false,
};

const C: LanguageProfile = LanguageProfile {
    name: "c",
    extensions: &["c", "h", "cc", "cpp", "cxx", "hpp", "hh", "cs", "kt", "swift", "scala"],
    line_comments: &["//"],
    block_comments: &[("/*", "*/")],
    quotes: &['"', '\''],
    raw_quotes: &[],
    escape: Some('\\'),
    triple_quotes: false,
    delimiters: BRACKETS,
    identifier_extras: &[],
    expression_separators: SEPARATORS,
    offside: false,
};

const JAVA: LanguageProfile = LanguageProfile {
    name: "java",
    extensions: &["java"],
    ..C
};

const GO: LanguageProfile = LanguageProfile {
    name: "go",
    extensions: &["go"],
    line_comments: &["//"],
    block_comments: &[("/*", "*/")],
    quotes: &['"', '\''],
    raw_quotes: &['`'],
    escape: Some('\\'),
    triple_quotes: false,
    delimiters: BRACKETS,
    identifier_extras: &[],
    expression_separators: SEPARATORS,
    offside: false,
};

const RUST: LanguageProfile = LanguageProfile {
    name: "rust",
    extensions: &["rs"],
    line_comments: &["//"],
    block_comments: &[("/*", "*/")],
    // `'` introduces lifetimes as often as char literals.
    quotes: &['"'],
    raw_quotes: &[],
    escape: Some('\\'),
    triple_quotes: false,
    delimiters: BRACKETS,
    identifier_extras: &[],
    expression_separators: SEPARATORS,
    offside: false,
};

const PYTHON: LanguageProfile = LanguageProfile {
    name: "python",
    extensions: &["py", "pyi"],
    line_comments: &["#"],
    block_comments: &[],
    quotes: &['"', '\''],
    raw_quotes: &[],
    escape: Some('\\'),
    triple_quotes: true,
    delimiters: BRACKETS,
    identifier_extras: &[],
    expression_separators: SEPARATORS,
    offside: true,
};

const JAVASCRIPT: LanguageProfile = LanguageProfile {
    name: "javascript",
    extensions: &["js", "jsx", "mjs", "cjs", "ts", "tsx", "mts", "cts"],
    line_comments: &["//"],
    block_comments: &[("/*", "*/")],
    quotes: &['"', '\'', '`'],
    raw_quotes: &[],
    escape: Some('\\'),
    triple_quotes: false,
    delimiters: BRACKETS,
    identifier_extras: &['$'],
    expression_separators: SEPARATORS,
    offside: false,
};

static PROFILES: &[LanguageProfile] = &[GENERIC, HASH_COMMENTS, C, JAVA, GO, RUST, PYTHON, JAVASCRIPT];

impl LanguageProfile {
    /// The fallback profile: `"` strings, no comments, `()[]{}` delimiters.
    pub fn generic() -> &'static LanguageProfile {
        &PROFILES[0]
    }

    /// All built-in profiles.
    pub fn all() -> &'static [LanguageProfile] {
        PROFILES
    }

    /// Look up a profile by file extension (without the dot, any case).
    pub fn from_extension(ext: &str) -> Option<&'static LanguageProfile> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        PROFILES
            .iter()
            .find(|p| p.extensions.contains(&ext.as_str()))
    }

    /// Look up a profile by canonical name.
    pub fn from_name(name: &str) -> Option<&'static LanguageProfile> {
        let name = name.to_ascii_lowercase();
        PROFILES.iter().find(|p| p.name == name)
    }

    /// Detect the profile of a path from its extension.
    ///
    /// Files named `Dockerfile` have no extension and are matched by name.
    pub fn from_path(path: &Path) -> Result<&'static LanguageProfile, LanguageProfileError> {
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            return Self::from_extension(ext)
                .ok_or_else(|| LanguageProfileError::unknown(format!(".{ext}")));
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        Self::from_extension(file_name).ok_or_else(|| LanguageProfileError::NoExtension {
            path: path.to_path_buf(),
        })
    }

    /// Resolve a `--matcher` argument: `.py`, `py` or a profile name.
    pub fn from_matcher(spec: &str) -> Result<&'static LanguageProfile, LanguageProfileError> {
        Self::from_extension(spec)
            .or_else(|| Self::from_name(spec.trim_start_matches('.')))
            .ok_or_else(|| LanguageProfileError::unknown(spec))
    }

    /// Closing partner of an opening delimiter.
    pub fn closer_of(&self, open: char) -> Option<char> {
        self.delimiters
            .iter()
            .find(|(o, _)| *o == open)
            .map(|(_, c)| *c)
    }

    pub fn is_open(&self, c: char) -> bool {
        self.delimiters.iter().any(|(o, _)| *o == c)
    }

    pub fn is_close(&self, c: char) -> bool {
        self.delimiters.iter().any(|(_, cl)| *cl == c)
    }

    pub fn is_quote(&self, c: char) -> bool {
        self.quotes.contains(&c) || self.raw_quotes.contains(&c)
    }

    /// Whether `c` may start an identifier.
    pub fn is_identifier_start(&self, c: char) -> bool {
        c.is_alphabetic() || c == '_' || self.identifier_extras.contains(&c)
    }

    /// Whether `c` may continue an identifier.
    pub fn is_identifier_continue(&self, c: char) -> bool {
        c.is_alphanumeric() || c == '_' || self.identifier_extras.contains(&c)
    }
}

impl fmt::Display for LanguageProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn lookup_by_extension() {
        assert_eq!(LanguageProfile::from_extension("py").unwrap().name, "python");
        assert_eq!(LanguageProfile::from_extension(".RS").unwrap().name, "rust");
        assert_eq!(LanguageProfile::from_extension("tsx").unwrap().name, "javascript");
        assert!(LanguageProfile::from_extension("zzz").is_none());
    }

    #[test]
    fn lookup_by_matcher_flag() {
        assert_eq!(LanguageProfile::from_matcher(".go").unwrap().name, "go");
        assert_eq!(LanguageProfile::from_matcher("python").unwrap().name, "python");
        let err = LanguageProfile::from_matcher(".pyy").unwrap_err();
        assert!(err.to_string().contains(".py"), "suggests closest: {err}");
    }

    #[test]
    fn lookup_by_path() {
        let p = LanguageProfile::from_path(&PathBuf::from("src/main.rs")).unwrap();
        assert_eq!(p.name, "rust");
        let docker = LanguageProfile::from_path(&PathBuf::from("Dockerfile")).unwrap();
        assert_eq!(docker.name, "hash");
        assert!(LanguageProfile::from_path(&PathBuf::from("Makefile")).is_err());
    }

    #[test]
    fn extensions_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for profile in LanguageProfile::all() {
            for ext in profile.extensions {
                assert!(seen.insert(*ext), "duplicate extension {ext}");
            }
        }
    }

    #[test]
    fn rust_does_not_quote_apostrophes() {
        let rust = LanguageProfile::from_name("rust").unwrap();
        assert!(!rust.is_quote('\''));
        assert!(rust.is_quote('"'));
    }
}
