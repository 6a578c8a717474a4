use crate::config::schema::{
    FixRegex, RuleFile, RuleSpec, Severity, ValidationError, ValidationIssue, FIX_REGEX_KEYS,
    KNOWN_KEYS,
};
use crate::pattern::Syntax;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use toml_edit::{DocumentMut, Item, Table};

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::TomlError,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read rule file {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(f, "failed to parse rule file ({}): {}", path.display(), source),
                None => write!(f, "failed to parse rule file: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid rule file ({}):\n{}", path.display(), source),
                None => write!(f, "invalid rule file:\n{}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

/// Parse a rule file. Every problem is collected before failing.
pub fn load_from_str(input: &str) -> Result<RuleFile, ConfigError> {
    let doc: DocumentMut = input
        .parse()
        .map_err(|source| ConfigError::Toml { path: None, source })?;

    let mut issues = Vec::new();
    let mut rules = Vec::new();
    for (name, item) in doc.iter() {
        match item.as_table() {
            Some(table) => {
                if let Some(rule) = read_rule(name, table, &mut issues) {
                    rules.push(rule);
                }
            }
            None => issues.push(ValidationIssue::NotATable {
                key: name.to_string(),
            }),
        }
    }
    if rules.is_empty() && issues.is_empty() {
        issues.push(ValidationIssue::EmptyRuleFile);
    }

    if issues.is_empty() {
        Ok(RuleFile { rules })
    } else {
        Err(ConfigError::Validation {
            path: None,
            source: ValidationError { issues },
        })
    }
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<RuleFile, ConfigError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

fn read_rule(name: &str, table: &Table, issues: &mut Vec<ValidationIssue>) -> Option<RuleSpec> {
    let before = issues.len();
    let mut fields = Fields {
        rule: name,
        issues: &mut *issues,
    };

    let pattern = fields.string(table, "match");
    let rewrite = fields.string(table, "rewrite");
    let rule = fields.string(table, "rule");
    let either = fields.strings(table, "pattern-either");
    let all = fields.strings(table, "pattern-all");
    let not = fields.strings(table, "pattern-not");
    let inside = fields.strings(table, "pattern-inside");
    let fix_regex = fields.fix_regex(table, "fix-regex");
    let message = fields.string(table, "message");
    let syntax = fields.string(table, "syntax");
    let severity = match fields.string(table, "severity") {
        Some(text) => match text.parse::<Severity>() {
            Ok(severity) => severity,
            Err(message) => {
                issues.push(ValidationIssue::BadSeverity {
                    rule: name.to_string(),
                    message,
                });
                Severity::default()
            }
        },
        None => Severity::default(),
    };
    let syntax = match syntax.map(|text| text.parse::<Syntax>()) {
        Some(Ok(syntax)) => syntax,
        Some(Err(message)) => {
            issues.push(ValidationIssue::BadSyntax {
                rule: name.to_string(),
                message,
            });
            Syntax::default()
        }
        None => Syntax::default(),
    };
    if rewrite.is_some() && fix_regex.is_some() {
        issues.push(ValidationIssue::ConflictingKeys {
            rule: name.to_string(),
            first: "rewrite",
            second: "fix-regex",
        });
    }

    for (key, _) in table.iter() {
        if !KNOWN_KEYS.contains(&key) {
            issues.push(ValidationIssue::UnknownKey {
                rule: name.to_string(),
                key: key.to_string(),
                suggestion: closest_key(key),
            });
        }
    }

    let pattern = match pattern {
        Some(p) if !p.trim().is_empty() => p,
        _ => {
            issues.push(ValidationIssue::MissingField {
                rule: name.to_string(),
                field: "match",
            });
            return None;
        }
    };

    (issues.len() == before).then(|| RuleSpec {
        name: name.to_string(),
        pattern,
        rewrite,
        rule,
        either,
        all,
        not,
        inside,
        fix_regex,
        syntax,
        message,
        severity,
    })
}

/// Typed field access that records type errors instead of failing.
struct Fields<'r, 'i> {
    rule: &'r str,
    issues: &'i mut Vec<ValidationIssue>,
}

impl Fields<'_, '_> {
    fn wrong_type(&mut self, key: &str, expected: &'static str) {
        self.issues.push(ValidationIssue::WrongType {
            rule: self.rule.to_string(),
            key: key.to_string(),
            expected,
        });
    }

    fn string(&mut self, table: &Table, key: &str) -> Option<String> {
        let item = table.get(key)?;
        match item.as_str() {
            Some(s) => Some(s.to_string()),
            None => {
                self.wrong_type(key, "a string");
                None
            }
        }
    }

    /// A string or an array of strings.
    fn strings(&mut self, table: &Table, key: &str) -> Vec<String> {
        let Some(item) = table.get(key) else {
            return Vec::new();
        };
        if let Some(s) = item.as_str() {
            return vec![s.to_string()];
        }
        let values: Option<Vec<String>> = match item {
            Item::Value(value) => value
                .as_array()
                .map(|array| array.iter().map(|v| v.as_str().map(str::to_string)).collect())
                .unwrap_or(None),
            _ => None,
        };
        values.unwrap_or_else(|| {
            self.wrong_type(key, "a string or an array of strings");
            Vec::new()
        })
    }

    /// A `{ regex, replacement, count }` table, inline or not.
    fn fix_regex(&mut self, table: &Table, key: &str) -> Option<FixRegex> {
        const EXPECTED: &str =
            "a table with string 'regex' and 'replacement' and an optional non-negative 'count'";
        let Some(fields) = table.get(key)?.as_table_like() else {
            self.wrong_type(key, EXPECTED);
            return None;
        };

        for (sub, _) in fields.iter() {
            if !FIX_REGEX_KEYS.contains(&sub) {
                self.issues.push(ValidationIssue::UnknownKey {
                    rule: self.rule.to_string(),
                    key: format!("{key}.{sub}"),
                    suggestion: None,
                });
            }
        }

        let regex = fields.get("regex").and_then(Item::as_str);
        let replacement = fields.get("replacement").and_then(Item::as_str);
        let count = match fields.get("count") {
            Some(item) => item
                .as_integer()
                .and_then(|n| usize::try_from(n).ok())
                .map(Some),
            None => Some(None),
        };
        match (regex, replacement, count) {
            (Some(regex), Some(replacement), Some(count)) => Some(FixRegex {
                regex: regex.to_string(),
                replacement: replacement.to_string(),
                count,
            }),
            _ => {
                self.wrong_type(key, EXPECTED);
                None
            }
        }
    }
}

fn closest_key(key: &str) -> Option<&'static str> {
    KNOWN_KEYS
        .iter()
        .map(|known| (strsim::jaro_winkler(key, known), *known))
        .filter(|(score, _)| *score > 0.8)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, known)| known)
}
