use crate::pattern::Syntax;
use std::fmt;
use std::str::FromStr;

/// A parsed rule file: named rules in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFile {
    pub rules: Vec<RuleSpec>,
}

impl RuleFile {
    /// Rules at or above `min`, in file order.
    pub fn at_least(&self, min: Severity) -> impl Iterator<Item = &RuleSpec> {
        self.rules.iter().filter(move |r| r.severity >= min)
    }
}

/// One `[name]` table of a rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSpec {
    pub name: String,
    /// The `match` template
    pub pattern: String,
    pub rewrite: Option<String>,
    /// `where` clause
    pub rule: Option<String>,
    /// Extra pattern-either alternatives
    pub either: Vec<String>,
    /// Patterns that must match the same range (pattern-all)
    pub all: Vec<String>,
    pub not: Vec<String>,
    pub inside: Vec<String>,
    pub fix_regex: Option<FixRegex>,
    pub syntax: Syntax,
    pub message: Option<String>,
    pub severity: Severity,
}

/// A `fix-regex` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixRegex {
    pub regex: String,
    pub replacement: String,
    /// Substitutions per match; every occurrence when unset
    pub count: Option<usize>,
}

impl RuleSpec {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            rewrite: None,
            rule: None,
            either: Vec::new(),
            all: Vec::new(),
            not: Vec::new(),
            inside: Vec::new(),
            fix_regex: None,
            syntax: Syntax::default(),
            message: None,
            severity: Severity::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    #[default]
    Warning,
    Error,
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" | "warn" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!(
                "unknown severity '{other}' (expected info, warning or error)"
            )),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// Keys a rule table may contain.
pub(crate) const KNOWN_KEYS: &[&str] = &[
    "match",
    "rewrite",
    "rule",
    "pattern-either",
    "pattern-all",
    "pattern-not",
    "pattern-inside",
    "fix-regex",
    "syntax",
    "message",
    "severity",
];

/// Keys of a `fix-regex` table.
pub(crate) const FIX_REGEX_KEYS: &[&str] = &["regex", "replacement", "count"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyRuleFile,
    NotATable {
        key: String,
    },
    MissingField {
        rule: String,
        field: &'static str,
    },
    UnknownKey {
        rule: String,
        key: String,
        suggestion: Option<&'static str>,
    },
    WrongType {
        rule: String,
        key: String,
        expected: &'static str,
    },
    BadSeverity {
        rule: String,
        message: String,
    },
    BadSyntax {
        rule: String,
        message: String,
    },
    ConflictingKeys {
        rule: String,
        first: &'static str,
        second: &'static str,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyRuleFile => write!(f, "rule file contains no rules"),
            ValidationIssue::NotATable { key } => {
                write!(f, "top-level key '{key}' must be a [table] of rule fields")
            }
            ValidationIssue::MissingField { rule, field } => {
                write!(f, "rule '{rule}' missing required field '{field}'")
            }
            ValidationIssue::UnknownKey {
                rule,
                key,
                suggestion,
            } => match suggestion {
                Some(s) => write!(f, "rule '{rule}' has unknown key '{key}' (did you mean '{s}'?)"),
                None => write!(f, "rule '{rule}' has unknown key '{key}'"),
            },
            ValidationIssue::WrongType {
                rule,
                key,
                expected,
            } => write!(f, "rule '{rule}' key '{key}' must be {expected}"),
            ValidationIssue::BadSeverity { rule, message }
            | ValidationIssue::BadSyntax { rule, message } => {
                write!(f, "rule '{rule}': {message}")
            }
            ValidationIssue::ConflictingKeys {
                rule,
                first,
                second,
            } => write!(f, "rule '{rule}' sets both '{first}' and '{second}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_and_parses() {
        assert!(Severity::Info < Severity::Warning && Severity::Warning < Severity::Error);
        assert_eq!("WARN".parse::<Severity>(), Ok(Severity::Warning));
        assert!("fatal".parse::<Severity>().is_err());
        assert_eq!(Severity::Error.to_string(), "error");
    }

    #[test]
    fn at_least_filters_in_order() {
        let mut a = RuleSpec::new("a", "x");
        a.severity = Severity::Error;
        let mut b = RuleSpec::new("b", "y");
        b.severity = Severity::Info;
        let c = RuleSpec::new("c", "z");
        let file = RuleFile {
            rules: vec![a, b, c],
        };
        let names: Vec<_> = file
            .at_least(Severity::Warning)
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, ["a", "c"]);
    }

    #[test]
    fn validation_error_lists_every_issue() {
        let err = ValidationError {
            issues: vec![
                ValidationIssue::MissingField {
                    rule: "r".into(),
                    field: "match",
                },
                ValidationIssue::UnknownKey {
                    rule: "r".into(),
                    key: "rewite".into(),
                    suggestion: Some("rewrite"),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "rule 'r' missing required field 'match'\nrule 'r' has unknown key 'rewite' (did you mean 'rewrite'?)"
        );
    }
}
