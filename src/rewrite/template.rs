use crate::pattern::hole::{is_name_continue, parse_hole};
use crate::pattern::{CompileError, HoleKind};
use crate::rewrite::errors::RewriteError;
use crate::rewrite::properties::Property;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatePart {
    Literal(String),
    HoleRef {
        name: String,
        property: Option<&'static Property>,
    },
    FreshId {
        label: Option<String>,
    },
}

/// A compiled rewrite template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteTemplate {
    source: String,
    parts: Vec<TemplatePart>,
}

impl RewriteTemplate {
    /// Compile a rewrite template.
    ///
    /// `:[x]`, `:[[x]]` and `:[x:e]` all substitute the value of `x`.
    /// `...` is plain text here. A `.Name` directly after a hole applies the
    /// property `Name` when it is registered; otherwise the dot and name are
    /// kept as text.
    pub fn compile(text: &str) -> Result<RewriteTemplate, CompileError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut pos = 0;

        while pos < text.len() {
            let rest = &text[pos..];
            if !rest.starts_with(":[") {
                let c = rest.chars().next().unwrap_or_default();
                literal.push(c);
                pos += c.len_utf8().max(1);
                continue;
            }

            let syntax = parse_hole(rest, pos)?;
            let hole_offset = pos;
            pos += syntax.len;
            if !literal.is_empty() {
                parts.push(TemplatePart::Literal(std::mem::take(&mut literal)));
            }

            match (syntax.kind, syntax.name) {
                (HoleKind::FreshId { label }, _) => parts.push(TemplatePart::FreshId { label }),
                (_, None) => {
                    return Err(CompileError::MalformedHole {
                        offset: hole_offset,
                        reason: "anonymous holes cannot be substituted".to_string(),
                    });
                }
                (_, Some(name)) => {
                    let property = match property_suffix(&text[pos..]) {
                        Some((property, len)) => {
                            pos += len;
                            if let Some((second, _)) = property_suffix(&text[pos..]) {
                                return Err(CompileError::ChainedProperty {
                                    offset: pos,
                                    first: property.name.to_string(),
                                    second: second.name.to_string(),
                                });
                            }
                            Some(property)
                        }
                        None => None,
                    };
                    parts.push(TemplatePart::HoleRef { name, property });
                }
            }
        }
        if !literal.is_empty() {
            parts.push(TemplatePart::Literal(literal));
        }

        Ok(RewriteTemplate {
            source: text.to_string(),
            parts,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parts(&self) -> &[TemplatePart] {
        &self.parts
    }

    /// Hole names the template substitutes, first occurrence first.
    pub fn holes(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for part in &self.parts {
            if let TemplatePart::HoleRef { name, .. } = part {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
        }
        names
    }

    /// Fail if the template substitutes a hole outside `bound`.
    pub fn check_bound(&self, bound: &[&str]) -> Result<(), RewriteError> {
        match self.holes().into_iter().find(|name| !bound.contains(name)) {
            Some(name) => Err(RewriteError::UnboundHole {
                name: name.to_string(),
            }),
            None => Ok(()),
        }
    }
}

/// A registered `.Property` at the start of `rest`, with its byte length.
fn property_suffix(rest: &str) -> Option<(&'static Property, usize)> {
    let after_dot = rest.strip_prefix('.')?;
    let name_len = after_dot
        .char_indices()
        .find(|(_, c)| !is_name_continue(*c))
        .map(|(i, _)| i)
        .unwrap_or(after_dot.len());
    let name = &after_dot[..name_len];
    if name.is_empty() {
        return None;
    }
    match Property::lookup(name) {
        Some(property) => Some((property, 1 + name_len)),
        None => {
            if let Some(close) = Property::suggest(name) {
                warn!(property = name, suggestion = close, "unknown property kept as text");
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(text: &str) -> RewriteTemplate {
        RewriteTemplate::compile(text).unwrap()
    }

    #[test]
    fn splits_literals_holes_and_fresh_ids() {
        let t = compile("let :[id(tmp)] = :[[x]] + :[y:e]; ...");
        assert_eq!(
            t.parts(),
            [
                TemplatePart::Literal("let ".into()),
                TemplatePart::FreshId {
                    label: Some("tmp".into())
                },
                TemplatePart::Literal(" = ".into()),
                TemplatePart::HoleRef {
                    name: "x".into(),
                    property: None
                },
                TemplatePart::Literal(" + ".into()),
                TemplatePart::HoleRef {
                    name: "y".into(),
                    property: None
                },
                TemplatePart::Literal("; ...".into()),
            ]
        );
        assert_eq!(t.holes(), ["x", "y"]);
    }

    #[test]
    fn registered_properties_attach_to_holes() {
        let t = compile("fn :[name].UpperCamelCase() -> :[n].length");
        let TemplatePart::HoleRef { property, .. } = &t.parts()[1] else {
            panic!("expected hole");
        };
        assert_eq!(property.map(|p| p.name), Some("UpperCamelCase"));
        assert!(matches!(
            t.parts().last(),
            Some(TemplatePart::HoleRef { property: Some(p), .. }) if p.name == "length"
        ));
    }

    #[test]
    fn unknown_properties_stay_literal() {
        let t = compile(":[v].len()");
        assert_eq!(t.parts()[1], TemplatePart::Literal(".len()".into()));
        let t = compile(":[v].lengthy");
        assert_eq!(t.parts()[1], TemplatePart::Literal(".lengthy".into()));
    }

    #[test]
    fn chained_properties_are_rejected() {
        assert_eq!(
            RewriteTemplate::compile(":[x].lowercase.Capitalize"),
            Err(CompileError::ChainedProperty {
                offset: 14,
                first: "lowercase".into(),
                second: "Capitalize".into()
            })
        );
    }

    #[test]
    fn anonymous_and_malformed_holes_are_errors() {
        assert!(matches!(
            RewriteTemplate::compile("f(:[_])"),
            Err(CompileError::MalformedHole { offset: 2, .. })
        ));
        assert!(RewriteTemplate::compile("f(:[x)").is_err());
    }

    #[test]
    fn check_bound_reports_first_missing_name() {
        let t = compile(":[a] :[b] :[c]");
        assert!(t.check_bound(&["a", "b", "c"]).is_ok());
        assert_eq!(
            t.check_bound(&["a"]),
            Err(RewriteError::UnboundHole { name: "b".into() })
        );
    }
}
