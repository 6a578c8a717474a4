use crate::edit::{Edit, EditVerification};
use crate::matcher::{Environment, Match};
use crate::position::Range;
use crate::rewrite::errors::RewriteError;
use crate::rewrite::fresh::{identifiers, FreshIds, FreshScope};
use crate::rewrite::regex_fix::RegexFix;
use crate::rewrite::template::{RewriteTemplate, TemplatePart};
use std::path::PathBuf;

/// Substitute `env` into `template`.
pub fn render(
    template: &RewriteTemplate,
    env: &Environment,
    scope: &mut FreshScope<'_>,
) -> Result<String, RewriteError> {
    let mut out = String::new();
    for part in template.parts() {
        match part {
            TemplatePart::Literal(text) => out.push_str(text),
            TemplatePart::HoleRef { name, property } => {
                let value = env.value(name).ok_or_else(|| RewriteError::UnboundHole {
                    name: name.clone(),
                })?;
                match property {
                    Some(property) => out.push_str(&property.apply(value)),
                    None => out.push_str(value),
                }
            }
            TemplatePart::FreshId { label } => out.push_str(&scope.get(label.as_deref())),
        }
    }
    Ok(out)
}

/// One match replaced by rendered text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// Range of the replaced text in the original source
    pub range: Range,
    pub original: String,
    pub replacement: String,
    pub environment: Environment,
    /// Byte span of `replacement` in the rewritten text
    pub output_start: usize,
    pub output_end: usize,
}

impl Replacement {
    /// Convert to an [`Edit`] against `file`, verified by the original text.
    pub fn to_edit(&self, file: impl Into<PathBuf>) -> Edit {
        Edit::with_verification(
            file.into(),
            self.range.start.offset,
            self.range.end.offset,
            self.replacement.clone(),
            EditVerification::from_text(&self.original),
        )
    }
}

/// Result of rewriting one source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    pub text: String,
    pub replacements: Vec<Replacement>,
}

impl Rewritten {
    pub fn changed(&self) -> bool {
        !self.replacements.is_empty()
    }
}

/// How a rule replaces its matches.
#[derive(Debug, Clone)]
pub enum Fix {
    Template(RewriteTemplate),
    Regex(RegexFix),
}

impl Fix {
    pub fn apply(
        &self,
        source: &str,
        matches: &[Match],
        fresh: &FreshIds,
    ) -> Result<Rewritten, RewriteError> {
        match self {
            Fix::Template(template) => apply_rewrite(source, matches, template, fresh),
            Fix::Regex(fix) => apply_regex_fix(source, matches, fix),
        }
    }
}

/// Replace every match in `source` with `template` rendered against it.
///
/// Matches must be in ascending order and must not overlap. Fresh ids are
/// drawn from `fresh` and never collide with identifiers in `source`.
/// With no matches the source comes back unchanged.
pub fn apply_rewrite(
    source: &str,
    matches: &[Match],
    template: &RewriteTemplate,
    fresh: &FreshIds,
) -> Result<Rewritten, RewriteError> {
    let taken = identifiers(source);
    splice(source, matches, |m| {
        let mut scope = fresh.scope(&taken);
        render(template, &m.environment, &mut scope)
    })
}

/// Replace every match in `source` with its own text run through `fix`.
pub fn apply_regex_fix(
    source: &str,
    matches: &[Match],
    fix: &RegexFix,
) -> Result<Rewritten, RewriteError> {
    splice(source, matches, |m| Ok(fix.apply(&m.matched)))
}

fn splice(
    source: &str,
    matches: &[Match],
    mut replace: impl FnMut(&Match) -> Result<String, RewriteError>,
) -> Result<Rewritten, RewriteError> {
    let mut text = String::with_capacity(source.len());
    let mut replacements = Vec::with_capacity(matches.len());
    let mut cursor = 0;

    for m in matches {
        let (start, end) = (m.byte_start(), m.byte_end());
        if start < cursor {
            return Err(RewriteError::OverlappingMatches { offset: start });
        }
        let replacement = replace(m)?;

        text.push_str(&source[cursor..start]);
        let output_start = text.len();
        text.push_str(&replacement);
        replacements.push(Replacement {
            range: m.range,
            original: m.matched.clone(),
            replacement,
            environment: m.environment.clone(),
            output_start,
            output_end: text.len(),
        });
        cursor = end;
    }
    text.push_str(&source[cursor..]);

    Ok(Rewritten { text, replacements })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::LanguageProfile;
    use crate::matcher::find_all;
    use crate::pattern::Pattern;

    fn rewrite(source: &str, pattern: &str, template: &str, fresh: &FreshIds) -> Rewritten {
        let pattern = Pattern::compile_generic(pattern).unwrap();
        let matches: Vec<_> = find_all(source, LanguageProfile::generic(), &pattern).collect();
        let template = RewriteTemplate::compile(template).unwrap();
        apply_rewrite(source, &matches, &template, fresh).unwrap()
    }

    #[test]
    fn rewrites_every_match() {
        let out = rewrite(
            "a = oldFunc(1, 2); b = oldFunc(x)",
            "oldFunc(:[args])",
            "newFunc(:[args])",
            &FreshIds::new(),
        );
        assert_eq!(out.text, "a = newFunc(1, 2); b = newFunc(x)");
        assert_eq!(out.replacements.len(), 2);
        let second = &out.replacements[1];
        assert_eq!(&out.text[second.output_start..second.output_end], "newFunc(x)");
        assert_eq!(second.original, "oldFunc(x)");
    }

    #[test]
    fn no_matches_leaves_source_identical() {
        let source = "nothing to see\n";
        let out = rewrite(source, "absent(:[x])", "present(:[x])", &FreshIds::new());
        assert_eq!(out.text, source);
        assert!(!out.changed());
    }

    #[test]
    fn labelled_fresh_ids_repeat_within_a_match() {
        let fresh = FreshIds::new();
        let out = rewrite(
            "swap(a, b); swap(c, d)",
            "swap(:[x], :[y])",
            "let :[id(tmp)] = :[x]; :[x] = :[y]; :[y] = :[id(tmp)]",
            &fresh,
        );
        assert_eq!(
            out.text,
            "let tmp_1 = a; a = b; b = tmp_1; let tmp_2 = c; c = d; d = tmp_2"
        );
    }

    #[test]
    fn unlabelled_fresh_ids_differ_across_matches() {
        let fresh = FreshIds::new();
        let out = rewrite("f(1) f(2)", "f(:[x])", "g(:[id()], :[x])", &fresh);
        assert_eq!(out.text, "g(id_1, 1) g(id_2, 2)");
    }

    #[test]
    fn properties_apply_on_render() {
        let out = rewrite(
            "def my_function(): pass",
            "def :[[name]]()",
            "def :[name].UpperCamelCase() # :[name].length",
            &FreshIds::new(),
        );
        assert_eq!(out.text, "def MyFunction() # 11: pass");
    }

    #[test]
    fn unbound_and_overlapping_are_errors() {
        let source = "f(a)";
        let pattern = Pattern::compile_generic("f(:[x])").unwrap();
        let matches: Vec<_> = find_all(source, LanguageProfile::generic(), &pattern).collect();
        let template = RewriteTemplate::compile(":[y]").unwrap();
        assert_eq!(
            apply_rewrite(source, &matches, &template, &FreshIds::new()),
            Err(RewriteError::UnboundHole { name: "y".into() })
        );

        let doubled = vec![matches[0].clone(), matches[0].clone()];
        let template = RewriteTemplate::compile("g").unwrap();
        assert_eq!(
            apply_rewrite(source, &doubled, &template, &FreshIds::new()),
            Err(RewriteError::OverlappingMatches { offset: 0 })
        );
    }

    #[test]
    fn regex_fix_rewrites_each_match() {
        let source = "requests.get(a)\nrequests.get(b, timeout=5)\n";
        let pattern = Pattern::compile_generic("requests.get(:[args])").unwrap();
        let matches: Vec<_> = find_all(source, LanguageProfile::generic(), &pattern)
            .filter(|m| !m.matched.contains("timeout"))
            .collect();
        let fix = Fix::Regex(RegexFix::compile(r"(.*)\)", r"\1, timeout=30)", None).unwrap());
        let out = fix.apply(source, &matches, &FreshIds::new()).unwrap();
        assert_eq!(
            out.text,
            "requests.get(a, timeout=30)\nrequests.get(b, timeout=5)\n"
        );
        assert_eq!(out.replacements[0].original, "requests.get(a)");
    }

    #[test]
    fn replacement_converts_to_verified_edit() {
        let out = rewrite("let v = old(1);", "old(:[x])", "new(:[x])", &FreshIds::new());
        let edit = out.replacements[0].to_edit("src/lib.rs");
        assert_eq!((edit.byte_start, edit.byte_end), (8, 14));
        assert_eq!(edit.new_text, "new(1)");
    }
}
