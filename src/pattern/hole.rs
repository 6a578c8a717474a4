//! Hole syntax shared by match and rewrite templates.
//!
//! ```text
//! :[name]        generic
//! :[[name]]      identifier
//! :[name:e]      expression
//! :[_]  ...      anonymous
//! :[id()]        fresh identifier
//! :[id(label)]   labelled fresh identifier
//! ```

use crate::pattern::ast::HoleKind;
use crate::pattern::errors::CompileError;

pub(crate) const ELLIPSIS: &str = "...";

/// A hole as written, before occurrence tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HoleSyntax {
    pub name: Option<String>,
    pub kind: HoleKind,
    /// Bytes consumed from the start of the hole
    pub len: usize,
}

pub(crate) fn is_name_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub(crate) fn is_name_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(is_name_start) && chars.all(is_name_continue)
}

/// Whether `text` contains anything that parses as a hole.
pub(crate) fn contains_hole(text: &str) -> bool {
    text.contains(":[") || text.contains(ELLIPSIS)
}

/// Parse the hole starting at `text[0..2] == ":["`.
///
/// `offset` is the position of `text` within the template, for errors.
pub(crate) fn parse_hole(text: &str, offset: usize) -> Result<HoleSyntax, CompileError> {
    let malformed = |reason: &str| CompileError::MalformedHole {
        offset,
        reason: reason.to_string(),
    };

    if let Some(inner) = text.strip_prefix(":[[") {
        let end = inner.find("]]").ok_or_else(|| malformed("missing ']]'"))?;
        let name = &inner[..end];
        if !is_valid_name(name) {
            return Err(malformed(&format!("invalid hole name '{name}'")));
        }
        return Ok(HoleSyntax {
            name: Some(name.to_string()),
            kind: HoleKind::Identifier,
            len: 3 + end + 2,
        });
    }

    let inner = text
        .strip_prefix(":[")
        .ok_or_else(|| malformed("expected ':['"))?;
    let end = inner.find(']').ok_or_else(|| malformed("missing ']'"))?;
    let body = &inner[..end];
    let len = 2 + end + 1;

    if let Some(args) = body.strip_prefix("id(") {
        let label = args
            .strip_suffix(')')
            .ok_or_else(|| malformed("missing ')' in fresh identifier"))?;
        if !label.is_empty() && !is_valid_name(label) {
            return Err(malformed(&format!("invalid fresh identifier label '{label}'")));
        }
        return Ok(HoleSyntax {
            name: None,
            kind: HoleKind::FreshId {
                label: (!label.is_empty()).then(|| label.to_string()),
            },
            len,
        });
    }

    let (name, kind) = match body.split_once(':') {
        Some((name, "e")) => (name, HoleKind::Expression),
        Some((_, suffix)) => {
            return Err(malformed(&format!("unknown hole suffix ':{suffix}'")));
        }
        None => (body, HoleKind::Generic),
    };

    if name.is_empty() {
        return Err(malformed("empty hole name"));
    }
    if !is_valid_name(name) {
        return Err(malformed(&format!("invalid hole name '{name}'")));
    }
    if name == "_" {
        return Ok(HoleSyntax {
            name: None,
            kind: HoleKind::Anonymous,
            len,
        });
    }

    Ok(HoleSyntax {
        name: Some(name.to_string()),
        kind,
        len,
    })
}
