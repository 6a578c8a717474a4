use crate::lang::LanguageProfile;
use crate::pattern::ast::{Hole, HoleKind, Occurrence, Pattern, PatternNode, QuotedPart};
use crate::pattern::errors::CompileError;
use crate::pattern::hole::{contains_hole, parse_hole, ELLIPSIS};
use std::collections::HashMap;

impl Pattern {
    /// Compile a match template for the given language profile.
    ///
    /// The profile decides which characters quote strings (delimiters inside
    /// strings are not tracked) and which comment markers exist.
    pub fn compile(text: &str, profile: &LanguageProfile) -> Result<Pattern, CompileError> {
        if text.trim().is_empty() {
            return Err(CompileError::EmptyPattern);
        }
        let mut compiler = Compiler::new(text, profile);
        let nodes = compiler.sequence(None)?;
        Ok(Pattern {
            source: text.to_string(),
            root: PatternNode::Sequence(nodes),
            variables: compiler.variables,
        })
    }

    /// Compile with the generic profile.
    pub fn compile_generic(text: &str) -> Result<Pattern, CompileError> {
        Self::compile(text, LanguageProfile::generic())
    }
}

struct Compiler<'t, 'p> {
    text: &'t str,
    profile: &'p LanguageProfile,
    pos: usize,
    kinds: HashMap<String, HoleKind>,
    variables: Vec<String>,
}

impl<'t, 'p> Compiler<'t, 'p> {
    fn new(text: &'t str, profile: &'p LanguageProfile) -> Self {
        Self {
            text,
            profile,
            pos: 0,
            kinds: HashMap::new(),
            variables: Vec::new(),
        }
    }

    /// Parse nodes until `closer` (or end of input at top level).
    ///
    /// `closer` carries the expected closing delimiter and the offset of its
    /// opening partner.
    fn sequence(&mut self, closer: Option<(char, usize)>) -> Result<Vec<PatternNode>, CompileError> {
        let mut nodes = Vec::new();
        let mut literal = String::new();

        loop {
            let rest = &self.text[self.pos..];
            let Some(c) = rest.chars().next() else {
                if let Some((expected, open_offset)) = closer {
                    return Err(CompileError::UnbalancedDelimiter {
                        offset: open_offset,
                        found: None,
                        expected: Some(expected),
                    });
                }
                break;
            };

            if rest.starts_with(":[") {
                flush(&mut literal, &mut nodes);
                let hole = self.hole()?;
                nodes.push(PatternNode::Hole(hole));
                continue;
            }

            if rest.starts_with(ELLIPSIS) {
                flush(&mut literal, &mut nodes);
                nodes.push(PatternNode::Hole(self.anonymous(self.pos)));
                self.pos += ELLIPSIS.len();
                continue;
            }

            if let Some(len) = self.comment_len(rest) {
                literal.push_str(&rest[..len]);
                self.pos += len;
                continue;
            }

            if self.profile.is_quote(c) {
                if let Some(len) = quoted_len(rest, c, self.profile.escape) {
                    let section = &rest[..len];
                    if contains_hole(&section[1..len - 1]) {
                        flush(&mut literal, &mut nodes);
                        let node = self.quoted(c, self.pos + 1, &section[1..len - 1])?;
                        nodes.push(node);
                    } else {
                        literal.push_str(section);
                    }
                    self.pos += len;
                    continue;
                }
            }

            if let Some(close) = self.profile.closer_of(c) {
                flush(&mut literal, &mut nodes);
                let open_offset = self.pos;
                self.pos += c.len_utf8();
                let body = self.sequence(Some((close, open_offset)))?;
                nodes.push(PatternNode::Balanced {
                    open: c,
                    body: Box::new(PatternNode::Sequence(body)),
                    close,
                });
                continue;
            }

            if self.profile.is_close(c) {
                return match closer {
                    Some((expected, _)) if expected == c => {
                        self.pos += c.len_utf8();
                        flush(&mut literal, &mut nodes);
                        Ok(nodes)
                    }
                    _ => Err(CompileError::UnbalancedDelimiter {
                        offset: self.pos,
                        found: Some(c),
                        expected: closer.map(|(expected, _)| expected),
                    }),
                };
            }

            literal.push(c);
            self.pos += c.len_utf8();
        }

        flush(&mut literal, &mut nodes);
        Ok(nodes)
    }

    fn hole(&mut self) -> Result<Hole, CompileError> {
        let offset = self.pos;
        let syntax = parse_hole(&self.text[offset..], offset)?;
        self.pos += syntax.len;
        self.register(syntax.name, syntax.kind, offset)
    }

    fn anonymous(&self, offset: usize) -> Hole {
        Hole {
            name: None,
            kind: HoleKind::Anonymous,
            occurrence: Occurrence::First,
            offset,
        }
    }

    /// Record a hole's name and kind, deciding whether it binds or repeats.
    fn register(
        &mut self,
        name: Option<String>,
        kind: HoleKind,
        offset: usize,
    ) -> Result<Hole, CompileError> {
        if let HoleKind::FreshId { .. } = kind {
            return Err(CompileError::FreshIdInPattern { offset });
        }
        let Some(name) = name else {
            return Ok(self.anonymous(offset));
        };

        let occurrence = match self.kinds.get(&name) {
            Some(first) if *first != kind => {
                return Err(CompileError::HoleKindConflict {
                    name,
                    first: first.clone(),
                    second: kind,
                });
            }
            Some(_) => Occurrence::Repeat,
            None => {
                self.kinds.insert(name.clone(), kind.clone());
                self.variables.push(name.clone());
                Occurrence::First
            }
        };

        Ok(Hole {
            name: Some(name),
            kind,
            occurrence,
            offset,
        })
    }

    /// Split the contents of a quoted section into text and holes.
    fn quoted(&mut self, quote: char, start: usize, content: &str) -> Result<PatternNode, CompileError> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut i = 0;

        while i < content.len() {
            let rest = &content[i..];
            if rest.starts_with(":[") {
                if !text.is_empty() {
                    parts.push(QuotedPart::Text(std::mem::take(&mut text)));
                }
                let syntax = parse_hole(rest, start + i)?;
                i += syntax.len;
                let hole = self.register(syntax.name, syntax.kind, start + i - syntax.len)?;
                parts.push(QuotedPart::Hole(hole));
            } else if rest.starts_with(ELLIPSIS) {
                if !text.is_empty() {
                    parts.push(QuotedPart::Text(std::mem::take(&mut text)));
                }
                parts.push(QuotedPart::Hole(self.anonymous(start + i)));
                i += ELLIPSIS.len();
            } else {
                let c = rest.chars().next().unwrap_or_default();
                text.push(c);
                i += c.len_utf8().max(1);
            }
        }
        if !text.is_empty() {
            parts.push(QuotedPart::Text(text));
        }

        Ok(PatternNode::Quoted { quote, parts })
    }

    fn comment_len(&self, rest: &str) -> Option<usize> {
        if self.profile.line_comments.iter().any(|m| rest.starts_with(*m)) {
            return Some(rest.find('\n').unwrap_or(rest.len()));
        }
        self.profile
            .block_comments
            .iter()
            .find(|(open, _)| rest.starts_with(*open))
            .map(|&(open, close)| {
                rest[open.len()..]
                    .find(close)
                    .map(|i| open.len() + i + close.len())
                    .unwrap_or(rest.len())
            })
    }
}

fn flush(literal: &mut String, nodes: &mut Vec<PatternNode>) {
    if !literal.is_empty() {
        nodes.push(PatternNode::Literal(std::mem::take(literal)));
    }
}

/// Length of a quoted section closed on the same line, including quotes.
fn quoted_len(rest: &str, quote: char, escape: Option<char>) -> Option<usize> {
    let mut chars = rest.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        if Some(c) == escape {
            chars.next();
        } else if c == quote {
            return Some(i + c.len_utf8());
        } else if c == '\n' {
            return None;
        }
    }
    None
}
