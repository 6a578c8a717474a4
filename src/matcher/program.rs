//! Lowering of a pattern tree into a flat instruction list.
//!
//! Literal text is lexed with the target profile so that pattern tokens and
//! source tokens compare like for like. Delimiter groups become explicit
//! open/close tokens; the matcher's balance rules keep them paired. A named
//! hole written against word characters (`get_:[name]`, `:[kind]Error`) is
//! fused with the touching words into one instruction that matches inside
//! a single identifier.

use crate::lang::LanguageProfile;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::pattern::{Hole, HoleKind, Occurrence, Pattern, PatternNode, QuotedPart};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HoleClass {
    Generic,
    Identifier,
    Expression,
    Anonymous,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HoleInstr {
    /// Environment slot; `None` for anonymous holes
    pub slot: Option<usize>,
    pub class: HoleClass,
    pub repeat: bool,
    /// Not nested inside any delimiter of the pattern
    pub top_level: bool,
    /// Last instruction of the program
    pub trailing: bool,
}

/// Piece of a string body or of an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Fragment {
    Text(String),
    Hole(HoleInstr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Instr {
    Token { kind: TokenKind, text: String },
    Hole(HoleInstr),
    Quoted { quote: char, parts: Vec<Fragment> },
    /// One identifier token made of text and holes
    Word { parts: Vec<Fragment> },
}

#[derive(Debug, Clone)]
pub(crate) struct Program {
    pub instrs: Vec<Instr>,
    /// Slot names, in first-occurrence order
    pub slots: Vec<String>,
    /// For each instruction index, the slots bound before it and referenced
    /// again at or after it
    pub live: Vec<Vec<usize>>,
    /// Tokens that end an expression hole
    pub separators: &'static [&'static str],
    pub offside: bool,
}

impl Program {
    pub fn lower(pattern: &Pattern, profile: &LanguageProfile) -> Self {
        let slots = pattern.variables().to_vec();
        let mut instrs = Vec::new();
        lower_node(pattern.root(), 0, &slots, profile, &mut instrs);

        if let Some(Instr::Hole(last)) = instrs.last_mut() {
            last.trailing = true;
        }

        let live = live_slots(&instrs, slots.len());
        Self {
            instrs,
            slots,
            live,
            separators: profile.expression_separators,
            offside: profile.offside,
        }
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }
}

fn hole_instr(hole: &Hole, depth: usize, slots: &[String]) -> HoleInstr {
    let class = match hole.kind {
        HoleKind::Generic => HoleClass::Generic,
        HoleKind::Identifier => HoleClass::Identifier,
        HoleKind::Expression => HoleClass::Expression,
        HoleKind::Anonymous | HoleKind::FreshId { .. } => HoleClass::Anonymous,
    };
    let slot = hole
        .name
        .as_ref()
        .and_then(|name| slots.iter().position(|s| s == name));
    HoleInstr {
        slot,
        class: if slot.is_none() { HoleClass::Anonymous } else { class },
        repeat: hole.occurrence == Occurrence::Repeat,
        top_level: depth == 0,
        trailing: false,
    }
}

fn lower_node(
    node: &PatternNode,
    depth: usize,
    slots: &[String],
    profile: &LanguageProfile,
    out: &mut Vec<Instr>,
) {
    match node {
        PatternNode::Literal(text) => {
            out.extend(significant(text, profile).iter().map(token_instr));
        }
        PatternNode::Hole(hole) => out.push(Instr::Hole(hole_instr(hole, depth, slots))),
        PatternNode::Sequence(nodes) => lower_sequence(nodes, depth, slots, profile, out),
        PatternNode::Balanced { open, body, close } => {
            out.push(Instr::Token {
                kind: TokenKind::OpenDelimiter,
                text: open.to_string(),
            });
            lower_node(body, depth + 1, slots, profile, out);
            out.push(Instr::Token {
                kind: TokenKind::CloseDelimiter,
                text: close.to_string(),
            });
        }
        PatternNode::Quoted { quote, parts } => {
            let parts = parts
                .iter()
                .map(|part| match part {
                    QuotedPart::Text(text) => Fragment::Text(text.clone()),
                    QuotedPart::Hole(hole) => Fragment::Hole(hole_instr(hole, depth + 1, slots)),
                })
                .collect();
            out.push(Instr::Quoted {
                quote: *quote,
                parts,
            });
        }
    }
}

fn lower_sequence(
    nodes: &[PatternNode],
    depth: usize,
    slots: &[String],
    profile: &LanguageProfile,
    out: &mut Vec<Instr>,
) {
    let mut word: Vec<Fragment> = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        let joins_prev = i > 0 && glued(&nodes[i - 1], node);
        let joins_next = nodes.get(i + 1).is_some_and(|next| glued(node, next));
        if !joins_prev && !joins_next {
            lower_node(node, depth, slots, profile, out);
            continue;
        }

        match node {
            PatternNode::Hole(hole) => {
                word.push(Fragment::Hole(hole_instr(hole, depth + 1, slots)));
                if !joins_next {
                    out.push(Instr::Word {
                        parts: std::mem::take(&mut word),
                    });
                }
            }
            PatternNode::Literal(text) => {
                let tokens = significant(text, profile);
                let mut rest = tokens.as_slice();
                if joins_prev {
                    if let Some((first, tail)) = rest.split_first() {
                        word.push(Fragment::Text(first.text.to_string()));
                        rest = tail;
                    }
                    if !(joins_next && rest.is_empty()) {
                        out.push(Instr::Word {
                            parts: std::mem::take(&mut word),
                        });
                    }
                }
                match rest.split_last() {
                    Some((last, head)) if joins_next => {
                        out.extend(head.iter().map(token_instr));
                        word.push(Fragment::Text(last.text.to_string()));
                    }
                    _ if joins_next => {}
                    _ => out.extend(rest.iter().map(token_instr)),
                }
            }
            other => lower_node(other, depth, slots, profile, out),
        }
    }
}

/// Whether a named hole touches word characters of the neighbouring text.
fn glued(left: &PatternNode, right: &PatternNode) -> bool {
    match (left, right) {
        (PatternNode::Literal(text), PatternNode::Hole(hole)) => {
            hole.name.is_some() && text.ends_with(is_word_char)
        }
        (PatternNode::Hole(hole), PatternNode::Literal(text)) => {
            hole.name.is_some() && text.starts_with(is_word_char)
        }
        _ => false,
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn significant<'t>(text: &'t str, profile: &LanguageProfile) -> Vec<Token<'t>> {
    tokenize(text, profile)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .collect()
}

fn token_instr(token: &Token<'_>) -> Instr {
    Instr::Token {
        kind: token.kind,
        text: token.text.to_string(),
    }
}

fn slot_refs(instr: &Instr) -> Vec<usize> {
    match instr {
        Instr::Token { .. } => Vec::new(),
        Instr::Hole(h) => h.slot.into_iter().collect(),
        Instr::Quoted { parts, .. } | Instr::Word { parts } => parts
            .iter()
            .filter_map(|p| match p {
                Fragment::Hole(h) => h.slot,
                Fragment::Text(_) => None,
            })
            .collect(),
    }
}

fn live_slots(instrs: &[Instr], slot_count: usize) -> Vec<Vec<usize>> {
    let mut first = vec![usize::MAX; slot_count];
    let mut last = vec![0; slot_count];
    for (i, instr) in instrs.iter().enumerate() {
        for slot in slot_refs(instr) {
            first[slot] = first[slot].min(i);
            last[slot] = last[slot].max(i);
        }
    }
    (0..=instrs.len())
        .map(|p| {
            (0..slot_count)
                .filter(|&s| first[s] < p && last[s] >= p)
                .collect()
        })
        .collect()
}
