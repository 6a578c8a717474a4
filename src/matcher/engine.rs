//! Memoized backtracking over (instruction, token) states.

use std::collections::HashSet;

use crate::lexer::TokenKind;
use crate::matcher::environment::{Binding, Environment, Match};
use crate::matcher::program::{Fragment, HoleClass, HoleInstr, Instr, Program};
use crate::matcher::source::SourceIndex;

/// Byte span of a capture.
type Span = (usize, usize);

const UNBOUND: Span = (usize::MAX, usize::MAX);

/// Failed states: instruction, token, and the spans of live bindings.
type MemoKey = (usize, usize, Vec<Span>);

/// Failed states kept before the memo is dropped and rebuilt.
const MEMO_LIMIT: usize = 1 << 20;

/// Mutable matching state for one program over one source.
///
/// The failure memo survives across start tokens: whether the rest of the
/// program fails from a state does not depend on where the match began,
/// except for an offside trailing `...`, which measures indentation against
/// the start token. It is cleared whenever a different source comes in.
#[derive(Debug, Default)]
pub(crate) struct State {
    captures: Vec<Option<Span>>,
    failed: HashSet<MemoKey>,
    start: usize,
    /// Id of the source the memo describes
    source: Option<u64>,
    /// States entered so far, memo hits included
    pub steps: usize,
}

impl State {
    pub fn new(program: &Program) -> Self {
        Self {
            captures: vec![None; program.slots.len()],
            ..Self::default()
        }
    }
}

/// Try `program` at token `t`. Returns the match and the index of the first
/// token after it.
pub(crate) fn match_at(
    program: &Program,
    src: &SourceIndex<'_>,
    state: &mut State,
    t: usize,
) -> Option<(Match, usize)> {
    if program.instrs.is_empty() || t >= src.len() {
        return None;
    }
    state.captures.iter_mut().for_each(|c| *c = None);
    state.start = t;
    if state.source != Some(src.id())
        || state.failed.len() > MEMO_LIMIT
        || start_sensitive(program)
    {
        state.failed.clear();
        state.source = Some(src.id());
    }

    let end = Run {
        program,
        src,
        state: &mut *state,
    }
    .step(0, t)?;
    if end <= t {
        return None;
    }

    let text = src.text();
    let (from, to) = src.span_bytes(t, end);
    let mut environment = Environment::new();
    for (name, capture) in program.slots.iter().zip(&state.captures) {
        if let Some((a, b)) = *capture {
            environment.insert(Binding {
                variable: name.clone(),
                value: text[a..b].to_string(),
                range: src.range(a, b),
            });
        }
    }

    Some((
        Match {
            range: src.range(from, to),
            environment,
            matched: text[from..to].to_string(),
        },
        end,
    ))
}

fn start_sensitive(program: &Program) -> bool {
    program.offside
        && matches!(
            program.instrs.last(),
            Some(Instr::Hole(h)) if h.class == HoleClass::Anonymous
        )
}

struct Run<'e, 'a> {
    program: &'e Program,
    src: &'e SourceIndex<'a>,
    state: &'e mut State,
}

impl<'e, 'a> Run<'e, 'a> {
    /// Match instructions `p..` from token `t`; returns the end token.
    fn step(&mut self, p: usize, t: usize) -> Option<usize> {
        self.state.steps += 1;
        let program = self.program;
        if p == program.instrs.len() {
            return Some(t);
        }

        let key = (p, t, self.live_spans(p));
        if self.state.failed.contains(&key) {
            return None;
        }

        let result = match &program.instrs[p] {
            Instr::Token { kind, text } => match self.src.tokens.get(t) {
                Some(tok) if tok.kind == *kind && tok.text == text => self.step(p + 1, t + 1),
                _ => None,
            },
            Instr::Hole(hole) => self.hole(p, hole, t),
            Instr::Quoted { quote, parts } => {
                let src = self.src;
                match src.tokens.get(t) {
                    Some(tok) if tok.kind == TokenKind::String => {
                        string_body(tok.text, *quote).and_then(|(skip, body)| {
                            self.fragments(p, t, parts, tok.offset + skip, body, 0)
                        })
                    }
                    _ => None,
                }
            }
            Instr::Word { parts } => {
                let src = self.src;
                match src.tokens.get(t) {
                    Some(tok) if tok.kind == TokenKind::Identifier => {
                        self.fragments(p, t, parts, tok.offset, tok.text, 0)
                    }
                    _ => None,
                }
            }
        };

        if result.is_none() {
            self.state.failed.insert(key);
        }
        result
    }

    fn live_spans(&self, p: usize) -> Vec<Span> {
        self.program.live[p]
            .iter()
            .map(|&slot| self.state.captures[slot].unwrap_or(UNBOUND))
            .collect()
    }

    fn hole(&mut self, p: usize, hole: &HoleInstr, t: usize) -> Option<usize> {
        if hole.class == HoleClass::Anonymous && !hole.trailing && p > 0 {
            return self.gap(p, t);
        }
        for end in self.candidate_ends(hole, t, p == 0) {
            let span = self.src.span_bytes(t, end);
            if !self.bind(hole, span) {
                continue;
            }
            if let Some(done) = self.step(p + 1, end) {
                return Some(done);
            }
            self.unbind(hole);
        }
        None
    }

    /// An unbound `...` that neither starts nor ends the program.
    ///
    /// Its ends are walked left to right, one element at a time. The walk
    /// from any later end is the walk a gap starting there would make, so a
    /// failed `(p, end)` state cuts it short, and every end reached by a
    /// failed walk is recorded as failed in turn.
    fn gap(&mut self, p: usize, t: usize) -> Option<usize> {
        let src = self.src;
        let live = self.live_spans(p);
        let mut reached = Vec::new();
        let mut cur = t;

        let found = loop {
            if cur > t && self.state.failed.contains(&(p, cur, live.clone())) {
                break None;
            }
            if let Some(done) = self.step(p + 1, cur) {
                break Some(done);
            }
            reached.push(cur);
            if cur >= src.len() || src.is_close(cur) {
                break None;
            }
            match src.element_end(cur) {
                Some(next) => cur = next,
                None => break None,
            }
        };

        if found.is_none() {
            for end in reached {
                self.state.failed.insert((p, end, live.clone()));
            }
        }
        found
    }

    /// End tokens a hole starting at `t` may stop at, in the order to try.
    /// A leading hole must capture something, otherwise it would only
    /// duplicate the match found at the next start token.
    fn candidate_ends(&self, hole: &HoleInstr, t: usize, leading: bool) -> Vec<usize> {
        let src = self.src;

        if hole.class == HoleClass::Identifier {
            return match src.tokens.get(t) {
                Some(tok) if tok.kind == TokenKind::Identifier => vec![t + 1],
                _ => Vec::new(),
            };
        }

        let expression = hole.class == HoleClass::Expression;
        let line_bound = hole.top_level && (hole.class != HoleClass::Anonymous || hole.trailing);
        let block_column = (hole.trailing && hole.class == HoleClass::Anonymous && self.program.offside)
            .then(|| src.tokens[self.state.start].column);

        let mut ends = Vec::new();
        if !expression && !leading {
            ends.push(t);
        }

        let mut cur = t;
        while cur < src.len() && !src.is_close(cur) {
            if cur > t {
                if expression && !src.adjacent_next[cur - 1] {
                    break;
                }
                if line_bound && src.newline_after[cur - 1] {
                    let indented = block_column.is_some_and(|col| src.tokens[cur].column > col);
                    if !indented {
                        break;
                    }
                }
            }
            if expression && self.program.separators.contains(&src.tokens[cur].text) {
                break;
            }
            let Some(next) = src.element_end(cur) else {
                break;
            };
            ends.push(next);
            cur = next;
        }

        if hole.trailing {
            ends.reverse();
        }
        ends
    }

    /// Record a capture, or check a repeat against the first one.
    fn bind(&mut self, hole: &HoleInstr, span: Span) -> bool {
        let Some(slot) = hole.slot else {
            return true;
        };
        if hole.repeat {
            return match self.state.captures[slot] {
                Some(first) => self.text(first) == self.text(span),
                None => false,
            };
        }
        self.state.captures[slot] = Some(span);
        true
    }

    fn unbind(&mut self, hole: &HoleInstr) {
        if let (Some(slot), false) = (hole.slot, hole.repeat) {
            self.state.captures[slot] = None;
        }
    }

    fn text(&self, (a, b): Span) -> &'a str {
        &self.src.text()[a..b]
    }

    /// Match fragments against the text of token `t` (a string body or an
    /// identifier), then continue after the token. `base` is the byte
    /// offset of `body` in the source.
    fn fragments(
        &mut self,
        p: usize,
        t: usize,
        parts: &[Fragment],
        base: usize,
        body: &str,
        pos: usize,
    ) -> Option<usize> {
        let Some((part, rest)) = parts.split_first() else {
            return if pos == body.len() {
                self.step(p + 1, t + 1)
            } else {
                None
            };
        };

        match part {
            Fragment::Text(text) => {
                if body[pos..].starts_with(text.as_str()) {
                    self.fragments(p, t, rest, base, body, pos + text.len())
                } else {
                    None
                }
            }
            Fragment::Hole(hole) => {
                let ends: Vec<usize> = if rest.is_empty() {
                    vec![body.len()]
                } else {
                    body[pos..]
                        .char_indices()
                        .map(|(i, _)| pos + i)
                        .chain(std::iter::once(body.len()))
                        .collect()
                };
                for end in ends {
                    if !accepts_substring(hole.class, &body[pos..end]) {
                        continue;
                    }
                    if !self.bind(hole, (base + pos, base + end)) {
                        continue;
                    }
                    if let Some(done) = self.fragments(p, t, rest, base, body, end) {
                        return Some(done);
                    }
                    self.unbind(hole);
                }
                None
            }
        }
    }
}

/// Contents of a string token opened and closed by `quote`, with the byte
/// length of the opening delimiter.
fn string_body(text: &str, quote: char) -> Option<(usize, &str)> {
    let q = quote.len_utf8();
    let triple: String = std::iter::repeat(quote).take(3).collect();
    if text.len() >= 6 * q && text.starts_with(&triple) && text.ends_with(&triple) {
        return Some((3 * q, &text[3 * q..text.len() - 3 * q]));
    }
    if text.len() >= 2 * q && text.starts_with(quote) && text.ends_with(quote) {
        return Some((q, &text[q..text.len() - q]));
    }
    None
}

fn accepts_substring(class: HoleClass, piece: &str) -> bool {
    match class {
        HoleClass::Identifier => {
            !piece.is_empty() && piece.chars().all(|c| c.is_alphanumeric() || c == '_')
        }
        HoleClass::Expression => !piece.is_empty() && !piece.chars().any(char::is_whitespace),
        HoleClass::Generic | HoleClass::Anonymous => true,
    }
}
