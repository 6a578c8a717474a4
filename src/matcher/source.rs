use crate::lang::LanguageProfile;
use crate::lexer::{tokenize, Token, TokenKind};
use crate::position::{LineIndex, Range};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Source text prepared for matching.
///
/// Holds only the significant tokens (no whitespace or comments) plus the
/// structural facts the matcher needs about them: delimiter partners and
/// what separates each token from the next.
#[derive(Debug)]
pub struct SourceIndex<'a> {
    id: u64,
    text: &'a str,
    pub(crate) tokens: Vec<Token<'a>>,
    /// For each open delimiter, the index of its matching close
    pub(crate) partner: Vec<Option<usize>>,
    /// Whether the gap after token `k` contains a newline
    pub(crate) newline_after: Vec<bool>,
    /// Whether token `k + 1` starts exactly where token `k` ends
    pub(crate) adjacent_next: Vec<bool>,
    lines: LineIndex<'a>,
}

impl<'a> SourceIndex<'a> {
    pub fn new(text: &'a str, profile: &LanguageProfile) -> Self {
        let tokens: Vec<_> = tokenize(text, profile)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect();

        let partner = pair_delimiters(&tokens, profile);

        let mut newline_after = Vec::with_capacity(tokens.len());
        let mut adjacent_next = Vec::with_capacity(tokens.len());
        for (k, tok) in tokens.iter().enumerate() {
            let gap_end = tokens.get(k + 1).map(|n| n.offset).unwrap_or(text.len());
            let gap = &text[tok.end()..gap_end];
            newline_after.push(gap.contains('\n'));
            adjacent_next.push(gap.is_empty());
        }

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            text,
            tokens,
            partner,
            newline_after,
            adjacent_next,
            lines: LineIndex::new(text),
        }
    }

    /// Distinct for every index built in this process.
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token<'a>] {
        &self.tokens
    }

    pub fn range(&self, start: usize, end: usize) -> Range {
        self.lines.range(start, end)
    }

    /// Byte offset where a capture starting at token `t` begins.
    pub(crate) fn start_offset(&self, t: usize) -> usize {
        match self.tokens.get(t) {
            Some(tok) => tok.offset,
            None => self.tokens.last().map(|tok| tok.end()).unwrap_or(0),
        }
    }

    /// Byte range covered by tokens `[start, end)`.
    pub(crate) fn span_bytes(&self, start: usize, end: usize) -> (usize, usize) {
        if end <= start {
            let at = self.start_offset(start);
            return (at, at);
        }
        (self.tokens[start].offset, self.tokens[end - 1].end())
    }

    pub(crate) fn is_close(&self, k: usize) -> bool {
        self.tokens[k].kind == TokenKind::CloseDelimiter
    }

    /// Index just past the element starting at `k`: the token itself, or the
    /// whole delimited group when `k` opens one. `None` for an unclosed open.
    pub(crate) fn element_end(&self, k: usize) -> Option<usize> {
        match self.tokens[k].kind {
            TokenKind::OpenDelimiter => self.partner[k].map(|close| close + 1),
            _ => Some(k + 1),
        }
    }
}

/// Match close delimiters to their opens with a stack.
///
/// A close that matches an open deeper in the stack closes it and leaves the
/// opens above it unpaired; a close matching nothing stays unpaired.
fn pair_delimiters(tokens: &[Token<'_>], profile: &LanguageProfile) -> Vec<Option<usize>> {
    let mut partner = vec![None; tokens.len()];
    let mut stack: Vec<(usize, char)> = Vec::new();

    for (k, tok) in tokens.iter().enumerate() {
        let Some(c) = tok.text.chars().next() else {
            continue;
        };
        match tok.kind {
            TokenKind::OpenDelimiter => {
                if let Some(close) = profile.closer_of(c) {
                    stack.push((k, close));
                }
            }
            TokenKind::CloseDelimiter => {
                if let Some(depth) = stack.iter().rposition(|(_, close)| *close == c) {
                    let (open, _) = stack[depth];
                    partner[open] = Some(k);
                    stack.truncate(depth);
                }
            }
            _ => {}
        }
    }

    partner
}
