use crate::matcher::engine::{match_at, State};
use crate::matcher::environment::Match;
use crate::matcher::program::Program;
use crate::matcher::source::SourceIndex;
use tracing::trace;

/// Decides whether a candidate match is reported. May add bindings to the
/// candidate's environment.
pub(crate) type Accept<'a> = Box<dyn Fn(&mut Match) -> bool + 'a>;

/// Lazy, left-to-right, non-overlapping scan over one source text.
///
/// Each significant token not covered by an earlier match is tried as a
/// start position. Alternatives are tried in order and the first accepted
/// candidate wins; a rejected candidate consumes nothing. The iterator is
/// finite and cannot be restarted.
pub struct Matches<'a> {
    src: SourceIndex<'a>,
    programs: Vec<Program>,
    states: Vec<State>,
    accept: Accept<'a>,
    pos: usize,
}

impl<'a> Matches<'a> {
    pub(crate) fn new(src: SourceIndex<'a>, programs: Vec<Program>, accept: Accept<'a>) -> Self {
        let states = programs.iter().map(State::new).collect();
        Self {
            src,
            programs,
            states,
            accept,
            pos: 0,
        }
    }

    /// The indexed source being scanned.
    pub fn source(&self) -> &SourceIndex<'a> {
        &self.src
    }
}

impl Iterator for Matches<'_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        while self.pos < self.src.len() {
            let t = self.pos;
            for (program, state) in self.programs.iter().zip(self.states.iter_mut()) {
                let Some((mut m, end)) = match_at(program, &self.src, state, t) else {
                    continue;
                };
                if m.range.is_empty() || !(self.accept)(&mut m) {
                    trace!(offset = m.byte_start(), "candidate rejected");
                    continue;
                }
                self.pos = end;
                return Some(m);
            }
            self.pos += 1;
        }
        None
    }
}
