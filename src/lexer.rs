//! Profile-driven tokenizer.
//!
//! One lexer serves every language: comment markers, quotes and delimiters
//! come from the [`LanguageProfile`]. Tokenizing never fails; characters the
//! profile does not recognise become single-character operator tokens.

use crate::lang::LanguageProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Identifier,
    Literal,
    Operator,
    OpenDelimiter,
    CloseDelimiter,
    String,
    Comment,
    Whitespace,
}

impl TokenKind {
    /// Whitespace and comments carry no structure for matching.
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// A lexed token borrowing its text from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    /// Byte offset of the first byte
    pub offset: usize,
    /// 1-based line of the first character
    pub line: usize,
    /// 1-based column (in characters) of the first character
    pub column: usize,
}

impl Token<'_> {
    pub fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

/// Multi-character operators, longest first.
const OPERATORS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "->", "=>", "::", "+=", "-=", "*=", "/=",
    "<<", ">>", "**", "..",
];

/// Tokenize `text` with the given profile.
pub fn tokenize<'a>(text: &'a str, profile: &LanguageProfile) -> Vec<Token<'a>> {
    Lexer::new(text, profile).collect()
}

/// Streaming lexer. Prefer [`tokenize`] unless tokens are consumed lazily.
pub struct Lexer<'a, 'p> {
    text: &'a str,
    profile: &'p LanguageProfile,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a, 'p> Lexer<'a, 'p> {
    pub fn new(text: &'a str, profile: &'p LanguageProfile) -> Self {
        Self {
            text,
            profile,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn scan(&mut self) -> TokenKind {
        let rest = self.rest();
        let Some(c) = rest.chars().next() else {
            return TokenKind::Whitespace;
        };

        if c.is_whitespace() {
            self.pos += byte_len_while(rest, char::is_whitespace);
            return TokenKind::Whitespace;
        }

        if self.profile.line_comments.iter().any(|m| rest.starts_with(*m)) {
            self.pos += rest.find('\n').unwrap_or(rest.len());
            return TokenKind::Comment;
        }

        for &(open, close) in self.profile.block_comments {
            if rest.starts_with(open) {
                self.pos += rest[open.len()..]
                    .find(close)
                    .map(|i| open.len() + i + close.len())
                    .unwrap_or(rest.len());
                return TokenKind::Comment;
            }
        }

        if self.profile.triple_quotes {
            for delim in ["\"\"\"", "'''"] {
                if rest.starts_with(delim) {
                    self.pos += rest[3..]
                        .find(delim)
                        .map(|i| 3 + i + 3)
                        .unwrap_or(rest.len());
                    return TokenKind::String;
                }
            }
        }

        if self.profile.quotes.contains(&c) {
            self.pos += string_len(rest, c, self.profile.escape, c == '`');
            return TokenKind::String;
        }

        if self.profile.raw_quotes.contains(&c) {
            self.pos += string_len(rest, c, None, true);
            return TokenKind::String;
        }

        if c.is_ascii_digit() {
            self.pos += number_len(rest);
            return TokenKind::Literal;
        }

        if self.profile.is_identifier_start(c) {
            let first = c.len_utf8();
            self.pos += first
                + byte_len_while(&rest[first..], |ch| self.profile.is_identifier_continue(ch));
            return TokenKind::Identifier;
        }

        if self.profile.is_open(c) {
            self.pos += c.len_utf8();
            return TokenKind::OpenDelimiter;
        }

        if self.profile.is_close(c) {
            self.pos += c.len_utf8();
            return TokenKind::CloseDelimiter;
        }

        let len = OPERATORS
            .iter()
            .find(|op| rest.starts_with(**op))
            .map(|op| op.len())
            .unwrap_or(c.len_utf8());
        self.pos += len;
        TokenKind::Operator
    }

    fn advance_position(&mut self, consumed: &str) {
        for ch in consumed.chars() {
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a, '_> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.pos >= self.text.len() {
            return None;
        }
        let start = self.pos;
        let (line, column) = (self.line, self.column);
        let kind = self.scan();
        let text = &self.text[start..self.pos];
        self.advance_position(text);
        Some(Token {
            kind,
            text,
            offset: start,
            line,
            column,
        })
    }
}

fn byte_len_while(s: &str, pred: impl Fn(char) -> bool) -> usize {
    s.char_indices()
        .find(|(_, c)| !pred(*c))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Length of a string literal starting at `s[0] == quote`.
///
/// Unterminated single-line strings end before the newline; unterminated
/// multi-line strings run to the end of input.
fn string_len(s: &str, quote: char, escape: Option<char>, multiline: bool) -> usize {
    let mut chars = s.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        if Some(c) == escape {
            chars.next();
        } else if c == quote {
            return i + c.len_utf8();
        } else if c == '\n' && !multiline {
            return i;
        }
    }
    s.len()
}

fn number_len(s: &str) -> usize {
    let bytes = s.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let fraction = b == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit);
        if b.is_ascii_alphanumeric() || b == b'_' || fraction {
            i += 1;
        } else {
            break;
        }
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds<'a>(text: &'a str, profile: &LanguageProfile) -> Vec<(TokenKind, &'a str)> {
        tokenize(text, profile)
            .into_iter()
            .filter(|t| t.kind != TokenKind::Whitespace)
            .map(|t| (t.kind, t.text))
            .collect()
    }

    fn profile(name: &str) -> &'static LanguageProfile {
        LanguageProfile::from_name(name).unwrap()
    }

    #[test]
    fn tokenizes_call_with_string() {
        use TokenKind::*;
        let toks = kinds("log(\"a, (b\", x)", profile("javascript"));
        assert_eq!(
            toks,
            vec![
                (Identifier, "log"),
                (OpenDelimiter, "("),
                (String, "\"a, (b\""),
                (Operator, ","),
                (Identifier, "x"),
                (CloseDelimiter, ")"),
            ]
        );
    }

    #[test]
    fn offsets_cover_input_exactly() {
        let text = "fn main() {\n    let x = a.unwrap()?; // done\n}\n";
        let toks = tokenize(text, profile("rust"));
        let mut expected = 0;
        for t in &toks {
            assert_eq!(t.offset, expected);
            assert_eq!(&text[t.offset..t.end()], t.text);
            expected = t.end();
        }
        assert_eq!(expected, text.len());
    }

    #[test]
    fn rust_macros_and_question_mark() {
        use TokenKind::*;
        let toks = kinds("dbg!(v)?", profile("rust"));
        assert_eq!(
            toks,
            vec![
                (Identifier, "dbg"),
                (Operator, "!"),
                (OpenDelimiter, "("),
                (Identifier, "v"),
                (CloseDelimiter, ")"),
                (Operator, "?"),
            ]
        );
    }

    #[test]
    fn rust_lifetimes_are_not_strings() {
        let toks = kinds("fn f<'a>(x: &'a str)", profile("rust"));
        assert!(toks.iter().all(|(k, _)| *k != TokenKind::String));
    }

    #[test]
    fn comments_per_profile() {
        let py = kinds("x = 1 # note", profile("python"));
        assert_eq!(py.last().unwrap(), &(TokenKind::Comment, "# note"));
        let c = kinds("a /* b ) */ c", profile("c"));
        assert_eq!(c[1], (TokenKind::Comment, "/* b ) */"));
        let generic = kinds("a # b", LanguageProfile::generic());
        assert!(generic.iter().all(|(k, _)| *k != TokenKind::Comment));
    }

    #[test]
    fn python_triple_quoted_strings() {
        let toks = kinds("s = \"\"\"a\n\"b\"\n\"\"\"", profile("python"));
        assert_eq!(toks.len(), 3);
        assert_eq!(toks[2].0, TokenKind::String);
    }

    #[test]
    fn operators_use_maximal_munch() {
        let toks = kinds("a == b != c => d", LanguageProfile::generic());
        let ops: Vec<_> = toks
            .iter()
            .filter(|(k, _)| *k == TokenKind::Operator)
            .map(|(_, t)| *t)
            .collect();
        assert_eq!(ops, vec!["==", "!=", "=>"]);
    }

    #[test]
    fn numbers_and_identifiers() {
        use TokenKind::*;
        let toks = kinds("x1 = 3.14 + 0xff", LanguageProfile::generic());
        assert_eq!(toks[0], (Identifier, "x1"));
        assert_eq!(toks[2], (Literal, "3.14"));
        assert_eq!(toks[4], (Literal, "0xff"));
    }

    #[test]
    fn tracks_lines_and_columns() {
        let toks = tokenize("a\n  b", LanguageProfile::generic());
        let b = toks.iter().find(|t| t.text == "b").unwrap();
        assert_eq!((b.line, b.column), (2, 3));
    }

    #[test]
    fn unterminated_string_stops_at_newline() {
        let toks = kinds("\"open\nnext", LanguageProfile::generic());
        assert_eq!(toks[0], (TokenKind::String, "\"open"));
        assert_eq!(toks[1], (TokenKind::Identifier, "next"));
    }

    #[test]
    fn unknown_characters_become_operators() {
        let toks = kinds("a @ b", LanguageProfile::generic());
        assert_eq!(toks[1], (TokenKind::Operator, "@"));
    }
}
