use crate::pattern::hole::{is_name_continue, is_name_start};
use crate::rules::ast::{Arm, ArmPattern, Atom, Rule};
use crate::rules::errors::RuleError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Hole(String),
    Quoted(String),
    Word(String),
    EqEq,
    NotEq,
    AndAnd,
    OrOr,
    Arrow,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Pipe,
    Comma,
}

#[derive(Debug, Clone)]
struct Lexeme<'t> {
    kind: Kind,
    raw: &'t str,
    offset: usize,
}

const PUNCT: &[(&str, Kind)] = &[
    ("==", Kind::EqEq),
    ("!=", Kind::NotEq),
    ("&&", Kind::AndAnd),
    ("||", Kind::OrOr),
    ("->", Kind::Arrow),
    ("(", Kind::LParen),
    (")", Kind::RParen),
    ("{", Kind::LBrace),
    ("}", Kind::RBrace),
    ("|", Kind::Pipe),
    (",", Kind::Comma),
];

fn is_word_char(rest: &str) -> bool {
    match rest.chars().next() {
        Some(c) if c.is_whitespace() || "(){}|,\"".contains(c) => false,
        Some(_) => !PUNCT.iter().any(|(p, _)| p.len() == 2 && rest.starts_with(p)),
        None => false,
    }
}

fn lex(text: &str) -> Result<Vec<Lexeme<'_>>, RuleError> {
    let mut out = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let rest = &text[pos..];
        let Some(c) = rest.chars().next() else {
            break;
        };

        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }

        let (kind, len) = if rest.starts_with(":[") {
            hole_ref(rest, pos)?
        } else if c == '"' {
            quoted(rest, pos)?
        } else if let Some((p, kind)) = PUNCT.iter().find(|(p, _)| rest.starts_with(p)) {
            (kind.clone(), p.len())
        } else {
            let mut len = 0;
            while is_word_char(&rest[len..]) {
                len += rest[len..].chars().next().map_or(1, char::len_utf8);
            }
            if len == 0 {
                len = c.len_utf8();
            }
            (Kind::Word(rest[..len].to_string()), len)
        };

        out.push(Lexeme {
            kind,
            raw: &text[pos..pos + len],
            offset: pos,
        });
        pos += len;
    }

    Ok(out)
}

/// `:[name]` or `:[[name]]`.
fn hole_ref(rest: &str, offset: usize) -> Result<(Kind, usize), RuleError> {
    let (inner, open, close) = match rest.strip_prefix(":[[") {
        Some(inner) => (inner, 3, "]]"),
        None => (&rest[2..], 2, "]"),
    };
    let end = inner
        .find(close)
        .ok_or(RuleError::MalformedHole { offset })?;
    let name = &inner[..end];
    let mut chars = name.chars();
    if !chars.next().is_some_and(is_name_start) || !chars.all(is_name_continue) {
        return Err(RuleError::MalformedHole { offset });
    }
    Ok((Kind::Hole(name.to_string()), open + end + close.len()))
}

fn quoted(rest: &str, offset: usize) -> Result<(Kind, usize), RuleError> {
    let mut value = String::new();
    let mut chars = rest.char_indices().skip(1);
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(escaped),
                None => break,
            },
            '"' => return Ok((Kind::Quoted(value), i + 1)),
            _ => value.push(c),
        }
    }
    Err(RuleError::UnterminatedString { offset })
}

struct Parser<'t> {
    lexemes: Vec<Lexeme<'t>>,
    pos: usize,
}

impl<'t> Parser<'t> {
    fn peek(&self) -> Option<&Kind> {
        self.lexemes.get(self.pos).map(|l| &l.kind)
    }

    fn peek_word(&self) -> Option<&str> {
        match self.peek() {
            Some(Kind::Word(w)) => Some(w),
            _ => None,
        }
    }

    fn eat(&mut self, kind: &Kind) -> bool {
        if self.peek() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &'static str) -> RuleError {
        match self.lexemes.get(self.pos) {
            Some(l) => RuleError::UnexpectedToken {
                offset: l.offset,
                found: l.raw.to_string(),
                expected,
            },
            None => RuleError::UnexpectedEnd { expected },
        }
    }

    fn expect(&mut self, kind: &Kind, expected: &'static str) -> Result<(), RuleError> {
        if self.eat(kind) {
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expr(&mut self) -> Result<Rule, RuleError> {
        let mut rule = self.and()?;
        while self.eat(&Kind::OrOr) {
            rule = Rule::Or(Box::new(rule), Box::new(self.and()?));
        }
        Ok(rule)
    }

    fn and(&mut self) -> Result<Rule, RuleError> {
        let mut rule = self.unary()?;
        while self.eat(&Kind::AndAnd) {
            rule = Rule::And(Box::new(rule), Box::new(self.unary()?));
        }
        Ok(rule)
    }

    fn unary(&mut self) -> Result<Rule, RuleError> {
        if self.peek_word() == Some("not") {
            self.pos += 1;
            return Ok(Rule::Not(Box::new(self.unary()?)));
        }
        self.primary()
    }

    fn followed_by_comparison(&self) -> bool {
        matches!(
            self.lexemes.get(self.pos + 1).map(|l| &l.kind),
            Some(Kind::EqEq | Kind::NotEq)
        )
    }

    fn primary(&mut self) -> Result<Rule, RuleError> {
        if self.eat(&Kind::LParen) {
            let rule = self.expr()?;
            self.expect(&Kind::RParen, "')'")?;
            return Ok(rule);
        }

        match self.peek_word() {
            Some(w @ ("true" | "false")) if !self.followed_by_comparison() => {
                let value = w == "true";
                self.pos += 1;
                return Ok(Rule::Bool(value));
            }
            Some("match") if !self.followed_by_comparison() => return self.match_case(),
            _ => {}
        }

        let left = self.atom()?;
        let equal = if self.eat(&Kind::EqEq) {
            true
        } else if self.eat(&Kind::NotEq) {
            false
        } else {
            return Err(self.unexpected("'==' or '!='"));
        };
        let right = self.atom()?;
        Ok(if equal {
            Rule::Equals(left, right)
        } else {
            Rule::NotEquals(left, right)
        })
    }

    fn match_case(&mut self) -> Result<Rule, RuleError> {
        let offset = self.lexemes[self.pos].offset;
        self.pos += 1;
        let subject = self.atom()?;
        self.expect(&Kind::LBrace, "'{'")?;

        let mut arms = Vec::new();
        while self.eat(&Kind::Pipe) {
            let pattern = if self.peek_word() == Some("_") {
                self.pos += 1;
                ArmPattern::Wildcard
            } else {
                ArmPattern::Atom(self.atom()?)
            };
            self.expect(&Kind::Arrow, "'->'")?;
            let body = self.expr()?;
            arms.push(Arm { pattern, body });
        }
        if arms.is_empty() && self.peek() == Some(&Kind::RBrace) {
            return Err(RuleError::NoArms { offset });
        }
        self.expect(&Kind::RBrace, "'|' or '}'")?;

        Ok(Rule::MatchesCase { subject, arms })
    }

    fn atom(&mut self) -> Result<Atom, RuleError> {
        let atom = match self.peek() {
            Some(Kind::Hole(name)) => Atom::Hole(name.clone()),
            Some(Kind::Quoted(text)) => Atom::Quoted(text.clone()),
            Some(Kind::Word(word)) => Atom::Word(word.clone()),
            _ => return Err(self.unexpected("a hole, string or word")),
        };
        self.pos += 1;
        Ok(atom)
    }
}

impl Rule {
    /// Parse a `where` clause. The leading `where` keyword is optional and
    /// comma-separated conditions are conjoined.
    pub fn parse(text: &str) -> Result<Rule, RuleError> {
        let lexemes = lex(text)?;
        let mut parser = Parser { lexemes, pos: 0 };
        if parser.peek_word() == Some("where") {
            parser.pos += 1;
        }
        if parser.peek().is_none() {
            return Err(RuleError::Empty);
        }

        let mut rule = parser.expr()?;
        while parser.eat(&Kind::Comma) {
            rule = Rule::And(Box::new(rule), Box::new(parser.expr()?));
        }
        if parser.peek().is_some() {
            return Err(parser.unexpected("',' or end of rule"));
        }
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hole(name: &str) -> Atom {
        Atom::Hole(name.into())
    }

    #[test]
    fn parses_equality_with_optional_where() {
        let expected = Rule::Equals(hole("x"), hole("y"));
        assert_eq!(Rule::parse(":[x] == :[y]").unwrap(), expected);
        assert_eq!(Rule::parse("where :[x] == :[y]").unwrap(), expected);
    }

    #[test]
    fn commas_conjoin() {
        let rule = Rule::parse("where :[a] != \"\", :[b] == foo").unwrap();
        assert_eq!(
            rule,
            Rule::And(
                Box::new(Rule::NotEquals(hole("a"), Atom::Quoted(String::new()))),
                Box::new(Rule::Equals(hole("b"), Atom::Word("foo".into()))),
            )
        );
    }

    #[test]
    fn precedence_and_not() {
        let rule = Rule::parse("not :[a] == x || :[b] == y && true").unwrap();
        let Rule::Or(left, right) = rule else {
            panic!("expected ||");
        };
        assert!(matches!(*left, Rule::Not(_)));
        assert!(matches!(*right, Rule::And(_, _)));
    }

    #[test]
    fn match_arms() {
        let rule = Rule::parse(
            r#"where match :[lvl] { | "warn" -> true | :[other] -> false | _ -> :[x] == y }"#,
        )
        .unwrap();
        let Rule::MatchesCase { subject, arms } = &rule else {
            panic!("expected match");
        };
        assert_eq!(subject, &hole("lvl"));
        assert_eq!(arms.len(), 3);
        assert_eq!(arms[2].pattern, ArmPattern::Wildcard);
        assert_eq!(rule.holes(), ["lvl", "other", "x"]);
    }

    #[test]
    fn quoted_escapes() {
        let rule = Rule::parse(r#":[s] == "a \"b\"""#).unwrap();
        assert_eq!(rule, Rule::Equals(hole("s"), Atom::Quoted("a \"b\"".into())));
    }

    #[test]
    fn reports_errors_with_offsets() {
        assert_eq!(Rule::parse("where "), Err(RuleError::Empty));
        assert!(matches!(
            Rule::parse(":[x] = y"),
            Err(RuleError::UnexpectedToken { offset: 5, .. })
        ));
        assert_eq!(
            Rule::parse(":[x] == \"open"),
            Err(RuleError::UnterminatedString { offset: 8 })
        );
        assert_eq!(
            Rule::parse(":[x == y"),
            Err(RuleError::MalformedHole { offset: 0 })
        );
        assert!(matches!(
            Rule::parse(":[x] =="),
            Err(RuleError::UnexpectedEnd { .. })
        ));
        assert_eq!(
            Rule::parse("match :[x] { }"),
            Err(RuleError::NoArms { offset: 0 })
        );
    }
}
