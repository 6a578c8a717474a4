/// An operand in a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Atom {
    /// `:[name]`: the value bound to `name`
    Hole(String),
    /// `"text"` with the quotes removed
    Quoted(String),
    /// An unquoted word, compared as written
    Word(String),
}

/// Left-hand side of a `match` arm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArmPattern {
    Atom(Atom),
    /// `_`
    Wildcard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arm {
    pub pattern: ArmPattern,
    pub body: Rule,
}

/// A boolean predicate over a match environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Equals(Atom, Atom),
    NotEquals(Atom, Atom),
    /// `match subject { | pattern -> rule ... }`
    MatchesCase { subject: Atom, arms: Vec<Arm> },
    And(Box<Rule>, Box<Rule>),
    Or(Box<Rule>, Box<Rule>),
    Not(Box<Rule>),
    Bool(bool),
}

impl Rule {
    /// Hole names referenced anywhere in the rule, first occurrence first.
    pub fn holes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_holes(&mut out);
        out
    }

    fn collect_holes<'r>(&'r self, out: &mut Vec<&'r str>) {
        match self {
            Rule::Equals(a, b) | Rule::NotEquals(a, b) => {
                push_hole(a, out);
                push_hole(b, out);
            }
            Rule::MatchesCase { subject, arms } => {
                push_hole(subject, out);
                for arm in arms {
                    if let ArmPattern::Atom(atom) = &arm.pattern {
                        push_hole(atom, out);
                    }
                    arm.body.collect_holes(out);
                }
            }
            Rule::And(a, b) | Rule::Or(a, b) => {
                a.collect_holes(out);
                b.collect_holes(out);
            }
            Rule::Not(inner) => inner.collect_holes(out),
            Rule::Bool(_) => {}
        }
    }
}

fn push_hole<'r>(atom: &'r Atom, out: &mut Vec<&'r str>) {
    if let Atom::Hole(name) = atom {
        if !out.contains(&name.as_str()) {
            out.push(name);
        }
    }
}
