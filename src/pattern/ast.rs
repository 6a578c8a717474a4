use std::fmt;

/// What a hole is allowed to capture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HoleKind {
    /// `:[x]`: any balanced span, shortest first, possibly empty
    Generic,
    /// `:[[x]]`: exactly one identifier token
    Identifier,
    /// `:[x:e]`: one balanced expression
    Expression,
    /// `...` or `:[_]`: like `Generic`, never bound
    Anonymous,
    /// `:[id()]` / `:[id(label)]`: produced at rewrite time only
    FreshId { label: Option<String> },
}

impl fmt::Display for HoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoleKind::Generic => f.write_str("generic hole"),
            HoleKind::Identifier => f.write_str("identifier hole"),
            HoleKind::Expression => f.write_str("expression hole"),
            HoleKind::Anonymous => f.write_str("anonymous hole"),
            HoleKind::FreshId { .. } => f.write_str("fresh identifier"),
        }
    }
}

/// Whether a hole binds a name or constrains an earlier binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Occurrence {
    First,
    Repeat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hole {
    /// `None` for anonymous holes
    pub name: Option<String>,
    pub kind: HoleKind,
    pub occurrence: Occurrence,
    /// Byte offset of the hole in the template
    pub offset: usize,
}

impl Hole {
    pub fn is_bound(&self) -> bool {
        self.name.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternNode {
    /// Raw template text; matched token by token, whitespace-insensitively
    Literal(String),
    Hole(Hole),
    Sequence(Vec<PatternNode>),
    /// A delimiter pair whose body must match inside the source pair
    Balanced {
        open: char,
        body: Box<PatternNode>,
        close: char,
    },
    /// A string literal containing holes; matches one source string token
    Quoted { quote: char, parts: Vec<QuotedPart> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotedPart {
    Text(String),
    Hole(Hole),
}

impl PatternNode {
    /// Visit every hole in template order.
    pub fn holes(&self) -> Vec<&Hole> {
        let mut out = Vec::new();
        self.collect_holes(&mut out);
        out
    }

    fn collect_holes<'a>(&'a self, out: &mut Vec<&'a Hole>) {
        match self {
            PatternNode::Literal(_) => {}
            PatternNode::Hole(hole) => out.push(hole),
            PatternNode::Sequence(nodes) => nodes.iter().for_each(|n| n.collect_holes(out)),
            PatternNode::Balanced { body, .. } => body.collect_holes(out),
            PatternNode::Quoted { parts, .. } => {
                for part in parts {
                    if let QuotedPart::Hole(hole) = part {
                        out.push(hole);
                    }
                }
            }
        }
    }
}

/// A compiled match template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub(crate) source: String,
    pub(crate) root: PatternNode,
    pub(crate) variables: Vec<String>,
}

impl Pattern {
    /// The template text this pattern was compiled from.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &PatternNode {
        &self.root
    }

    /// Names bound by this pattern, in first-occurrence order.
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn binds(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }

    pub fn has_holes(&self) -> bool {
        !self.root.holes().is_empty()
    }
}
