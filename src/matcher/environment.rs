use crate::position::Range;
use serde::Serialize;

/// One hole's captured text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub variable: String,
    pub value: String,
    pub range: Range,
}

/// Hole bindings of one match, in first-occurrence order of the pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Environment {
    bindings: Vec<Binding>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a binding. A name that is already bound keeps its first value.
    pub fn insert(&mut self, binding: Binding) {
        if self.get(&binding.variable).is_none() {
            self.bindings.push(binding);
        }
    }

    pub fn get(&self, variable: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.variable == variable)
    }

    /// Captured text of `variable`.
    pub fn value(&self, variable: &str) -> Option<&str> {
        self.get(variable).map(|b| b.value.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Binding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl<'e> IntoIterator for &'e Environment {
    type Item = &'e Binding;
    type IntoIter = std::slice::Iter<'e, Binding>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// A successful match of a pattern against source text.
///
/// Serializes as `{"range", "environment", "matched"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Match {
    pub range: Range,
    pub environment: Environment,
    pub matched: String,
}

impl Match {
    pub fn byte_start(&self) -> usize {
        self.range.start.offset
    }

    pub fn byte_end(&self) -> usize {
        self.range.end.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::LineIndex;

    #[test]
    fn first_binding_wins_and_order_is_kept() {
        let index = LineIndex::new("a b c");
        let mut env = Environment::new();
        for (name, value, at) in [("b", "b", 2), ("a", "a", 0), ("b", "c", 4)] {
            env.insert(Binding {
                variable: name.into(),
                value: value.into(),
                range: index.range(at, at + 1),
            });
        }
        let names: Vec<_> = env.iter().map(|b| b.variable.as_str()).collect();
        assert_eq!(names, ["b", "a"]);
        assert_eq!(env.value("b"), Some("b"));
        assert_eq!(env.value("zz"), None);
    }

    #[test]
    fn serializes_with_stable_field_names() {
        let index = LineIndex::new("f(x)");
        let mut environment = Environment::new();
        environment.insert(Binding {
            variable: "args".into(),
            value: "x".into(),
            range: index.range(2, 3),
        });
        let m = Match {
            range: index.range(0, 4),
            environment,
            matched: "f(x)".into(),
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["matched"], "f(x)");
        assert_eq!(json["range"]["start"]["offset"], 0);
        assert_eq!(json["range"]["end"]["column"], 5);
        assert_eq!(json["environment"][0]["variable"], "args");
        assert_eq!(json["environment"][0]["value"], "x");
        assert_eq!(json["environment"][0]["range"]["start"]["offset"], 2);
    }
}
