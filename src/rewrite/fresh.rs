//! Fresh identifier generation for `:[id()]` and `:[id(label)]`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Run-wide fresh identifier counter.
///
/// Clones share the counter, so ids stay unique across worker threads.
#[derive(Debug, Clone, Default)]
pub struct FreshIds {
    counter: Arc<AtomicU64>,
}

impl FreshIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next suffix, starting at 1.
    pub fn next(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Restart numbering. Intended for test isolation.
    pub fn reset(&self) {
        self.counter.store(0, Ordering::Relaxed);
    }

    /// Start a scope for rendering one match.
    pub fn scope<'s>(&'s self, taken: &'s HashSet<String>) -> FreshScope<'s> {
        FreshScope {
            ids: self,
            taken,
            labelled: HashMap::new(),
        }
    }
}

/// Fresh ids for one rendered match: equal labels share an id, unlabelled
/// references are always new.
#[derive(Debug)]
pub struct FreshScope<'s> {
    ids: &'s FreshIds,
    taken: &'s HashSet<String>,
    labelled: HashMap<String, String>,
}

impl FreshScope<'_> {
    pub fn get(&mut self, label: Option<&str>) -> String {
        match label {
            Some(label) => {
                if let Some(id) = self.labelled.get(label) {
                    return id.clone();
                }
                let id = self.generate(label);
                self.labelled.insert(label.to_string(), id.clone());
                id
            }
            None => self.generate("id"),
        }
    }

    fn generate(&self, prefix: &str) -> String {
        loop {
            let candidate = format!("{prefix}_{}", self.ids.next());
            if !self.taken.contains(&candidate) {
                return candidate;
            }
        }
    }
}

/// Identifier-like words in `text`, for collision avoidance.
pub fn identifiers(text: &str) -> HashSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_are_stable_within_a_scope() {
        let ids = FreshIds::new();
        let taken = HashSet::new();
        let mut scope = ids.scope(&taken);
        let a = scope.get(Some("tmp"));
        assert_eq!(scope.get(Some("tmp")), a);
        assert_ne!(scope.get(None), scope.get(None));

        let mut other = ids.scope(&taken);
        assert_ne!(other.get(Some("tmp")), a);
    }

    #[test]
    fn skips_taken_names_and_resets() {
        let ids = FreshIds::new();
        let taken = identifiers("let tmp_1 = tmp_2 + x;");
        let mut scope = ids.scope(&taken);
        assert_eq!(scope.get(Some("tmp")), "tmp_3");

        ids.reset();
        let none = HashSet::new();
        assert_eq!(ids.scope(&none).get(None), "id_1");
    }

    #[test]
    fn clones_share_the_counter() {
        let ids = FreshIds::new();
        let clone = ids.clone();
        assert_eq!(ids.next(), 1);
        assert_eq!(clone.next(), 2);
    }
}
