//! Thread-local cache of compiled patterns.
//!
//! Every file of a batch compiles the same rule patterns against its
//! language profile; the cache makes that a lookup after the first file
//! per worker thread. Capped at 256 entries; the cache is cleared when full.

use crate::lang::LanguageProfile;
use crate::pattern::{CompileError, Pattern};
use std::cell::RefCell;
use std::collections::HashMap;

const MAX_CACHE_ENTRIES: usize = 256;

thread_local! {
    // Keyed by "<profile>:<pattern>": quote and delimiter sets differ per
    // profile, so one pattern text can compile differently.
    static PATTERN_CACHE: RefCell<HashMap<String, Pattern>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled pattern from the cache, or compile and cache it.
///
/// Compile errors are not cached.
pub fn get_or_compile(pattern: &str, profile: &LanguageProfile) -> Result<Pattern, CompileError> {
    let cache_key = format!("{}:{}", profile.name, pattern);

    PATTERN_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(p) = cache.get(&cache_key) {
            return Ok(p.clone());
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Pattern::compile(pattern, profile)?;
        cache.insert(cache_key, compiled.clone());
        Ok(compiled)
    })
}

/// Clear this thread's cache.
pub fn clear_cache() {
    PATTERN_CACHE.with(|cache| {
        cache.borrow_mut().clear();
    });
}

pub fn cache_size() -> usize {
    PATTERN_CACHE.with(|cache| cache.borrow().len())
}
