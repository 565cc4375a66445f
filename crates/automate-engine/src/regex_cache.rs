use std::{num::NonZeroUsize, sync::Arc};

use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;

/// Default maximum number of cached compiled regexes.
const DEFAULT_CAPACITY: usize = 128;

/// Thread-safe, size-bounded cache of whole-string matchers.
///
/// Patterns are anchored on compile, so `text.*` matches `"textView"` but `ext` does not.
pub struct RegexCache {
    map: Mutex<LruCache<String, Arc<Regex>>>,
}

impl Default for RegexCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RegexCache {
    /// Create a new cache with default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new cache with a specific capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            map: Mutex::new(LruCache::new(cap)),
        }
    }

    /// Get the anchored matcher for `pattern`, compiling and caching on miss.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Arc<Regex>, regex::Error> {
        if let Some(found) = self.map.lock().get(pattern).cloned() {
            return Ok(found);
        }

        // Compile outside the lock so slow patterns do not block other lookups.
        let compiled = Arc::new(Regex::new(&format!("^(?:{pattern})$"))?);

        let mut guard = self.map.lock();
        if let Some(found) = guard.get(pattern).cloned() {
            return Ok(found);
        }
        guard.put(pattern.to_string(), compiled.clone());
        Ok(compiled)
    }

    /// Whether `haystack` matches `pattern` in full. Invalid patterns never match.
    pub fn is_full_match(&self, pattern: &str, haystack: &str) -> bool {
        match self.get_or_compile(pattern) {
            Ok(re) => re.is_match(haystack),
            Err(err) => {
                tracing::debug!(target: "automate::selector", pattern, %err, "invalid regex");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_are_anchored() {
        let cache = RegexCache::new();
        assert!(cache.is_full_match("text.*", "textView"));
        assert!(!cache.is_full_match("ext", "textView"));
        assert!(cache.is_full_match("a|b", "b"));
    }

    #[test]
    fn invalid_pattern_never_matches() {
        let cache = RegexCache::new();
        assert!(!cache.is_full_match("(", "("));
        assert!(cache.get_or_compile("(").is_err());
    }

    #[test]
    fn compiled_patterns_are_shared() {
        let cache = RegexCache::with_capacity(0);
        let a = cache.get_or_compile("ok").unwrap();
        let b = cache.get_or_compile("ok").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
