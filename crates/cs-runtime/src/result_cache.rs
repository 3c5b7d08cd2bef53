use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolveCacheKey {
    pub id: String,
    pub text: String,
}

impl ResolveCacheKey {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// Resolution results keyed by (self id, script text). One lives on every entity, one more on
/// the resolver for resolutions without an entity.
#[derive(Debug, Default)]
pub struct ResolveCache {
    entries: RwLock<HashMap<ResolveCacheKey, String>>,
}

impl ResolveCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ResolveCacheKey) -> Option<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Stores `value` unless an entry already exists, and returns whichever is stored.
    pub fn insert_if_absent(&self, key: ResolveCacheKey, value: String) -> String {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(value)
            .clone()
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod result_cache_tests {
    use super::*;

    #[test]
    fn first_insert_wins_and_ids_are_independent() {
        let cache = ResolveCache::new();
        let key = ResolveCacheKey::new("a", "$st");
        assert_eq!(cache.insert_if_absent(key.clone(), "1".to_string()), "1");
        assert_eq!(cache.insert_if_absent(key.clone(), "2".to_string()), "1");
        assert_eq!(cache.get(&key).as_deref(), Some("1"));
        assert_eq!(cache.get(&ResolveCacheKey::new("b", "$st")), None);

        cache.insert_if_absent(ResolveCacheKey::new("b", "$st"), "3".to_string());
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
