//! # Entity Type Registry
//!
//! Maps `entity-type` tags to the [`EntityShape`] used to decode them.
//!
//! The registry is an owned value handed to the converter at construction. Clones share the
//! same underlying map, so an entity registered through one handle is visible to every
//! converter built from it, while two registries created with [`EntityRegistry::new`] stay
//! fully isolated.
use super::{
    ENTITY_TYPE_DOCUMENT, ENTITY_TYPE_DOCUMENTS, ENTITY_TYPE_RECORDSET, ENTITY_TYPE_USER,
    EntityShape,
};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Clone)]
pub struct EntityRegistry {
    entries: Arc<RwLock<HashMap<String, EntityShape>>>,
}

impl EntityRegistry {
    /// Creates a registry seeded with the built-in entities:
    /// `document`, `documents`, `recordSet` and `user`.
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register(ENTITY_TYPE_DOCUMENT, EntityShape::Document);
        registry.register(ENTITY_TYPE_DOCUMENTS, EntityShape::Documents);
        registry.register(ENTITY_TYPE_RECORDSET, EntityShape::RecordSet);
        registry.register(ENTITY_TYPE_USER, EntityShape::User);
        registry
    }

    /// Creates a registry with no entries at all.
    pub fn empty() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Registers `shape` for `entity_type`, replacing any previous registration.
    pub fn register(&self, entity_type: impl Into<String>, shape: EntityShape) {
        // Entries are inserted whole, a poisoned lock never holds a partial write.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(entity_type.into(), shape);
    }

    pub fn lookup(&self, entity_type: &str) -> Option<EntityShape> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(entity_type).copied()
    }

    /// Lists the registered tags, sorted.
    pub fn entity_types(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut tags: Vec<String> = entries.keys().cloned().collect();
        tags.sort();
        tags
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

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_builtin_entities() {
        let registry = EntityRegistry::new();
        assert_eq!(registry.lookup("document"), Some(EntityShape::Document));
        assert_eq!(registry.lookup("documents"), Some(EntityShape::Documents));
        assert_eq!(registry.lookup("recordSet"), Some(EntityShape::RecordSet));
        assert_eq!(registry.lookup("user"), Some(EntityShape::User));
        assert_eq!(registry.lookup("group"), None);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_register_round_trip() {
        let registry = EntityRegistry::new();
        registry.register("workflow", EntityShape::Workflow);
        assert_eq!(registry.lookup("workflow"), Some(EntityShape::Workflow));
    }

    #[test]
    fn test_register_overwrites() {
        let registry = EntityRegistry::new();
        registry.register("widget", EntityShape::Generic);
        registry.register("widget", EntityShape::Document);

        assert_eq!(registry.lookup("widget"), Some(EntityShape::Document));
        assert_eq!(
            registry
                .entity_types()
                .iter()
                .filter(|t| *t == "widget")
                .count(),
            1
        );
    }

    #[test]
    fn test_clones_share_entries_but_new_registries_are_isolated() {
        let registry = EntityRegistry::new();
        let shared = registry.clone();
        let isolated = EntityRegistry::new();

        shared.register("group", EntityShape::Group);

        assert_eq!(registry.lookup("group"), Some(EntityShape::Group));
        assert_eq!(isolated.lookup("group"), None);
    }

    #[test]
    fn test_concurrent_register_and_lookup() {
        let registry = EntityRegistry::new();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for j in 0..100 {
                        registry.register(format!("tag-{i}-{j}"), EntityShape::Generic);
                        assert_eq!(registry.lookup("document"), Some(EntityShape::Document));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 4 + 8 * 100);
    }
}
