//! Named registries for bindings, rules and providers.
//!
//! Registration happens at setup and lookups on every route, so entries sit
//! behind a read-write lock and are handed out as shared `Arc`s. Stored
//! values are never mutated; re-registering a name replaces the entry.

use crate::chunking::ChunkingConfig;
use crate::error::{Result, RouterError};
use datasource::{DataSource, SourceKind, StoreConfig};
use llm::ModelConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::OnceCell;

/// A named model and chunking configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDefinition {
    pub name: String,
    pub model_config: ModelConfig,
    pub chunking_config: ChunkingConfig,
}

/// A named data source configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSourceBinding {
    pub label: String,
    pub source_kind: SourceKind,
    pub store_config: StoreConfig,
}

/// A binding plus its adapter, connected on first fetch.
pub(crate) struct BindingEntry {
    pub binding: DataSourceBinding,
    pub source: OnceCell<Arc<dyn DataSource>>,
}

impl BindingEntry {
    pub fn new(binding: DataSourceBinding) -> Self {
        Self {
            binding,
            source: OnceCell::new(),
        }
    }
}

/// Thread-safe map from name to shared entry.
pub struct Registry<T: ?Sized> {
    entity: &'static str,
    entries: Arc<RwLock<HashMap<String, Arc<T>>>>,
}

impl<T: ?Sized> Registry<T> {
    /// Create an empty registry; `entity` names the entries in errors.
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert or replace an entry, returning the replaced one.
    pub fn register(&self, name: impl Into<String>, entry: Arc<T>) -> Option<Arc<T>> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(name.into(), entry)
    }

    /// Replace the entry under `name` only if it is still `current`.
    /// Returns false when the name was re-registered or removed meanwhile.
    pub fn replace_if_current(&self, name: &str, current: &Arc<T>, replacement: Arc<T>) -> bool {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        match entries.get_mut(name) {
            Some(entry) if Arc::ptr_eq(entry, current) => {
                *entry = replacement;
                true
            }
            _ => false,
        }
    }

    /// Look up an entry, failing with `NotFound`.
    pub fn get(&self, name: &str) -> Result<Arc<T>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(name)
            .cloned()
            .ok_or_else(|| RouterError::not_found(self.entity, name))
    }

    pub fn contains(&self, name: &str) -> bool {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Arc<T>> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = entries.keys().cloned().collect();
        names.sort();
        names
    }

    /// All entries, sorted by name.
    pub fn entries(&self) -> Vec<(String, Arc<T>)> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        let mut all: Vec<(String, Arc<T>)> = entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ?Sized> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            entity: self.entity,
            entries: self.entries.clone(),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entity", &self.entity)
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let registry: Registry<String> = Registry::new("rule");
        assert!(registry.is_empty());

        assert!(registry.register("a", Arc::new("one".to_string())).is_none());
        assert_eq!(*registry.get("a").unwrap(), "one");
        assert!(registry.contains("a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reregister_overwrites() {
        let registry: Registry<String> = Registry::new("rule");
        registry.register("a", Arc::new("one".to_string()));
        let old = registry.register("a", Arc::new("two".to_string()));

        assert_eq!(old.as_deref().map(String::as_str), Some("one"));
        assert_eq!(*registry.get("a").unwrap(), "two");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_missing_is_not_found() {
        let registry: Registry<String> = Registry::new("binding");
        match registry.get("nope") {
            Err(RouterError::NotFound { entity, name }) => {
                assert_eq!(entity, "binding");
                assert_eq!(name, "nope");
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_names_sorted_and_remove() {
        let registry: Registry<u32> = Registry::new("rule");
        registry.register("b", Arc::new(2));
        registry.register("a", Arc::new(1));
        registry.register("c", Arc::new(3));

        assert_eq!(registry.names(), vec!["a", "b", "c"]);
        assert_eq!(registry.remove("b").map(|v| *v), Some(2));
        assert!(registry.remove("b").is_none());
        assert_eq!(registry.entries().len(), 2);
    }

    #[test]
    fn test_replace_if_current() {
        let registry: Registry<String> = Registry::new("binding");
        let first = Arc::new("first".to_string());
        registry.register("a", first.clone());

        assert!(registry.replace_if_current("a", &first, Arc::new("fresh".to_string())));
        assert_eq!(*registry.get("a").unwrap(), "fresh");

        // A newer registration is left alone.
        registry.register("a", Arc::new("newer".to_string()));
        assert!(!registry.replace_if_current("a", &first, Arc::new("stale".to_string())));
        assert_eq!(*registry.get("a").unwrap(), "newer");

        assert!(!registry.replace_if_current("missing", &first, Arc::new("x".to_string())));
        assert!(!registry.contains("missing"));
    }

    #[test]
    fn test_clone_shares_entries() {
        let registry: Registry<u32> = Registry::new("rule");
        let clone = registry.clone();
        clone.register("x", Arc::new(7));
        assert!(registry.contains("x"));
    }
}
