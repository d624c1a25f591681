//! AdapterRegistry: collection name → adapter

use super::traits::{CollectionKind, TableAdapter};
use crate::row::EDGE_ID_DELIMITER;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry key of the edge collection derived from `table.column`.
///
/// A table may carry several foreign keys, each giving its own collection.
pub fn edge_collection_name(table: &str, column: &str) -> String {
    format!("{}{}{}", table, EDGE_ID_DELIMITER, column)
}

/// The published set of collections, ordered by name.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn TableAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its own name, replacing any previous entry.
    pub fn register(&mut self, adapter: Arc<dyn TableAdapter>) {
        let name = adapter.name().to_string();
        if self.adapters.insert(name.clone(), adapter).is_some() {
            tracing::warn!(collection = %name, "replaced existing collection");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn TableAdapter>> {
        self.adapters.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.adapters.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.adapters.keys().cloned().collect()
    }

    /// Collection names of one kind.
    pub fn names_of(&self, kind: CollectionKind) -> Vec<String> {
        self.adapters
            .values()
            .filter(|a| a.kind() == kind)
            .map(|a| a.name().to_string())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn TableAdapter>)> {
        self.adapters.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("collections", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}
