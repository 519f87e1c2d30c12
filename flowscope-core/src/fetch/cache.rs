//! Caller-owned cache of process graphs by definition id.
//!
//! Process graphs change only on redeployment, which produces a new
//! definition id, so entries stay valid until the caller invalidates them.
//! There is no global cache: whoever owns the [`DefinitionCache`] decides
//! when to call [`DefinitionCache::force_refresh`].

use crate::graph::ProcessGraph;
use std::collections::{HashMap, VecDeque};

/// Bounded map of definition id to [`ProcessGraph`]; the oldest insertion
/// is evicted first.
#[derive(Debug, Clone)]
pub struct DefinitionCache {
    capacity: usize,
    graphs: HashMap<String, ProcessGraph>,
    insertion_order: VecDeque<String>,
}

impl DefinitionCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            graphs: HashMap::new(),
            insertion_order: VecDeque::new(),
        }
    }

    pub fn get(&self, definition_id: &str) -> Option<&ProcessGraph> {
        self.graphs.get(definition_id)
    }

    pub fn insert(&mut self, definition_id: impl Into<String>, graph: ProcessGraph) {
        let definition_id = definition_id.into();
        if self.graphs.insert(definition_id.clone(), graph).is_some() {
            return;
        }

        self.insertion_order.push_back(definition_id);
        while self.graphs.len() > self.capacity {
            let Some(oldest) = self.insertion_order.pop_front() else {
                break;
            };
            self.graphs.remove(&oldest);
            tracing::debug!(definition_id = %oldest, "Evicted cached process graph");
        }
    }

    /// Drop one definition. Returns whether it was cached.
    pub fn invalidate(&mut self, definition_id: &str) -> bool {
        self.insertion_order.retain(|id| id != definition_id);
        self.graphs.remove(definition_id).is_some()
    }

    /// Drop every cached graph.
    pub fn force_refresh(&mut self) {
        self.graphs.clear();
        self.insertion_order.clear();
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}

impl Default for DefinitionCache {
    fn default() -> Self {
        Self::new(crate::config::ReplayConfig::default().definition_cache_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(id: &str) -> ProcessGraph {
        let mut graph = ProcessGraph::new();
        graph.definition_id = Some(id.to_string());
        graph
    }

    #[test]
    fn test_insert_and_get() {
        let mut cache = DefinitionCache::new(4);
        cache.insert("review:1:1", graph("review:1:1"));

        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get("review:1:1").unwrap().definition_id.as_deref(),
            Some("review:1:1")
        );
        assert!(cache.get("review:2:9").is_none());
    }

    #[test]
    fn test_evicts_oldest() {
        let mut cache = DefinitionCache::new(2);
        cache.insert("a", graph("a"));
        cache.insert("b", graph("b"));
        cache.insert("a", graph("a"));
        cache.insert("c", graph("c"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("a").is_none());
        assert!(cache.get("b").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_invalidate_and_force_refresh() {
        let mut cache = DefinitionCache::new(4);
        cache.insert("a", graph("a"));
        cache.insert("b", graph("b"));

        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert_eq!(cache.len(), 1);

        cache.force_refresh();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_default_capacity_from_config() {
        let cache = DefinitionCache::default();
        assert_eq!(cache.capacity, 32);
    }
}
