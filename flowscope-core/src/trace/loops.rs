//! Revisit/loop classification of traversed edges.
//!
//! Walks an [`OrderedTrace`] keeping the set of node ids seen so far. An edge
//! whose target node is already in that set when the edge is taken is a
//! loop-back; anything else is a normal transition.
//!
//! The result covers the whole trace and does not depend on the replay
//! cursor: the cursor only decides which edges are shown.

use super::OrderedTrace;
use crate::graph::ProcessGraph;
use crate::types::{EdgeState, ReconcileWarning};
use std::collections::{BTreeMap, HashSet};

/// Per-edge classification for a full trace.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoopClassification {
    states: BTreeMap<String, EdgeState>,
    /// Edges whose target could not be resolved
    pub warnings: Vec<ReconcileWarning>,
}

impl LoopClassification {
    /// Classification of an edge. Edges never seen in the trace are normal.
    pub fn state(&self, edge_id: &str) -> EdgeState {
        self.states
            .get(edge_id)
            .copied()
            .unwrap_or(EdgeState::NormalDone)
    }

    pub fn states(&self) -> &BTreeMap<String, EdgeState> {
        &self.states
    }

    /// Ids of edges classified as loop-backs.
    pub fn loop_backs(&self) -> impl Iterator<Item = &str> {
        self.states
            .iter()
            .filter(|(_, state)| **state == EdgeState::LoopBack)
            .map(|(id, _)| id.as_str())
    }
}

/// Classify every edge record of `trace`.
///
/// An edge traversed more than once keeps the classification of its first
/// traversal. Without a graph, or when the graph does not know the edge,
/// the edge is [`EdgeState::NormalDone`] and an
/// [`ReconcileWarning::UnresolvedEdgeTarget`] is recorded once per edge.
pub fn classify_loops(trace: &OrderedTrace, graph: Option<&ProcessGraph>) -> LoopClassification {
    let mut visited: HashSet<&str> = HashSet::new();
    let mut result = LoopClassification::default();

    for record in trace {
        if record.is_node() {
            visited.insert(record.activity_id.as_str());
            continue;
        }
        if !record.is_edge() || result.states.contains_key(&record.activity_id) {
            continue;
        }

        let target = graph.and_then(|g| g.edge_target(&record.activity_id));
        let state = match target {
            Some(target) if visited.contains(target) => EdgeState::LoopBack,
            Some(_) => EdgeState::NormalDone,
            None => {
                tracing::warn!(
                    edge_id = %record.activity_id,
                    process_definition_id = %record.process_definition_id,
                    "Edge target not found in process graph; treating as normal transition"
                );
                result.warnings.push(ReconcileWarning::UnresolvedEdgeTarget {
                    edge_id: record.activity_id.clone(),
                });
                EdgeState::NormalDone
            }
        };

        result.states.insert(record.activity_id.clone(), state);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphEdge;
    use crate::trace::test_support::record;

    fn edge(id: &str, source: &str, target: &str) -> GraphEdge {
        GraphEdge {
            id: id.to_string(),
            source: source.to_string(),
            target: target.to_string(),
            name: None,
        }
    }

    fn graph(edges: &[(&str, &str, &str)]) -> ProcessGraph {
        let mut graph = ProcessGraph::new();
        for (id, source, target) in edges {
            graph.add_edge(edge(id, source, target));
        }
        graph
    }

    #[test]
    fn test_simple_loop() {
        let graph = graph(&[("e1", "A", "B"), ("e2", "B", "A")]);
        let trace = OrderedTrace::from_records(vec![
            record("A", "task", 0),
            record("e1", "sequenceFlow", 1),
            record("B", "task", 1),
            record("e2", "sequenceFlow", 2),
            record("A", "task", 2),
        ]);

        let loops = classify_loops(&trace, Some(&graph));
        assert_eq!(loops.state("e1"), EdgeState::NormalDone);
        assert_eq!(loops.state("e2"), EdgeState::LoopBack);
        assert_eq!(loops.loop_backs().collect::<Vec<_>>(), vec!["e2"]);
        assert!(loops.warnings.is_empty());
    }

    #[test]
    fn test_first_traversal_wins() {
        // A -e1-> B -e2-> A -e1-> B: the second e1 re-enters B, but e1 was
        // first taken as a forward transition.
        let graph = graph(&[("e1", "A", "B"), ("e2", "B", "A")]);
        let trace = OrderedTrace::from_records(vec![
            record("A", "task", 0),
            record("e1", "sequenceFlow", 1),
            record("B", "task", 1),
            record("e2", "sequenceFlow", 2),
            record("A", "task", 2),
            record("e1", "sequenceFlow", 3),
            record("B", "task", 3),
        ]);

        let loops = classify_loops(&trace, Some(&graph));
        assert_eq!(loops.state("e1"), EdgeState::NormalDone);
        assert_eq!(loops.state("e2"), EdgeState::LoopBack);
    }

    #[test]
    fn test_self_loop() {
        let graph = graph(&[("retry", "A", "A")]);
        let trace = OrderedTrace::from_records(vec![
            record("A", "serviceTask", 0),
            record("retry", "sequenceFlow", 1),
            record("A", "serviceTask", 1),
        ]);

        let loops = classify_loops(&trace, Some(&graph));
        assert_eq!(loops.state("retry"), EdgeState::LoopBack);
    }

    #[test]
    fn test_unresolved_target_defaults_to_normal() {
        let graph = graph(&[("e1", "A", "B")]);
        let trace = OrderedTrace::from_records(vec![
            record("A", "task", 0),
            record("ghost", "sequenceFlow", 1),
            record("A", "task", 1),
            record("ghost", "sequenceFlow", 2),
        ]);

        let loops = classify_loops(&trace, Some(&graph));
        assert_eq!(loops.state("ghost"), EdgeState::NormalDone);
        assert_eq!(
            loops.warnings,
            vec![ReconcileWarning::UnresolvedEdgeTarget {
                edge_id: "ghost".to_string()
            }]
        );
    }

    #[test]
    fn test_without_graph_everything_normal() {
        let trace = OrderedTrace::from_records(vec![
            record("A", "task", 0),
            record("e1", "sequenceFlow", 1),
            record("A", "task", 1),
        ]);

        let loops = classify_loops(&trace, None);
        assert_eq!(loops.state("e1"), EdgeState::NormalDone);
        assert_eq!(loops.warnings.len(), 1);
    }

    #[test]
    fn test_unknown_records_do_not_count_as_visits() {
        let graph = graph(&[("e1", "X", "mi")]);
        let trace = OrderedTrace::from_records(vec![
            record("mi", "multiInstanceBody", 0),
            record("e1", "sequenceFlow", 1),
        ]);

        let loops = classify_loops(&trace, Some(&graph));
        assert_eq!(loops.state("e1"), EdgeState::NormalDone);
    }
}
