//! Static process graph
//!
//! The reconciliation engine only needs a structural view of a process
//! definition: which node ids exist (with their authored names) and, for each
//! edge, its source and target node. Two JSON document shapes are accepted:
//!
//! ```json
//! { "nodes": [{ "id": "task1", "name": "Review" }],
//!   "edges": [{ "id": "flow1", "source": "start", "target": "task1" }] }
//! ```
//!
//! or the engine model style, where edges are flow elements carrying refs:
//!
//! ```json
//! { "flowElements": [{ "id": "task1", "name": "Review", "type": "userTask" },
//!                    { "id": "flow1", "sourceRef": "start", "targetRef": "task1" }] }
//! ```

use crate::error::{Error, HistoryInput, Result};
use crate::types::ActivityType;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// A node of the process graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    /// Name authored in the diagram
    pub name: Option<String>,
    pub node_type: Option<ActivityType>,
}

/// A directed edge of the process graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub name: Option<String>,
}

/// Structural view of one process definition version.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessGraph {
    /// Process definition this graph was loaded for, when known
    pub definition_id: Option<String>,
    nodes: BTreeMap<String, GraphNode>,
    edges: BTreeMap<String, GraphEdge>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawElement {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "type")]
    element_type: Option<String>,
    #[serde(default, alias = "sourceRef")]
    source: Option<String>,
    #[serde(default, alias = "targetRef")]
    target: Option<String>,
}

impl ProcessGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from a structural JSON document.
    pub fn from_value(doc: &Value) -> Result<Self> {
        let obj = doc.as_object().ok_or_else(|| {
            Error::malformed(HistoryInput::ProcessGraph, "expected a JSON object")
        })?;

        let mut graph = ProcessGraph {
            definition_id: obj
                .get("definitionId")
                .or_else(|| obj.get("id"))
                .and_then(Value::as_str)
                .map(str::to_string),
            ..Default::default()
        };

        if let Some(elements) = obj.get("flowElements") {
            for element in Self::elements(elements, "flowElements")? {
                if element.target.is_some() {
                    graph.push_edge(element)?;
                } else {
                    graph.push_node(element);
                }
            }
            return Ok(graph);
        }

        if let Some(nodes) = obj.get("nodes") {
            for element in Self::elements(nodes, "nodes")? {
                graph.push_node(element);
            }
        }
        if let Some(edges) = obj.get("edges") {
            for element in Self::elements(edges, "edges")? {
                graph.push_edge(element)?;
            }
        }

        Ok(graph)
    }

    /// Parse a structural JSON document from text.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let doc: Value = serde_json::from_str(s)?;
        Self::from_value(&doc)
    }

    fn elements(list: &Value, field: &str) -> Result<Vec<RawElement>> {
        let items = list.as_array().ok_or_else(|| {
            Error::malformed(
                HistoryInput::ProcessGraph,
                format!("`{}` must be an array", field),
            )
        })?;

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                RawElement::deserialize(item).map_err(|e| {
                    Error::malformed(
                        HistoryInput::ProcessGraph,
                        format!("`{}[{}]`: {}", field, index, e),
                    )
                })
            })
            .collect()
    }

    fn push_node(&mut self, element: RawElement) {
        self.add_node(GraphNode {
            node_type: element.element_type.as_deref().map(ActivityType::parse),
            id: element.id,
            name: element.name,
        });
    }

    fn push_edge(&mut self, element: RawElement) -> Result<()> {
        let (Some(source), Some(target)) = (element.source, element.target) else {
            return Err(Error::malformed(
                HistoryInput::ProcessGraph,
                format!("edge `{}` needs both source and target", element.id),
            ));
        };
        self.add_edge(GraphEdge {
            id: element.id,
            source,
            target,
            name: element.name,
        });
        Ok(())
    }

    pub fn add_node(&mut self, node: GraphNode) {
        self.nodes.insert(node.id.clone(), node);
    }

    pub fn add_edge(&mut self, edge: GraphEdge) {
        self.edges.insert(edge.id.clone(), edge);
    }

    /// Target node id of an edge, if the edge is known.
    pub fn edge_target(&self, edge_id: &str) -> Option<&str> {
        self.edges.get(edge_id).map(|e| e.target.as_str())
    }

    /// Authored display name of a node.
    pub fn node_name(&self, node_id: &str) -> Option<&str> {
        self.nodes.get(node_id).and_then(|n| n.name.as_deref())
    }

    pub fn contains_node(&self, node_id: &str) -> bool {
        self.nodes.contains_key(node_id)
    }

    pub fn node(&self, node_id: &str) -> Option<&GraphNode> {
        self.nodes.get(node_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &GraphEdge> {
        self.edges.values()
    }
}
