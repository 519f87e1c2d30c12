//! Renderer adapter seam
//!
//! The core never draws. A diagram library is plugged in by implementing
//! [`MarkerSurface`] over its "mark element" / "set element text" primitives;
//! [`apply_plan`] then drives it.
//!
//! Markers are never patched incrementally: every application clears the
//! surface and replays the whole plan, so a stale highlight cannot survive a
//! recomputation.

use crate::types::{AnnotationPlan, EdgeState, NodeState};
use std::collections::BTreeMap;

/// Visual marker operations of a diagram renderer, keyed by element id.
pub trait MarkerSurface {
    /// Remove every marker, badge and label override.
    fn clear_markers(&mut self);

    fn mark_node(&mut self, element_id: &str, state: NodeState);

    fn mark_edge(&mut self, element_id: &str, state: EdgeState);

    fn set_badge(&mut self, element_id: &str, ordinal: u32);

    fn set_label(&mut self, element_id: &str, label: &str);
}

/// Clear `surface` and apply the full `plan` to it.
pub fn apply_plan<S: MarkerSurface + ?Sized>(surface: &mut S, plan: &AnnotationPlan) {
    surface.clear_markers();

    for (id, state) in &plan.node_states {
        surface.mark_node(id, *state);
    }
    for (id, state) in &plan.edge_states {
        surface.mark_edge(id, *state);
    }
    for (id, ordinal) in &plan.badges {
        surface.set_badge(id, *ordinal);
    }
    for (id, label) in &plan.labels {
        surface.set_label(id, label);
    }

    tracing::trace!(
        nodes = plan.node_states.len(),
        edges = plan.edge_states.len(),
        "Applied annotation plan"
    );
}

/// Markers held for one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementMarkers {
    pub node: Option<NodeState>,
    pub edge: Option<EdgeState>,
    pub badge: Option<u32>,
    pub label: Option<String>,
}

/// In-memory surface that renders its markers as plain text.
#[derive(Debug, Clone, Default)]
pub struct TextSurface {
    elements: BTreeMap<String, ElementMarkers>,
}

impl TextSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element(&self, element_id: &str) -> Option<&ElementMarkers> {
        self.elements.get(element_id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn entry(&mut self, element_id: &str) -> &mut ElementMarkers {
        self.elements.entry(element_id.to_string()).or_default()
    }

    /// One line per marked element; badged nodes first in badge order,
    /// then edges and label-only elements by id.
    pub fn render(&self) -> String {
        let mut badged: Vec<(&String, &ElementMarkers)> = self
            .elements
            .iter()
            .filter(|(_, m)| m.badge.is_some())
            .collect();
        badged.sort_by_key(|(_, m)| m.badge);

        let rest = self.elements.iter().filter(|(_, m)| m.badge.is_none());

        let mut out = String::new();
        for (id, markers) in badged.into_iter().chain(rest) {
            let badge = markers
                .badge
                .map(|b| format!("#{}", b))
                .unwrap_or_else(|| "-".to_string());
            let state = match (markers.node, markers.edge) {
                (Some(node), _) => node.as_str(),
                (None, Some(edge)) => edge.as_str(),
                (None, None) => NodeState::Unvisited.as_str(),
            };
            out.push_str(&format!("{:>4}  {:<12} {}", badge, state, id));
            if let Some(label) = &markers.label {
                out.push_str(&format!("  \"{}\"", label));
            }
            out.push('\n');
        }
        out
    }
}

impl MarkerSurface for TextSurface {
    fn clear_markers(&mut self) {
        self.elements.clear();
    }

    fn mark_node(&mut self, element_id: &str, state: NodeState) {
        self.entry(element_id).node = Some(state);
    }

    fn mark_edge(&mut self, element_id: &str, state: EdgeState) {
        self.entry(element_id).edge = Some(state);
    }

    fn set_badge(&mut self, element_id: &str, ordinal: u32) {
        self.entry(element_id).badge = Some(ordinal);
    }

    fn set_label(&mut self, element_id: &str, label: &str) {
        self.entry(element_id).label = Some(label.to_string());
    }
}
