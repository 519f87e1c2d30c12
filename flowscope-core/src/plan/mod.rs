//! Annotation planning
//!
//! Computes the [`AnnotationPlan`] for a replay position: which nodes are
//! done or active, how each traversed edge is drawn, the step badge of every
//! visited node and its display label.
//!
//! [`plan_annotations`] is a pure function of its inputs. Advancing the
//! cursor by one record changes at most two node states (the previously
//! active node becomes done, the new one becomes active), so a step-through
//! UI can rebuild the plan on every step.

pub mod labels;

pub use labels::{reconcile_labels, LabelReconciliation};

use crate::trace::{LoopClassification, OrderedTrace};
use crate::types::{AnnotationPlan, NodeState};
use std::collections::BTreeMap;

/// Plan the annotations for the first `cursor` records of `trace`.
///
/// `None` reveals the whole trace; larger values are clamped to its length.
/// Records of unknown type take a cursor position but stay unmarked.
pub fn plan_annotations(
    trace: &OrderedTrace,
    loops: &LoopClassification,
    labels: &BTreeMap<String, String>,
    cursor: Option<usize>,
) -> AnnotationPlan {
    let prefix = trace.prefix(cursor.unwrap_or(trace.len()));
    let last_node = prefix.iter().rposition(|r| r.is_node());

    let mut plan = AnnotationPlan {
        labels: labels.clone(),
        ..Default::default()
    };
    let mut ordinal: u32 = 0;

    for (index, record) in prefix.iter().enumerate() {
        if record.is_edge() {
            plan.edge_states
                .insert(record.activity_id.clone(), loops.state(&record.activity_id));
        } else if record.is_node() {
            ordinal += 1;
            let state = if Some(index) == last_node {
                NodeState::Active
            } else {
                NodeState::Done
            };
            plan.node_states.insert(record.activity_id.clone(), state);
            plan.badges.insert(record.activity_id.clone(), ordinal);
        }
    }

    plan
}
