//! Replay pipeline
//!
//! Composes the stages into one model per fetched history:
//!
//! ```text
//! raw payloads ──► normalize ──► select definition ──► order ──► classify loops
//!                                                          │
//!                                                          └──► reconcile labels
//!                                                                    │
//!                               cursor ──► ReplayModel::plan ◄───────┘
//! ```
//!
//! Building the model is done once per fetch. Moving the cursor only calls
//! [`ReplayModel::plan`], which is pure.

use crate::error::Result;
use crate::graph::ProcessGraph;
use crate::history::{self, NormalizedHistory};
use crate::plan::{plan_annotations, reconcile_labels};
use crate::trace::{classify_loops, select_current_definition, LoopClassification, OrderedTrace};
use crate::types::{AnnotationPlan, ReconcileWarning, TaskHistoryRecord};
use serde_json::Value;
use std::collections::BTreeMap;

/// Everything derived from one instance history, ready to plan at any cursor.
#[derive(Debug, Clone, Default)]
pub struct ReplayModel {
    trace: OrderedTrace,
    loops: LoopClassification,
    labels: BTreeMap<String, String>,
    tasks: Vec<TaskHistoryRecord>,
    warnings: Vec<ReconcileWarning>,
}

impl ReplayModel {
    /// Derive a model from normalized history and an optional process graph.
    pub fn build(history: NormalizedHistory, graph: Option<&ProcessGraph>) -> Self {
        let NormalizedHistory {
            activities,
            tasks,
            mut warnings,
        } = history;

        let activities = select_current_definition(activities, &mut warnings);
        let trace = OrderedTrace::from_records(activities);
        let loops = classify_loops(&trace, graph);
        let labels = reconcile_labels(trace.records(), &tasks, graph);

        warnings.extend(loops.warnings.iter().cloned());
        warnings.extend(labels.warnings);

        tracing::debug!(
            records = trace.len(),
            steps = trace.node_count(),
            loop_backs = loops.loop_backs().count(),
            warnings = warnings.len(),
            "Built replay model"
        );

        Self {
            trace,
            loops,
            labels: labels.labels,
            tasks,
            warnings,
        }
    }

    /// Normalize raw API payloads and build the model.
    ///
    /// Fails only when a payload is malformed; per-record anomalies end up in
    /// [`ReplayModel::warnings`].
    pub fn from_payloads(
        activities: &Value,
        tasks: &Value,
        graph: Option<&ProcessGraph>,
    ) -> Result<Self> {
        let history = history::normalize(activities, tasks)?;
        Ok(Self::build(history, graph))
    }

    /// Annotation plan revealing the first `cursor` trace records
    /// (`None` = everything known so far).
    pub fn plan(&self, cursor: Option<usize>) -> AnnotationPlan {
        plan_annotations(&self.trace, &self.loops, &self.labels, cursor)
    }

    pub fn trace(&self) -> &OrderedTrace {
        &self.trace
    }

    pub fn loops(&self) -> &LoopClassification {
        &self.loops
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        &self.labels
    }

    pub fn tasks(&self) -> &[TaskHistoryRecord] {
        &self.tasks
    }

    pub fn warnings(&self) -> &[ReconcileWarning] {
        &self.warnings
    }

    /// Number of trace records, i.e. the largest meaningful cursor.
    pub fn len(&self) -> usize {
        self.trace.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EdgeState, NodeState};
    use serde_json::json;

    #[test]
    fn test_from_payloads_collects_all_warnings() {
        let graph = ProcessGraph::from_value(&json!({
            "nodes": [{ "id": "start" }, { "id": "task1" }],
            "edges": [{ "id": "flow1", "source": "start", "target": "task1" }]
        }))
        .unwrap();

        let model = ReplayModel::from_payloads(
            &json!([
                { "activityId": "start", "activityType": "startEvent", "startTime": 0 },
                { "activityId": "flow1", "activityType": "sequenceFlow", "startTime": 1 },
                {
                    "activityId": "task1",
                    "activityType": "userTask",
                    "startTime": 1,
                    "taskId": "t1"
                },
                { "activityId": "flowX", "activityType": "sequenceFlow", "startTime": 2 },
                { "activityId": "broken", "activityType": "task" }
            ]),
            &json!([
                { "taskId": "t1", "taskName": "Approve Request", "status": "ACTIVE" },
                { "taskId": "t7", "taskName": "Ghost" }
            ]),
            Some(&graph),
        )
        .unwrap();

        assert_eq!(model.len(), 4);
        assert_eq!(model.warnings().len(), 3);

        let plan = model.plan(None);
        assert_eq!(plan.node_states["task1"], NodeState::Active);
        assert_eq!(plan.edge_states["flowX"], EdgeState::NormalDone);
        assert_eq!(plan.labels["task1"], "Approve Request");
    }

    #[test]
    fn test_empty_history_gives_empty_plan() {
        let model = ReplayModel::from_payloads(&json!([]), &json!([]), None).unwrap();
        assert!(model.is_empty());
        assert_eq!(model.plan(None), AnnotationPlan::default());
    }
}
