//! Label reconciliation
//!
//! Maps task history onto graph node ids and picks a display name per node.
//! Authored diagram names (and engine activity names) are only defaults: a
//! matching task history record's `taskName` always wins, since a diagram
//! node may have been reused across renamed definition versions.

use crate::graph::ProcessGraph;
use crate::types::{ActivityRecord, ReconcileWarning, TaskHistoryRecord};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Display names per node id, plus the task records that matched nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelReconciliation {
    pub labels: BTreeMap<String, String>,
    pub warnings: Vec<ReconcileWarning>,
}

/// Build `activityId -> displayName` for the nodes of a trace.
///
/// Task records resolve to a node through `taskId` first, then through their
/// own `activityId`. The latter must name a node of the trace or the graph.
/// When several task records land on the same node, the most recently
/// started one names it.
pub fn reconcile_labels(
    activities: &[ActivityRecord],
    tasks: &[TaskHistoryRecord],
    graph: Option<&ProcessGraph>,
) -> LabelReconciliation {
    let mut result = LabelReconciliation::default();

    let mut task_owner: HashMap<&str, &str> = HashMap::new();
    let mut trace_nodes: HashSet<&str> = HashSet::new();

    for record in activities.iter().filter(|r| r.is_node()) {
        trace_nodes.insert(record.activity_id.as_str());
        if let Some(task_id) = record.task_id.as_deref() {
            task_owner.insert(task_id, record.activity_id.as_str());
        }

        let default_name = graph
            .and_then(|g| g.node_name(&record.activity_id))
            .or(record.activity_name.as_deref());
        if let Some(name) = default_name {
            result
                .labels
                .entry(record.activity_id.clone())
                .or_insert_with(|| name.to_string());
        }
    }

    let mut ordered: Vec<&TaskHistoryRecord> = tasks.iter().collect();
    ordered.sort_by_key(|task| task.start_time);

    for task in ordered {
        let by_task_id = task
            .task_id
            .as_deref()
            .and_then(|id| task_owner.get(id).copied());
        let by_activity_id = task.activity_id.as_deref().filter(|id| {
            trace_nodes.contains(id) || graph.is_some_and(|g| g.contains_node(id))
        });

        match by_task_id.or(by_activity_id) {
            Some(activity_id) => {
                result
                    .labels
                    .insert(activity_id.to_string(), task.task_name.clone());
            }
            None => {
                tracing::warn!(
                    task_id = task.task_id.as_deref().unwrap_or(""),
                    task_name = %task.task_name,
                    "Task history record has no matching activity"
                );
                result.warnings.push(ReconcileWarning::UnresolvedTask {
                    task_id: task.task_id.clone(),
                    task_name: task.task_name.clone(),
                });
            }
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphNode;
    use crate::trace::test_support::record;
    use crate::types::TaskStatus;
    use chrono::{TimeZone, Utc};

    fn task(task_id: Option<&str>, name: &str) -> TaskHistoryRecord {
        TaskHistoryRecord {
            task_id: task_id.map(str::to_string),
            activity_id: None,
            task_name: name.to_string(),
            status: TaskStatus::Completed,
            start_time: None,
            end_time: None,
            completed_by: None,
            form_key: None,
            form_submission_id: None,
        }
    }

    fn with_task_id(mut record: ActivityRecord, task_id: &str) -> ActivityRecord {
        record.task_id = Some(task_id.to_string());
        record
    }

    #[test]
    fn test_task_id_join() {
        let activities = vec![
            record("start", "startEvent", 0),
            with_task_id(record("task1", "userTask", 1), "t1"),
        ];
        let result = reconcile_labels(&activities, &[task(Some("t1"), "Approve Request")], None);

        assert_eq!(result.labels.len(), 1);
        assert_eq!(result.labels["task1"], "Approve Request");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_task_name_beats_graph_name() {
        let mut graph = ProcessGraph::new();
        graph.add_node(GraphNode {
            id: "task1".to_string(),
            name: Some("Review (v1)".to_string()),
            node_type: None,
        });
        graph.add_node(GraphNode {
            id: "start".to_string(),
            name: Some("Order received".to_string()),
            node_type: None,
        });
        let activities = vec![
            record("start", "startEvent", 0),
            with_task_id(record("task1", "userTask", 1), "t1"),
        ];

        let result = reconcile_labels(&activities, &[task(Some("t1"), "Approve")], Some(&graph));
        assert_eq!(result.labels["task1"], "Approve");
        assert_eq!(result.labels["start"], "Order received");
    }

    #[test]
    fn test_activity_name_as_default() {
        let mut start = record("start", "startEvent", 0);
        start.activity_name = Some("Begin".to_string());
        let result = reconcile_labels(&[start], &[], None);
        assert_eq!(result.labels["start"], "Begin");
    }

    #[test]
    fn test_activity_id_fallback() {
        let activities = vec![record("review", "userTask", 0)];
        let mut fallback = task(Some("unknown-task"), "Review order");
        fallback.activity_id = Some("review".to_string());

        let result = reconcile_labels(&activities, &[fallback], None);
        assert_eq!(result.labels["review"], "Review order");
    }

    #[test]
    fn test_unresolved_task_ignored() {
        let activities = vec![record("review", "userTask", 0)];
        let mut dangling = task(Some("t9"), "Old step");
        dangling.activity_id = Some("removed_node".to_string());

        let result = reconcile_labels(&activities, &[dangling, task(None, "Orphan")], None);
        assert!(result.labels.is_empty());
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_most_recent_task_names_node() {
        let activities = vec![
            with_task_id(record("review", "userTask", 0), "t1"),
            with_task_id(record("review", "userTask", 10), "t2"),
        ];
        let mut first = task(Some("t1"), "Review");
        first.start_time = Utc.timestamp_millis_opt(0).single();
        let mut second = task(Some("t2"), "Review again");
        second.start_time = Utc.timestamp_millis_opt(10).single();

        let result = reconcile_labels(&activities, &[second, first], None);
        assert_eq!(result.labels["review"], "Review again");
    }
}
