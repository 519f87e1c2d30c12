//! Core domain types for flowscope
//!
//! These types are the normalized form of process-instance history and the
//! annotation plan computed from it.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Activity** | One node or edge traversal in a process graph, as recorded by the engine |
//! | **Trace** | The time-ordered sequence of activities for one process instance |
//! | **Cursor** | How many trace records to reveal ("replay position") |
//! | **Loop-back edge** | A transition whose target node was already visited earlier in the trace |
//! | **Annotation plan** | Node/edge states, badges and labels to apply to a static diagram |
//!
//! Everything here is derived and read-only: a new fetch or a cursor change
//! rebuilds these values from scratch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================
// Activities
// ============================================

/// Kind of graph element an activity record refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityType {
    StartEvent,
    EndEvent,
    /// Plain or manual task
    Task,
    UserTask,
    /// Service, script, send/receive and business-rule tasks
    ServiceTask,
    Gateway,
    /// Intermediate catch/throw and boundary events
    IntermediateEvent,
    SubProcess,
    /// A transition between two nodes
    SequenceFlow,
    /// A type string the engine reported that we do not recognize
    Unknown(String),
}

impl ActivityType {
    /// Parse an engine activity type string.
    ///
    /// Unrecognized strings map to [`ActivityType::Unknown`] rather than failing.
    pub fn parse(s: &str) -> Self {
        match s {
            "startEvent" | "noneStartEvent" | "messageStartEvent" | "timerStartEvent"
            | "signalStartEvent" => ActivityType::StartEvent,
            "endEvent" | "noneEndEvent" | "terminateEndEvent" | "errorEndEvent" => {
                ActivityType::EndEvent
            }
            "task" | "manualTask" => ActivityType::Task,
            "userTask" => ActivityType::UserTask,
            "serviceTask" | "scriptTask" | "sendTask" | "receiveTask" | "businessRuleTask" => {
                ActivityType::ServiceTask
            }
            "gateway" => ActivityType::Gateway,
            "subProcess" | "callActivity" => ActivityType::SubProcess,
            "sequenceFlow" => ActivityType::SequenceFlow,
            other if other.ends_with("Gateway") => ActivityType::Gateway,
            other if other.ends_with("StartEvent") => ActivityType::StartEvent,
            other if other.ends_with("EndEvent") => ActivityType::EndEvent,
            other
                if other.starts_with("intermediate") || other.starts_with("boundary") =>
            {
                ActivityType::IntermediateEvent
            }
            other => ActivityType::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ActivityType::StartEvent => "startEvent",
            ActivityType::EndEvent => "endEvent",
            ActivityType::Task => "task",
            ActivityType::UserTask => "userTask",
            ActivityType::ServiceTask => "serviceTask",
            ActivityType::Gateway => "gateway",
            ActivityType::IntermediateEvent => "intermediateEvent",
            ActivityType::SubProcess => "subProcess",
            ActivityType::SequenceFlow => "sequenceFlow",
            ActivityType::Unknown(raw) => raw,
        }
    }

    /// True for transitions (sequence flows).
    pub fn is_edge(&self) -> bool {
        matches!(self, ActivityType::SequenceFlow)
    }

    /// True for recognized node types. Unknown types are neither nodes nor edges.
    pub fn is_node(&self) -> bool {
        !matches!(self, ActivityType::SequenceFlow | ActivityType::Unknown(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ActivityType::Unknown(_))
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One execution step or transition observed in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    /// Graph element identifier (node or edge)
    pub activity_id: String,
    /// Kind of element
    pub activity_type: ActivityType,
    /// Name the engine recorded for the element, if any
    pub activity_name: Option<String>,
    pub start_time: DateTime<Utc>,
    /// Absent while the activity is still running
    pub end_time: Option<DateTime<Utc>>,
    /// Present only for human tasks; joins with [`TaskHistoryRecord::task_id`]
    pub task_id: Option<String>,
    /// Which graph version this record belongs to
    pub process_definition_id: String,
}

impl ActivityRecord {
    pub fn is_edge(&self) -> bool {
        self.activity_type.is_edge()
    }

    pub fn is_node(&self) -> bool {
        self.activity_type.is_node()
    }

    /// Still executing (no end time recorded yet)
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed time between start and end, if the activity has ended.
    pub fn duration(&self) -> Option<chrono::Duration> {
        self.end_time
            .map(|end| end.signed_duration_since(self.start_time))
    }
}

// ============================================
// Task history
// ============================================

/// Lifecycle status of a human task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Active,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Active => "ACTIVE",
            TaskStatus::Completed => "COMPLETED",
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ACTIVE" => Ok(TaskStatus::Active),
            "COMPLETED" => Ok(TaskStatus::Completed),
            _ => Err(format!("unknown task status: {}", s)),
        }
    }
}

/// A human-task-centric audit entry, richer than [`ActivityRecord`] for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskHistoryRecord {
    pub task_id: Option<String>,
    /// Owning graph node, when the history endpoint reports it directly
    pub activity_id: Option<String>,
    pub task_name: String,
    pub status: TaskStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub completed_by: Option<String>,
    pub form_key: Option<String>,
    pub form_submission_id: Option<String>,
}

// ============================================
// Annotation plan
// ============================================

/// Visual state of a diagram node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    /// Not reached in the revealed prefix (renderer default; never stored in a plan)
    Unvisited,
    Done,
    /// Currently executing here
    Active,
}

impl NodeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeState::Unvisited => "UNVISITED",
            NodeState::Done => "DONE",
            NodeState::Active => "ACTIVE",
        }
    }
}

/// Visual state of a traversed edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeState {
    NormalDone,
    /// Target node had already been visited when this edge was first taken
    LoopBack,
}

impl EdgeState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeState::NormalDone => "NORMAL_DONE",
            EdgeState::LoopBack => "LOOP_BACK",
        }
    }
}

/// Render instructions for one replay position.
///
/// Element ids absent from `node_states` are unvisited. Maps are ordered so
/// two equal plans serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationPlan {
    pub node_states: BTreeMap<String, NodeState>,
    pub edge_states: BTreeMap<String, EdgeState>,
    /// 1-based step ordinal per node (most recent visit wins)
    pub badges: BTreeMap<String, u32>,
    pub labels: BTreeMap<String, String>,
}

impl AnnotationPlan {
    /// State of a node, defaulting to unvisited.
    pub fn node_state(&self, activity_id: &str) -> NodeState {
        self.node_states
            .get(activity_id)
            .copied()
            .unwrap_or(NodeState::Unvisited)
    }

    /// The node currently marked active, if any.
    pub fn active_node(&self) -> Option<&str> {
        self.node_states
            .iter()
            .find(|(_, state)| **state == NodeState::Active)
            .map(|(id, _)| id.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.node_states.is_empty() && self.edge_states.is_empty()
    }
}

// ============================================
// Warnings
// ============================================

/// Non-fatal anomaly found while normalizing or reconciling history.
///
/// These degrade a single element (unlabeled, unmarked, default state)
/// and never abort plan computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReconcileWarning {
    /// A raw record was skipped during normalization
    DroppedRecord {
        input: String,
        index: usize,
        reason: String,
    },
    /// An edge's target node could not be resolved; classified as a normal transition
    UnresolvedEdgeTarget { edge_id: String },
    /// A task history record could not be matched to any graph node
    UnresolvedTask {
        task_id: Option<String>,
        task_name: String,
    },
    /// Records from an older process definition were set aside
    SupersededDefinition {
        process_definition_id: String,
        records: usize,
    },
}

impl std::fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileWarning::DroppedRecord {
                input,
                index,
                reason,
            } => write!(f, "dropped {} record #{}: {}", input, index, reason),
            ReconcileWarning::UnresolvedEdgeTarget { edge_id } => {
                write!(f, "target of edge {} not found in graph", edge_id)
            }
            ReconcileWarning::UnresolvedTask { task_id, task_name } => write!(
                f,
                "task {} ({}) has no matching activity",
                task_id.as_deref().unwrap_or("<no id>"),
                task_name
            ),
            ReconcileWarning::SupersededDefinition {
                process_definition_id,
                records,
            } => write!(
                f,
                "{} records from superseded definition {} ignored",
                records, process_definition_id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_type_parse() {
        assert_eq!(ActivityType::parse("startEvent"), ActivityType::StartEvent);
        assert_eq!(ActivityType::parse("userTask"), ActivityType::UserTask);
        assert_eq!(ActivityType::parse("scriptTask"), ActivityType::ServiceTask);
        assert_eq!(
            ActivityType::parse("exclusiveGateway"),
            ActivityType::Gateway
        );
        assert_eq!(
            ActivityType::parse("boundaryTimer"),
            ActivityType::IntermediateEvent
        );
        assert_eq!(
            ActivityType::parse("sequenceFlow"),
            ActivityType::SequenceFlow
        );
        assert_eq!(
            ActivityType::parse("multiInstanceBody"),
            ActivityType::Unknown("multiInstanceBody".to_string())
        );
    }

    #[test]
    fn test_edge_and_node_classification() {
        assert!(ActivityType::SequenceFlow.is_edge());
        assert!(!ActivityType::SequenceFlow.is_node());
        assert!(ActivityType::Task.is_node());
        let unknown = ActivityType::Unknown("weird".to_string());
        assert!(!unknown.is_edge());
        assert!(!unknown.is_node());
        assert_eq!(unknown.as_str(), "weird");
    }

    #[test]
    fn test_task_status_from_str() {
        assert_eq!("COMPLETED".parse::<TaskStatus>(), Ok(TaskStatus::Completed));
        assert_eq!("active".parse::<TaskStatus>(), Ok(TaskStatus::Active));
        assert!("SUSPENDED".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_plan_states_serialize_screaming_case() {
        let mut plan = AnnotationPlan::default();
        plan.node_states.insert("task1".to_string(), NodeState::Active);
        plan.edge_states.insert("flow1".to_string(), EdgeState::LoopBack);

        let json = serde_json::to_value(&plan).unwrap();
        assert_eq!(json["node_states"]["task1"], "ACTIVE");
        assert_eq!(json["edge_states"]["flow1"], "LOOP_BACK");
        assert_eq!(plan.active_node(), Some("task1"));
        assert_eq!(plan.node_state("elsewhere"), NodeState::Unvisited);
    }
}
