//! Activity record normalization
//!
//! Converts the raw payloads of the two history endpoints (historic
//! activities and task-centric process history) for one process instance
//! into [`ActivityRecord`]s and [`TaskHistoryRecord`]s.
//!
//! ## Error Handling
//!
//! - **Payload not a list**: fails with [`Error::MalformedHistory`] naming the
//!   input. A broken fetch must stay distinguishable from an empty history.
//! - **Element not an object**: also [`Error::MalformedHistory`], naming the
//!   element index.
//! - **Field of the wrong JSON type**: record dropped with a
//!   [`ReconcileWarning::DroppedRecord`]. Identifiers are accepted as strings
//!   or numbers.
//! - **Missing or unparseable `startTime`** on an activity: record dropped,
//!   a [`ReconcileWarning::DroppedRecord`] is recorded and logged.
//! - **Unknown `activityType`**: kept as [`ActivityType::Unknown`] when the
//!   record has an `activityId`, dropped otherwise.
//!
//! No ordering or deduplication happens here; see [`crate::trace`].

pub mod timestamp;

pub use timestamp::{parse_timestamp, parse_timestamp_str};

use crate::error::{Error, HistoryInput, Result};
use crate::types::{ActivityRecord, ActivityType, ReconcileWarning, TaskHistoryRecord, TaskStatus};
use serde::Deserialize;
use serde_json::Value;

/// Output of [`normalize`]: typed records plus non-fatal warnings.
#[derive(Debug, Clone, Default)]
pub struct NormalizedHistory {
    pub activities: Vec<ActivityRecord>,
    pub tasks: Vec<TaskHistoryRecord>,
    /// Records dropped during normalization
    pub warnings: Vec<ReconcileWarning>,
}

// ============================================
// Raw record types (serde deserialization)
// ============================================

/// Historic activity record as returned by the engine.
#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawActivity {
    activity_id: Option<Value>,
    activity_name: Option<String>,
    activity_type: Option<String>,
    start_time: Option<Value>,
    end_time: Option<Value>,
    task_id: Option<Value>,
    process_definition_id: Option<Value>,
}

/// Task history record as returned by the engine.
#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawTaskHistory {
    task_id: Option<Value>,
    id: Option<Value>,
    activity_id: Option<Value>,
    task_definition_key: Option<Value>,
    task_name: Option<String>,
    name: Option<String>,
    status: Option<String>,
    start_time: Option<Value>,
    end_time: Option<Value>,
    completed_by: Option<String>,
    assignee: Option<String>,
    form_key: Option<Value>,
    form_submission_id: Option<Value>,
}

impl RawTaskHistory {
    /// Engine-native field names (`id`, `name`, `taskDefinitionKey`,
    /// `assignee`) back up the console's own ones.
    fn coalesce(self) -> Self {
        Self {
            task_id: self.task_id.filter(is_id).or(self.id),
            id: None,
            activity_id: self.activity_id.filter(is_id).or(self.task_definition_key),
            task_definition_key: None,
            task_name: non_empty(self.task_name).or(non_empty(self.name)),
            name: None,
            completed_by: non_empty(self.completed_by).or(non_empty(self.assignee)),
            assignee: None,
            ..self
        }
    }
}

// ============================================
// Normalization
// ============================================

/// Normalize both history payloads of one process instance.
pub fn normalize(activities: &Value, tasks: &Value) -> Result<NormalizedHistory> {
    let mut history = NormalizedHistory::default();
    history.activities = normalize_activities(activities, &mut history.warnings)?;
    history.tasks = normalize_task_history(tasks, &mut history.warnings)?;

    tracing::debug!(
        activities = history.activities.len(),
        tasks = history.tasks.len(),
        dropped = history.warnings.len(),
        "Normalized instance history"
    );

    Ok(history)
}

/// Normalize the historic-activity payload.
pub fn normalize_activities(
    payload: &Value,
    warnings: &mut Vec<ReconcileWarning>,
) -> Result<Vec<ActivityRecord>> {
    let items = records(payload, HistoryInput::Activities)?;
    let mut out = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Some(raw) =
            deserialize_record::<RawActivity>(item, index, HistoryInput::Activities, warnings)?
        else {
            continue;
        };

        let activity_id = id_string(raw.activity_id);
        let activity_type = raw
            .activity_type
            .as_deref()
            .map(ActivityType::parse)
            .unwrap_or_else(|| ActivityType::Unknown(String::new()));

        let Some(activity_id) = activity_id else {
            let reason = if activity_type.is_unknown() {
                "unrecognized activity type without activityId"
            } else {
                "missing activityId"
            };
            drop_record(warnings, HistoryInput::Activities, index, reason);
            continue;
        };

        let Some(start_time) = raw.start_time.as_ref().and_then(parse_timestamp) else {
            drop_record(
                warnings,
                HistoryInput::Activities,
                index,
                "missing or unparseable startTime",
            );
            continue;
        };

        out.push(ActivityRecord {
            activity_id,
            activity_type,
            activity_name: raw.activity_name,
            start_time,
            end_time: raw.end_time.as_ref().and_then(parse_timestamp),
            task_id: id_string(raw.task_id),
            process_definition_id: id_string(raw.process_definition_id).unwrap_or_default(),
        });
    }

    Ok(out)
}

/// Normalize the task-centric process history payload.
pub fn normalize_task_history(
    payload: &Value,
    warnings: &mut Vec<ReconcileWarning>,
) -> Result<Vec<TaskHistoryRecord>> {
    let items = records(payload, HistoryInput::TaskHistory)?;
    let mut out = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        let Some(raw) =
            deserialize_record::<RawTaskHistory>(item, index, HistoryInput::TaskHistory, warnings)?
        else {
            continue;
        };
        let raw = raw.coalesce();

        let Some(task_name) = raw.task_name else {
            drop_record(warnings, HistoryInput::TaskHistory, index, "missing taskName");
            continue;
        };

        let end_time = raw.end_time.as_ref().and_then(parse_timestamp);
        let status = raw
            .status
            .as_deref()
            .and_then(|s| s.parse::<TaskStatus>().ok())
            .unwrap_or(if end_time.is_some() {
                TaskStatus::Completed
            } else {
                TaskStatus::Active
            });

        out.push(TaskHistoryRecord {
            task_id: id_string(raw.task_id),
            activity_id: id_string(raw.activity_id),
            task_name,
            status,
            start_time: raw.start_time.as_ref().and_then(parse_timestamp),
            end_time,
            completed_by: raw.completed_by,
            form_key: id_string(raw.form_key),
            form_submission_id: id_string(raw.form_submission_id),
        });
    }

    Ok(out)
}

/// Unwrap a list payload: a bare array or a paged `{ "data": [...] }` envelope.
fn records(payload: &Value, input: HistoryInput) -> Result<&Vec<Value>> {
    match payload {
        Value::Array(items) => Ok(items),
        Value::Object(obj) => match obj.get("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(Error::malformed(
                input,
                "expected an array or an object with a `data` array",
            )),
        },
        other => Err(Error::malformed(
            input,
            format!("expected an array, got {}", json_kind(other)),
        )),
    }
}

/// Deserialize one element. `Ok(None)` means the record was dropped.
fn deserialize_record<T>(
    item: &Value,
    index: usize,
    input: HistoryInput,
    warnings: &mut Vec<ReconcileWarning>,
) -> Result<Option<T>>
where
    T: for<'de> Deserialize<'de>,
{
    if !item.is_object() {
        return Err(Error::malformed(
            input,
            format!("record #{} is {}, expected an object", index, json_kind(item)),
        ));
    }
    match T::deserialize(item) {
        Ok(raw) => Ok(Some(raw)),
        Err(e) => {
            drop_record(warnings, input, index, &e.to_string());
            Ok(None)
        }
    }
}

fn drop_record(
    warnings: &mut Vec<ReconcileWarning>,
    input: HistoryInput,
    index: usize,
    reason: &str,
) {
    tracing::warn!(input = %input, index, reason, "Dropping history record");
    warnings.push(ReconcileWarning::DroppedRecord {
        input: input.to_string(),
        index,
        reason: reason.to_string(),
    });
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Engine ids arrive as strings or as numbers.
fn id_string(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) => non_empty(Some(s)),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn is_id(value: &Value) -> bool {
    id_string(Some(value.clone())).is_some()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
