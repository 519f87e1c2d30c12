//! Trace ordering
//!
//! Turns normalized activity records into an [`OrderedTrace`]: sorted by
//! `startTime`, with sequence-flow records placed before node records that
//! share the same instant. The engine stamps a node and the transition into
//! it with the same time, and a replay up to step N must show the incoming
//! arrow no later than the node it feeds.
//!
//! Repeated activity ids are kept. A node that appears twice was visited
//! twice, which is what loop classification in [`loops`] relies on.

pub mod loops;

pub use loops::{classify_loops, LoopClassification};

use crate::types::{ActivityRecord, ReconcileWarning};
use chrono::{DateTime, Utc};

/// Activity records in replay order. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrderedTrace {
    records: Vec<ActivityRecord>,
}

impl OrderedTrace {
    /// Order records by start time, edges before nodes on ties.
    ///
    /// The sort is stable: records that tie on both keys keep their input order.
    pub fn from_records(mut records: Vec<ActivityRecord>) -> Self {
        records.sort_by_key(|record| (record.start_time, !record.is_edge()));
        Self { records }
    }

    pub fn records(&self) -> &[ActivityRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The first `cursor` records, with `cursor` clamped to the trace length.
    pub fn prefix(&self, cursor: usize) -> &[ActivityRecord] {
        &self.records[..cursor.min(self.records.len())]
    }

    /// Number of node records (badge-carrying steps) in the trace.
    pub fn node_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_node()).count()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActivityRecord> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a OrderedTrace {
    type Item = &'a ActivityRecord;
    type IntoIter = std::slice::Iter<'a, ActivityRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Records of one process definition version.
#[derive(Debug, Clone)]
pub struct DefinitionSegment {
    pub process_definition_id: String,
    pub records: Vec<ActivityRecord>,
}

impl DefinitionSegment {
    fn latest_start(&self) -> Option<DateTime<Utc>> {
        self.records.iter().map(|r| r.start_time).max()
    }
}

/// Split records by `processDefinitionId`, in order of first appearance.
pub fn partition_by_definition(records: Vec<ActivityRecord>) -> Vec<DefinitionSegment> {
    let mut segments: Vec<DefinitionSegment> = Vec::new();

    for record in records {
        match segments
            .iter_mut()
            .find(|s| s.process_definition_id == record.process_definition_id)
        {
            Some(segment) => segment.records.push(record),
            None => segments.push(DefinitionSegment {
                process_definition_id: record.process_definition_id.clone(),
                records: vec![record],
            }),
        }
    }

    segments
}

/// Keep the records of the most recently active definition.
///
/// An instance migrated to a new definition version starts a new trace; the
/// older segments are reported as [`ReconcileWarning::SupersededDefinition`].
pub fn select_current_definition(
    records: Vec<ActivityRecord>,
    warnings: &mut Vec<ReconcileWarning>,
) -> Vec<ActivityRecord> {
    let mut segments = partition_by_definition(records);
    if segments.len() <= 1 {
        return segments.pop().map(|s| s.records).unwrap_or_default();
    }

    // Later segments win ties so the last-seen definition is preferred.
    let current = segments
        .iter()
        .enumerate()
        .max_by_key(|(index, segment)| (segment.latest_start(), *index))
        .map(|(index, _)| index)
        .unwrap_or(0);

    let mut kept = Vec::new();
    for (index, segment) in segments.into_iter().enumerate() {
        if index == current {
            kept = segment.records;
            continue;
        }
        tracing::warn!(
            process_definition_id = %segment.process_definition_id,
            records = segment.records.len(),
            "Ignoring history from superseded process definition"
        );
        warnings.push(ReconcileWarning::SupersededDefinition {
            process_definition_id: segment.process_definition_id,
            records: segment.records.len(),
        });
    }
    kept
}
