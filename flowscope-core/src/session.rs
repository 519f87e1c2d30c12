//! Replay session state
//!
//! A [`ReplaySession`] owns the current [`ReplayModel`] of the instance on
//! screen together with the replay cursor. History loads are asynchronous and
//! may overlap; each load takes a [`LoadTicket`] and only the newest ticket
//! may install its result.
//!
//! ## Propagation policy
//!
//! - A result for an older ticket is discarded on arrival ([`LoadOutcome::Stale`]).
//! - A failed load keeps the previous model and records the error
//!   ([`LoadOutcome::Failed`]); the UI can show an error affordance while the
//!   last valid plan stays visible.
//! - A successful load replaces the model and resets the cursor to the end.

use crate::error::Error;
use crate::pipeline::ReplayModel;
use crate::types::AnnotationPlan;

/// Sequence number identifying one history load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

impl LoadTicket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// What happened to a finished load.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The new model is installed
    Applied,
    /// A newer load was started; this result was dropped
    Stale,
    /// The load failed; the previous model is kept
    Failed,
}

/// Current replay state for one diagram view.
#[derive(Debug, Default)]
pub struct ReplaySession {
    model: Option<ReplayModel>,
    cursor: Option<usize>,
    issued: u64,
    last_error: Option<Error>,
}

impl ReplaySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new load. Any load started earlier becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued += 1;
        LoadTicket(self.issued)
    }

    /// Whether `ticket` still belongs to the newest load.
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        ticket.0 == self.issued
    }

    /// Install the result of a load if it is still current.
    pub fn finish_load(
        &mut self,
        ticket: LoadTicket,
        result: crate::error::Result<ReplayModel>,
    ) -> LoadOutcome {
        if !self.is_current(ticket) {
            tracing::debug!(
                sequence = ticket.0,
                newest = self.issued,
                "Discarding stale history load"
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(model) => {
                self.model = Some(model);
                self.cursor = None;
                self.last_error = None;
                LoadOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(
                    sequence = ticket.0,
                    error = %err,
                    "History load failed; keeping previous plan"
                );
                self.last_error = Some(err);
                LoadOutcome::Failed
            }
        }
    }

    /// Move the replay cursor (`None` = show everything).
    pub fn set_cursor(&mut self, cursor: Option<usize>) {
        self.cursor = cursor;
    }

    /// Cursor as seen by the planner, clamped to the current trace.
    pub fn cursor(&self) -> usize {
        let len = self.model.as_ref().map(ReplayModel::len).unwrap_or(0);
        self.cursor.map_or(len, |c| c.min(len))
    }

    /// Plan for the current model and cursor, if a model was ever loaded.
    pub fn current_plan(&self) -> Option<AnnotationPlan> {
        self.model.as_ref().map(|model| model.plan(self.cursor))
    }

    pub fn model(&self) -> Option<&ReplayModel> {
        self.model.as_ref()
    }

    /// Error of the most recent load, cleared by the next successful one.
    pub fn last_error(&self) -> Option<&Error> {
        self.last_error.as_ref()
    }
}
