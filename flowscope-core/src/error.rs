//! Error types for flowscope-core

use thiserror::Error;

/// Which raw payload a [`Error::MalformedHistory`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryInput {
    /// The historic-activity list
    Activities,
    /// The task-centric process history list
    TaskHistory,
    /// The static process graph document
    ProcessGraph,
}

impl HistoryInput {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryInput::Activities => "activity history",
            HistoryInput::TaskHistory => "task history",
            HistoryInput::ProcessGraph => "process graph",
        }
    }
}

impl std::fmt::Display for HistoryInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the flowscope-core library
#[derive(Error, Debug)]
pub enum Error {
    /// A raw payload is not a well-formed record set
    #[error("malformed {input}: {reason}")]
    MalformedHistory { input: HistoryInput, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Workflow engine API error
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Process definition graph not found on the engine
    #[error("process definition not found: {0}")]
    DefinitionNotFound(String),
}

impl Error {
    pub(crate) fn malformed(input: HistoryInput, reason: impl Into<String>) -> Self {
        Error::MalformedHistory {
            input,
            reason: reason.into(),
        }
    }
}

/// Result type alias for flowscope-core
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_history_names_input() {
        let err = Error::malformed(HistoryInput::TaskHistory, "expected an array, got object");
        assert_eq!(
            err.to_string(),
            "malformed task history: expected an array, got object"
        );
    }
}
