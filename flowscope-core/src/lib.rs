//! # flowscope-core
//!
//! Core library for flowscope - a process instance replay and diagram
//! annotation engine.
//!
//! Given the execution history of one BPMN process instance, this library
//! computes how the process diagram should be decorated: which elements were
//! visited, which one is active, in which order they ran, which transitions
//! closed a loop, and which human-readable label each task carries.
//!
//! ## Architecture
//!
//! Data flows through four stages:
//! - **Normalize:** raw engine payloads become typed records ([`history`])
//! - **Order:** records are sorted into a replayable trace ([`trace`])
//! - **Classify:** edges are split into normal and loop-back transitions
//!   ([`trace::loops`])
//! - **Plan:** a cursor-limited prefix becomes an [`AnnotationPlan`] ([`plan`])
//!
//! [`ReplayModel`] runs the first three once per fetch; planning is cheap
//! and runs on every cursor move. A renderer consumes the plan through the
//! [`render::MarkerSurface`] seam.
//!
//! ## Example
//!
//! ```rust
//! use flowscope_core::ReplayModel;
//! use serde_json::json;
//!
//! let activities = json!([
//!     {
//!         "activityId": "start",
//!         "activityType": "startEvent",
//!         "startTime": "2024-03-01T09:00:00Z"
//!     },
//!     {
//!         "activityId": "review",
//!         "activityType": "userTask",
//!         "startTime": "2024-03-01T09:00:05Z"
//!     },
//! ]);
//! let model = ReplayModel::from_payloads(&activities, &json!([]), None)
//!     .expect("valid history");
//!
//! let plan = model.plan(None);
//! assert_eq!(plan.active_node(), Some("review"));
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use error::{Error, HistoryInput, Result};
pub use fetch::{BlockingEngineClient, DefinitionCache, EngineClient};
pub use graph::ProcessGraph;
pub use history::{normalize, NormalizedHistory};
pub use pipeline::ReplayModel;
pub use render::{apply_plan, MarkerSurface, TextSurface};
pub use session::{LoadOutcome, LoadTicket, ReplaySession};
pub use trace::OrderedTrace;
pub use types::*;

// Public modules
pub mod config;
pub mod error;
pub mod fetch;
pub mod format;
pub mod graph;
pub mod history;
pub mod logging;
pub mod pipeline;
pub mod plan;
pub mod render;
pub mod session;
pub mod trace;
pub mod types;
