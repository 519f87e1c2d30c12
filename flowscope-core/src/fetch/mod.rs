//! Workflow engine access
//!
//! The engine is an external data source. This module only reads from it:
//! the two history lists of a process instance and the structural graph of
//! its process definition.
//!
//! ## Usage
//!
//! Point `~/.config/flowscope/config.toml` at the engine:
//!
//! ```toml
//! [engine]
//! base_url = "http://localhost:8080/engine-rest"
//! username = "demo"
//! password = "demo"
//! ```

mod cache;
mod client;

pub use cache::DefinitionCache;
pub use client::{BlockingEngineClient, EngineClient, InstanceHistory};
