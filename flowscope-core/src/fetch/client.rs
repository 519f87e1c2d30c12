//! HTTP client for the workflow engine history API
//!
//! Reads the two history lists of a process instance and the structural
//! graph of its process definition. The history lists have no ordering
//! dependency, so [`EngineClient::fetch_instance_history`] requests them
//! concurrently and returns once both have arrived.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;

use crate::config::{EngineConfig, DEFINITION_PLACEHOLDER, INSTANCE_PLACEHOLDER};
use crate::error::{Error, Result};
use crate::graph::ProcessGraph;
use crate::history;
use crate::pipeline::ReplayModel;

use super::cache::DefinitionCache;

/// Both history payloads of one process instance, as returned by the engine.
#[derive(Debug, Clone)]
pub struct InstanceHistory {
    pub activities: Value,
    pub tasks: Value,
}

/// HTTP client for the workflow engine REST API
pub struct EngineClient {
    config: EngineConfig,
    http_client: reqwest::Client,
    base_url: String,
}

impl EngineClient {
    /// Create a new engine client from configuration
    ///
    /// Returns an error if the configuration is invalid or missing required fields.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| Error::Config("engine.base_url is required".to_string()))?
            .trim_end_matches('/')
            .to_string();

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
            base_url,
        })
    }

    /// Historic-activity list of a process instance (raw JSON).
    pub async fn fetch_activity_history(&self, instance_id: &str) -> Result<Value> {
        let url = self.url(
            &self.config.activity_history_path,
            INSTANCE_PLACEHOLDER,
            instance_id,
        );
        self.get_json_with_retry(&url)
            .await?
            .ok_or_else(|| Error::Fetch(format!("process instance not found: {}", instance_id)))
    }

    /// Task-centric process history list of a process instance (raw JSON).
    pub async fn fetch_task_history(&self, instance_id: &str) -> Result<Value> {
        let url = self.url(&self.config.task_history_path, INSTANCE_PLACEHOLDER, instance_id);
        self.get_json_with_retry(&url)
            .await?
            .ok_or_else(|| Error::Fetch(format!("process instance not found: {}", instance_id)))
    }

    /// Fetch both history lists concurrently.
    ///
    /// Fails if either request fails; a partial history is never returned.
    pub async fn fetch_instance_history(&self, instance_id: &str) -> Result<InstanceHistory> {
        let (activities, tasks) = tokio::join!(
            self.fetch_activity_history(instance_id),
            self.fetch_task_history(instance_id)
        );

        Ok(InstanceHistory {
            activities: activities?,
            tasks: tasks?,
        })
    }

    /// Structural graph of a process definition.
    pub async fn fetch_definition_graph(&self, definition_id: &str) -> Result<ProcessGraph> {
        let url = self.url(
            &self.config.definition_graph_path,
            DEFINITION_PLACEHOLDER,
            definition_id,
        );
        let doc = self
            .get_json_with_retry(&url)
            .await?
            .ok_or_else(|| Error::DefinitionNotFound(definition_id.to_string()))?;

        let mut graph = ProcessGraph::from_value(&doc)?;
        graph.definition_id = Some(definition_id.to_string());
        Ok(graph)
    }

    /// Graph of a definition, served from `cache` unless `force_refresh` is set.
    pub async fn definition_graph(
        &self,
        definition_id: &str,
        cache: &mut DefinitionCache,
        force_refresh: bool,
    ) -> Result<ProcessGraph> {
        if force_refresh {
            cache.invalidate(definition_id);
        } else if let Some(graph) = cache.get(definition_id) {
            return Ok(graph.clone());
        }

        let graph = self.fetch_definition_graph(definition_id).await?;
        cache.insert(definition_id, graph.clone());
        Ok(graph)
    }

    /// Fetch everything needed to replay an instance and build its model.
    ///
    /// The graph is looked up for `definition_id`, or for the definition of
    /// the most recent activity when none is given. A definition the engine
    /// no longer knows is tolerated: the model is built without a graph and
    /// edges default to normal transitions.
    pub async fn load_replay_model(
        &self,
        instance_id: &str,
        definition_id: Option<&str>,
        cache: &mut DefinitionCache,
    ) -> Result<ReplayModel> {
        let raw = self.fetch_instance_history(instance_id).await?;
        let history = history::normalize(&raw.activities, &raw.tasks)?;

        let definition_id = definition_id.map(str::to_string).or_else(|| {
            history
                .activities
                .iter()
                .max_by_key(|r| r.start_time)
                .map(|r| r.process_definition_id.clone())
                .filter(|id| !id.is_empty())
        });

        let graph = match definition_id {
            Some(id) => match self.definition_graph(&id, cache, false).await {
                Ok(graph) => Some(graph),
                Err(Error::DefinitionNotFound(id)) => {
                    tracing::warn!(
                        definition_id = %id,
                        "Process graph not found; loop detection disabled"
                    );
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        Ok(ReplayModel::build(history, graph.as_ref()))
    }

    fn url(&self, template: &str, placeholder: &str, id: &str) -> String {
        format!(
            "{}{}",
            self.base_url,
            template.replace(placeholder, &urlencoding::encode(id))
        )
    }

    /// GET a JSON document. `Ok(None)` means 404.
    async fn get_json(&self, url: &str) -> Result<Option<Value>> {
        let mut request = self.http_client.get(url);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_ref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Fetch(format!("HTTP request failed: {}", e)))?;

        let status = response.status();

        if status.is_success() {
            let body: Value = response
                .json()
                .await
                .map_err(|e| Error::Fetch(format!("failed to parse response: {}", e)))?;
            Ok(Some(body))
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(None)
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            Err(Error::Fetch(format!(
                "API error ({}): {}",
                status.as_u16(),
                error_text
            )))
        }
    }

    /// GET with retry logic
    ///
    /// Retries transient failures (5xx, network errors) with exponential backoff.
    async fn get_json_with_retry(&self, url: &str) -> Result<Option<Value>> {
        let mut last_error = None;
        let mut delay = Duration::from_millis(250);

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::debug!(
                    url,
                    "Retrying GET (attempt {}/{}), waiting {:?}",
                    attempt + 1,
                    self.config.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                delay = std::cmp::min(delay * 2, Duration::from_secs(10));
            }

            match self.get_json(url).await {
                Ok(body) => return Ok(body),
                Err(e) if is_retryable_error(&e) => {
                    tracing::warn!(url, "Transient error fetching history: {}", e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| Error::Fetch("max retries exceeded".to_string())))
    }
}

/// Check if an error is retryable (transient)
fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::Fetch(msg) => {
            msg.starts_with("HTTP request failed") || msg.starts_with("API error (5")
        }
        _ => false,
    }
}

/// Synchronous wrapper for [`EngineClient`]
///
/// Provides blocking methods for use in synchronous code.
pub struct BlockingEngineClient {
    inner: EngineClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingEngineClient {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| Error::Fetch(format!("failed to create runtime: {}", e)))?;

        Ok(Self {
            inner: EngineClient::new(config)?,
            runtime,
        })
    }

    /// Fetch both history lists (blocking)
    pub fn fetch_instance_history(&self, instance_id: &str) -> Result<InstanceHistory> {
        self.runtime
            .block_on(self.inner.fetch_instance_history(instance_id))
    }

    /// Fetch a definition graph, through `cache` (blocking)
    pub fn definition_graph(
        &self,
        definition_id: &str,
        cache: &mut DefinitionCache,
        force_refresh: bool,
    ) -> Result<ProcessGraph> {
        self.runtime
            .block_on(self.inner.definition_graph(definition_id, cache, force_refresh))
    }

    /// Fetch and build the replay model of an instance (blocking)
    pub fn load_replay_model(
        &self,
        instance_id: &str,
        definition_id: Option<&str>,
        cache: &mut DefinitionCache,
    ) -> Result<ReplayModel> {
        self.runtime
            .block_on(self.inner.load_replay_model(instance_id, definition_id, cache))
    }
}
