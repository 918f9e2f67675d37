//! Tools the agent may call while researching a trip.
//!
//! Failures never abort the agent run: the executor folds them into an
//! `{"error": ...}` object that goes back to the model as the tool output.

pub mod parks;
pub mod wikipedia;

pub use parks::{best_match, summarize_park, ParkLookupTool};
pub use wikipedia::{format_extracts, parse_search_titles, WikipediaTool};

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    config::ToolsConfig,
    services::llm::{ToolCall, ToolDefinition},
};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("missing required argument `{0}`")]
    MissingArgument(&'static str),
    #[error("{0}")]
    NotConfigured(String),
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{service} returned status {status}")]
    Status { service: &'static str, status: u16 },
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("{0}")]
    NoMatch(String),
}

#[async_trait]
pub trait Tool: Send + Sync {
    /// Name the model uses in its tool call.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;

    async fn call(&self, input: Value) -> Result<String, ToolError>;
}

/// Pulls a string argument, accepting the bare-text fallback `{"input": ...}`.
pub(crate) fn string_arg(input: &Value, key: &'static str) -> Result<String, ToolError> {
    input[key]
        .as_str()
        .or_else(|| input["input"].as_str())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(ToolError::MissingArgument(key))
}

#[derive(Clone, Default)]
pub struct ToolExecutor {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wikipedia and park lookup tools sharing one HTTP client.
    pub fn standard(config: &ToolsConfig, http: reqwest::Client) -> Self {
        let mut executor = Self::new();
        executor.add_tool(Arc::new(WikipediaTool::new(
            http.clone(),
            config.wikipedia_base_url.clone(),
        )));
        executor.add_tool(Arc::new(ParkLookupTool::new(
            http,
            config.nps_base_url.clone(),
            config.nps_api_key.clone(),
        )));
        executor
    }

    pub fn add_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub async fn execute(&self, call: &ToolCall) -> String {
        let Some(tool) = self.tools.get(&call.name) else {
            return json!({ "error": format!("unknown tool: {}", call.name) }).to_string();
        };
        match tool.call(call.arguments.clone()).await {
            Ok(output) => output,
            Err(err) => json!({ "error": err.to_string() }).to_string(),
        }
    }
}
