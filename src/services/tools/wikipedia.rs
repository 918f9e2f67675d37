use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;
use url::Url;

use super::{string_arg, Tool, ToolError};

const MAX_RESULTS: usize = 3;
const MAX_CHARS: usize = 4000;
const NO_RESULT: &str = "No good Wikipedia Search Result was found";

pub struct WikipediaTool {
    http: Client,
    base_url: String,
}

impl WikipediaTool {
    pub fn new(http: Client, base_url: String) -> Self {
        Self { http, base_url }
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> Result<Value, ToolError> {
        let url = Url::parse_with_params(&self.base_url, params)?;
        let response = self
            .http
            .get(url)
            .header("User-Agent", "trip-planner/0.1")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Status {
                service: "Wikipedia",
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl Tool for WikipediaTool {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    fn description(&self) -> &'static str {
        "Look up general knowledge about a place, landmark or attraction on Wikipedia. \
Input is a search query."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {"type": "string", "description": "What to search Wikipedia for"}
            },
            "required": ["query"]
        })
    }

    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let query = string_arg(&input, "query")?;
        let limit = MAX_RESULTS.to_string();
        let search = self
            .get_json(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query.as_str()),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .await?;
        let titles = parse_search_titles(&search);
        debug!(query = %query, hits = titles.len(), "wikipedia search");
        if titles.is_empty() {
            return Ok(NO_RESULT.to_string());
        }

        let joined = titles.join("|");
        let extracts = self
            .get_json(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", joined.as_str()),
                ("format", "json"),
            ])
            .await?;
        Ok(format_extracts(&extracts, &titles))
    }
}

pub fn parse_search_titles(body: &Value) -> Vec<String> {
    body["query"]["search"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .filter_map(|hit| hit["title"].as_str())
                .take(MAX_RESULTS)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// "Page: / Summary:" blocks in search-rank order, capped at `MAX_CHARS`.
pub fn format_extracts(body: &Value, titles: &[String]) -> String {
    let Some(pages) = body["query"]["pages"].as_object() else {
        return NO_RESULT.to_string();
    };

    let blocks: Vec<String> = titles
        .iter()
        .filter_map(|title| {
            pages
                .values()
                .find(|page| page["title"].as_str() == Some(title.as_str()))
                .and_then(|page| page["extract"].as_str())
                .map(str::trim)
                .filter(|extract| !extract.is_empty())
                .map(|extract| format!("Page: {title}\nSummary: {extract}"))
        })
        .collect();

    if blocks.is_empty() {
        return NO_RESULT.to_string();
    }
    blocks.join("\n\n").chars().take(MAX_CHARS).collect()
}
