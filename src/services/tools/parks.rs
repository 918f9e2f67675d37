use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use strsim::normalized_levenshtein;
use tracing::{debug, info};
use url::Url;

use super::{string_arg, Tool, ToolError};

const PARK_LIMIT: &str = "500";

pub struct ParkLookupTool {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ParkLookupTool {
    pub fn new(http: Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    async fn fetch_parks(&self) -> Result<Vec<Value>, ToolError> {
        let endpoint = format!("{}/parks", self.base_url.trim_end_matches('/'));
        let url = Url::parse_with_params(&endpoint, &[("limit", PARK_LIMIT)])?;
        let response = self
            .http
            .get(url)
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Status {
                service: "NPS API",
                status: status.as_u16(),
            });
        }
        let body: Value = response.json().await?;
        Ok(body["data"].as_array().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Tool for ParkLookupTool {
    fn name(&self) -> &'static str {
        "park_lookup"
    }

    fn description(&self) -> &'static str {
        "Get National Park Service facts for a US national park: description, activities, \
directions and weather. Input is the park name; approximate names are fine."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "park_name": {"type": "string", "description": "Name of the national park"}
            },
            "required": ["park_name"]
        })
    }

    async fn call(&self, input: Value) -> Result<String, ToolError> {
        let park_name = string_arg(&input, "park_name")?;
        if self.api_key.trim().is_empty() {
            return Err(ToolError::NotConfigured(
                "park lookup unavailable: NPS_API_KEY is not set".into(),
            ));
        }

        let parks = self.fetch_parks().await?;
        let names: Vec<&str> = parks
            .iter()
            .map(|park| park["fullName"].as_str().unwrap_or_default())
            .collect();
        debug!(candidates = names.len(), query = %park_name, "matching park name");

        let idx = best_match(&park_name, &names)
            .ok_or_else(|| ToolError::NoMatch(format!("No park matched \"{park_name}\"")))?;
        info!(query = %park_name, matched = names[idx], "park lookup");
        Ok(summarize_park(&parks[idx]).to_string())
    }
}

/// Index of the candidate most similar to `query`. Any non-empty list
/// yields a match and the earliest candidate wins a tie.
pub fn best_match(query: &str, candidates: &[&str]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in candidates.iter().enumerate() {
        let score = similarity(query, candidate);
        if best.map_or(true, |(_, top)| score > top) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

/// Case-insensitive partial ratio in `0.0..=1.0`. Word-sorted forms are
/// scored too, so "national park yosemite" lines up with "Yosemite National Park".
pub fn similarity(query: &str, candidate: &str) -> f64 {
    let query = query.to_lowercase();
    let candidate = candidate.to_lowercase();
    partial_ratio(&query, &candidate).max(partial_ratio(
        &sort_words(&query),
        &sort_words(&candidate),
    ))
}

/// Best normalized Levenshtein similarity of the shorter string against
/// every window of the longer one with the same length.
fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count();
    if short_len == 0 {
        return 0.0;
    }
    let long_chars: Vec<char> = long.chars().collect();
    long_chars
        .windows(short_len)
        .map(|window| {
            let window: String = window.iter().collect();
            normalized_levenshtein(short, &window)
        })
        .fold(0.0, f64::max)
}

fn sort_words(text: &str) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    words.sort_unstable();
    words.join(" ")
}

/// The handful of NPS fields worth spending context on.
pub fn summarize_park(park: &Value) -> Value {
    let activities: Vec<&str> = park["activities"]
        .as_array()
        .map(|items| items.iter().filter_map(|a| a["name"].as_str()).collect())
        .unwrap_or_default();
    json!({
        "fullName": park["fullName"],
        "parkCode": park["parkCode"],
        "description": park["description"],
        "states": park["states"],
        "url": park["url"],
        "activities": activities,
        "directionsInfo": park["directionsInfo"],
        "weatherInfo": park["weatherInfo"],
    })
}
