//! Search tool — one SerpAPI query per invocation.
//!
//! The response is mined for a single short answer, in order of
//! preference:
//!
//! 1. `answer_box.answer`
//! 2. `answer_box.snippet`
//! 3. `organic_results[0].snippet`
//!
//! and `"no answer found"` when none of them is present.

use async_trait::async_trait;
use ponder_core::error::ToolError;
use ponder_core::tool::Tool;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

/// Default SerpAPI endpoint.
pub const SERPAPI_ENDPOINT: &str = "https://serpapi.com/search";

const NO_ANSWER: &str = "no answer found";

pub struct SearchTool {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl SearchTool {
    pub fn new(client: Client, endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        }
    }

    /// Build from the `[search]` config section.
    pub fn from_config(config: &ponder_config::SearchConfig) -> Self {
        Self::new(
            Client::new(),
            config.endpoint.clone(),
            config.api_key.clone(),
        )
    }

    fn transport(reason: impl std::fmt::Display) -> ToolError {
        ToolError::Transport {
            tool_name: "Search".into(),
            reason: reason.to_string(),
        }
    }
}

fn non_empty(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}

/// Pick the best available answer out of a SerpAPI response body.
pub fn extract_answer(body: &Value) -> &str {
    non_empty(&body["answer_box"]["answer"])
        .or_else(|| non_empty(&body["answer_box"]["snippet"]))
        .or_else(|| non_empty(&body["organic_results"][0]["snippet"]))
        .unwrap_or(NO_ANSWER)
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "Search"
    }

    fn description(&self) -> &str {
        "a search engine. Useful for when you need to answer questions about current events. \
         Input should be a search query."
    }

    async fn execute(&self, input: &str) -> Result<String, ToolError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ToolError::NotConfigured("Search has no API key".into()))?;

        let query = input.trim();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("empty search query".into()));
        }

        debug!(query = %query, "Searching");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("api_key", api_key), ("q", query)])
            .send()
            .await
            .map_err(Self::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::transport(format!("HTTP {status}")));
        }

        let body: Value = response.json().await.map_err(Self::transport)?;
        let answer = extract_answer(&body).to_string();
        debug!(answer = %answer, "Search answered");
        Ok(answer)
    }
}
