//! **web_search** (spec §4.3): a provider-agnostic wrapper over Tavily,
//! LinkUp, and SearXNG, normalizing every result shape to
//! `{title, snippet, url}` and emitting `web_search_complete` /
//! `web_search_error` events.

use async_trait::async_trait;
use maestro_core::events::EventSink;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use crate::error::ToolError;
use crate::registry::Tool;
use crate::schema::{ToolCategory, ToolSchema};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebSearchProvider {
    Tavily,
    LinkUp,
    SearXng,
}

impl std::str::FromStr for WebSearchProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "tavily" => Self::Tavily,
            "linkup" => Self::LinkUp,
            "searxng" => Self::SearXng,
            other => return Err(format!("unknown web search provider: {other}")),
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct NormalizedResult {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

pub struct WebSearchTool {
    provider: WebSearchProvider,
    api_key: Option<String>,
    base_url: Option<String>,
    client: reqwest::Client,
    events: Arc<dyn EventSink>,
}

impl WebSearchTool {
    pub fn new(
        provider: WebSearchProvider,
        api_key: Option<String>,
        base_url: Option<String>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            provider,
            api_key,
            base_url,
            client: reqwest::Client::new(),
            events,
        }
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<NormalizedResult>, ToolError> {
        match self.provider {
            WebSearchProvider::Tavily => self.search_tavily(query, max_results).await,
            WebSearchProvider::LinkUp => self.search_linkup(query, max_results).await,
            WebSearchProvider::SearXng => self.search_searxng(query, max_results).await,
        }
    }

    async fn search_tavily(&self, query: &str, max_results: usize) -> Result<Vec<NormalizedResult>, ToolError> {
        #[derive(Deserialize)]
        struct TavilyResponse {
            results: Vec<TavilyResult>,
        }
        #[derive(Deserialize)]
        struct TavilyResult {
            title: String,
            content: String,
            url: String,
        }

        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ToolError::input_invalid("tavily_api_key is not configured"))?;
        let body = json!({
            "api_key": api_key,
            "query": query,
            "max_results": max_results,
        });
        let response = self
            .client
            .post("https://api.tavily.com/search")
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::transient(format!("tavily request failed: {e}")))?;
        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ToolError::parse_failure(format!("invalid tavily response: {e}")))?;
        Ok(parsed
            .results
            .into_iter()
            .map(|r| NormalizedResult {
                title: r.title,
                snippet: r.content,
                url: r.url,
            })
            .collect())
    }

    async fn search_linkup(&self, query: &str, max_results: usize) -> Result<Vec<NormalizedResult>, ToolError> {
        #[derive(Deserialize)]
        struct LinkUpResponse {
            results: Vec<LinkUpResult>,
        }
        #[derive(Deserialize)]
        struct LinkUpResult {
            name: String,
            content: String,
            url: String,
        }

        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ToolError::input_invalid("linkup_api_key is not configured"))?;
        let body = json!({
            "q": query,
            "depth": "standard",
            "outputType": "searchResults",
        });
        let response = self
            .client
            .post("https://api.linkup.so/v1/search")
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::transient(format!("linkup request failed: {e}")))?;
        let parsed: LinkUpResponse = response
            .json()
            .await
            .map_err(|e| ToolError::parse_failure(format!("invalid linkup response: {e}")))?;
        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(|r| NormalizedResult {
                title: r.name,
                snippet: r.content,
                url: r.url,
            })
            .collect())
    }

    async fn search_searxng(&self, query: &str, max_results: usize) -> Result<Vec<NormalizedResult>, ToolError> {
        #[derive(Deserialize)]
        struct SearxngResponse {
            results: Vec<SearxngResult>,
        }
        #[derive(Deserialize)]
        struct SearxngResult {
            title: String,
            #[serde(default)]
            content: String,
            url: String,
        }

        let base_url = self
            .base_url
            .as_ref()
            .ok_or_else(|| ToolError::input_invalid("searxng_base_url is not configured"))?;
        let response = self
            .client
            .get(format!("{}/search", base_url.trim_end_matches('/')))
            .query(&[("q", query), ("format", "json")])
            .send()
            .await
            .map_err(|e| ToolError::transient(format!("searxng request failed: {e}")))?;
        let parsed: SearxngResponse = response
            .json()
            .await
            .map_err(|e| ToolError::parse_failure(format!("invalid searxng response: {e}")))?;
        Ok(parsed
            .results
            .into_iter()
            .take(max_results)
            .map(|r| NormalizedResult {
                title: r.title,
                snippet: r.content,
                url: r.url,
            })
            .collect())
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Searches the web through a configured provider (Tavily, LinkUp, SearXNG)"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Retrieval
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string"},
                    "max_results": {"type": "integer"}
                }
            }),
            ["query"],
        )
    }

    #[tracing::instrument(skip(self, args, context))]
    async fn invoke(
        &self,
        args: serde_json::Value,
        context: &maestro_core::context::ExecutionContext,
    ) -> Result<serde_json::Value, ToolError> {
        context.check_cancelled().map_err(ToolError::from)?;
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::input_invalid("'query' must be a string"))?;
        let max_results = args
            .get("max_results")
            .and_then(|v| v.as_u64())
            .unwrap_or(10) as usize;

        match self.search(query, max_results).await {
            Ok(results) => {
                self.events.emit(
                    "web_search_complete",
                    json!({"type": "web_search_complete", "query": query, "result_count": results.len()}),
                );
                Ok(json!({ "results": results }))
            }
            Err(err) => {
                self.events.emit(
                    "web_search_error",
                    json!({"type": "web_search_error", "query": query, "message": err.message}),
                );
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_parses_documented_spellings() {
        assert_eq!("tavily".parse::<WebSearchProvider>().unwrap(), WebSearchProvider::Tavily);
        assert_eq!("linkup".parse::<WebSearchProvider>().unwrap(), WebSearchProvider::LinkUp);
        assert_eq!("searxng".parse::<WebSearchProvider>().unwrap(), WebSearchProvider::SearXng);
        assert!("bing".parse::<WebSearchProvider>().is_err());
    }
}
