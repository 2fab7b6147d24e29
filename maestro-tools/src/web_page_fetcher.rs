//! **web_page_fetcher** (spec §4.3): fetches a URL and extracts readable
//! text, caching by URL hash with an age bound of
//! `web_cache_expiration_days`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use scraper::{Html, Selector};
use serde_json::json;
use std::collections::HashMap;

use crate::error::ToolError;
use crate::registry::Tool;
use crate::schema::{ToolCategory, ToolSchema};
use maestro_utils::refid::sha1_hex8;

struct CacheEntry {
    text: String,
    title: Option<String>,
    fetched_at: DateTime<Utc>,
}

/// In-process fetch cache, keyed by the URL's sha1 hash. A persistent
/// backing store is an external collaborator (spec §1's "out of scope:
/// file ingestion... persistence DDL"); this cache only bounds repeat
/// fetches within a single process lifetime.
#[derive(Default)]
pub struct FetchCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl FetchCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get(&self, key: &str, max_age_days: i64) -> Option<(String, Option<String>)> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        let age = Utc::now().signed_duration_since(entry.fetched_at);
        if age.num_days() > max_age_days {
            return None;
        }
        Some((entry.text.clone(), entry.title.clone()))
    }

    fn put(&self, key: String, text: String, title: Option<String>) {
        self.entries.write().insert(
            key,
            CacheEntry {
                text,
                title,
                fetched_at: Utc::now(),
            },
        );
    }
}

pub struct WebPageFetcherTool {
    client: reqwest::Client,
    cache: FetchCache,
    cache_expiration_days: i64,
}

impl WebPageFetcherTool {
    pub fn new(cache_expiration_days: i64) -> Self {
        Self {
            client: reqwest::Client::new(),
            cache: FetchCache::new(),
            cache_expiration_days,
        }
    }

    async fn fetch(&self, url: &str) -> Result<(String, Option<String>), ToolError> {
        let cache_key = sha1_hex8(url);
        if let Some(cached) = self.cache.get(&cache_key, self.cache_expiration_days) {
            return Ok(cached);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ToolError::transient(format!("fetch of '{url}' failed: {e}")))?;
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::transient(format!("reading body of '{url}' failed: {e}")))?;

        let (text, title) = extract_readable_text(&body);
        self.cache.put(cache_key, text.clone(), title.clone());
        Ok((text, title))
    }
}

/// Strip script/style content and concatenate visible text, matching the
/// teacher's `scraper`-based extraction idiom (selector -> text nodes).
/// `scraper` has no element-removal API, so script/style/noscript subtrees
/// are skipped by walking the DOM directly rather than by post-filtering
/// joined text.
pub(crate) fn extract_readable_text(html: &str) -> (String, Option<String>) {
    let document = Html::parse_document(html);
    let title_selector = Selector::parse("title").expect("static selector parses");
    let title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty());

    let body_selector = Selector::parse("body").expect("static selector parses");
    let root = document
        .select(&body_selector)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut words = Vec::new();
    collect_visible_text(root, &mut words);
    let text = words.join(" ");

    (text, title)
}

/// Depth-first text collection that skips `script`/`style`/`noscript`
/// subtrees entirely.
fn collect_visible_text(element: scraper::ElementRef, out: &mut Vec<String>) {
    let tag = element.value().name();
    if matches!(tag, "script" | "style" | "noscript") {
        return;
    }
    for child in element.children() {
        if let Some(child_element) = scraper::ElementRef::wrap(child) {
            collect_visible_text(child_element, out);
        } else if let Some(text_node) = child.value().as_text() {
            out.extend(text_node.split_whitespace().map(str::to_string));
        }
    }
}

#[async_trait]
impl Tool for WebPageFetcherTool {
    fn name(&self) -> &str {
        "web_page_fetcher"
    }

    fn description(&self) -> &str {
        "Fetches a web page and extracts its readable text, cached by URL"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Retrieval
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            json!({
                "type": "object",
                "properties": {
                    "url": {"type": "string"}
                }
            }),
            ["url"],
        )
    }

    async fn invoke(
        &self,
        args: serde_json::Value,
        context: &maestro_core::context::ExecutionContext,
    ) -> Result<serde_json::Value, ToolError> {
        context.check_cancelled().map_err(ToolError::from)?;
        let url = args
            .get("url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::input_invalid("'url' must be a string"))?;
        let (text, title) = self.fetch(url).await?;
        Ok(json!({ "text": text, "title": title, "url": url }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_title_and_strips_scripts() {
        let html = "<html><head><title>Hi</title></head><body><p>Hello</p><script>evil()</script></body></html>";
        let (text, title) = extract_readable_text(html);
        assert_eq!(title, Some("Hi".to_string()));
        assert!(text.contains("Hello"));
    }

    #[test]
    fn cache_respects_age_bound() {
        let cache = FetchCache::new();
        cache.put("key".into(), "text".into(), None);
        assert!(cache.get("key", 7).is_some());
        assert!(cache.get("key", -1).is_none());
    }
}
