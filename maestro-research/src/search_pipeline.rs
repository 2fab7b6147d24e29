//! Iterative Search Pipeline (M1, spec §4.4): decomposes a research question
//! into sub-queries, enriches each with recent conversational context and a
//! mode-specific template, then runs a bounded search/assess/refine loop per
//! sub-query before folding every relevant hit into mission `Note`s.
//!
//! Grounded on `document_search.rs`'s strategize -> prepare -> retrieve ->
//! rerank pipeline shape, generalized from a single retrieval call to a
//! multi-attempt loop that also drives `web_search`/`web_page_fetcher`
//! through the tool registry rather than calling a vector store directly.
//! The per-attempt quality gate and query refinement are ported
//! algorithm-for-algorithm from `simplified_writing_agent.py`'s
//! `_assess_content_quality` (called from `_perform_focused_iterative_web_search`
//! / `_perform_focused_iterative_document_search`): one LLM call per attempt
//! returns `quality_score`/`is_sufficient`/`refined_query_suggestion` together,
//! rather than a bare result-count threshold and an independently-prompted
//! refinement call.

use chrono::{Datelike, Utc};
use maestro_core::context::ExecutionContext;
use maestro_core::error::Result;
use maestro_core::model::{Note, NoteId, Source, SourceType};
use maestro_core::traits::AgentInput;
use maestro_config::SettingsResolver;
use maestro_providers::{AgentRole, ModelDispatcher};
use maestro_tools::registry::ToolRegistry;
use maestro_utils::json_extract::extract_first_json;
use maestro_utils::refid::{derive_ref_id, SourceKind};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

/// Which retrieval surface a pipeline run targets. Document and web modes
/// share the decompose/enrich/loop shape but differ in tool name, result
/// shape, and whether a follow-up full-page fetch applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    Document,
    Web,
}

/// One relevant hit surviving the inner loop's relevance assessment, before
/// it's turned into a `Note`.
#[derive(Debug, Clone)]
struct RetrievedItem {
    dedup_key: String,
    source_id: String,
    title: String,
    content: String,
    source_metadata: std::collections::HashMap<String, serde_json::Value>,
}

/// The pipeline's output for a single research question: the notes worth
/// keeping plus the `Source` records the Report Generator will later cite
/// them through.
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub notes: Vec<Note>,
    pub sources: Vec<Source>,
}

pub struct IterativeSearchPipeline {
    dispatcher: Arc<ModelDispatcher>,
    resolver: Arc<SettingsResolver>,
    tools: Arc<ToolRegistry>,
}

impl IterativeSearchPipeline {
    pub fn new(dispatcher: Arc<ModelDispatcher>, resolver: Arc<SettingsResolver>, tools: Arc<ToolRegistry>) -> Self {
        Self { dispatcher, resolver, tools }
    }

    /// Run the full pipeline for one research question under `mission_id`.
    /// `recent_messages` is the last-6-messages window the enrichment step
    /// folds into each sub-query (spec §4.4).
    pub async fn run(
        &self,
        mode: SearchMode,
        question: &str,
        recent_messages: &[String],
        mission_id: &str,
        context: &ExecutionContext,
    ) -> Result<SearchOutcome> {
        context.check_cancelled()?;
        let max_decomposed = self.resolver.get_int("max_decomposed_queries", Some(mission_id))? as usize;
        let sub_queries = self.decompose(question, max_decomposed, mission_id).await;

        let mut global_seen: HashSet<String> = HashSet::new();
        let mut items: Vec<RetrievedItem> = Vec::new();

        // Sub-queries run sequentially (each one's refinement depends on its
        // own prior attempts), but the work inside a single attempt
        // (relevance assessment, full-content fetch) fans out concurrently.
        for sub_query in &sub_queries {
            context.check_cancelled()?;
            let enriched = enrich_query(mode, sub_query, recent_messages);
            let found = self
                .search_one_query(mode, &enriched, sub_query, mission_id, &mut global_seen, context)
                .await?;
            items.extend(found);
        }

        Ok(self.into_outcome(mode, items))
    }

    /// Step 1: split `question` into up to `max_decomposed` sub-queries.
    /// Tries an LLM call first (spec's preferred path); on dispatch failure
    /// or an unparseable/empty response, falls back to three rule-based
    /// decomposition patterns before giving up and researching the question
    /// verbatim.
    async fn decompose(&self, question: &str, max_decomposed: usize, mission_id: &str) -> Vec<String> {
        let prompt = format!(
            "Break this research question into at most {max_decomposed} focused sub-questions \
             that together cover it. Respond with a JSON array of strings.\n\nQuestion: {question}"
        );
        let input = AgentInput::from_prompt(prompt);
        if let Ok(output) = self.dispatcher.dispatch(AgentRole::Planning, input).await {
            if let Some(queries) =
                extract_first_json(&output.content).and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            {
                let queries: Vec<String> = queries.into_iter().filter(|q| !q.trim().is_empty()).collect();
                if !queries.is_empty() {
                    let mut queries = queries;
                    queries.truncate(max_decomposed.max(1));
                    tracing::debug!(mission_id, count = queries.len(), "decomposed question via planning model");
                    return queries;
                }
            }
        }

        let fallback = rule_based_decompose(question);
        let mut fallback = fallback;
        fallback.truncate(max_decomposed.max(1));
        tracing::debug!(mission_id, count = fallback.len(), "decomposed question via rule-based fallback");
        fallback
    }

    /// Steps 2-6: run the bounded search/assess/refine loop for one (already
    /// enriched) sub-query, returning every item judged relevant across all
    /// attempts, deduped against both this sub-query's own hits and every
    /// other sub-query's (`global_seen`).
    async fn search_one_query(
        &self,
        mode: SearchMode,
        enriched_query: &str,
        original_sub_query: &str,
        mission_id: &str,
        global_seen: &mut HashSet<String>,
        context: &ExecutionContext,
    ) -> Result<Vec<RetrievedItem>> {
        let max_attempts = self.resolver.get_int("max_search_iterations", Some(mission_id))?.max(1) as usize;
        let max_search_results = self.resolver.get_int("max_search_results", Some(mission_id))?.max(1) as usize;
        let max_doc_results = self.resolver.get_int("max_doc_results", Some(mission_id))?.max(1) as usize;

        let mut local_seen: HashSet<String> = HashSet::new();
        let mut collected: Vec<RetrievedItem> = Vec::new();
        let mut query = enriched_query.to_string();

        for attempt in 0..max_attempts {
            context.check_cancelled()?;
            let raw_results = self.invoke_search(mode, &query, max_search_results, max_doc_results, context).await?;

            let candidates: Vec<(String, String, String, std::collections::HashMap<String, serde_json::Value>)> =
                raw_results
                    .into_iter()
                    .filter_map(|v| parse_candidate(mode, &v))
                    .filter(|(key, ..)| !global_seen.contains(key) && !local_seen.contains(key))
                    .collect();

            // Step: parallel relevance assessment against the original
            // sub-query (not the enriched/refined form), fast model.
            let assessed = futures::future::join_all(candidates.into_iter().map(|(key, source_id, snippet, meta)| {
                let dispatcher = self.dispatcher.clone();
                let original = original_sub_query.to_string();
                async move {
                    let relevant = assess_relevance(&dispatcher, &original, &snippet).await;
                    (relevant, key, source_id, snippet, meta)
                }
            }))
            .await;

            let mut relevant_this_attempt: Vec<RetrievedItem> = Vec::new();
            for (relevant, key, source_id, snippet, meta) in assessed {
                if !relevant {
                    continue;
                }
                local_seen.insert(key.clone());
                global_seen.insert(key.clone());
                relevant_this_attempt.push(RetrievedItem {
                    dedup_key: key,
                    source_id,
                    title: meta
                        .get("title")
                        .and_then(|v| v.as_str())
                        .unwrap_or(original_sub_query)
                        .to_string(),
                    content: snippet,
                    source_metadata: meta,
                });
            }

            // Step: parallel full-content fetch (web mode only — document
            // chunks returned by `document_search` are already complete).
            if mode == SearchMode::Web {
                context.check_cancelled()?;
                relevant_this_attempt = self.fetch_full_content(relevant_this_attempt, context).await;
            }

            let attempt_content = relevant_this_attempt.iter().map(|item| item.content.as_str()).collect::<Vec<_>>().join("\n\n");
            let found_anything_new = !relevant_this_attempt.is_empty();
            collected.extend(relevant_this_attempt);

            // Only bother assessing quality once we have either new results
            // from this attempt or it's the first attempt (matches the
            // original's "only assess if we got new results" guard).
            if !found_anything_new && attempt > 0 {
                if attempt + 1 >= max_attempts {
                    break;
                }
                continue;
            }

            let content_type = match mode {
                SearchMode::Document => "document",
                SearchMode::Web => "web",
            };
            let assessment =
                assess_content_quality(&self.dispatcher, original_sub_query, content_type, &attempt_content).await;
            tracing::debug!(
                mission_id,
                attempt,
                quality_score = assessment.quality_score,
                is_sufficient = assessment.is_sufficient,
                "focused query quality assessment"
            );

            if assessment.is_sufficient || attempt + 1 >= max_attempts {
                break;
            }

            query = assessment.refined_query_suggestion;
        }

        Ok(collected)
    }

    async fn invoke_search(
        &self,
        mode: SearchMode,
        query: &str,
        max_search_results: usize,
        max_doc_results: usize,
        context: &ExecutionContext,
    ) -> Result<Vec<serde_json::Value>> {
        let (tool_name, args) = match mode {
            SearchMode::Document => (
                "document_search",
                json!({"query": query, "n_results": max_doc_results}),
            ),
            SearchMode::Web => ("web_search", json!({"query": query, "max_results": max_search_results})),
        };
        let result = self
            .tools
            .invoke(tool_name, args, context)
            .await
            .map_err(maestro_core::error::MaestroError::from)?;
        Ok(result
            .get("results")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default())
    }

    /// Web-mode follow-up: replace each item's snippet with the fetched
    /// page's full readable text, keeping the snippet if the fetch fails.
    async fn fetch_full_content(&self, items: Vec<RetrievedItem>, context: &ExecutionContext) -> Vec<RetrievedItem> {
        futures::future::join_all(items.into_iter().map(|mut item| {
            let tools = self.tools.clone();
            async move {
                let args = json!({"url": item.source_id});
                if let Ok(fetched) = tools.invoke("web_page_fetcher", args, context).await {
                    if let Some(text) = fetched.get("text").and_then(|v| v.as_str()) {
                        if !text.trim().is_empty() {
                            item.content = text.to_string();
                        }
                    }
                }
                item
            }
        }))
        .await
    }

    fn into_outcome(&self, mode: SearchMode, items: Vec<RetrievedItem>) -> SearchOutcome {
        let source_kind = match mode {
            SearchMode::Document => SourceKind::Document,
            SearchMode::Web => SourceKind::Web,
        };
        let source_type = match mode {
            SearchMode::Document => SourceType::Document,
            SearchMode::Web => SourceType::Web,
        };

        let mut notes = Vec::with_capacity(items.len());
        let mut sources = Vec::with_capacity(items.len());
        for item in items {
            let ref_id = derive_ref_id(source_kind, &item.source_id);
            let note_id: NoteId = uuid::Uuid::new_v4().to_string();
            notes.push(Note {
                note_id,
                content: item.content,
                source_type,
                source_id: item.source_id.clone(),
                source_metadata: item.source_metadata,
            });
            sources.push(Source {
                source_type,
                ref_id,
                title: item.title,
                url: matches!(mode, SearchMode::Web).then(|| item.source_id.clone()),
                doc_id: matches!(mode, SearchMode::Document).then_some(item.source_id),
                page: None,
                provider: None,
            });
        }
        SourceDedup::dedup_sources(&mut sources);
        SearchOutcome { notes, sources }
    }
}

/// Keeps the first `Source` seen per `ref_id`; later duplicates (the same
/// document surfacing under two sub-queries) are dropped rather than
/// double-cited.
struct SourceDedup;
impl SourceDedup {
    fn dedup_sources(sources: &mut Vec<Source>) {
        let mut seen = HashSet::new();
        sources.retain(|s| seen.insert(s.ref_id.clone()));
    }
}

fn parse_candidate(
    mode: SearchMode,
    value: &serde_json::Value,
) -> Option<(String, String, String, std::collections::HashMap<String, serde_json::Value>)> {
    match mode {
        SearchMode::Document => {
            let text = value.get("text").and_then(|v| v.as_str())?.to_string();
            let doc_id = value.get("doc_id").and_then(|v| v.as_str()).unwrap_or_default();
            let chunk_id = value.get("chunk_id").and_then(|v| v.as_str()).unwrap_or_default();
            let source_id = if chunk_id.is_empty() {
                doc_id.to_string()
            } else {
                format!("{doc_id}_{chunk_id}")
            };
            let meta = value
                .get("metadata")
                .and_then(|v| v.as_object())
                .map(|m| m.clone().into_iter().collect())
                .unwrap_or_default();
            let key = if source_id.is_empty() {
                format!("doc:{}", maestro_utils::refid::sha1_hex8(&text))
            } else {
                format!("doc:{source_id}")
            };
            Some((key, source_id, text, meta))
        }
        SearchMode::Web => {
            let url = value.get("url").and_then(|v| v.as_str())?.to_string();
            let snippet = value.get("snippet").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let title = value.get("title").and_then(|v| v.as_str()).unwrap_or_default().to_string();
            let mut meta = std::collections::HashMap::new();
            if !title.is_empty() {
                meta.insert("title".to_string(), serde_json::Value::String(title));
            }
            let key = format!("web:{url}");
            Some((key, url, snippet, meta))
        }
    }
}

async fn assess_relevance(dispatcher: &ModelDispatcher, question: &str, snippet: &str) -> bool {
    let truncated: String = snippet.chars().take(800).collect();
    let prompt = format!(
        "Is the following passage relevant to answering the question \"{question}\"? \
         Respond with only YES or NO.\n\nPassage: {truncated}"
    );
    let input = AgentInput::from_prompt(prompt);
    match dispatcher.dispatch(AgentRole::Research, input).await {
        Ok(output) => output.content.trim().to_uppercase().starts_with("YES"),
        // A fast-model hiccup shouldn't silently drop a candidate; treat
        // it as relevant and let later stages (dedup, writing) filter noise.
        Err(_) => true,
    }
}

/// The JSON shape the quality-assessment prompt asks the model for;
/// `#[serde(default)]` on the optional-looking fields absorbs a response that
/// dropped one of them rather than failing the whole parse (the original's
/// `all(key in assessment for key in [...])` check is stricter, but a
/// partial-but-parseable response is still better signal than the
/// conservative fallback).
#[derive(Debug, Clone, serde::Deserialize)]
struct RawQualityAssessment {
    #[serde(default = "default_quality_score")]
    quality_score: serde_json::Value,
    is_sufficient: bool,
    #[serde(default)]
    refined_query_suggestion: String,
}

fn default_quality_score() -> serde_json::Value {
    json!(5)
}

/// Result of scoring one attempt's retrieved content against the original
/// sub-query (spec §4.4 step 4; ported from `_assess_content_quality`).
#[derive(Debug, Clone)]
struct QualityAssessment {
    quality_score: u8,
    is_sufficient: bool,
    refined_query_suggestion: String,
}

impl QualityAssessment {
    /// Spec §7's documented `ParseFailure` default for this use-site:
    /// `quality_score=5, is_sufficient=len(content)>500`. Used both when the
    /// dispatch call itself fails and when its response isn't parseable JSON.
    fn conservative_fallback(query: &str, content: &str) -> Self {
        Self {
            quality_score: 5,
            is_sufficient: content.len() > 500,
            refined_query_suggestion: format!("{query} (more detailed information)"),
        }
    }
}

/// One LLM call per attempt: scores the attempt's retrieved content 1-10
/// against the original sub-query and decides whether to keep iterating,
/// returning a refined query to try next if not. Ported from
/// `simplified_writing_agent.py::_assess_content_quality`.
async fn assess_content_quality(
    dispatcher: &ModelDispatcher,
    original_query: &str,
    content_type: &str,
    content: &str,
) -> QualityAssessment {
    let truncated: String = content.chars().take(2000).collect();
    let prompt = format!(
        "You are a content quality assessor. Evaluate if the retrieved {content_type} content \
         adequately addresses the user's query.\n\nUser's Query: {original_query}\n\n\
         Retrieved Content:\n{truncated}\n\n\
         Rate the content quality and determine if more searches are needed.\n\n\
         Respond with ONLY a JSON object, no other text:\n\
         {{\"quality_score\": 8, \"is_sufficient\": true, \"refined_query_suggestion\": \"better search query\"}}"
    );
    let input = AgentInput::from_prompt(prompt);

    let Ok(output) = dispatcher.dispatch(AgentRole::Research, input).await else {
        return QualityAssessment::conservative_fallback(original_query, content);
    };

    let Some(parsed) =
        extract_first_json(&output.content).and_then(|raw| serde_json::from_str::<RawQualityAssessment>(raw).ok())
    else {
        return QualityAssessment::conservative_fallback(original_query, content);
    };

    let quality_score = parsed.quality_score.as_u64().map_or(5, |n| n.clamp(1, 10) as u8);
    let refined_query_suggestion = if parsed.refined_query_suggestion.trim().is_empty() {
        format!("{original_query} (more detailed information)")
    } else {
        parsed.refined_query_suggestion
    };
    QualityAssessment { quality_score, is_sufficient: parsed.is_sufficient, refined_query_suggestion }
}

/// Fold the last-6-messages window and a mode-specific template carrying
/// the current date/year into a sub-query before it's searched (spec
/// §4.4's enrichment step). Kept as local string templating, not a further
/// LLM call — the templated prompt is what gets searched against.
fn enrich_query(mode: SearchMode, sub_query: &str, recent_messages: &[String]) -> String {
    let now = Utc::now();
    let context_window = recent_messages.iter().rev().take(6).cloned().collect::<Vec<_>>().join(" ");
    let mode_template = match mode {
        SearchMode::Document => "Search the document collection for",
        SearchMode::Web => "Search the web for",
    };
    if context_window.trim().is_empty() {
        format!("{mode_template}: {sub_query} (current date: {}-{:02}-{:02})", now.year(), now.month(), now.day())
    } else {
        format!(
            "{mode_template}: {sub_query} (current date: {}-{:02}-{:02}; recent context: {context_window})",
            now.year(),
            now.month(),
            now.day()
        )
    }
}

/// Three rule-based decomposition patterns tried in order when the planning
/// model is unavailable or returns nothing usable (spec §4.4): "activities
/// in X and in Y", a generic "X and Y" split with substantive halves, and a
/// comma-separated split with substantive halves. Falls back to the
/// question verbatim if none apply.
fn rule_based_decompose(question: &str) -> Vec<String> {
    if let Some(parts) = split_in_x_and_in_y(question) {
        return parts;
    }
    if let Some(parts) = split_and_substantive(question) {
        return parts;
    }
    if let Some(parts) = split_comma_substantive(question) {
        return parts;
    }
    vec![question.to_string()]
}

const MIN_SUBSTANTIVE_WORDS: usize = 3;

fn is_substantive(text: &str) -> bool {
    text.split_whitespace().count() >= MIN_SUBSTANTIVE_WORDS
}

/// "activities in France and in Germany" -> ["activities in France",
/// "activities in Germany"], recognized by two " in " occurrences joined by
/// " and ".
fn split_in_x_and_in_y(question: &str) -> Option<Vec<String>> {
    let lower = question.to_lowercase();
    let and_in = " and in ";
    let idx = lower.find(and_in)?;
    let first_in = lower[..idx].find(" in ")?;
    let prefix = question[..first_in].trim();
    let first_half = question[..idx].trim();
    let second_half = format!("{prefix} in {}", question[idx + and_in.len()..].trim());
    if is_substantive(first_half) && is_substantive(&second_half) {
        Some(vec![first_half.to_string(), second_half])
    } else {
        None
    }
}

/// "the economic impact and the social impact" -> two substantive halves
/// split on the first standalone " and ".
fn split_and_substantive(question: &str) -> Option<Vec<String>> {
    let idx = question.to_lowercase().find(" and ")?;
    let first = question[..idx].trim();
    let second = question[idx + 5..].trim();
    if is_substantive(first) && is_substantive(second) {
        Some(vec![first.to_string(), second.to_string()])
    } else {
        None
    }
}

/// Comma-separated halves, each required to be substantive on its own so a
/// question with a single incidental comma doesn't get split pointlessly.
fn split_comma_substantive(question: &str) -> Option<Vec<String>> {
    let parts: Vec<&str> = question.split(", ").map(str::trim).filter(|s| !s.is_empty()).collect();
    if parts.len() < 2 || !parts.iter().all(|p| is_substantive(p)) {
        return None;
    }
    Some(parts.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn activities_in_x_and_in_y_splits_into_two_full_questions() {
        let parts = split_in_x_and_in_y("What are the economic activities in France and in Germany").unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].contains("France"));
        assert!(parts[1].contains("Germany"));
        assert!(parts[1].starts_with("What are the economic activities"));
    }

    #[test]
    fn and_split_requires_both_halves_substantive() {
        assert!(split_and_substantive("cats and dogs").is_none());
        let parts = split_and_substantive("the economic impact of tariffs and the social impact of tariffs").unwrap();
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn comma_split_requires_every_part_substantive() {
        assert!(split_comma_substantive("apples, bananas, oranges").is_none());
        let parts = split_comma_substantive(
            "describe the first major event, describe the second major event, describe the third major event",
        )
        .unwrap();
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn rule_based_decompose_falls_back_to_verbatim_question() {
        let parts = rule_based_decompose("What happened?");
        assert_eq!(parts, vec!["What happened?".to_string()]);
    }

    #[test]
    fn rule_based_decompose_prefers_in_x_and_in_y_pattern() {
        let parts = rule_based_decompose("Describe the culture in Japan and in Korea");
        assert_eq!(parts.len(), 2);
    }

    #[test]
    fn enrich_query_injects_current_year() {
        let enriched = enrich_query(SearchMode::Web, "latest AI regulation", &[]);
        assert!(enriched.contains(&Utc::now().year().to_string()));
        assert!(enriched.starts_with("Search the web for"));
    }

    #[test]
    fn enrich_query_folds_in_recent_context_when_present() {
        let messages = vec!["earlier turn".to_string(), "another turn".to_string()];
        let enriched = enrich_query(SearchMode::Document, "population growth", &messages);
        assert!(enriched.contains("recent context"));
    }

    #[test]
    fn conservative_fallback_treats_substantial_content_as_sufficient() {
        let short = QualityAssessment::conservative_fallback("q", &"x".repeat(100));
        assert_eq!(short.quality_score, 5);
        assert!(!short.is_sufficient);

        let long = QualityAssessment::conservative_fallback("q", &"x".repeat(600));
        assert!(long.is_sufficient);
    }

    #[test]
    fn raw_quality_assessment_parses_documented_response_shape() {
        let raw: RawQualityAssessment =
            serde_json::from_str(r#"{"quality_score": 8, "is_sufficient": true, "refined_query_suggestion": "x"}"#).unwrap();
        assert_eq!(raw.quality_score, json!(8));
        assert!(raw.is_sufficient);
    }

    #[test]
    fn parse_document_candidate_joins_doc_and_chunk_ids() {
        let value = json!({"text": "hello", "doc_id": "d1", "chunk_id": "c2", "metadata": {}});
        let (key, source_id, text, _meta) = parse_candidate(SearchMode::Document, &value).unwrap();
        assert_eq!(source_id, "d1_c2");
        assert_eq!(key, "doc:d1_c2");
        assert_eq!(text, "hello");
    }

    #[test]
    fn parse_web_candidate_keys_by_url() {
        let value = json!({"url": "https://example.com/a", "snippet": "s", "title": "t"});
        let (key, source_id, _text, meta) = parse_candidate(SearchMode::Web, &value).unwrap();
        assert_eq!(source_id, "https://example.com/a");
        assert_eq!(key, "web:https://example.com/a");
        assert_eq!(meta.get("title").unwrap(), "t");
    }

    #[test]
    fn dedup_sources_keeps_first_occurrence_per_ref_id() {
        let mut sources = vec![
            Source {
                source_type: SourceType::Web,
                ref_id: "abc".into(),
                title: "first".into(),
                url: Some("https://a".into()),
                doc_id: None,
                page: None,
                provider: None,
            },
            Source {
                source_type: SourceType::Web,
                ref_id: "abc".into(),
                title: "second".into(),
                url: Some("https://a".into()),
                doc_id: None,
                page: None,
                provider: None,
            },
        ];
        SourceDedup::dedup_sources(&mut sources);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].title, "first");
    }
}
