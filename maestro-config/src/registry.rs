//! Standard parameter registrations (spec §6 "Environment variables"),
//! grounded on `llmspell-config/src/env_registry.rs`'s per-concern grouping
//! functions (`register_runtime_vars`, `register_provider_vars`, ...).

use crate::{ParamDef, ParamKind, ParamValue};

pub fn standard_params() -> Vec<ParamDef> {
    let mut params = Vec::new();
    params.extend(provider_params());
    params.extend(search_params());
    params.extend(research_budget_params());
    params.extend(timing_params());
    params
}

fn provider_params() -> Vec<ParamDef> {
    vec![
        ParamDef::new("openrouter_api_key", ParamKind::String)
            .env("OPENROUTER_API_KEY")
            .user_path("providers.openrouter_api_key")
            .required(),
        ParamDef::new("openrouter_base_url", ParamKind::String)
            .env("OPENROUTER_BASE_URL")
            .user_path("providers.openrouter_base_url")
            .default_value(ParamValue::String(
                "https://openrouter.ai/api/v1".to_string(),
            )),
        ParamDef::new("local_llm_base_url", ParamKind::String)
            .env("LOCAL_LLM_BASE_URL")
            .user_path("providers.local_llm_base_url"),
        ParamDef::new("local_llm_api_key", ParamKind::String)
            .env("LOCAL_LLM_API_KEY")
            .user_path("providers.local_llm_api_key"),
        ParamDef::new("fast_llm_provider", ParamKind::String)
            .env("FAST_LLM_PROVIDER")
            .user_path("providers.fast_llm_provider")
            .default_value(ParamValue::String("openrouter".to_string())),
        ParamDef::new("mid_llm_provider", ParamKind::String)
            .env("MID_LLM_PROVIDER")
            .user_path("providers.mid_llm_provider")
            .default_value(ParamValue::String("openrouter".to_string())),
        ParamDef::new("intelligent_llm_provider", ParamKind::String)
            .env("INTELLIGENT_LLM_PROVIDER")
            .user_path("providers.intelligent_llm_provider")
            .default_value(ParamValue::String("openrouter".to_string())),
        ParamDef::new("verifier_llm_provider", ParamKind::String)
            .env("VERIFIER_LLM_PROVIDER")
            .user_path("providers.verifier_llm_provider")
            .default_value(ParamValue::String("openrouter".to_string())),
    ]
}

fn search_params() -> Vec<ParamDef> {
    vec![
        ParamDef::new("web_search_provider", ParamKind::String)
            .env("WEB_SEARCH_PROVIDER")
            .user_path("search.web_search_provider")
            .default_value(ParamValue::String("tavily".to_string())),
        ParamDef::new("tavily_api_key", ParamKind::String)
            .env("TAVILY_API_KEY")
            .user_path("search.tavily_api_key"),
        ParamDef::new("linkup_api_key", ParamKind::String)
            .env("LINKUP_API_KEY")
            .user_path("search.linkup_api_key"),
        ParamDef::new("searxng_base_url", ParamKind::String)
            .env("SEARXNG_BASE_URL")
            .user_path("search.searxng_base_url"),
    ]
}

fn research_budget_params() -> Vec<ParamDef> {
    vec![
        ParamDef::new("max_decomposed_queries", ParamKind::Int)
            .env("MAX_DECOMPOSED_QUERIES")
            .mission_key("max_decomposed_queries")
            .user_path("research.max_decomposed_queries")
            .default_value(ParamValue::Int(4)),
        ParamDef::new("max_search_iterations", ParamKind::Int)
            .env("MAX_SEARCH_ITERATIONS")
            .mission_key("max_search_iterations")
            .user_path("research.max_search_iterations")
            .default_value(ParamValue::Int(3)),
        ParamDef::new("max_search_results", ParamKind::Int)
            .env("MAX_SEARCH_RESULTS")
            .mission_key("max_search_results")
            .user_path("research.max_search_results")
            .default_value(ParamValue::Int(10)),
        ParamDef::new("max_doc_results", ParamKind::Int)
            .env("MAX_DOC_RESULTS")
            .mission_key("max_doc_results")
            .user_path("research.max_doc_results")
            .default_value(ParamValue::Int(10)),
        ParamDef::new("initial_research_max_depth", ParamKind::Int)
            .env("INITIAL_RESEARCH_MAX_DEPTH")
            .mission_key("initial_research_max_depth")
            .default_value(ParamValue::Int(2)),
        ParamDef::new("initial_research_max_questions", ParamKind::Int)
            .env("INITIAL_RESEARCH_MAX_QUESTIONS")
            .mission_key("initial_research_max_questions")
            .default_value(ParamValue::Int(5)),
        ParamDef::new("structured_research_rounds", ParamKind::Int)
            .env("STRUCTURED_RESEARCH_ROUNDS")
            .mission_key("structured_research_rounds")
            .user_path("research.structured_research_rounds")
            .default_value(ParamValue::Int(2)),
        ParamDef::new("writing_passes", ParamKind::Int)
            .env("WRITING_PASSES")
            .mission_key("writing_passes")
            .user_path("writing.writing_passes")
            .default_value(ParamValue::Int(2)),
        ParamDef::new("thought_pad_context_limit", ParamKind::Int)
            .env("THOUGHT_PAD_CONTEXT_LIMIT")
            .mission_key("thought_pad_context_limit")
            .default_value(ParamValue::Int(20)),
        ParamDef::new("max_concurrent_requests", ParamKind::Int)
            .env("MAX_CONCURRENT_REQUESTS")
            .user_path("providers.max_concurrent_requests")
            .default_value(ParamValue::Int(0)),
        ParamDef::new("skip_final_replanning", ParamKind::Bool)
            .env("SKIP_FINAL_REPLANNING")
            .mission_key("skip_final_replanning")
            .default_value(ParamValue::Bool(false)),
        ParamDef::new("max_total_depth", ParamKind::Int)
            .env("MAX_TOTAL_DEPTH")
            .mission_key("max_total_depth")
            .user_path("research.max_total_depth")
            .default_value(ParamValue::Int(2)),
        ParamDef::new("max_planning_context_chars", ParamKind::Int)
            .mission_key("max_planning_context_chars")
            .default_value(ParamValue::Int(60_000)),
        ParamDef::new("max_suggestions_per_batch", ParamKind::Int)
            .mission_key("max_suggestions_per_batch")
            .default_value(ParamValue::Int(-1)),
    ]
}

fn timing_params() -> Vec<ParamDef> {
    vec![
        ParamDef::new("llm_request_timeout", ParamKind::Int)
            .env("LLM_REQUEST_TIMEOUT")
            .user_path("providers.llm_request_timeout")
            .default_value(ParamValue::Int(600)),
        ParamDef::new("max_retries", ParamKind::Int)
            .env("MAX_RETRIES")
            .user_path("providers.max_retries")
            .default_value(ParamValue::Int(3)),
        ParamDef::new("retry_delay", ParamKind::Float)
            .env("RETRY_DELAY")
            .user_path("providers.retry_delay")
            .default_value(ParamValue::Float(2.0)),
        ParamDef::new("web_cache_expiration_days", ParamKind::Int)
            .env("WEB_CACHE_EXPIRATION_DAYS")
            .user_path("search.web_cache_expiration_days")
            .default_value(ParamValue::Int(7)),
        ParamDef::new("tz", ParamKind::String)
            .env("TZ")
            .default_value(ParamValue::String("UTC".to_string())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SettingsResolver;

    #[test]
    fn standard_params_register_without_panicking() {
        let resolver = SettingsResolver::default();
        assert_eq!(
            resolver.get("writing_passes", None).unwrap(),
            ParamValue::Int(2)
        );
        assert_eq!(
            resolver.get("max_total_depth", None).unwrap(),
            ParamValue::Int(2)
        );
        assert_eq!(
            resolver.get("max_suggestions_per_batch", None).unwrap(),
            ParamValue::Int(-1)
        );
    }

    #[test]
    fn missing_api_key_surfaces_configuration_required() {
        let resolver = SettingsResolver::default();
        // No OPENROUTER_API_KEY set in this process and no user settings
        // layer populated, so resolution must fail loudly rather than
        // silently default.
        if std::env::var("OPENROUTER_API_KEY").is_err() {
            assert!(resolver.get("openrouter_api_key", None).is_err());
        }
    }
}
