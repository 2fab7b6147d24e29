//! The Model Dispatcher (L2, spec §4.2): resolves an `AgentRole` to a
//! concrete provider and model through the Settings Resolver, bounds
//! concurrency with a semaphore, retries transient failures, and folds
//! usage into the process-wide `CostTracker`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use maestro_core::error::{MaestroError, Result};
use maestro_core::traits::{AgentInput, AgentOutput, UsageDetails};
use maestro_config::SettingsResolver;
use tokio::sync::Semaphore;

use crate::cost::CostTracker;
use crate::provider::{ChatCompletionProvider, CompletionRequest};
use crate::roles::AgentRole;

/// Per-model-class concrete routing: which provider to call and which
/// model name to send it, resolved once per dispatcher construction from
/// the Settings Resolver's `{class}_llm_provider` / `{class}_model` keys.
#[derive(Debug, Clone)]
pub struct ModelRoute {
    pub provider: String,
    pub model: String,
}

/// Per-role overrides a caller may supply (spec §4.2's
/// "dispatch(messages, role?, response_format?, overrides?)").
#[derive(Debug, Clone, Default)]
pub struct DispatchOverrides {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub model: Option<String>,
}

pub struct ModelDispatcher {
    providers: HashMap<String, Arc<dyn ChatCompletionProvider>>,
    routes: HashMap<&'static str, ModelRoute>,
    resolver: Arc<SettingsResolver>,
    cost_tracker: Arc<CostTracker>,
    semaphore: Option<Arc<Semaphore>>,
    max_retries: u32,
    retry_delay: Duration,
}

impl ModelDispatcher {
    /// `max_concurrent_requests` of 0 means unbounded, per spec §4.2 and
    /// the `max_concurrent_requests` parameter's default (registry.rs).
    pub fn new(
        resolver: Arc<SettingsResolver>,
        cost_tracker: Arc<CostTracker>,
        max_concurrent_requests: u32,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            providers: HashMap::new(),
            routes: HashMap::new(),
            resolver,
            cost_tracker,
            semaphore: if max_concurrent_requests == 0 {
                None
            } else {
                Some(Arc::new(Semaphore::new(max_concurrent_requests as usize)))
            },
            max_retries,
            retry_delay,
        }
    }

    pub fn register_provider(&mut self, name: impl Into<String>, provider: Arc<dyn ChatCompletionProvider>) {
        self.providers.insert(name.into(), provider);
    }

    pub fn register_route(&mut self, model_class: &'static str, route: ModelRoute) {
        self.routes.insert(model_class, route);
    }

    fn route_for(&self, role: AgentRole) -> Result<&ModelRoute> {
        let class = role.model_class().as_str();
        self.routes.get(class).ok_or_else(|| {
            MaestroError::configuration(format!(
                "no model route registered for model class '{class}'"
            ))
        })
    }

    /// Dispatch one chat-completion call for `role`, retrying transient
    /// provider errors up to `max_retries` times with `retry_delay` between
    /// attempts. Authentication failures never retry (spec §4.2).
    pub async fn dispatch(&self, role: AgentRole, input: AgentInput) -> Result<AgentOutput> {
        self.dispatch_with_overrides(role, input, DispatchOverrides::default())
            .await
    }

    /// As `dispatch`, but a caller-supplied model/temperature/max_tokens
    /// override wins over both the input and the resolved route (spec
    /// §4.2's "dispatch(messages, role?, response_format?, overrides?)").
    #[tracing::instrument(skip(self, input, overrides), fields(role = role.as_str()))]
    pub async fn dispatch_with_overrides(
        &self,
        role: AgentRole,
        input: AgentInput,
        overrides: DispatchOverrides,
    ) -> Result<AgentOutput> {
        let route = self.route_for(role)?;
        let provider = self.providers.get(&route.provider).ok_or_else(|| {
            MaestroError::configuration(format!("no provider registered for '{}'", route.provider))
        })?;
        let model = overrides.model.clone().unwrap_or_else(|| route.model.clone());
        let provider_name = route.provider.clone();

        let _permit = match &self.semaphore {
            Some(sem) => Some(sem.clone().acquire_owned().await.map_err(|_| {
                MaestroError::internal("dispatcher semaphore closed unexpectedly")
            })?),
            None => None,
        };

        let request = CompletionRequest {
            messages: input.messages,
            model,
            temperature: overrides.temperature.or(input.temperature),
            max_tokens: overrides.max_tokens.or(input.max_tokens),
            response_format: input.response_format,
        };

        let mut attempt: u32 = 0;
        loop {
            match provider.complete(request.clone()).await {
                Ok(response) => {
                    let model_key = format!("{}:{}", provider_name, request.model);
                    self.cost_tracker.record(
                        model_key,
                        response.cost.unwrap_or(0.0),
                        response.prompt_tokens,
                        response.completion_tokens,
                        response.total_tokens,
                    );
                    return Ok(AgentOutput {
                        content: response.content,
                        details: UsageDetails {
                            model_name: request.model.clone(),
                            provider: provider_name,
                            prompt_tokens: response.prompt_tokens,
                            completion_tokens: response.completion_tokens,
                            native_total_tokens: response.total_tokens,
                            cost: response.cost.unwrap_or(0.0),
                        },
                    });
                }
                Err(err) if err.is_retriable() && attempt < self.max_retries => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %err, "retrying transient provider error");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use maestro_core::traits::ChatMessage;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct FlakyProvider {
        fail_times: AtomicU32,
    }

    #[async_trait]
    impl ChatCompletionProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<crate::provider::CompletionResponse> {
            if self.fail_times.load(Ordering::SeqCst) > 0 {
                self.fail_times.fetch_sub(1, Ordering::SeqCst);
                return Err(MaestroError::transient("temporary blip", "flaky"));
            }
            Ok(crate::provider::CompletionResponse {
                content: "ok".into(),
                prompt_tokens: 5,
                completion_tokens: 5,
                total_tokens: 10,
                cost: Some(0.001),
            })
        }
    }

    struct AlwaysAuthFailsProvider;

    #[async_trait]
    impl ChatCompletionProvider for AlwaysAuthFailsProvider {
        fn name(&self) -> &str {
            "bad-auth"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<crate::provider::CompletionResponse> {
            Err(MaestroError::AuthenticationFailed {
                message: "bad key".into(),
                provider: Some("bad-auth".into()),
            })
        }
    }

    fn dispatcher_with(provider_name: &'static str, provider: Arc<dyn ChatCompletionProvider>) -> ModelDispatcher {
        let resolver = Arc::new(SettingsResolver::default());
        let cost_tracker = Arc::new(CostTracker::new());
        let mut dispatcher = ModelDispatcher::new(resolver, cost_tracker, 0, 3, Duration::from_millis(1));
        dispatcher.register_provider(provider_name, provider);
        dispatcher.register_route(
            "fast",
            ModelRoute {
                provider: provider_name.to_string(),
                model: "test-model".to_string(),
            },
        );
        dispatcher
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let dispatcher = dispatcher_with(
            "flaky",
            Arc::new(FlakyProvider {
                fail_times: AtomicU32::new(2),
            }),
        );
        let result = dispatcher
            .dispatch(AgentRole::Research, AgentInput::from_prompt("hi"))
            .await
            .unwrap();
        assert_eq!(result.content, "ok");
    }

    #[tokio::test]
    async fn authentication_failure_never_retries() {
        let dispatcher = dispatcher_with("bad-auth", Arc::new(AlwaysAuthFailsProvider));
        let err = dispatcher
            .dispatch(AgentRole::Research, AgentInput::from_prompt("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, MaestroError::AuthenticationFailed { .. }));
    }

    #[tokio::test]
    async fn missing_route_surfaces_configuration_required() {
        let resolver = Arc::new(SettingsResolver::default());
        let cost_tracker = Arc::new(CostTracker::new());
        let dispatcher = ModelDispatcher::new(resolver, cost_tracker, 0, 0, Duration::from_millis(1));
        let err = dispatcher
            .dispatch(AgentRole::Planning, AgentInput::from_prompt("hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, MaestroError::ConfigurationRequired { .. }));
    }

    #[tokio::test]
    async fn message_payload_round_trips_into_provider_content() {
        let dispatcher = dispatcher_with(
            "flaky",
            Arc::new(FlakyProvider {
                fail_times: AtomicU32::new(0),
            }),
        );
        let input = AgentInput::with_messages(vec![ChatMessage::user("roundtrip")]);
        let result = dispatcher.dispatch(AgentRole::Research, input).await.unwrap();
        assert_eq!(result.details.provider, "flaky");
        assert_eq!(result.details.prompt_tokens, 5);
    }
}
