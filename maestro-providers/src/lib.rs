//! Model Dispatcher (L2): routes each agent role to a concrete provider and
//! model through the Settings Resolver, bounds concurrency, retries
//! transient failures, and tracks cost — spec §4.2.

pub mod cost;
pub mod dispatch;
pub mod provider;
pub mod roles;

pub use cost::{CostTracker, ModelTotals};
pub use dispatch::{DispatchOverrides, ModelDispatcher, ModelRoute};
pub use provider::{ChatCompletionProvider, CompletionRequest, CompletionResponse, OpenAiCompatibleProvider};
pub use roles::{AgentRole, ModelClass, ProviderKind};
