//! Tool Registry (L3, spec §4.3): a name -> `(schema, async invocation)`
//! table with a uniform call signature, grounded on the teacher's
//! `llmspell-core::traits::tool::Tool` trait generalized to this spec's
//! retrieval-tool set (no `BaseAgent` supertrait — tools here are invoked
//! directly by name, not wrapped as agents).

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::ToolError;
use crate::schema::{ToolCategory, ToolSchema};

/// Every built-in tool implements this. `invoke` is asynchronous,
/// non-blocking, and honors the caller's cancellation token (spec §4.3).
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> ToolCategory;
    fn schema(&self) -> ToolSchema;

    async fn invoke(
        &self,
        args: serde_json::Value,
        cancel: &maestro_core::context::ExecutionContext,
    ) -> Result<serde_json::Value, ToolError>;
}

/// Process-wide name -> tool table. Registration happens once at startup;
/// lookups and invocations happen continuously from many agents, so the
/// map itself is guarded by a `parking_lot::RwLock` the same way
/// `InMemoryMissionStore` guards its map.
#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tool: Arc<dyn Tool>) {
        self.tools.write().insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.read().keys().cloned().collect()
    }

    #[tracing::instrument(skip(self, args, context), fields(tool = name))]
    pub async fn invoke(
        &self,
        name: &str,
        args: serde_json::Value,
        context: &maestro_core::context::ExecutionContext,
    ) -> Result<serde_json::Value, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::input_invalid(format!("unknown tool '{name}'")))?;
        tool.schema().validate(&args)?;
        tool.invoke(args, context).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::context::ExecutionContext;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn category(&self) -> ToolCategory {
            ToolCategory::Computation
        }
        fn schema(&self) -> ToolSchema {
            ToolSchema::new(json!({"type": "object"}), [])
        }
        async fn invoke(
            &self,
            args: serde_json::Value,
            _cancel: &ExecutionContext,
        ) -> Result<serde_json::Value, ToolError> {
            Ok(args)
        }
    }

    #[tokio::test]
    async fn registers_and_invokes_by_name() {
        let registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let ctx = ExecutionContext::for_mission("m1");
        let result = registry.invoke("echo", json!({"x": 1}), &ctx).await.unwrap();
        assert_eq!(result, json!({"x": 1}));
    }

    #[tokio::test]
    async fn unknown_tool_is_input_invalid() {
        let registry = ToolRegistry::new();
        let ctx = ExecutionContext::for_mission("m1");
        let err = registry.invoke("nope", json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.kind, crate::error::ToolErrorKind::ToolInputInvalid);
    }
}
