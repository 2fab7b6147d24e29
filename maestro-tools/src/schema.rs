//! Tool metadata, generalized from the teacher's `llmspell-core::traits::
//! tool::{ToolCategory, ToolSchema}` to this spec's retrieval-tool set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ToolCategory {
    Retrieval,
    Computation,
    Filesystem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    pub parameters: serde_json::Value,
    pub required: Vec<String>,
}

impl ToolSchema {
    pub fn new(parameters: serde_json::Value, required: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            parameters,
            required: required.into_iter().map(str::to_string).collect(),
        }
    }

    /// Validate `input` against `required` and the JSON Schema carried in
    /// `parameters`, surfacing any violation as `ToolInputInvalid` per
    /// SPEC_FULL §[EXPANSION 4.3a].
    pub fn validate(&self, input: &serde_json::Value) -> Result<(), crate::error::ToolError> {
        for field in &self.required {
            if input.get(field).is_none() {
                return Err(crate::error::ToolError::input_invalid(format!(
                    "missing required parameter '{field}'"
                )));
            }
        }
        let compiled = jsonschema::JSONSchema::compile(&self.parameters).map_err(|e| {
            crate::error::ToolError::internal(format!("invalid tool schema: {e}"))
        })?;
        if let Err(mut errors) = compiled.validate(input) {
            let message = errors
                .next()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "schema validation failed".to_string());
            return Err(crate::error::ToolError::input_invalid(message));
        }
        Ok(())
    }
}
