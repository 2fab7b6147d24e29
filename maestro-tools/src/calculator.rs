//! **calculator** (spec §4.3): a safe evaluator over a whitelist of
//! functions `{sqrt, pow, sin, cos, tan, log, log10, pi, e}`; any other
//! identifier is rejected rather than evaluated.

use async_trait::async_trait;
use fasteval::{Compiler, Evaler, Slab};
use serde_json::json;

use crate::error::ToolError;
use crate::registry::Tool;
use crate::schema::{ToolCategory, ToolSchema};

const ALLOWED_FUNCTIONS: &[&str] = &["sqrt", "pow", "sin", "cos", "tan", "log", "log10"];
const ALLOWED_CONSTANTS: &[&str] = &["pi", "e"];

/// `fasteval`'s `EvalNamespace` callback: refuse any variable/function name
/// outside the documented whitelist, matching spec §4.3's "rejects any
/// unknown name."
struct WhitelistNamespace;

impl fasteval::EvalNamespace for WhitelistNamespace {
    fn lookup(&mut self, name: &str, args: Vec<f64>, _keybuf: &mut String) -> Option<f64> {
        if args.is_empty() && ALLOWED_CONSTANTS.contains(&name) {
            return match name {
                "pi" => Some(std::f64::consts::PI),
                "e" => Some(std::f64::consts::E),
                _ => None,
            };
        }
        if !ALLOWED_FUNCTIONS.contains(&name) {
            return None;
        }
        let arg = *args.first()?;
        match name {
            "sqrt" => Some(arg.sqrt()),
            "pow" => Some(arg.powf(*args.get(1)?)),
            "sin" => Some(arg.sin()),
            "cos" => Some(arg.cos()),
            "tan" => Some(arg.tan()),
            "log" => Some(arg.ln()),
            "log10" => Some(arg.log10()),
            _ => None,
        }
    }
}

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        "calculator"
    }

    fn description(&self) -> &str {
        "Evaluates an arithmetic expression over a whitelisted function set"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Computation
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            json!({
                "type": "object",
                "properties": {
                    "expression": {"type": "string"}
                }
            }),
            ["expression"],
        )
    }

    async fn invoke(
        &self,
        args: serde_json::Value,
        _context: &maestro_core::context::ExecutionContext,
    ) -> Result<serde_json::Value, ToolError> {
        let expression = args
            .get("expression")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::input_invalid("'expression' must be a string"))?;

        match evaluate(expression) {
            Ok(result) => Ok(json!({ "result": result })),
            Err(message) => Ok(json!({ "error": message })),
        }
    }
}

fn evaluate(expression: &str) -> Result<f64, String> {
    let parser = fasteval::Parser::new();
    let mut slab = Slab::new();
    let compiled = parser
        .parse(expression, &mut slab.ps)
        .map_err(|e| e.to_string())?
        .from(&slab.ps)
        .compile(&slab.ps, &mut slab.cs);
    let mut namespace = WhitelistNamespace;
    compiled.eval(&slab, &mut namespace).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::context::ExecutionContext;

    #[tokio::test]
    async fn evaluates_whitelisted_functions() {
        let tool = CalculatorTool;
        let ctx = ExecutionContext::for_mission("m1");
        let out = tool
            .invoke(json!({"expression": "sqrt(16) + 2"}), &ctx)
            .await
            .unwrap();
        assert_eq!(out["result"], json!(6.0));
    }

    #[tokio::test]
    async fn rejects_unknown_identifiers() {
        let tool = CalculatorTool;
        let ctx = ExecutionContext::for_mission("m1");
        let out = tool
            .invoke(json!({"expression": "__import__('os')"}), &ctx)
            .await
            .unwrap();
        assert!(out.get("error").is_some());
    }

    #[tokio::test]
    async fn missing_expression_is_input_invalid() {
        let tool = CalculatorTool;
        let ctx = ExecutionContext::for_mission("m1");
        let err = tool.invoke(json!({}), &ctx).await.unwrap_err();
        assert_eq!(err.kind, crate::error::ToolErrorKind::ToolInputInvalid);
    }
}
