//! **file_reader** (spec §4.3, SPEC_FULL §[EXPANSION 4.3b]): sandboxed file
//! read. Canonicalizes the requested path, rejects anything that escapes a
//! configured document root, and caps read size — grounded on the
//! teacher's `llmspell-security::sandbox::FileSandbox::validate_path`/
//! `read_file`, adapted from manual `..`-stripping to `path-clean`.

use async_trait::async_trait;
use path_clean::PathClean;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::error::ToolError;
use crate::registry::Tool;
use crate::schema::{ToolCategory, ToolSchema};

const MAX_READ_BYTES: u64 = 10 * 1024 * 1024;

pub struct FileReaderTool {
    root: PathBuf,
}

impl FileReaderTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Join `requested` onto the sandbox root and reject any result that
    /// lands outside it, after lexical `..`/`.` resolution (no filesystem
    /// access needed, unlike `canonicalize`, so a nonexistent path can still
    /// be validated before the read attempt surfaces a clean error).
    fn resolve(&self, requested: &str) -> Result<PathBuf, ToolError> {
        let requested_path = Path::new(requested);
        let joined = if requested_path.is_absolute() {
            requested_path.to_path_buf()
        } else {
            self.root.join(requested_path)
        };
        let cleaned = joined.clean();

        if !cleaned.starts_with(&self.root) {
            return Err(ToolError::input_invalid(format!(
                "path '{requested}' escapes the configured document root"
            )));
        }
        Ok(cleaned)
    }
}

#[async_trait]
impl Tool for FileReaderTool {
    fn name(&self) -> &str {
        "file_reader"
    }

    fn description(&self) -> &str {
        "Reads a text file from within the configured document root"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Filesystem
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema::new(
            json!({
                "type": "object",
                "properties": {
                    "path": {"type": "string"}
                }
            }),
            ["path"],
        )
    }

    async fn invoke(
        &self,
        args: serde_json::Value,
        context: &maestro_core::context::ExecutionContext,
    ) -> Result<serde_json::Value, ToolError> {
        context.check_cancelled().map_err(ToolError::from)?;
        let path = args
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::input_invalid("'path' must be a string"))?;
        let resolved = self.resolve(path)?;

        let metadata = tokio::fs::metadata(&resolved)
            .await
            .map_err(|e| ToolError::input_invalid(format!("cannot stat '{path}': {e}")))?;
        if metadata.len() > MAX_READ_BYTES {
            return Err(ToolError::input_invalid(format!(
                "'{path}' is {} bytes, exceeding the {MAX_READ_BYTES}-byte read cap",
                metadata.len()
            )));
        }

        let content = tokio::fs::read_to_string(&resolved)
            .await
            .map_err(|e| ToolError::input_invalid(format!("cannot read '{path}': {e}")))?;
        Ok(json!({ "content": content, "path": path }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::context::ExecutionContext;
    use tempfile::tempdir;

    #[tokio::test]
    async fn reads_file_within_root() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("note.txt"), "hello").unwrap();
        let tool = FileReaderTool::new(dir.path());
        let ctx = ExecutionContext::for_mission("m1");
        let out = tool.invoke(json!({"path": "note.txt"}), &ctx).await.unwrap();
        assert_eq!(out["content"], json!("hello"));
    }

    #[tokio::test]
    async fn rejects_path_traversal_outside_root() {
        let dir = tempdir().unwrap();
        let tool = FileReaderTool::new(dir.path());
        let ctx = ExecutionContext::for_mission("m1");
        let err = tool
            .invoke(json!({"path": "../../etc/passwd"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ToolErrorKind::ToolInputInvalid);
    }

    #[tokio::test]
    async fn missing_file_is_input_invalid_not_panic() {
        let dir = tempdir().unwrap();
        let tool = FileReaderTool::new(dir.path());
        let ctx = ExecutionContext::for_mission("m1");
        let err = tool
            .invoke(json!({"path": "does-not-exist.txt"}), &ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ToolErrorKind::ToolInputInvalid);
    }
}
