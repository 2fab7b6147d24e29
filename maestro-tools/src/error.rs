//! Tool error taxonomy (SPEC_FULL §[EXPANSION 4.3a]): `invoke()` never
//! panics on malformed input — it always surfaces a `ToolError` whose
//! `kind` is drawn from the same vocabulary as `MaestroError`.

use maestro_core::error::MaestroError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolErrorKind {
    ToolInputInvalid,
    TransientProvider,
    StorageUnavailable,
    ParseFailure,
    Internal,
}

#[derive(Debug, Clone)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolError {
    pub fn input_invalid(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::ToolInputInvalid,
            message: message.into(),
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::TransientProvider,
            message: message.into(),
        }
    }

    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::StorageUnavailable,
            message: message.into(),
        }
    }

    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::ParseFailure,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ToolErrorKind::Internal,
            message: message.into(),
        }
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ToolError {}

impl From<ToolError> for MaestroError {
    fn from(err: ToolError) -> Self {
        match err.kind {
            ToolErrorKind::ToolInputInvalid => MaestroError::ToolInputInvalid {
                tool: "unknown".to_string(),
                message: err.message,
            },
            ToolErrorKind::TransientProvider => MaestroError::transient(err.message, "tool"),
            ToolErrorKind::StorageUnavailable => MaestroError::StorageUnavailable {
                message: err.message,
                source: None,
            },
            ToolErrorKind::ParseFailure => MaestroError::ParseFailure {
                message: err.message,
            },
            ToolErrorKind::Internal => MaestroError::internal(err.message),
        }
    }
}

impl From<MaestroError> for ToolError {
    fn from(err: MaestroError) -> Self {
        match err {
            MaestroError::ToolInputInvalid { message, .. } => ToolError::input_invalid(message),
            MaestroError::TransientProvider { message, .. } => ToolError::transient(message),
            MaestroError::StorageUnavailable { message, .. } => ToolError::storage_unavailable(message),
            MaestroError::ParseFailure { message } => ToolError::parse_failure(message),
            other => ToolError::internal(other.to_string()),
        }
    }
}
