//! `MaestroError` realizes the error kinds from the error-handling design:
//! each variant is a kind, not an implementation detail, so callers can
//! match on "what went wrong" the same way the design document does.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MaestroError>;

#[derive(Debug, Error)]
pub enum MaestroError {
    /// Missing model name, API key, or provider; raised at first access.
    #[error("configuration required: {message}")]
    ConfigurationRequired {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Rate limit or network hiccup; retried by the caller up to `max_retries`.
    #[error("transient provider error ({provider:?}): {message}")]
    TransientProvider {
        message: String,
        provider: Option<String>,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Non-retriable credential failure.
    #[error("authentication failed ({provider:?}): {message}")]
    AuthenticationFailed {
        message: String,
        provider: Option<String>,
    },

    /// Schema violation on tool input.
    #[error("invalid tool input for '{tool}': {message}")]
    ToolInputInvalid { tool: String, message: String },

    /// LLM returned non-JSON where JSON was required and no fallback applied.
    #[error("failed to parse response: {message}")]
    ParseFailure { message: String },

    /// Validator found unfixable outline structure.
    #[error("outline invalid: {message}")]
    OutlineInvalid { message: String },

    /// Vector store (or other external storage) health check failed.
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Cooperative cancellation observed at a suspension point.
    #[error("cancelled")]
    Cancelled,

    /// Catch-all for invariant violations inside this implementation
    /// (an outline with no research_based section reaching report
    /// generation, a context-store lookup of a mission that does not
    /// exist, etc.) that don't belong to any external-facing kind above.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl MaestroError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::ConfigurationRequired {
            message: message.into(),
            source: None,
        }
    }

    pub fn transient(message: impl Into<String>, provider: impl Into<String>) -> Self {
        Self::TransientProvider {
            message: message.into(),
            provider: Some(provider.into()),
            source: None,
        }
    }

    pub fn tool_input(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInputInvalid {
            tool: tool.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this kind is safe to retry per the error-handling design's
    /// policy table (transient is retriable, authentication is not).
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::TransientProvider { .. })
    }
}
