//! Error types for the Ponder domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; [`Error`] wraps them all.

use thiserror::Error;

/// The top-level error type for all Ponder operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- History errors ---
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the LLM completion call.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures raised by a tool's `execute`.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid tool input: {0}")]
    InvalidArguments(String),

    #[error("Cannot evaluate expression: {0}")]
    Evaluation(String),

    #[error("Tool not configured: {0}")]
    NotConfigured(String),

    #[error("{tool_name} request failed: {reason}")]
    Transport { tool_name: String, reason: String },
}

impl ToolError {
    /// Whether this failure should abort the question instead of being
    /// reported back to the model as an observation.
    ///
    /// Only transport failures are fatal; everything else is the model's
    /// problem to reason about.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ToolError::Transport { .. })
    }
}

/// Failures of the conversation history.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Invalid turn: {0}")]
    InvalidTurn(String),

    #[error("Storage error: {0}")]
    Storage(String),
}
