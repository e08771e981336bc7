//! LLM Client Module
//!
//! Thin provider abstraction over the external text-completion service.
//! The orchestrator talks to [`LLMProvider`] only; the concrete backend
//! is selected at startup from configuration.

pub mod google;
pub mod types;

use async_trait::async_trait;

pub use google::GoogleProvider;
pub use types::{ChatMessage, ChatRequest, ChatResponse, MessageRole};

/// Errors from the upstream completion service
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, LLMError>;

/// A text-completion backend. One blocking call per turn; no streaming.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Stable provider identifier (used in logs and responses).
    fn id(&self) -> &str;

    /// Model identifier the provider is configured with.
    fn model(&self) -> &str;

    /// Run one completion against the backend.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}
