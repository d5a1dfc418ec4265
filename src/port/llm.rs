//! Chat-completion port for model adapters.
//!
//! The router selects a model id from its catalog; the adapter behind this
//! trait carries the request to whatever HTTP endpoint serves that model.

use async_trait::async_trait;

use crate::error::Result;

/// A single chat message.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    /// "system" or "user"; assistants never appear in our requests.
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }
}

/// A completion request against a specific catalog model.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
    /// Force a JSON-object response when the endpoint supports it.
    pub json_response: bool,
}

/// Token accounting reported by the endpoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Raw completion result.
#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// Client for chat-completion requests.
///
/// Implementations wrap a specific provider endpoint and must be
/// thread-safe (`Send + Sync`); validation requests run concurrently.
///
/// # Errors
///
/// [`complete`](Self::complete) returns an error for transport failures,
/// non-success statuses, and unparseable responses. Timeouts are enforced
/// by the adapter and surface as errors too.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Provider name for logging and metrics.
    fn name(&self) -> &'static str;

    /// Send a completion request and return the generated content.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}
