//! OpenAI-compatible chat-completions client.
//!
//! Implements [`ChatCompletion`] against any endpoint speaking the OpenAI
//! `/chat/completions` dialect (OpenAI itself, OpenRouter, local gateways).
//! The model id travels per-request, so one client serves the whole router
//! catalog.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::LlmApiConfig;
use crate::error::{ConfigError, Error, Result};
use crate::port::llm::{ChatCompletion, Completion, CompletionRequest, TokenUsage};

/// Chat-completions API client.
#[derive(Debug)]
pub struct OpenAiCompatible {
    client: Client,
    base_url: String,
    api_key: String,
    max_tokens: usize,
}

impl OpenAiCompatible {
    /// Create a client with explicit settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
        max_tokens: usize,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_tokens,
        })
    }

    /// Create a client from config, reading the API key from the
    /// environment variable the config names.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the key variable is
    /// unset, a fatal startup condition rather than a retryable one.
    pub fn from_config(config: &LlmApiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            Error::Config(ConfigError::MissingField {
                field: "router.api.api_key_env",
            })
        })?;

        Self::new(
            config.base_url.clone(),
            api_key,
            Duration::from_millis(config.timeout_ms),
            config.max_tokens,
        )
    }
}

#[derive(Serialize)]
struct Request {
    model: String,
    max_tokens: usize,
    temperature: f64,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct Response {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

fn build_request(request: &CompletionRequest, max_tokens: usize) -> Request {
    Request {
        model: request.model.clone(),
        max_tokens,
        temperature: request.temperature,
        messages: request
            .messages
            .iter()
            .map(|m| Message {
                role: m.role,
                content: m.content.clone(),
            })
            .collect(),
        response_format: request
            .json_response
            .then_some(ResponseFormat { kind: "json_object" }),
    }
}

#[async_trait]
impl ChatCompletion for OpenAiCompatible {
    fn name(&self) -> &'static str {
        "openai-compatible"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let body = build_request(request, self.max_tokens);
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Connection(e.to_string()))?
            .json::<Response>()
            .await?;

        let usage = response.usage.unwrap_or_default();
        let content = response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default();

        Ok(Completion {
            content,
            usage: TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            },
        })
    }
}
