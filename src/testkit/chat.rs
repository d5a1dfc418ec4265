//! Mock [`ChatCompletion`] implementations.

use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::port::llm::{ChatCompletion, Completion, CompletionRequest, TokenUsage};

/// A scripted chat client: fixed response content, optional per-model
/// failures, and a record of every model id requested.
pub struct ScriptedChat {
    response: String,
    fail_models: Mutex<HashSet<String>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedChat {
    /// Respond with the given content for every request.
    #[must_use]
    pub fn with_response(content: impl Into<String>) -> Self {
        Self {
            response: content.into(),
            fail_models: Mutex::new(HashSet::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A validator-shaped confirmation verdict.
    #[must_use]
    pub fn confirming() -> Self {
        Self::with_response(
            r#"{"confirmed": true, "confidence": 90.0, "reasoning": "scripted confirmation"}"#,
        )
    }

    /// A validator-shaped rejection verdict.
    #[must_use]
    pub fn rejecting() -> Self {
        Self::with_response(
            r#"{"confirmed": false, "confidence": 20.0, "reasoning": "scripted rejection"}"#,
        )
    }

    /// Fail every request routed to `model`.
    #[must_use]
    pub fn failing_for(self, model: impl Into<String>) -> Self {
        self.fail_models.lock().insert(model.into());
        self
    }

    /// Stop failing requests for `model`.
    pub fn heal(&self, model: &str) {
        self.fail_models.lock().remove(model);
    }

    /// Model ids in request order.
    #[must_use]
    pub fn requested_models(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl ChatCompletion for ScriptedChat {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        self.requests.lock().push(request.model.clone());

        if self.fail_models.lock().contains(&request.model) {
            return Err(Error::Connection(format!(
                "scripted failure for {}",
                request.model
            )));
        }

        Ok(Completion {
            content: self.response.clone(),
            usage: TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 20,
            },
        })
    }
}
