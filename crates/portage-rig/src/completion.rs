//! Backend-independent completion interface.

use portage_core::LlmUsage;
use serde::{Deserialize, Serialize};

use crate::Result;

/// A single-turn completion request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System instructions sent ahead of the prompt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preamble: Option<String>,
    /// User prompt.
    pub prompt: String,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Upper bound on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

impl CompletionRequest {
    /// Creates a request with only a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    /// Sets the preamble.
    pub fn with_preamble(mut self, preamble: impl Into<String>) -> Self {
        self.preamble = Some(preamble.into());
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the token limit.
    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Text reply of a completion together with its token usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Concatenated text content of the reply.
    pub text: String,
    /// Tokens consumed by the call.
    pub usage: LlmUsage,
}

/// Anything that can answer a [`CompletionRequest`].
#[async_trait::async_trait]
pub trait Completion: Send + Sync {
    /// Identifier of the model answering requests.
    fn model_name(&self) -> &str;

    /// Sends one request and waits for the reply.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;
}
