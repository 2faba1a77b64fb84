//! Scripted completion backend.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use portage_core::LlmUsage;

use crate::{Completion, CompletionRequest, CompletionResponse, Error, Result};

type Responder = dyn Fn(&CompletionRequest) -> Result<String> + Send + Sync;

/// Completion backend answering from a script instead of a model.
///
/// Every request is recorded and can be inspected with
/// [`MockCompletion::requests`]. Usage is reported as whitespace-separated
/// word counts so that accounting can be asserted on.
pub struct MockCompletion {
    model: String,
    responder: Box<Responder>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockCompletion {
    /// Model name reported by default.
    pub const MODEL: &'static str = "mock-model";

    /// Answers every request with the result of `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            model: Self::MODEL.to_owned(),
            responder: Box::new(responder),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with the same text.
    pub fn replying(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Answers requests with `replies` in order, failing once they run out.
    pub fn scripted<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let replies: Mutex<VecDeque<String>> =
            Mutex::new(replies.into_iter().map(Into::into).collect());
        Self::new(move |_| {
            replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .ok_or_else(|| Error::provider("mock", "script exhausted"))
        })
    }

    /// Overrides the reported model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Returns the requests received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait::async_trait]
impl Completion for MockCompletion {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let reply = (self.responder)(&request);
        let input_tokens = request
            .preamble
            .iter()
            .chain(std::iter::once(&request.prompt))
            .map(|text| text.split_whitespace().count() as u64)
            .sum();
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);

        let text = reply?;
        let output_tokens = text.split_whitespace().count() as u64;
        Ok(CompletionResponse {
            usage: LlmUsage::new(&self.model, input_tokens, output_tokens),
            text,
        })
    }
}

impl std::fmt::Debug for MockCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCompletion")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
