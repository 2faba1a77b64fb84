//! State shared by the conversion workers.

use std::sync::Arc;

use portage_core::LlmUsage;
use portage_rig::{Structured, StructuredOutput};
use portage_runtime::prelude::WorkerContext;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::ConvertOptions;

/// Structured completion access and options handed to every converter.
#[derive(Debug, Clone)]
pub struct ConvertContext {
    structured: StructuredOutput,
    options: Arc<ConvertOptions>,
}

impl ConvertContext {
    /// Creates a context.
    pub fn new(structured: StructuredOutput, options: ConvertOptions) -> Self {
        Self {
            structured,
            options: Arc::new(options),
        }
    }

    /// Conversion options.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Structured output extractor.
    pub fn structured(&self) -> &StructuredOutput {
        &self.structured
    }

    /// Asks the model for a `T` and records the usage of every attempt on `ctx`.
    pub(crate) async fn extract<T>(
        &self,
        ctx: &WorkerContext,
        preamble: &str,
        prompt: &str,
    ) -> portage_core::Result<T>
    where
        T: JsonSchema + DeserializeOwned,
    {
        let Structured { value, usage } = self.structured.extract::<T>(preamble, prompt).await?;
        usage.into_iter().for_each(|usage: LlmUsage| ctx.record_usage(usage));
        Ok(value)
    }
}

/// Context answering from a scripted completion backend.
#[cfg(test)]
pub(crate) fn mock_context(
    mock: portage_rig::mock::MockCompletion,
    options: ConvertOptions,
) -> ConvertContext {
    ConvertContext::new(StructuredOutput::new(Arc::new(mock)).with_attempts(1), options)
}
