//! Model-backed conversion of one endpoint function.

use portage_core::FileContent;
use portage_runtime::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::planner::FunctionTask;
use super::prompt::{API_PREAMBLE, function_prompt};
use crate::{ConvertContext, TRACING_TARGET_API};

/// Client module the model produced for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FrontendCode {
    /// TypeScript source of the client module.
    pub frontend_code: String,
}

/// Converts one endpoint function into a frontend API client module.
#[derive(Debug, Clone)]
pub struct FunctionApiConverter {
    context: ConvertContext,
}

impl FunctionApiConverter {
    /// Creates a converter.
    pub fn new(context: ConvertContext) -> Self {
        Self { context }
    }
}

#[async_trait::async_trait]
impl Worker for FunctionApiConverter {
    type Input = FunctionTask;
    type Output = FileContent;

    async fn invoke(&self, task: FunctionTask, ctx: &WorkerContext) -> WorkflowResult<FileContent> {
        tracing::debug!(
            target: TRACING_TARGET_API,
            file = %task.pair.src_relpath.display(),
            function = %task.function,
            "Converting endpoint"
        );

        let prompt = function_prompt(&task.pair.src_relpath, &task.source, &task.pair.dst_relpath);
        let code: FrontendCode = self.context.extract(ctx, API_PREAMBLE, &prompt).await?;
        Ok(FileContent::new(task.pair.dst_path(), code.frontend_code))
    }
}
