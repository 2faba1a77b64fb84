//! Model-backed conversion of one client module.

use portage_core::FileContent;
use portage_runtime::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::planner::ActionFileTask;
use super::prompt::{ACTION_PREAMBLE, action_prompt};
use crate::{ConvertContext, TRACING_TARGET_ACTION};

/// Server action module the model produced for one client module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ServerActionCode {
    /// TypeScript source of the server action module.
    pub server_action_code: String,
}

/// Converts one API client module into a server action module.
#[derive(Debug, Clone)]
pub struct FileActionConverter {
    context: ConvertContext,
}

impl FileActionConverter {
    /// Creates a converter.
    pub fn new(context: ConvertContext) -> Self {
        Self { context }
    }
}

#[async_trait::async_trait]
impl Worker for FileActionConverter {
    type Input = ActionFileTask;
    type Output = FileContent;

    async fn invoke(&self, task: ActionFileTask, ctx: &WorkerContext) -> WorkflowResult<FileContent> {
        tracing::debug!(
            target: TRACING_TARGET_ACTION,
            file = %task.src_path.display(),
            "Converting client module"
        );

        let code: ServerActionCode = self
            .context
            .extract(ctx, ACTION_PREAMBLE, &action_prompt(&task.source))
            .await?;
        Ok(FileContent::new(task.dst_path, code.server_action_code))
    }
}
