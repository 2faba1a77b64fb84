//! Worker nodes.

use std::sync::Arc;

use portage_core::LlmUsage;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::engine::{EngineConfig, ExecutionContext};
use crate::error::{WorkflowError, WorkflowResult};

/// An async unit of work with a typed input and output.
///
/// Payloads travel between nodes as JSON values; the runtime deserializes
/// the incoming payload into [`Worker::Input`] and serializes the returned
/// [`Worker::Output`].
#[async_trait::async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Input payload.
    type Input: DeserializeOwned + Send + 'static;
    /// Output payload.
    type Output: Serialize + Send + 'static;

    /// Runs the worker on one input.
    async fn invoke(
        &self,
        input: Self::Input,
        ctx: &WorkerContext,
    ) -> WorkflowResult<Self::Output>;
}

/// Type-erased worker stored in the graph.
#[async_trait::async_trait]
pub(crate) trait DynWorker: Send + Sync {
    async fn invoke_value(&self, input: Value, ctx: &WorkerContext) -> WorkflowResult<Value>;
}

#[async_trait::async_trait]
impl<W: Worker> DynWorker for W {
    async fn invoke_value(&self, input: Value, ctx: &WorkerContext) -> WorkflowResult<Value> {
        let input: W::Input = serde_json::from_value(input)
            .map_err(|e| WorkflowError::payload(format!("{} (input)", ctx.node_name()), e))?;
        let output = self.invoke(input, ctx).await?;
        serde_json::to_value(output)
            .map_err(|e| WorkflowError::payload(format!("{} (output)", ctx.node_name()), e))
    }
}

/// Per-invocation context handed to a worker.
#[derive(Debug, Clone)]
pub struct WorkerContext {
    node_name: Arc<str>,
    batch_index: Option<usize>,
    execution: Arc<ExecutionContext>,
}

impl WorkerContext {
    pub(crate) fn new(
        node_name: Arc<str>,
        batch_index: Option<usize>,
        execution: Arc<ExecutionContext>,
    ) -> Self {
        Self {
            node_name,
            batch_index,
            execution,
        }
    }

    /// Creates a context outside of any engine run.
    ///
    /// Useful to invoke a worker directly, e.g. in tests.
    pub fn detached(node_name: impl Into<Arc<str>>) -> Self {
        let execution = ExecutionContext::new(EngineConfig::default(), CancellationToken::new());
        Self::new(node_name.into(), None, Arc::new(execution))
    }

    /// Name of the node being executed.
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    /// Position of the item within its batch, if the node is batched.
    pub fn batch_index(&self) -> Option<usize> {
        self.batch_index
    }

    /// Records token usage of an LLM call made by this worker.
    pub fn record_usage(&self, usage: LlmUsage) {
        self.execution.record_usage(usage);
    }

    /// Cancellation token of the current run.
    pub fn cancellation(&self) -> &CancellationToken {
        self.execution.cancellation()
    }

    /// Returns true if the current run has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.execution.cancellation().is_cancelled()
    }

    /// Shared state of the current run.
    pub fn execution(&self) -> &Arc<ExecutionContext> {
        &self.execution
    }
}
