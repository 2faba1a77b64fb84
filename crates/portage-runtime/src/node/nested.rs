//! Nested workflows.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Worker, WorkerContext};
use crate::engine::run_graph;
use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::WorkflowGraph;

/// Worker that runs a whole workflow graph as one step.
///
/// The nested run shares the caller's engine settings, cancellation token
/// and usage ledger. Its `I` input is handed to the nested entry node and
/// its `O` output is the nested exit node's output.
pub struct GraphWorker<I, O> {
    graph: Arc<WorkflowGraph>,
    _marker: PhantomData<fn(I) -> O>,
}

impl<I, O> GraphWorker<I, O> {
    /// Wraps a graph, validating it first.
    pub fn new(graph: WorkflowGraph) -> WorkflowResult<Self> {
        graph.validate()?;
        Ok(Self {
            graph: Arc::new(graph),
            _marker: PhantomData,
        })
    }

    /// The wrapped graph.
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }
}

impl<I, O> Clone for GraphWorker<I, O> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            _marker: PhantomData,
        }
    }
}

impl<I, O> fmt::Debug for GraphWorker<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphWorker")
            .field("graph", &self.graph)
            .field("input", &std::any::type_name::<I>())
            .field("output", &std::any::type_name::<O>())
            .finish()
    }
}

#[async_trait::async_trait]
impl<I, O> Worker for GraphWorker<I, O>
where
    I: Serialize + DeserializeOwned + Send + 'static,
    O: Serialize + DeserializeOwned + Send + 'static,
{
    type Input = I;
    type Output = O;

    async fn invoke(&self, input: I, ctx: &WorkerContext) -> WorkflowResult<O> {
        let input = serde_json::to_value(input)
            .map_err(|e| WorkflowError::payload(format!("{} (nested input)", ctx.node_name()), e))?;
        let output = run_graph(&self.graph, input, ctx.execution()).await?;
        serde_json::from_value(output)
            .map_err(|e| WorkflowError::payload(format!("{} (nested output)", ctx.node_name()), e))
    }
}
