//! Workflow execution engine.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use futures::{StreamExt, TryStreamExt};
use jiff::Timestamp;
use petgraph::graph::NodeIndex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::context::ExecutionContext;
use super::{EngineConfig, RunReport};
use crate::error::{WorkflowError, WorkflowResult};
use crate::graph::WorkflowGraph;
use crate::link::{LinkData, SocketCall};
use crate::node::{AggregatorState, DynWorker, NodeData, WorkerContext};

/// Tracing target for engine operations.
const TRACING_TARGET: &str = "portage_runtime::engine";

/// The workflow execution engine.
///
/// Manages workflow execution, concurrency, and retries. Nodes run level by
/// level in topological order; nodes of the same level run concurrently and
/// batched workers process their items concurrently up to
/// [`EngineConfig::max_batch_concurrency`].
#[derive(Debug, Clone)]
pub struct Engine {
    config: EngineConfig,
    semaphore: Arc<Semaphore>,
}

impl Engine {
    /// Creates a new engine with the given configuration.
    pub fn new(config: EngineConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrent_runs));

        tracing::info!(
            target: TRACING_TARGET,
            max_concurrent_runs = config.max_concurrent_runs,
            max_batch_concurrency = config.max_batch_concurrency,
            default_timeout_secs = config.default_timeout.as_secs(),
            "Workflow engine initialized"
        );

        Self { config, semaphore }
    }

    /// Creates a new engine with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validates a workflow graph.
    pub fn validate(&self, workflow: &WorkflowGraph) -> WorkflowResult<()> {
        workflow.validate()
    }

    /// Runs a workflow graph on the given input.
    pub async fn run<I, O>(&self, workflow: &WorkflowGraph, input: &I) -> WorkflowResult<RunReport<O>>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        self.run_with_cancellation(workflow, input, CancellationToken::new())
            .await
    }

    /// Runs a workflow graph, aborting once `cancellation` is triggered.
    pub async fn run_with_cancellation<I, O>(
        &self,
        workflow: &WorkflowGraph,
        input: &I,
        cancellation: CancellationToken,
    ) -> WorkflowResult<RunReport<O>>
    where
        I: Serialize + ?Sized,
        O: DeserializeOwned,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| WorkflowError::Internal(format!("semaphore closed: {e}")))?;

        workflow.validate()?;
        let input = serde_json::to_value(input)?;

        let started_at = Timestamp::now();
        let start = Instant::now();
        let execution = Arc::new(ExecutionContext::new(
            self.config.clone(),
            cancellation.clone(),
        ));

        tracing::info!(
            target: TRACING_TARGET,
            workflow = workflow.name(),
            nodes = workflow.node_count(),
            links = workflow.link_count(),
            "Starting workflow execution"
        );
        tracing::trace!(
            target: TRACING_TARGET,
            graph = ?workflow.describe(),
            "Workflow structure"
        );

        let result = tokio::select! {
            result = tokio::time::timeout(
                self.config.default_timeout,
                run_graph(workflow, input, &execution),
            ) => match result {
                Ok(result) => result,
                Err(_) => {
                    cancellation.cancel();
                    Err(WorkflowError::Timeout)
                }
            },
            () = cancellation.cancelled() => Err(WorkflowError::Cancelled),
        };

        let output = match result {
            Ok(output) => output,
            Err(error) => {
                tracing::error!(
                    target: TRACING_TARGET,
                    workflow = workflow.name(),
                    error = %error,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Workflow execution failed"
                );
                return Err(error);
            }
        };

        let output = serde_json::from_value(output)
            .map_err(|e| WorkflowError::payload(format!("{} (exit)", workflow.name()), e))?;

        let report = RunReport {
            output,
            usage: execution.usage_summary(),
            started_at,
            elapsed: start.elapsed(),
            nodes_executed: execution.nodes_executed(),
        };

        tracing::info!(
            target: TRACING_TARGET,
            workflow = workflow.name(),
            nodes_executed = report.nodes_executed,
            llm_requests = report.usage.requests(),
            llm_tokens = report.usage.total_tokens(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Workflow execution completed"
        );

        Ok(report)
    }
}

/// Output of a node: one payload, or one payload per batch item.
#[derive(Debug, Clone)]
enum NodeOutput {
    Single(Value),
    Batch(BTreeMap<usize, Value>),
}

impl NodeOutput {
    /// Batches leave a graph as an array in index order.
    fn into_value(self) -> Value {
        match self {
            Self::Single(value) => value,
            Self::Batch(items) => Value::Array(items.into_values().collect()),
        }
    }
}

/// Runs a validated graph within an existing execution context.
pub(crate) async fn run_graph(
    workflow: &WorkflowGraph,
    input: Value,
    execution: &Arc<ExecutionContext>,
) -> WorkflowResult<Value> {
    let missing = |what: &str| {
        WorkflowError::InvalidDefinition(format!("workflow '{}' has no {what} node", workflow.name()))
    };
    let entry = workflow.index_of(workflow.entry().ok_or_else(|| missing("entry"))?)?;
    let exit = workflow.index_of(workflow.exit().ok_or_else(|| missing("exit"))?)?;
    let levels = workflow.levels()?;

    let executor = Executor {
        workflow,
        execution,
    };

    let mut outputs: HashMap<NodeIndex, NodeOutput> = HashMap::new();
    let NodeData::Worker { name, worker } = workflow.node(entry) else {
        return Err(WorkflowError::InvalidDefinition(format!(
            "entry of '{}' is not a worker",
            workflow.name()
        )));
    };
    let entry_output = executor.invoke_worker(name, worker, input, None).await?;
    outputs.insert(entry, NodeOutput::Single(entry_output));

    for level in levels {
        execution.check_cancelled()?;

        let pending: Vec<NodeIndex> = level.into_iter().filter(|index| *index != entry).collect();
        if pending.is_empty() {
            continue;
        }

        let results = try_join_all(
            pending
                .iter()
                .map(|index| executor.execute_node(*index, &outputs)),
        )
        .await?;
        outputs.extend(pending.into_iter().zip(results));
    }

    outputs
        .remove(&exit)
        .map(NodeOutput::into_value)
        .ok_or_else(|| WorkflowError::Internal(format!("exit of '{}' produced no output", workflow.name())))
}

#[derive(Clone, Copy)]
struct Executor<'a> {
    workflow: &'a WorkflowGraph,
    execution: &'a Arc<ExecutionContext>,
}

impl<'a> Executor<'a> {
    async fn execute_node(
        self,
        index: NodeIndex,
        outputs: &HashMap<NodeIndex, NodeOutput>,
    ) -> WorkflowResult<NodeOutput> {
        match self.workflow.node(index) {
            NodeData::Worker { name, worker } => {
                let (source, link) = self
                    .workflow
                    .incoming(index)
                    .into_iter()
                    .next()
                    .ok_or_else(|| WorkflowError::Internal(format!("worker '{name}' has no input")))?;
                let upstream = self.upstream(source, outputs)?;
                let input = apply_worker_link(link, upstream)
                    .map_err(|e| e.in_link(self.workflow.node(source).name(), &**name))?;

                match input {
                    NodeOutput::Single(value) => self
                        .invoke_worker(name, worker, value, None)
                        .await
                        .map(NodeOutput::Single),
                    NodeOutput::Batch(items) => self
                        .invoke_batch(name, worker, items)
                        .await
                        .map(NodeOutput::Batch),
                }
            }
            NodeData::Aggregator {
                name,
                aggregator,
                sockets,
            } => {
                let mut state = AggregatorState::new();
                for (source, link) in self.workflow.incoming(index) {
                    let upstream = self.upstream(source, outputs)?;
                    let calls = socket_calls(link, upstream).map_err(|e| {
                        e.in_link(self.workflow.node(source).name(), &**name)
                    })?;

                    for call in calls {
                        let socket =
                            sockets
                                .get(&call.socket)
                                .ok_or_else(|| WorkflowError::UnknownSocket {
                                    aggregator: name.to_string(),
                                    socket: call.socket.clone(),
                                })?;
                        socket
                            .call(&mut state, call.data)
                            .map_err(|e| e.in_node(&**name))?;
                    }
                }

                let output = aggregator
                    .build_value(state)
                    .map_err(|e| e.in_node(&**name))?;
                self.execution.node_executed();

                tracing::debug!(
                    target: TRACING_TARGET,
                    node = %name,
                    "Aggregator built"
                );
                Ok(NodeOutput::Single(output))
            }
        }
    }

    fn upstream<'o>(
        &self,
        source: NodeIndex,
        outputs: &'o HashMap<NodeIndex, NodeOutput>,
    ) -> WorkflowResult<&'o NodeOutput> {
        outputs.get(&source).ok_or_else(|| {
            WorkflowError::Internal(format!(
                "node '{}' has not produced an output yet",
                self.workflow.node(source).name()
            ))
        })
    }

    async fn invoke_batch(
        self,
        name: &Arc<str>,
        worker: &Arc<dyn DynWorker>,
        items: BTreeMap<usize, Value>,
    ) -> WorkflowResult<BTreeMap<usize, Value>> {
        let concurrency = self.execution.config().max_batch_concurrency.max(1);

        tracing::debug!(
            target: TRACING_TARGET,
            node = %name,
            items = items.len(),
            concurrency,
            "Dispatching batch"
        );

        futures::stream::iter(items)
            .map(|(index, value)| async move {
                self.invoke_worker(name, worker, value, Some(index))
                    .await
                    .map(|output| (index, output))
            })
            .buffer_unordered(concurrency)
            .try_collect()
            .await
    }

    async fn invoke_worker(
        self,
        name: &Arc<str>,
        worker: &Arc<dyn DynWorker>,
        input: Value,
        batch_index: Option<usize>,
    ) -> WorkflowResult<Value> {
        let config = self.execution.config();
        let ctx = WorkerContext::new(name.clone(), batch_index, self.execution.clone());
        let mut attempt = 0u32;

        loop {
            self.execution.check_cancelled()?;

            match worker.invoke_value(input.clone(), &ctx).await {
                Ok(output) => {
                    self.execution.node_executed();
                    tracing::debug!(
                        target: TRACING_TARGET,
                        node = %name,
                        batch_index = ?batch_index,
                        attempt,
                        "Worker completed"
                    );
                    return Ok(output);
                }
                Err(error) if error.is_retryable() && attempt < config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        target: TRACING_TARGET,
                        node = %name,
                        batch_index = ?batch_index,
                        attempt,
                        max_retries = config.max_retries,
                        error = %error,
                        "Worker failed, retrying"
                    );
                    tokio::time::sleep(config.retry_delay).await;
                }
                Err(error) => return Err(error.in_node(&**name)),
            }
        }
    }
}

fn apply_worker_link(link: &LinkData, upstream: &NodeOutput) -> WorkflowResult<NodeOutput> {
    match (link, upstream) {
        (LinkData::Bridge(bridge), NodeOutput::Single(value)) => {
            Ok(NodeOutput::Single(bridge.bridge_value(value.clone())?))
        }
        (LinkData::Bridge(bridge), NodeOutput::Batch(items)) => items
            .iter()
            .map(|(index, value)| Ok((*index, bridge.bridge_value(value.clone())?)))
            .collect::<WorkflowResult<_>>()
            .map(NodeOutput::Batch),
        (LinkData::Dispatch(dispatch), NodeOutput::Single(value)) => {
            let items = dispatch.dispatch_value(value.clone())?;
            Ok(NodeOutput::Batch(items.into_iter().enumerate().collect()))
        }
        (LinkData::Dispatch(_), NodeOutput::Batch(_)) => Err(WorkflowError::InvalidDefinition(
            "dispatch from a batched node".into(),
        )),
        (LinkData::Plug(_) | LinkData::Collect(_), _) => Err(WorkflowError::InvalidDefinition(
            "plug and collect links cannot feed a worker".into(),
        )),
    }
}

fn socket_calls(link: &LinkData, upstream: &NodeOutput) -> WorkflowResult<Vec<SocketCall>> {
    match (link, upstream) {
        (LinkData::Plug(plugger), NodeOutput::Single(value)) => plugger.plug_value(value.clone()),
        (LinkData::Plug(plugger), NodeOutput::Batch(items)) => {
            let mut calls = Vec::new();
            for value in items.values() {
                calls.extend(plugger.plug_value(value.clone())?);
            }
            Ok(calls)
        }
        (LinkData::Collect(collect), NodeOutput::Batch(items)) => {
            collect.collect_value(items.clone())
        }
        (LinkData::Collect(collect), NodeOutput::Single(value)) => {
            collect.collect_value(BTreeMap::from([(0, value.clone())]))
        }
        (LinkData::Bridge(_) | LinkData::Dispatch(_), _) => Err(WorkflowError::InvalidDefinition(
            "bridge and dispatch links cannot feed an aggregator".into(),
        )),
    }
}
