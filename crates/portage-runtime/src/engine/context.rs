//! Shared state of one workflow run.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use portage_core::{LlmUsage, UsageSummary};
use tokio_util::sync::CancellationToken;

use super::EngineConfig;
use crate::error::{WorkflowError, WorkflowResult};

/// State shared by every node of a run, nested workflows included.
#[derive(Debug)]
pub struct ExecutionContext {
    config: EngineConfig,
    cancellation: CancellationToken,
    usage: Mutex<Vec<LlmUsage>>,
    nodes_executed: AtomicUsize,
}

impl ExecutionContext {
    /// Creates a fresh context.
    pub fn new(config: EngineConfig, cancellation: CancellationToken) -> Self {
        Self {
            config,
            cancellation,
            usage: Mutex::new(Vec::new()),
            nodes_executed: AtomicUsize::new(0),
        }
    }

    /// Engine configuration of the run.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cancellation token of the run.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Fails with [`WorkflowError::Cancelled`] once the run is cancelled.
    pub fn check_cancelled(&self) -> WorkflowResult<()> {
        if self.cancellation.is_cancelled() {
            return Err(WorkflowError::Cancelled);
        }
        Ok(())
    }

    /// Appends a usage record.
    pub fn record_usage(&self, usage: LlmUsage) {
        self.usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(usage);
    }

    /// Returns every usage record so far.
    pub fn usage(&self) -> Vec<LlmUsage> {
        self.usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns usage summed per model.
    pub fn usage_summary(&self) -> UsageSummary {
        self.usage
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .collect()
    }

    pub(crate) fn node_executed(&self) {
        self.nodes_executed.fetch_add(1, Ordering::Relaxed);
    }

    /// Number of node executions so far, batch items counted one by one.
    pub fn nodes_executed(&self) -> usize {
        self.nodes_executed.load(Ordering::Relaxed)
    }
}
