//! Outcome of a workflow run.

use std::time::Duration;

use jiff::Timestamp;
use portage_core::UsageSummary;
use serde::Serialize;

/// Output and statistics of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<O> {
    /// Output of the exit node.
    pub output: O,
    /// LLM usage summed per model.
    pub usage: UsageSummary,
    /// When the run started.
    pub started_at: Timestamp,
    /// Wall-clock duration of the run.
    pub elapsed: Duration,
    /// Node executions, batch items counted one by one.
    pub nodes_executed: usize,
}

impl<O> RunReport<O> {
    /// Replaces the output, keeping the statistics.
    pub fn map<T>(self, f: impl FnOnce(O) -> T) -> RunReport<T> {
        RunReport {
            output: f(self.output),
            usage: self.usage,
            started_at: self.started_at,
            elapsed: self.elapsed,
            nodes_executed: self.nodes_executed,
        }
    }
}
