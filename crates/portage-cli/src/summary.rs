//! Run summary printed on stdout.

use std::path::{Path, PathBuf};

use portage_convert::ConvertTarget;
use portage_core::{FilesContent, UsageSummary};
use portage_runtime::prelude::RunReport;
use serde::Serialize;

/// What a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Conversion that ran.
    pub target: ConvertTarget,
    /// Whether files were left unwritten.
    pub dry_run: bool,
    /// Generated files in path order.
    pub files: Vec<PathBuf>,
    /// LLM usage per model.
    pub usage: UsageSummary,
    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u64,
    /// Node executions, batch items counted one by one.
    pub nodes_executed: usize,
}

impl RunSummary {
    /// Summarizes `report`.
    pub fn new(target: ConvertTarget, dry_run: bool, report: &RunReport<FilesContent>) -> Self {
        Self {
            target,
            dry_run,
            files: report.output.paths().map(Path::to_path_buf).collect(),
            usage: report.usage.clone(),
            elapsed_ms: u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            nodes_executed: report.nodes_executed,
        }
    }
}
