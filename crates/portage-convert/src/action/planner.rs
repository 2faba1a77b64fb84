//! Discovery of the API client modules to convert.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use portage_core::{Error, FilesContent, Result};
use portage_runtime::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::{ProjectLayout, TRACING_TARGET_ACTION};

/// Client module shared by every endpoint, never converted.
const CONFIG_FILE: &str = "config.ts";
/// Barrel file name, never converted.
const INDEX_FILE: &str = "index.ts";

/// Input of the action conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Repository roots.
    pub layout: ProjectLayout,
    /// Client modules generated earlier in the run. They take precedence
    /// over the files on disk.
    #[serde(default)]
    pub generated: FilesContent,
}

impl ActionRequest {
    /// Creates a request reading every client module from disk.
    pub fn new(layout: ProjectLayout) -> Self {
        Self {
            layout,
            generated: FilesContent::new(),
        }
    }

    /// Adds client modules generated earlier in the run.
    pub fn with_generated(mut self, generated: FilesContent) -> Self {
        self.generated = generated;
        self
    }
}

/// One client module to convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFileTask {
    /// Client module.
    pub src_path: PathBuf,
    /// Server action module to generate.
    pub dst_path: PathBuf,
    /// TypeScript source of the client module.
    pub source: String,
}

/// Maps every client module onto its server action module.
///
/// `frontend/lib/backend-api/<rel>.ts` becomes
/// `frontend/actions/backend-api/<rel>.ts`, except the top-level `config.ts`
/// and every `index.ts`. Tasks come in path order.
pub fn plan_action_files(request: &ActionRequest) -> Result<Vec<ActionFileTask>> {
    let api_dir = request.layout.api_dir();
    let actions_dir = request.layout.actions_dir();

    let mut sources: BTreeMap<PathBuf, Option<&str>> = BTreeMap::new();
    if api_dir.is_dir() {
        for entry in WalkDir::new(&api_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                Error::io()
                    .with_message(format!("cannot walk {}", api_dir.display()))
                    .with_source(e)
            })?;
            if entry.file_type().is_file()
                && let Some(rel) = client_relpath(&api_dir, entry.path())
            {
                sources.insert(rel, None);
            }
        }
    }
    for (path, content) in request.generated.iter() {
        if let Some(rel) = client_relpath(&api_dir, path) {
            sources.insert(rel, Some(content.as_str()));
        }
    }

    let mut tasks = Vec::with_capacity(sources.len());
    for (rel, generated) in sources {
        let src_path = api_dir.join(&rel);
        let source = match generated {
            Some(content) => content.to_owned(),
            None => std::fs::read_to_string(&src_path).map_err(|e| {
                Error::io()
                    .with_message(format!("cannot read {}", src_path.display()))
                    .with_source(e)
            })?,
        };
        tasks.push(ActionFileTask {
            src_path,
            dst_path: actions_dir.join(&rel),
            source,
        });
    }

    tracing::info!(
        target: TRACING_TARGET_ACTION,
        files = tasks.len(),
        "Action conversion planned"
    );
    Ok(tasks)
}

/// Path of a convertible client module relative to `api_dir`.
fn client_relpath(api_dir: &Path, path: &Path) -> Option<PathBuf> {
    let rel = path.strip_prefix(api_dir).ok()?;
    let is_ts = rel.extension().is_some_and(|ext| ext == "ts");
    let is_index = rel.file_name().is_some_and(|name| name == INDEX_FILE);
    let is_config = rel == Path::new(CONFIG_FILE);
    (is_ts && !is_index && !is_config).then(|| rel.to_path_buf())
}

/// Worker running [`plan_action_files`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectActionPlanner;

#[async_trait::async_trait]
impl Worker for ProjectActionPlanner {
    type Input = ActionRequest;
    type Output = Vec<ActionFileTask>;

    async fn invoke(
        &self,
        request: ActionRequest,
        _ctx: &WorkerContext,
    ) -> WorkflowResult<Vec<ActionFileTask>> {
        let tasks = tokio::task::spawn_blocking(move || plan_action_files(&request))
            .await
            .map_err(|e| Error::internal_error().with_message("action planner failed").with_source(e))??;
        Ok(tasks)
    }
}
