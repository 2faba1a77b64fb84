//! Workflow nodes that assemble, write and index generated files.
//!
//! Every converter ends with the same output stage, built by
//! [`attach_output_stage`]:
//!
//! ```text
//! collected -> dump -> export_request -> ts_export -> dump_index
//!                 \                                         \
//!                  +-------------------> output <------------+
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use portage_core::{Error, FileContent, FilesContent};
use portage_runtime::prelude::*;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_FILES;
use crate::typescript::export_index;

/// Socket receiving the path of a [`FileContent`].
pub const SOCKET_FILEPATH: &str = "filepath";
/// Socket receiving the full text of a [`FileContent`].
pub const SOCKET_CONTENT: &str = "content";
/// Socket receiving indexed text segments of a [`FileContent`].
pub const SOCKET_SEGMENTS: &str = "segments";
/// Socket receiving files of a [`FilesContent`].
pub const SOCKET_FILES: &str = "files";
/// Socket receiving module directories to index.
pub const SOCKET_MODULES: &str = "modules";

/// Builds one [`FileContent`] from a path and either a full text or segments.
///
/// Explicit content wins. Otherwise the non-empty segments are joined in index
/// order with a blank line between them.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileContentAggregator;

impl FileContentAggregator {
    /// Socket call delivering segment `index`.
    pub fn segment(index: usize, text: impl Into<String>) -> WorkflowResult<SocketCall> {
        SocketCall::new(SOCKET_SEGMENTS, BTreeMap::from([(index, text.into())]))
    }
}

impl Aggregator for FileContentAggregator {
    type Output = FileContent;

    fn sockets(&self) -> Vec<Socket> {
        vec![
            Socket::set(SOCKET_FILEPATH, "filepath"),
            Socket::set(SOCKET_CONTENT, "content"),
            Socket::merge(SOCKET_SEGMENTS, "segments"),
        ]
    }

    fn build(&self, mut state: AggregatorState) -> WorkflowResult<FileContent> {
        let filepath: PathBuf = state.take_typed("filepath")?.ok_or_else(|| {
            Error::invalid_input().with_message("file content received no filepath")
        })?;

        if let Some(content) = state.take_typed::<String>("content")? {
            return Ok(FileContent::new(filepath, content));
        }

        let segments: BTreeMap<usize, String> = state.take_typed("segments")?.unwrap_or_default();
        let content = segments
            .into_values()
            .filter(|segment| !segment.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(FileContent::new(filepath, content))
    }
}

/// Merges every file it receives into one [`FilesContent`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesContentAggregator;

impl Aggregator for FilesContentAggregator {
    type Output = FilesContent;

    fn sockets(&self) -> Vec<Socket> {
        vec![Socket::merge(SOCKET_FILES, "files")]
    }
}

fn file_call(file: FileContent) -> WorkflowResult<SocketCall> {
    SocketCall::new(SOCKET_FILES, BTreeMap::from([(file.filepath, file.content)]))
}

fn files_call(files: FilesContent) -> WorkflowResult<SocketCall> {
    SocketCall::new(SOCKET_FILES, files.into_inner())
}

/// Plugs a [`FileContent`] into a [`FilesContentAggregator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileContentPlug;

impl Plugger for FileContentPlug {
    type Source = FileContent;

    fn plug(&self, source: FileContent) -> WorkflowResult<Vec<SocketCall>> {
        Ok(vec![file_call(source)?])
    }
}

/// Plugs a [`FilesContent`] into a [`FilesContentAggregator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesContentPlug;

impl Plugger for FilesContentPlug {
    type Source = FilesContent;

    fn plug(&self, source: FilesContent) -> WorkflowResult<Vec<SocketCall>> {
        Ok(vec![files_call(source)?])
    }
}

/// Collects a batch of [`FileContent`] into a [`FilesContentAggregator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileContentCollect;

impl CollectPlugger for FileContentCollect {
    type Source = FileContent;

    fn collect(&self, batch: BTreeMap<usize, FileContent>) -> WorkflowResult<Vec<SocketCall>> {
        batch.into_values().map(file_call).collect()
    }
}

/// Collects a batch of [`FilesContent`] into a [`FilesContentAggregator`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesContentCollect;

impl CollectPlugger for FilesContentCollect {
    type Source = FilesContent;

    fn collect(&self, batch: BTreeMap<usize, FilesContent>) -> WorkflowResult<Vec<SocketCall>> {
        batch.into_values().map(files_call).collect()
    }
}

/// Writes the files it receives and passes them on.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilesDumper {
    dry_run: bool,
}

impl FilesDumper {
    /// Creates a dumper. A dry-run dumper writes nothing.
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }
}

#[async_trait::async_trait]
impl Worker for FilesDumper {
    type Input = FilesContent;
    type Output = FilesContent;

    async fn invoke(&self, files: FilesContent, ctx: &WorkerContext) -> WorkflowResult<FilesContent> {
        if self.dry_run {
            tracing::info!(
                target: TRACING_TARGET_FILES,
                node = ctx.node_name(),
                count = files.len(),
                "Dry run, files not written"
            );
        } else {
            files.write_all().await?;
        }
        Ok(files)
    }
}

/// Files about to be written and the module directories to index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    /// Generated files, keyed by path.
    pub files: BTreeMap<PathBuf, String>,
    /// Directories that receive an `index.ts` tree.
    pub modules: Vec<PathBuf>,
}

/// Gathers an [`ExportRequest`] from `files` and `modules` socket calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportRequestAggregator;

impl Aggregator for ExportRequestAggregator {
    type Output = ExportRequest;

    fn sockets(&self) -> Vec<Socket> {
        vec![
            Socket::merge(SOCKET_FILES, "files"),
            Socket::append(SOCKET_MODULES, "modules"),
        ]
    }
}

/// Regenerates the `index.ts` files of the requested module directories.
///
/// Files of the request count as present even when they are not on disk
/// yet. A module directory that neither exists nor receives a file is
/// skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct TsExporter;

#[async_trait::async_trait]
impl Worker for TsExporter {
    type Input = ExportRequest;
    type Output = FilesContent;

    async fn invoke(&self, request: ExportRequest, _ctx: &WorkerContext) -> WorkflowResult<FilesContent> {
        let indexes = tokio::task::spawn_blocking(move || -> portage_core::Result<FilesContent> {
            let pending: BTreeSet<PathBuf> = request.files.into_keys().collect();
            let mut indexes = FilesContent::new();
            for module in &request.modules {
                let has_pending = pending.iter().any(|path| path.starts_with(module));
                if !module.is_dir() && !has_pending {
                    tracing::warn!(
                        target: TRACING_TARGET_FILES,
                        module = %module.display(),
                        "Nothing to export"
                    );
                    continue;
                }
                indexes.extend(export_index(module, &pending)?);
            }
            Ok(indexes)
        })
        .await
        .map_err(|e| Error::internal_error().with_message("index export task failed").with_source(e))??;

        Ok(indexes)
    }
}

/// Appends the dump, export and merge stage to `graph` and makes its last
/// node the exit.
///
/// `collected` produces the converted [`FilesContent`]. `modules` maps the
/// output of `entry` to the directories that receive an `index.ts` tree.
/// Returns the exit node, whose output holds the converted files and the
/// generated indexes.
pub fn attach_output_stage<S, F>(
    graph: &mut WorkflowGraph,
    entry: NodeId,
    collected: NodeId,
    modules: F,
    dry_run: bool,
) -> WorkflowResult<NodeId>
where
    S: DeserializeOwned + 'static,
    F: Fn(S) -> Vec<PathBuf> + Send + Sync + 'static,
{
    let dump = graph.add_worker("dump", FilesDumper::new(dry_run));
    let export_request = graph.add_aggregator("export_request", ExportRequestAggregator);
    let exporter = graph.add_worker("ts_export", TsExporter);
    let dump_index = graph.add_worker("dump_index", FilesDumper::new(dry_run));
    let output = graph.add_aggregator("output", FilesContentAggregator);

    graph.bridge(collected, dump, IdentityBridge)?;
    graph.plug(dump, export_request, FilesContentPlug)?;
    graph.plug(
        entry,
        export_request,
        plug_fn(move |source: S| {
            modules(source)
                .into_iter()
                .map(|module| SocketCall::new(SOCKET_MODULES, module))
                .collect()
        }),
    )?;
    graph.bridge(export_request, exporter, IdentityBridge)?;
    graph.bridge(exporter, dump_index, IdentityBridge)?;
    graph.plug(dump, output, FilesContentPlug)?;
    graph.plug(dump_index, output, FilesContentPlug)?;
    graph.set_exit(output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;

    use super::*;

    #[test]
    fn content_wins_over_segments() {
        let mut state = AggregatorState::new();
        state.set("filepath", json!("/f/types/user.ts"));
        state.set("content", json!("full"));
        state.set("segments", json!({"0": "a"}));

        let file = FileContentAggregator.build(state).unwrap();
        assert_eq!(file, FileContent::new("/f/types/user.ts", "full"));
    }

    #[test]
    fn segments_join_in_numeric_order() {
        let mut state = AggregatorState::new();
        state.set("filepath", json!("x.ts"));
        let calls = [(10, "ten"), (2, "two"), (0, ""), (1, "one")];
        for (index, text) in calls {
            let call = FileContentAggregator::segment(index, text).unwrap();
            state.merge("segments", call.data).unwrap();
        }

        let file = FileContentAggregator.build(state).unwrap();
        assert_eq!(file.content, "one\n\ntwo\n\nten");
    }

    #[test]
    fn missing_filepath_is_an_error() {
        assert!(FileContentAggregator.build(AggregatorState::new()).is_err());
    }

    /// entry(FilesContent) -> collected -> output stage.
    fn stage_graph(dir: PathBuf, dry_run: bool) -> WorkflowGraph {
        let mut graph = WorkflowGraph::new("stage");
        let entry = graph.add_worker("entry", Holder::<FilesContent>::new());
        let collected = graph.add_aggregator("collected", FilesContentAggregator);
        graph.plug(entry, collected, FilesContentPlug).unwrap();
        graph.set_entry(entry).unwrap();
        attach_output_stage(
            &mut graph,
            entry,
            collected,
            move |_: FilesContent| vec![dir.clone()],
            dry_run,
        )
        .unwrap();
        graph
    }

    #[tokio::test]
    async fn output_stage_writes_and_indexes() {
        let dir = tempfile::tempdir().unwrap();
        let types = dir.path().join("types");
        let files: FilesContent = [
            FileContent::new(types.join("user.ts"), "export type User = {};"),
            FileContent::new(types.join("auth/token.ts"), "export type Token = {};"),
        ]
        .into_iter()
        .collect();

        let engine = Engine::with_defaults();
        let report: RunReport<FilesContent> = engine
            .run(&stage_graph(types.clone(), false), &files)
            .await
            .unwrap();

        assert_eq!(report.output.len(), 4);
        assert_eq!(
            fs::read_to_string(types.join("index.ts")).unwrap(),
            "export * from \"./auth\";\nexport * from \"./user\";\n"
        );
        assert_eq!(
            fs::read_to_string(types.join("auth/token.ts")).unwrap(),
            "export type Token = {};"
        );
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let types = dir.path().join("types");
        let files = FilesContent::from(FileContent::new(types.join("user.ts"), "x"));

        let engine = Engine::with_defaults();
        let report: RunReport<FilesContent> = engine
            .run(&stage_graph(types.clone(), true), &files)
            .await
            .unwrap();

        assert!(report.output.contains_key(&types.join("index.ts")));
        assert!(!types.exists());
    }

    #[tokio::test]
    async fn exporter_skips_missing_modules() {
        let request = ExportRequest {
            files: BTreeMap::new(),
            modules: vec![PathBuf::from("/definitely/not/here")],
        };
        let indexes = TsExporter
            .invoke(request, &WorkerContext::detached("ts_export"))
            .await
            .unwrap();
        assert!(indexes.is_empty());
    }
}
