//! Schema conversion workflows.

use std::collections::BTreeMap;

use portage_core::{FileContent, SrcDstFilePair};
use portage_runtime::prelude::*;

use super::converter::{
    ConvertedSegment, SchemaImportConverter, SchemaSegment, SchemaSplitter,
    SegmentSchemaConverter, SplitSchemaFile,
};
use super::planner::ProjectSchemaPlanner;
use crate::files::{
    FileContentAggregator, FileContentCollect, FilesContentAggregator, SOCKET_FILEPATH,
    attach_output_stage,
};
use crate::segment::segment_text;
use crate::{ConvertContext, ProjectLayout};

/// Workflow converting one schema module.
///
/// ```text
/// entry(SrcDstFilePair) -> split -> imports ----------(segment 0)--> file
///       \                      \-dispatch-> segment -(segment i+1)-> file
///        \-----------------------(filepath)------------------------> file
/// ```
///
/// The exit yields a [`FileContent`](portage_core::FileContent) at the
/// destination path.
pub fn file_schema_graph(context: &ConvertContext) -> WorkflowResult<WorkflowGraph> {
    let options = context.options();
    let separators = options.separators.clone();
    let max_lines = options.max_lines_per_segment;

    let mut graph = WorkflowGraph::new("file_schema_converter");
    let entry = graph.add_worker("entry", Holder::<SrcDstFilePair>::new());
    let split = graph.add_worker("split", SchemaSplitter);
    let imports = graph.add_worker(
        "imports",
        SchemaImportConverter::new(options.import_rules.clone()),
    );
    let segment = graph.add_worker("segment", SegmentSchemaConverter::new(context.clone()));
    let file = graph.add_aggregator("file", FileContentAggregator);

    graph.bridge(entry, split, IdentityBridge)?;
    graph.bridge(split, imports, IdentityBridge)?;
    graph.dispatch(
        split,
        segment,
        dispatch_fn(move |file: SplitSchemaFile| {
            let src_relpath = file.pair.src_relpath;
            Ok(segment_text(&file.split.remains, &separators, max_lines)
                .segments
                .into_iter()
                .map(|segment| SchemaSegment {
                    src_relpath: src_relpath.clone(),
                    segment,
                })
                .collect())
        }),
    )?;

    graph.plug(
        entry,
        file,
        plug_fn(|pair: SrcDstFilePair| Ok(vec![SocketCall::new(SOCKET_FILEPATH, pair.dst_path())?])),
    )?;
    graph.plug(
        imports,
        file,
        plug_fn(|imports: String| Ok(vec![FileContentAggregator::segment(0, imports)?])),
    )?;
    graph.collect(
        segment,
        file,
        collect_fn(|batch: BTreeMap<usize, ConvertedSegment>| {
            batch
                .into_iter()
                .map(|(index, converted)| {
                    FileContentAggregator::segment(index + 1, converted.converted_segment)
                })
                .collect()
        }),
    )?;

    graph.set_entry(entry)?;
    graph.set_exit(file)?;
    Ok(graph)
}

/// Workflow converting every schema module of a project.
///
/// Takes a [`ProjectLayout`], writes the type modules and the `types` barrel
/// files, and yields every generated file as a
/// [`FilesContent`](portage_core::FilesContent).
pub fn project_schema_graph(context: &ConvertContext) -> WorkflowResult<WorkflowGraph> {
    let mut graph = WorkflowGraph::new("project_schema_converter");
    let entry = graph.add_worker("entry", Holder::<ProjectLayout>::new());
    let planner = graph.add_worker("planner", ProjectSchemaPlanner);
    let file = graph.add_worker("file_converter", GraphWorker::<SrcDstFilePair, FileContent>::new(file_schema_graph(context)?)?);
    let collected = graph.add_aggregator("collected", FilesContentAggregator);

    graph.bridge(entry, planner, IdentityBridge)?;
    graph.dispatch(planner, file, dispatch_fn(|pairs: Vec<SrcDstFilePair>| Ok(pairs)))?;
    graph.collect(file, collected, FileContentCollect)?;
    graph.set_entry(entry)?;

    attach_output_stage(
        &mut graph,
        entry,
        collected,
        |layout: ProjectLayout| vec![layout.types_dir()],
        context.options().dry_run,
    )?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use portage_core::{FilesContent, RepoKind};
    use portage_rig::mock::MockCompletion;
    use portage_rig::{Error as RigError, StructuredOutput};

    use super::*;
    use crate::ConvertOptions;
    use crate::context::mock_context;
    use crate::typescript::SchemaImportRules;

    const USER_PY: &str = "from typing import Optional\n\
        from .base import Timestamped\n\
        from engine.schemas import ProjectPublicity\n\
        \n\
        class User(Timestamped):\n    id: int\n    publicity: ProjectPublicity\n\
        \n\
        class UserCreateReqBody(MyBaseModel):\n    email: str\n    name: Optional[str] = None\n";

    fn backend(root: &std::path::Path) {
        let schemas = root.join("backend/app/schemas");
        fs::create_dir_all(&schemas).unwrap();
        fs::write(schemas.join("__init__.py"), "").unwrap();
        fs::write(schemas.join("user.py"), USER_PY).unwrap();
        fs::write(schemas.join("empty.py"), "import uuid\n").unwrap();
    }

    /// Replies with one `export type` per class found in the segment.
    fn mock() -> MockCompletion {
        MockCompletion::new(|request| {
            let converted: Vec<String> = request
                .prompt
                .lines()
                .filter_map(|line| line.strip_prefix("class "))
                .filter_map(|rest| rest.split(['(', ':']).next())
                .map(|name| format!("export type {name} = {{}};"))
                .collect();
            let reply = serde_json::json!({ "converted_segment": converted.join("\n") });
            Ok(reply.to_string())
        })
    }

    fn options(max_lines: usize, dry_run: bool) -> ConvertOptions {
        ConvertOptions {
            dry_run,
            max_lines_per_segment: max_lines,
            import_rules: SchemaImportRules {
                engine_qualifiers: vec!["ProjectPublicity".into()],
                ..SchemaImportRules::default()
            },
            ..ConvertOptions::default()
        }
    }

    #[tokio::test]
    async fn converts_a_file_segment_by_segment() {
        let dir = tempfile::tempdir().unwrap();
        backend(dir.path());
        let pair = SrcDstFilePair::new(
            RepoKind::Backend,
            dir.path().join("backend"),
            "app/schemas/user.py",
            RepoKind::Frontend,
            dir.path().join("frontend"),
            "types/user.ts",
        )
        .unwrap();

        let context = mock_context(mock(), options(4, true));
        let graph = file_schema_graph(&context).unwrap();
        let report: RunReport<portage_core::FileContent> =
            Engine::with_defaults().run(&graph, &pair).await.unwrap();

        assert_eq!(report.output.filepath, dir.path().join("frontend/types/user.ts"));
        assert_eq!(
            report.output.content,
            "import { Timestamped } from \"./base\";\n\
             import { ProjectPublicity } from \"./engine_schemas\";\n\n\
             export type User = {};\n\n\
             export type UserCreateReqBody = {};"
        );
        assert_eq!(report.usage.requests(), 2);
    }

    #[tokio::test]
    async fn converts_and_indexes_a_project() {
        let dir = tempfile::tempdir().unwrap();
        backend(dir.path());
        let layout = ProjectLayout::new(dir.path().join("backend"), dir.path().join("frontend"));

        let context = mock_context(mock(), options(512, false));
        let graph = project_schema_graph(&context).unwrap();
        let report: RunReport<FilesContent> =
            Engine::with_defaults().run(&graph, &layout).await.unwrap();

        let types = layout.types_dir();
        assert_eq!(
            report.output.paths().collect::<Vec<_>>(),
            vec![types.join("empty.ts"), types.join("index.ts"), types.join("user.ts")]
        );
        assert_eq!(report.output[&types.join("empty.ts")], "");
        assert_eq!(
            fs::read_to_string(types.join("index.ts")).unwrap(),
            "export * from \"./empty\";\nexport * from \"./user\";\n"
        );
        assert!(
            fs::read_to_string(types.join("user.ts"))
                .unwrap()
                .contains("export type UserCreateReqBody = {};")
        );
    }

    #[tokio::test]
    async fn model_failure_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        backend(dir.path());
        let layout = ProjectLayout::new(dir.path().join("backend"), dir.path().join("frontend"));

        let failing = MockCompletion::new(|_| Err(RigError::provider("mock", "invalid request")));
        let context = ConvertContext::new(
            StructuredOutput::new(Arc::new(failing)),
            options(512, false),
        );
        let graph = project_schema_graph(&context).unwrap();
        let result: WorkflowResult<RunReport<FilesContent>> =
            Engine::with_defaults().run(&graph, &layout).await;

        assert!(result.is_err());
        assert!(!layout.types_dir().exists());
    }
}
