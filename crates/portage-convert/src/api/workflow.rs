//! Api conversion workflows.

use portage_core::FilesContent;
use portage_runtime::prelude::*;

use super::converter::FunctionApiConverter;
use super::planner::{ApiFilePlanner, ApiFileTask, FunctionTask, ProjectApiPlanner};
use crate::files::{FileContentCollect, FilesContentAggregator, FilesContentCollect, attach_output_stage};
use crate::{ConvertContext, ProjectLayout};

/// Workflow converting every function of one router module.
///
/// ```text
/// entry(ApiFileTask) -> planner -dispatch-> function -collect-> files
/// ```
pub fn file_api_graph(context: &ConvertContext) -> WorkflowResult<WorkflowGraph> {
    let mut graph = WorkflowGraph::new("file_api_converter");
    let entry = graph.add_worker("entry", Holder::<ApiFileTask>::new());
    let planner = graph.add_worker("planner", ApiFilePlanner::new(context.options().clone()));
    let function = graph.add_worker("function", FunctionApiConverter::new(context.clone()));
    let files = graph.add_aggregator("files", FilesContentAggregator);

    graph.bridge(entry, planner, IdentityBridge)?;
    graph.dispatch(planner, function, dispatch_fn(|functions: Vec<FunctionTask>| Ok(functions)))?;
    graph.collect(function, files, FileContentCollect)?;
    graph.set_entry(entry)?;
    graph.set_exit(files)?;
    Ok(graph)
}

/// Workflow converting every router of a project.
///
/// Takes a [`ProjectLayout`], writes the client modules and the
/// `lib/backend-api` barrel files, and yields every generated file.
pub fn project_api_graph(context: &ConvertContext) -> WorkflowResult<WorkflowGraph> {
    let mut graph = WorkflowGraph::new("project_api_converter");
    let entry = graph.add_worker("entry", Holder::<ProjectLayout>::new());
    let planner = graph.add_worker("planner", ProjectApiPlanner);
    let file = graph.add_worker("file_converter", GraphWorker::<ApiFileTask, FilesContent>::new(file_api_graph(context)?)?);
    let collected = graph.add_aggregator("collected", FilesContentAggregator);

    graph.bridge(entry, planner, IdentityBridge)?;
    graph.dispatch(planner, file, dispatch_fn(|tasks: Vec<ApiFileTask>| Ok(tasks)))?;
    graph.collect(file, collected, FilesContentCollect)?;
    graph.set_entry(entry)?;

    attach_output_stage(
        &mut graph,
        entry,
        collected,
        |layout: ProjectLayout| vec![layout.api_dir()],
        context.options().dry_run,
    )?;
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use portage_core::FilesContent;
    use portage_rig::mock::MockCompletion;

    use super::*;
    use crate::ConvertOptions;
    use crate::api::planner::tests::backend;
    use crate::context::mock_context;

    /// Replies with a client named after the converted function.
    fn mock() -> MockCompletion {
        MockCompletion::new(|request| {
            let name = request
                .prompt
                .lines()
                .find_map(|line| {
                    let line = line.trim_start_matches("async ");
                    line.strip_prefix("def ")?.split('(').next()
                })
                .unwrap_or("unknown");
            let reply = serde_json::json!({ "frontend_code": format!("export const {name} = 1;") });
            Ok(reply.to_string())
        })
    }

    #[tokio::test]
    async fn converts_each_function_into_its_own_module() {
        let dir = tempfile::tempdir().unwrap();
        let layout = backend(dir.path());
        let options = ConvertOptions::default();

        let graph = project_api_graph(&mock_context(mock(), options)).unwrap();
        let report: RunReport<FilesContent> =
            Engine::with_defaults().run(&graph, &layout).await.unwrap();

        let api = layout.api_dir();
        assert_eq!(report.usage.requests(), 2);
        assert_eq!(
            fs::read_to_string(api.join("users/create_user.ts")).unwrap(),
            "export const create_user = 1;"
        );
        assert_eq!(
            report.output[&api.join("users/index.ts")],
            "export * from \"./create_user\";\nexport * from \"./read_user\";\n"
        );
        assert_eq!(report.output[&api.join("index.ts")], "export * from \"./users\";\n");
        assert!(!api.join("token").exists());
    }

    #[tokio::test]
    async fn existing_client_files_are_indexed() {
        let dir = tempfile::tempdir().unwrap();
        let layout = backend(dir.path());
        fs::create_dir_all(layout.api_dir()).unwrap();
        fs::write(layout.api_dir().join("config.ts"), "export const BACKEND_API_URL = \"\";").unwrap();

        let graph = project_api_graph(&mock_context(mock(), ConvertOptions::default())).unwrap();
        let report: RunReport<FilesContent> =
            Engine::with_defaults().run(&graph, &layout).await.unwrap();

        assert_eq!(
            report.output[&layout.api_dir().join("index.ts")],
            "export * from \"./config\";\nexport * from \"./users\";\n"
        );
    }
}
