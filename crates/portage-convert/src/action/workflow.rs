//! Action conversion workflow.

use portage_runtime::prelude::*;

use super::converter::FileActionConverter;
use super::planner::{ActionFileTask, ActionRequest, ProjectActionPlanner};
use crate::ConvertContext;
use crate::files::{FileContentCollect, FilesContentAggregator, attach_output_stage};

/// Workflow converting every API client module of a project.
///
/// ```text
/// entry(ActionRequest) -> planner -dispatch-> file -collect-> collected -> output stage
/// ```
///
/// Writes the server action modules and the `actions/backend-api` barrel
/// files, and yields every generated file.
pub fn project_action_graph(context: &ConvertContext) -> WorkflowResult<WorkflowGraph> {
    let mut graph = WorkflowGraph::new("project_action_converter");
    let entry = graph.add_worker("entry", Holder::<ActionRequest>::new());
    let planner = graph.add_worker("planner", ProjectActionPlanner);
    let file = graph.add_worker("file_converter", FileActionConverter::new(context.clone()));
    let collected = graph.add_aggregator("collected", FilesContentAggregator);

    graph.bridge(entry, planner, IdentityBridge)?;
    graph.dispatch(planner, file, dispatch_fn(|tasks: Vec<ActionFileTask>| Ok(tasks)))?;
    graph.collect(file, collected, FileContentCollect)?;
    graph.set_entry(entry)?;

    attach_output_stage(
        &mut graph,
        entry,
        collected,
        |request: ActionRequest| vec![request.layout.actions_dir()],
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
    use crate::context::mock_context;
    use crate::{ConvertOptions, ProjectLayout};

    #[tokio::test]
    async fn converts_clients_into_server_actions() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path().join("backend"), dir.path().join("frontend"));
        let api = layout.api_dir();
        fs::create_dir_all(api.join("users")).unwrap();
        fs::write(api.join("config.ts"), "export const BACKEND_API_URL = \"\";").unwrap();
        fs::write(api.join("users/read_user.ts"), "export const readUser = cache(async () => {});").unwrap();

        let mock = MockCompletion::new(|request| {
            assert!(request.prompt.contains("readUser"));
            Ok(r#"{"server_action_code": "\"use server\";\nexport async function readUserAction() {}"}"#.to_owned())
        });
        let graph = project_action_graph(&mock_context(mock, ConvertOptions::default())).unwrap();
        let report: RunReport<FilesContent> = Engine::with_defaults()
            .run(&graph, &ActionRequest::new(layout.clone()))
            .await
            .unwrap();

        let actions = layout.actions_dir();
        assert_eq!(report.usage.requests(), 1);
        assert_eq!(
            fs::read_to_string(actions.join("users/read_user.ts")).unwrap(),
            "\"use server\";\nexport async function readUserAction() {}"
        );
        assert_eq!(
            fs::read_to_string(actions.join("index.ts")).unwrap(),
            "export * from \"./users\";\n"
        );
        assert!(!actions.join("config.ts").exists());
    }
}
