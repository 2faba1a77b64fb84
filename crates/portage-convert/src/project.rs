//! Whole-project conversion.

use portage_core::FilesContent;
use portage_runtime::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use crate::action::{ActionRequest, project_action_graph};
use crate::api::project_api_graph;
use crate::files::{FilesContentAggregator, FilesContentPlug};
use crate::schema::project_schema_graph;
use crate::{ConvertContext, ProjectLayout, TRACING_TARGET_PROJECT};

/// Socket of the action request receiving the project layout.
const SOCKET_LAYOUT: &str = "layout";
/// Socket of the action request receiving the generated API clients.
const SOCKET_GENERATED: &str = "generated";

/// What to convert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[derive(AsRefStr, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConvertTarget {
    /// Backend schemas into frontend types.
    Schema,
    /// Backend endpoints into frontend API clients.
    Api,
    /// Frontend API clients into server actions.
    Action,
    /// All of the above, actions built from the freshly generated clients.
    All,
}

/// Builds an [`ActionRequest`] from the layout and the generated clients.
#[derive(Debug, Clone, Copy, Default)]
struct ActionRequestAggregator;

impl Aggregator for ActionRequestAggregator {
    type Output = ActionRequest;

    fn sockets(&self) -> Vec<Socket> {
        vec![
            Socket::set(SOCKET_LAYOUT, "layout"),
            Socket::set(SOCKET_GENERATED, "generated"),
        ]
    }
}

/// Runs the conversion workflows on a project.
#[derive(Debug, Clone)]
pub struct ProjectConverter {
    engine: Engine,
    context: ConvertContext,
}

impl ProjectConverter {
    /// Creates a converter running on `engine`.
    pub fn new(engine: Engine, context: ConvertContext) -> Self {
        Self { engine, context }
    }

    /// Conversion context.
    pub fn context(&self) -> &ConvertContext {
        &self.context
    }

    /// Builds the workflow of `target`.
    pub fn graph(&self, target: ConvertTarget) -> WorkflowResult<WorkflowGraph> {
        match target {
            ConvertTarget::Schema => project_schema_graph(&self.context),
            ConvertTarget::Api => project_api_graph(&self.context),
            ConvertTarget::Action => project_action_graph(&self.context),
            ConvertTarget::All => self.all_graph(),
        }
    }

    /// Converts `layout` and returns every generated file.
    pub async fn convert(
        &self,
        target: ConvertTarget,
        layout: &ProjectLayout,
    ) -> WorkflowResult<RunReport<FilesContent>> {
        let graph = self.graph(target)?;
        tracing::info!(
            target: TRACING_TARGET_PROJECT,
            kind = %target,
            backend = %layout.backend.display(),
            frontend = %layout.frontend.display(),
            dry_run = self.context.options().dry_run,
            "Starting conversion"
        );

        let report: RunReport<FilesContent> = match target {
            ConvertTarget::Action => {
                let request = ActionRequest::new(layout.clone());
                self.engine.run(&graph, &request).await?
            }
            ConvertTarget::Schema | ConvertTarget::Api | ConvertTarget::All => {
                self.engine.run(&graph, layout).await?
            }
        };

        tracing::info!(
            target: TRACING_TARGET_PROJECT,
            kind = %target,
            files = report.output.len(),
            llm_requests = report.usage.requests(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Conversion finished"
        );
        Ok(report)
    }

    /// Schema and api conversion side by side, then actions from the api output.
    ///
    /// ```text
    /// entry -> schema ---------------------------------> output
    ///      \-> api ----(generated)--> action_request -> action -> output
    ///       \-----------(layout)---------/
    /// ```
    fn all_graph(&self) -> WorkflowResult<WorkflowGraph> {
        let mut graph = WorkflowGraph::new("project_converter");
        let entry = graph.add_worker("entry", Holder::<ProjectLayout>::new());
        let schema = graph.add_worker(
            "schema",
            GraphWorker::<ProjectLayout, FilesContent>::new(project_schema_graph(&self.context)?)?,
        );
        let api = graph.add_worker(
            "api",
            GraphWorker::<ProjectLayout, FilesContent>::new(project_api_graph(&self.context)?)?,
        );
        let action_request = graph.add_aggregator("action_request", ActionRequestAggregator);
        let action = graph.add_worker(
            "action",
            GraphWorker::<ActionRequest, FilesContent>::new(project_action_graph(&self.context)?)?,
        );
        let output = graph.add_aggregator("output", FilesContentAggregator);

        graph.bridge(entry, schema, IdentityBridge)?;
        graph.bridge(entry, api, IdentityBridge)?;
        graph.plug(
            entry,
            action_request,
            plug_fn(|layout: ProjectLayout| Ok(vec![SocketCall::new(SOCKET_LAYOUT, layout)?])),
        )?;
        graph.plug(
            api,
            action_request,
            plug_fn(|generated: FilesContent| Ok(vec![SocketCall::new(SOCKET_GENERATED, generated)?])),
        )?;
        graph.bridge(action_request, action, IdentityBridge)?;

        graph.plug(schema, output, FilesContentPlug)?;
        graph.plug(api, output, FilesContentPlug)?;
        graph.plug(action, output, FilesContentPlug)?;

        graph.set_entry(entry)?;
        graph.set_exit(output)?;
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use portage_rig::mock::MockCompletion;

    use super::*;
    use crate::ConvertOptions;
    use crate::context::mock_context;

    fn project(root: &Path) -> ProjectLayout {
        let backend = root.join("backend");
        fs::create_dir_all(backend.join("app/schemas")).unwrap();
        fs::create_dir_all(backend.join("app/api/v1/endpoints")).unwrap();
        fs::write(
            backend.join("app/schemas/user.py"),
            "class User(MyBaseModel):\n    id: int\n",
        )
        .unwrap();
        fs::write(
            backend.join("app/api/v1/endpoints/users.py"),
            "@router.get(\"/{user_id}\")\ndef read_user(user_id: int) -> User:\n    pass\n",
        )
        .unwrap();
        ProjectLayout::new(backend, root.join("frontend"))
    }

    /// Answers with the field matching the reply type named in the preamble.
    fn mock() -> MockCompletion {
        MockCompletion::new(|request| {
            let preamble = request.preamble.as_deref().unwrap_or_default();
            let reply = if preamble.contains("converted_segment") {
                serde_json::json!({ "converted_segment": "export type User = { id: number };" })
            } else if preamble.contains("frontend_code") {
                serde_json::json!({ "frontend_code": "export const readUser = 1;" })
            } else {
                serde_json::json!({ "server_action_code": format!("\"use server\";\n// {}", request.prompt.len()) })
            };
            Ok(reply.to_string())
        })
    }

    #[test]
    fn target_names() {
        assert_eq!(ConvertTarget::All.to_string(), "all");
        assert_eq!("api".parse::<ConvertTarget>().unwrap(), ConvertTarget::Api);
    }

    #[tokio::test]
    async fn all_chains_actions_after_api() {
        let dir = tempfile::tempdir().unwrap();
        let layout = project(dir.path());
        let options = ConvertOptions {
            dry_run: true,
            ..ConvertOptions::default()
        };
        let converter = ProjectConverter::new(Engine::with_defaults(), mock_context(mock(), options));

        let report = converter.convert(ConvertTarget::All, &layout).await.unwrap();
        let output = report.output;

        assert_eq!(output[&layout.types_dir().join("user.ts")], "export type User = { id: number };");
        assert_eq!(output[&layout.api_dir().join("users/read_user.ts")], "export const readUser = 1;");
        assert!(output[&layout.actions_dir().join("users/read_user.ts")].starts_with("\"use server\";"));
        assert!(output.contains_key(&layout.actions_dir().join("users/index.ts")));
        assert_eq!(report.usage.requests(), 3);
        assert!(!layout.frontend.exists());
    }

    #[tokio::test]
    async fn action_alone_reads_clients_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let layout = project(dir.path());
        fs::create_dir_all(layout.api_dir().join("users")).unwrap();
        fs::write(layout.api_dir().join("users/read_user.ts"), "export const readUser = 1;").unwrap();

        let converter = ProjectConverter::new(
            Engine::with_defaults(),
            mock_context(mock(), ConvertOptions::default()),
        );
        let report = converter.convert(ConvertTarget::Action, &layout).await.unwrap();

        assert_eq!(report.usage.requests(), 1);
        assert!(layout.actions_dir().join("users/read_user.ts").is_file());
        assert!(layout.actions_dir().join("index.ts").is_file());
    }
}
