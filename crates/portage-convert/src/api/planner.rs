//! Discovery of the endpoint routers and functions to convert.

use std::path::{Path, PathBuf};

use portage_core::{Error, RepoKind, Result, SrcDstFilePair};
use portage_runtime::prelude::*;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::layout::{BACKEND_ENDPOINTS_DIR, FRONTEND_API_DIR};
use crate::python::{DependencyResolver, parse_file};
use crate::{ConvertOptions, ProjectLayout, TRACING_TARGET_API};

/// Router files that hold no client-facing endpoint.
const EXCLUDED_FILES: &[&str] = &["__init__.py", "token.py"];

/// One router module to convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiFileTask {
    /// Repository roots.
    pub layout: ProjectLayout,
    /// Router module, relative to the backend root.
    pub src_relpath: PathBuf,
}

/// One endpoint function to convert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionTask {
    /// Router module and generated client module.
    pub pair: SrcDstFilePair,
    /// Function name.
    pub function: String,
    /// Source sent to the model.
    pub source: String,
}

/// Lists the router modules of a backend in path order.
///
/// A missing endpoints directory yields no task.
pub fn plan_api_files(layout: &ProjectLayout) -> Result<Vec<ApiFileTask>> {
    let endpoints_dir = layout.endpoints_dir();
    if !endpoints_dir.is_dir() {
        tracing::warn!(
            target: TRACING_TARGET_API,
            dir = %endpoints_dir.display(),
            "Endpoints directory not found"
        );
        return Ok(Vec::new());
    }

    let mut tasks = Vec::new();
    for entry in WalkDir::new(&endpoints_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::io()
                .with_message(format!("cannot walk {}", endpoints_dir.display()))
                .with_source(e)
        })?;
        let path = entry.path();
        let excluded = path
            .file_name()
            .is_some_and(|name| EXCLUDED_FILES.iter().any(|excluded| name == *excluded));
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "py") || excluded {
            continue;
        }

        let src_relpath = path
            .strip_prefix(&layout.backend)
            .map_err(|e| Error::internal_error().with_source(e))?;
        tasks.push(ApiFileTask {
            layout: layout.clone(),
            src_relpath: src_relpath.to_path_buf(),
        });
    }

    tracing::info!(
        target: TRACING_TARGET_API,
        files = tasks.len(),
        "Api conversion planned"
    );
    Ok(tasks)
}

/// Lists the functions of one router module.
///
/// Functions of `app/api/v1/endpoints/<dir>/<router>.py` map to
/// `lib/backend-api/<dir>/<router>/<function>.ts`. With `with_dependencies`
/// the source of each function is followed by the classes its parameters
/// are annotated with, searched below the backend and engine roots.
pub fn plan_functions(task: &ApiFileTask, options: &ConvertOptions) -> Result<Vec<FunctionTask>> {
    let layout = &task.layout;
    let module = parse_file(&layout.backend.join(&task.src_relpath))?;
    let resolver = DependencyResolver::new(layout.python_roots())
        .with_excluded(options.framework_names.iter().cloned());

    let router = task
        .src_relpath
        .strip_prefix(BACKEND_ENDPOINTS_DIR)
        .unwrap_or(&task.src_relpath)
        .with_extension("");

    let mut functions = Vec::with_capacity(module.functions.len());
    for header in &module.functions {
        let source = if options.with_dependencies {
            resolver.resolve(&module, header)?.to_source()
        } else {
            header.text.clone()
        };

        let dst_relpath = Path::new(FRONTEND_API_DIR)
            .join(&router)
            .join(format!("{}.ts", header.name));
        functions.push(FunctionTask {
            pair: SrcDstFilePair::new(
                RepoKind::Backend,
                &layout.backend,
                &task.src_relpath,
                RepoKind::Frontend,
                &layout.frontend,
                dst_relpath,
            )?,
            function: header.name.clone(),
            source,
        });
    }

    tracing::debug!(
        target: TRACING_TARGET_API,
        file = %task.src_relpath.display(),
        functions = functions.len(),
        "Router parsed"
    );
    Ok(functions)
}

/// Worker running [`plan_api_files`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectApiPlanner;

#[async_trait::async_trait]
impl Worker for ProjectApiPlanner {
    type Input = ProjectLayout;
    type Output = Vec<ApiFileTask>;

    async fn invoke(&self, layout: ProjectLayout, _ctx: &WorkerContext) -> WorkflowResult<Vec<ApiFileTask>> {
        let tasks = tokio::task::spawn_blocking(move || plan_api_files(&layout))
            .await
            .map_err(|e| Error::internal_error().with_message("api planner failed").with_source(e))??;
        Ok(tasks)
    }
}

/// Worker running [`plan_functions`].
#[derive(Debug, Clone)]
pub struct ApiFilePlanner {
    options: ConvertOptions,
}

impl ApiFilePlanner {
    /// Creates a planner.
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }
}

#[async_trait::async_trait]
impl Worker for ApiFilePlanner {
    type Input = ApiFileTask;
    type Output = Vec<FunctionTask>;

    async fn invoke(&self, task: ApiFileTask, _ctx: &WorkerContext) -> WorkflowResult<Vec<FunctionTask>> {
        let options = self.options.clone();
        let functions = tokio::task::spawn_blocking(move || plan_functions(&task, &options))
            .await
            .map_err(|e| Error::internal_error().with_message("router parser failed").with_source(e))??;
        Ok(functions)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::fs;

    use super::*;

    pub(crate) const USERS_PY: &str = "\
from fastapi import APIRouter, Depends
from sqlalchemy.orm import Session
from app.schemas.user import UserCreateReqBody, UserSafe

router = APIRouter()


@router.post(\"/\", response_model=UserSafe)
async def create_user(body: UserCreateReqBody, db: Session = Depends(get_db)):
    \"\"\"Create a user.\"\"\"
    user = crud.create(db, body)
    return user


@router.get(\"/{user_id}\", response_model=UserSafe)
def read_user(user_id: int, db: Session = Depends(get_db)) -> UserSafe:
    return crud.get(db, user_id)
";

    pub(crate) fn backend(root: &Path) -> ProjectLayout {
        let backend = root.join("backend");
        let endpoints = backend.join(BACKEND_ENDPOINTS_DIR);
        fs::create_dir_all(&endpoints).unwrap();
        fs::create_dir_all(backend.join("app/schemas")).unwrap();
        fs::write(endpoints.join("__init__.py"), "").unwrap();
        fs::write(endpoints.join("token.py"), "def login():\n    pass\n").unwrap();
        fs::write(endpoints.join("users.py"), USERS_PY).unwrap();
        fs::write(
            backend.join("app/schemas/user.py"),
            "class UserCreateReqBody(MyBaseModel):\n    email: str\n\nclass UserSafe(MyBaseModel):\n    id: int\n",
        )
        .unwrap();
        ProjectLayout::new(backend, root.join("frontend"))
    }

    #[test]
    fn lists_routers_minus_excluded_files() {
        let dir = tempfile::tempdir().unwrap();
        let layout = backend(dir.path());

        let tasks = plan_api_files(&layout).unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].src_relpath, PathBuf::from("app/api/v1/endpoints/users.py"));
    }

    #[test]
    fn one_task_per_function() {
        let dir = tempfile::tempdir().unwrap();
        let layout = backend(dir.path());
        let task = ApiFileTask {
            layout: layout.clone(),
            src_relpath: "app/api/v1/endpoints/users.py".into(),
        };

        let functions = plan_functions(&task, &ConvertOptions::default()).unwrap();
        let names: Vec<&str> = functions.iter().map(|f| f.function.as_str()).collect();
        assert_eq!(names, vec!["create_user", "read_user"]);
        assert_eq!(
            functions[1].pair.dst_path(),
            layout.frontend.join("lib/backend-api/users/read_user.ts")
        );
        assert!(functions[0].source.starts_with("@router.post"));
        assert!(!functions[0].source.contains("class UserCreateReqBody"));
    }

    #[test]
    fn dependencies_follow_the_signature() {
        let dir = tempfile::tempdir().unwrap();
        let layout = backend(dir.path());
        let task = ApiFileTask {
            layout,
            src_relpath: "app/api/v1/endpoints/users.py".into(),
        };
        let options = ConvertOptions {
            with_dependencies: true,
            ..ConvertOptions::default()
        };

        let functions = plan_functions(&task, &options).unwrap();
        assert!(functions[0].source.contains("class UserCreateReqBody(MyBaseModel):"));
        assert!(!functions[0].source.contains("class UserSafe"));
    }
}
