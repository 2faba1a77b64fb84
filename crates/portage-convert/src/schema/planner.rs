//! Discovery of the schema modules to convert.

use std::path::Path;

use portage_core::{Error, RepoKind, Result, SrcDstFilePair};
use portage_runtime::prelude::*;
use walkdir::WalkDir;

use crate::layout::{BACKEND_SCHEMAS_DIR, FRONTEND_TYPES_DIR};
use crate::{ProjectLayout, TRACING_TARGET_SCHEMA};

/// Python files that never hold schemas.
const EXCLUDED_FILES: &[&str] = &["__init__.py"];

/// Maps every backend schema module onto its frontend type module.
///
/// `backend/app/schemas/<rel>.py` becomes `frontend/types/<rel>.ts`. Pairs
/// come in path order. A missing schemas directory yields no pair.
pub fn plan_schema_files(layout: &ProjectLayout) -> Result<Vec<SrcDstFilePair>> {
    let schemas_dir = layout.schemas_dir();
    if !schemas_dir.is_dir() {
        tracing::warn!(
            target: TRACING_TARGET_SCHEMA,
            dir = %schemas_dir.display(),
            "Schemas directory not found"
        );
        return Ok(Vec::new());
    }

    let mut pairs = Vec::new();
    for entry in WalkDir::new(&schemas_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::io()
                .with_message(format!("cannot walk {}", schemas_dir.display()))
                .with_source(e)
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || !is_schema_module(path) {
            continue;
        }

        let rel = path
            .strip_prefix(&schemas_dir)
            .map_err(|e| Error::internal_error().with_source(e))?;
        pairs.push(SrcDstFilePair::new(
            RepoKind::Backend,
            &layout.backend,
            Path::new(BACKEND_SCHEMAS_DIR).join(rel),
            RepoKind::Frontend,
            &layout.frontend,
            Path::new(FRONTEND_TYPES_DIR).join(rel).with_extension("ts"),
        )?);
    }

    tracing::info!(
        target: TRACING_TARGET_SCHEMA,
        files = pairs.len(),
        "Schema conversion planned"
    );
    Ok(pairs)
}

fn is_schema_module(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "py")
        && path
            .file_name()
            .is_some_and(|name| !EXCLUDED_FILES.iter().any(|excluded| name == *excluded))
}

/// Worker running [`plan_schema_files`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectSchemaPlanner;

#[async_trait::async_trait]
impl Worker for ProjectSchemaPlanner {
    type Input = ProjectLayout;
    type Output = Vec<SrcDstFilePair>;

    async fn invoke(
        &self,
        layout: ProjectLayout,
        _ctx: &WorkerContext,
    ) -> WorkflowResult<Vec<SrcDstFilePair>> {
        let pairs = tokio::task::spawn_blocking(move || plan_schema_files(&layout))
            .await
            .map_err(|e| Error::internal_error().with_message("schema planner failed").with_source(e))??;
        Ok(pairs)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn mirrors_schema_tree_into_types() {
        let dir = tempfile::tempdir().unwrap();
        let schemas = dir.path().join("backend/app/schemas");
        fs::create_dir_all(schemas.join("auth")).unwrap();
        fs::write(schemas.join("__init__.py"), "").unwrap();
        fs::write(schemas.join("user.py"), "").unwrap();
        fs::write(schemas.join("auth/token.py"), "").unwrap();
        fs::write(schemas.join("README.md"), "").unwrap();

        let layout = ProjectLayout::new(dir.path().join("backend"), dir.path().join("frontend"));
        let pairs = plan_schema_files(&layout).unwrap();

        let dst: Vec<PathBuf> = pairs.iter().map(|p| p.dst_relpath.clone()).collect();
        assert_eq!(dst, vec![PathBuf::from("types/auth/token.ts"), PathBuf::from("types/user.ts")]);
        assert_eq!(pairs[1].src_path(), schemas.join("user.py"));
        assert_eq!(pairs[1].dst_path(), dir.path().join("frontend/types/user.ts"));
    }

    #[test]
    fn missing_directory_plans_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path().join("b"), dir.path().join("f"));
        assert!(plan_schema_files(&layout).unwrap().is_empty());
    }
}
