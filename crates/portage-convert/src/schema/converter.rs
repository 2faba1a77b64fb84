//! Workers of the per-file schema workflow.

use std::path::PathBuf;

use portage_core::{Error, SrcDstFilePair};
use portage_runtime::prelude::*;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::prompt::{SEGMENT_PREAMBLE, segment_prompt};
use crate::python::{SplitPythonSource, split_imports};
use crate::typescript::{SchemaImportRules, convert_schema_imports};
use crate::{ConvertContext, TRACING_TARGET_SCHEMA};

/// A schema module split into its imports and the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSchemaFile {
    /// Source module and destination type module.
    pub pair: SrcDstFilePair,
    /// Split source text.
    pub split: SplitPythonSource,
}

/// Reads a schema module and splits its imports from the rest.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchemaSplitter;

#[async_trait::async_trait]
impl Worker for SchemaSplitter {
    type Input = SrcDstFilePair;
    type Output = SplitSchemaFile;

    async fn invoke(&self, pair: SrcDstFilePair, _ctx: &WorkerContext) -> WorkflowResult<SplitSchemaFile> {
        let path = pair.src_path();
        let source = tokio::fs::read_to_string(&path).await.map_err(|e| {
            Error::io()
                .with_message(format!("cannot read {}", path.display()))
                .with_source(e)
        })?;
        let split = split_imports(&path, &source)?;

        tracing::debug!(
            target: TRACING_TARGET_SCHEMA,
            file = %pair.src_relpath.display(),
            import_bytes = split.imports.len(),
            remain_bytes = split.remains.len(),
            "Schema module split"
        );
        Ok(SplitSchemaFile { pair, split })
    }
}

/// Rewrites the import block of a split schema module.
#[derive(Debug, Clone)]
pub struct SchemaImportConverter {
    rules: SchemaImportRules,
}

impl SchemaImportConverter {
    /// Creates a converter applying `rules`.
    pub fn new(rules: SchemaImportRules) -> Self {
        Self { rules }
    }
}

#[async_trait::async_trait]
impl Worker for SchemaImportConverter {
    type Input = SplitSchemaFile;
    type Output = String;

    async fn invoke(&self, file: SplitSchemaFile, _ctx: &WorkerContext) -> WorkflowResult<String> {
        Ok(convert_schema_imports(&file.split.imports, &file.pair, &self.rules)?)
    }
}

/// One segment of a schema module on its way to the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSegment {
    /// Source module, relative to the backend root.
    pub src_relpath: PathBuf,
    /// Python source of the segment.
    pub segment: String,
}

/// TypeScript declarations the model produced for one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConvertedSegment {
    /// TypeScript source, empty when the segment declares no type.
    pub converted_segment: String,
}

/// Converts one schema segment with the model.
#[derive(Debug, Clone)]
pub struct SegmentSchemaConverter {
    context: ConvertContext,
}

impl SegmentSchemaConverter {
    /// Creates a converter.
    pub fn new(context: ConvertContext) -> Self {
        Self { context }
    }
}

#[async_trait::async_trait]
impl Worker for SegmentSchemaConverter {
    type Input = SchemaSegment;
    type Output = ConvertedSegment;

    async fn invoke(&self, input: SchemaSegment, ctx: &WorkerContext) -> WorkflowResult<ConvertedSegment> {
        tracing::debug!(
            target: TRACING_TARGET_SCHEMA,
            file = %input.src_relpath.display(),
            segment = ?ctx.batch_index(),
            lines = input.segment.lines().count(),
            "Converting schema segment"
        );

        let prompt = segment_prompt(&input.src_relpath, &input.segment);
        let converted: ConvertedSegment = self.context.extract(ctx, SEGMENT_PREAMBLE, &prompt).await?;
        Ok(converted)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use portage_core::RepoKind;
    use portage_rig::mock::MockCompletion;

    use super::*;
    use crate::context::mock_context;

    fn pair(root: &std::path::Path) -> SrcDstFilePair {
        SrcDstFilePair::new(
            RepoKind::Backend,
            root.join("backend"),
            "app/schemas/user.py",
            RepoKind::Frontend,
            root.join("frontend"),
            "types/user.ts",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn splitter_reads_and_splits() {
        let dir = tempfile::tempdir().unwrap();
        let schemas = dir.path().join("backend/app/schemas");
        fs::create_dir_all(&schemas).unwrap();
        fs::write(schemas.join("user.py"), "from .base import Base\n\nclass User(Base):\n    id: int\n").unwrap();

        let file = SchemaSplitter
            .invoke(pair(dir.path()), &WorkerContext::detached("split"))
            .await
            .unwrap();
        assert_eq!(file.split.imports, "from .base import Base\n");
        assert!(file.split.remains.contains("class User(Base):"));
    }

    #[tokio::test]
    async fn splitter_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = SchemaSplitter
            .invoke(pair(dir.path()), &WorkerContext::detached("split"))
            .await
            .unwrap_err();
        assert!(error.to_string().contains("cannot read"));
    }

    #[tokio::test]
    async fn segment_converter_records_usage() {
        let context = mock_context(
            MockCompletion::replying(r#"{"converted_segment": "export type User = { id: number };"}"#),
            Default::default(),
        );
        let ctx = WorkerContext::detached("segment");
        let converted = SegmentSchemaConverter::new(context)
            .invoke(
                SchemaSegment {
                    src_relpath: "app/schemas/user.py".into(),
                    segment: "class User(Base):\n    id: int".into(),
                },
                &ctx,
            )
            .await
            .unwrap();

        assert_eq!(converted.converted_segment, "export type User = { id: number };");
        assert_eq!(ctx.execution().usage_summary().requests(), 1);
    }
}
