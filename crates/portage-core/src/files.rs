//! In-memory file contents produced by converters.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use derive_more::Deref;
use serde::{Deserialize, Serialize};

use crate::{Error, Result, TRACING_TARGET_FILES};

/// A single generated file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContent {
    /// Absolute or project-relative path of the file.
    pub filepath: PathBuf,
    /// Full text of the file.
    pub content: String,
}

impl FileContent {
    /// Creates a new file content.
    pub fn new(filepath: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            content: content.into(),
        }
    }
}

/// A set of generated files keyed by path.
///
/// Iteration order follows the path ordering, which keeps summaries and
/// written output deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Deref)]
pub struct FilesContent {
    #[serde(default)]
    files: BTreeMap<PathBuf, String>,
}

impl FilesContent {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a file, replacing any previous content at the same path.
    pub fn insert(&mut self, filepath: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(filepath.into(), content.into());
    }

    /// Inserts a [`FileContent`].
    pub fn push(&mut self, file: FileContent) {
        self.files.insert(file.filepath, file.content);
    }

    /// Merges another set into this one. Entries from `other` win.
    pub fn extend(&mut self, other: FilesContent) {
        self.files.extend(other.files);
    }

    /// Returns the paths of all files.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    /// Returns the inner map.
    pub fn into_inner(self) -> BTreeMap<PathBuf, String> {
        self.files
    }

    /// Writes every file to disk, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an [`ErrorKind::Io`](crate::ErrorKind::Io) error naming the first file that
    /// could not be written.
    pub async fn write_all(&self) -> Result<()> {
        for (path, content) in &self.files {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    Error::io()
                        .with_message(format!("cannot create directory {}", parent.display()))
                        .with_source(e)
                })?;
            }

            tokio::fs::write(path, content).await.map_err(|e| {
                Error::io()
                    .with_message(format!("cannot write {}", path.display()))
                    .with_source(e)
            })?;

            tracing::debug!(
                target: TRACING_TARGET_FILES,
                path = %path.display(),
                bytes = content.len(),
                "file written"
            );
        }

        tracing::info!(
            target: TRACING_TARGET_FILES,
            count = self.files.len(),
            "files written to disk"
        );
        Ok(())
    }
}

impl From<FileContent> for FilesContent {
    fn from(file: FileContent) -> Self {
        let mut files = Self::new();
        files.push(file);
        files
    }
}

impl FromIterator<FileContent> for FilesContent {
    fn from_iter<I: IntoIterator<Item = FileContent>>(iter: I) -> Self {
        let mut files = Self::new();
        for file in iter {
            files.push(file);
        }
        files
    }
}

impl IntoIterator for FilesContent {
    type IntoIter = std::collections::btree_map::IntoIter<PathBuf, String>;
    type Item = (PathBuf, String);

    fn into_iter(self) -> Self::IntoIter {
        self.files.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extend_overwrites_existing_paths() {
        let mut files = FilesContent::new();
        files.insert("a.ts", "old");
        files.insert("b.ts", "b");

        let mut other = FilesContent::new();
        other.insert("a.ts", "new");
        files.extend(other);

        assert_eq!(files.len(), 2);
        assert_eq!(files.get(Path::new("a.ts")).map(String::as_str), Some("new"));
    }

    #[test]
    fn serializes_as_path_keyed_object() {
        let files: FilesContent = [FileContent::new("x/y.ts", "export {};")]
            .into_iter()
            .collect();
        let json = serde_json::to_value(&files).unwrap();
        assert_eq!(json["files"]["x/y.ts"], "export {};");

        let back: FilesContent = serde_json::from_value(json).unwrap();
        assert_eq!(back, files);
    }

    #[tokio::test]
    async fn write_all_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = FilesContent::new();
        files.insert(dir.path().join("types/nested/user.ts"), "export type User = {};\n");
        files.insert(dir.path().join("index.ts"), "");

        files.write_all().await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("types/nested/user.ts")).unwrap();
        assert_eq!(written, "export type User = {};\n");
        assert!(dir.path().join("index.ts").exists());
    }
}
