//! Barrel (`index.ts`) generation.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use portage_core::{Error, FilesContent, Result};

use crate::TRACING_TARGET_FILES;

const INDEX_FILE: &str = "index.ts";

/// Builds an `index.ts` for `dir` and every directory below it.
///
/// Each index re-exports the `.ts` modules and subdirectories next to it with
/// `export * from "./<name>";`, one line per entry in sorted order. Paths in
/// `pending` are files that are about to be written and count as present,
/// including those inside directories that do not exist yet.
///
/// # Errors
///
/// Returns [`InvalidInput`](portage_core::ErrorKind::InvalidInput) when `dir`
/// is not a directory and no pending file lives below it.
pub fn export_index(dir: &Path, pending: &BTreeSet<PathBuf>) -> Result<FilesContent> {
    let mut files = FilesContent::new();
    export_dir(dir, pending, &mut files)?;
    tracing::debug!(
        target: TRACING_TARGET_FILES,
        dir = %dir.display(),
        indexes = files.len(),
        "Generated index files"
    );
    Ok(files)
}

fn export_dir(dir: &Path, pending: &BTreeSet<PathBuf>, files: &mut FilesContent) -> Result<()> {
    let pending_here: Vec<&Path> = pending
        .iter()
        .filter_map(|path| path.strip_prefix(dir).ok())
        .filter(|rel| !rel.as_os_str().is_empty())
        .collect();

    let on_disk = dir.is_dir();
    if !on_disk && pending_here.is_empty() {
        return Err(Error::invalid_input()
            .with_message(format!("{} is not a directory", dir.display())));
    }

    let mut modules = BTreeSet::new();
    let mut subdirs = BTreeSet::new();

    if on_disk {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                modules.insert(entry.file_name().to_string_lossy().into_owned());
                subdirs.insert(path);
            } else if let Some(stem) = module_stem(&path) {
                modules.insert(stem);
            }
        }
    }

    for rel in pending_here {
        let mut components = rel.components();
        let Some(first) = components.next() else {
            continue;
        };
        if components.next().is_some() {
            modules.insert(first.as_os_str().to_string_lossy().into_owned());
            subdirs.insert(dir.join(first));
        } else if let Some(stem) = module_stem(rel) {
            modules.insert(stem);
        }
    }

    for subdir in &subdirs {
        export_dir(subdir, pending, files)?;
    }

    let mut content = modules
        .iter()
        .map(|module| format!("export * from \"./{module}\";"))
        .collect::<Vec<_>>()
        .join("\n");
    content.push('\n');
    files.insert(dir.join(INDEX_FILE), content);
    Ok(())
}

/// Stem of a re-exportable `.ts` file.
fn module_stem(path: &Path) -> Option<String> {
    if path.extension().is_none_or(|ext| ext != "ts") {
        return None;
    }
    if path.file_name().is_some_and(|name| name == INDEX_FILE) {
        return None;
    }
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn exports_modules_and_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("users")).unwrap();
        fs::write(root.join("project.ts"), "").unwrap();
        fs::write(root.join("index.ts"), "stale").unwrap();
        fs::write(root.join("notes.md"), "").unwrap();
        fs::write(root.join("users/read.ts"), "").unwrap();

        let files = export_index(root, &BTreeSet::new()).unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(
            files[&root.join("index.ts")],
            "export * from \"./project\";\nexport * from \"./users\";\n"
        );
        assert_eq!(files[&root.join("users/index.ts")], "export * from \"./read\";\n");
    }

    #[test]
    fn pending_files_count_as_present() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("types");
        let pending: BTreeSet<PathBuf> = [root.join("item.ts"), root.join("auth/token.ts")]
            .into_iter()
            .collect();

        let files = export_index(&root, &pending).unwrap();
        assert_eq!(
            files[&root.join("index.ts")],
            "export * from \"./auth\";\nexport * from \"./item\";\n"
        );
        assert_eq!(files[&root.join("auth/index.ts")], "export * from \"./token\";\n");
    }

    #[test]
    fn rejects_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let error = export_index(&dir.path().join("missing"), &BTreeSet::new()).unwrap_err();
        assert_eq!(error.kind(), portage_core::ErrorKind::InvalidInput);
    }
}
