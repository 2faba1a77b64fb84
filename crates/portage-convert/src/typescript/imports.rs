//! Deterministic rewriting of schema imports.

use std::path::PathBuf;

use portage_core::{Error, Result, SrcDstFilePair};
use serde::{Deserialize, Serialize};

use crate::python::{ImportsInfo, split_alias};

/// What survives when Python schema imports become TypeScript imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaImportRules {
    /// Frontend directory holding the generated types, relative to the frontend root.
    pub types_dir: PathBuf,
    /// Top-level Python package of the shared engine.
    pub engine_package: String,
    /// Module below `types_dir` that declares the shared engine types.
    pub engine_module: String,
    /// Engine names that are re-imported from `engine_module`.
    pub engine_qualifiers: Vec<String>,
    /// Project names that are never imported.
    pub excluded_qualifiers: Vec<String>,
}

impl Default for SchemaImportRules {
    fn default() -> Self {
        Self {
            types_dir: PathBuf::from(crate::layout::FRONTEND_TYPES_DIR),
            engine_package: "engine".to_owned(),
            engine_module: "engine_schemas".to_owned(),
            engine_qualifiers: Vec::new(),
            excluded_qualifiers: Vec::new(),
        }
    }
}

impl SchemaImportRules {
    fn is_engine_module(&self, module: &str) -> bool {
        module == self.engine_package
            || module
                .strip_prefix(self.engine_package.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    }
}

/// Rewrites the Python `imports` of a schema module into TypeScript imports.
///
/// Relative imports keep their capitalized names minus the excluded ones.
/// Imports from the engine package keep the allow-listed names and point at
/// the engine types module, addressed from the depth of the destination file
/// below `types_dir`. Every other import is dropped. Lines are grouped per
/// module in first-seen order and sorted by length.
///
/// # Errors
///
/// Returns [`InvalidInput`](portage_core::ErrorKind::InvalidInput) when the
/// destination does not live below `types_dir`.
pub fn convert_schema_imports(
    imports: &str,
    pair: &SrcDstFilePair,
    rules: &SchemaImportRules,
) -> Result<String> {
    let depth = pair
        .dst_relpath
        .strip_prefix(&rules.types_dir)
        .map(|rel| rel.components().count())
        .unwrap_or_default();
    if depth == 0 {
        return Err(Error::invalid_input().with_message(format!(
            "{} is not below {}",
            pair.dst_relpath.display(),
            rules.types_dir.display()
        )));
    }

    let engine_module = match depth {
        1 => format!("./{}", rules.engine_module),
        _ => format!("{}{}", "../".repeat(depth - 1), rules.engine_module),
    };

    let mut grouped: Vec<(String, Vec<&str>)> = Vec::new();
    let info = ImportsInfo::extract(imports);
    for entry in &info.import_froms {
        let (target, names): (String, Vec<&str>) = if entry.is_relative() {
            let names = entry
                .names
                .iter()
                .map(String::as_str)
                .filter(|name| {
                    let (original, _) = split_alias(name);
                    original.starts_with(|c: char| c.is_uppercase())
                        && !rules.excluded_qualifiers.iter().any(|q| q == original)
                })
                .collect();
            (relative_module(&entry.module), names)
        } else if rules.is_engine_module(&entry.module) {
            let names = entry
                .names
                .iter()
                .map(String::as_str)
                .filter(|name| {
                    let (original, _) = split_alias(name);
                    rules.engine_qualifiers.iter().any(|q| q == original)
                })
                .collect();
            (engine_module.clone(), names)
        } else {
            continue;
        };

        if names.is_empty() {
            continue;
        }
        match grouped.iter_mut().find(|(module, _)| *module == target) {
            Some((_, existing)) => {
                for name in names {
                    if !existing.contains(&name) {
                        existing.push(name);
                    }
                }
            }
            None => grouped.push((target, names)),
        }
    }

    let mut lines: Vec<String> = grouped
        .into_iter()
        .map(|(module, names)| format!("import {{ {} }} from \"{module}\";", names.join(", ")))
        .collect();
    lines.sort_by_key(String::len);
    Ok(lines.join("\n"))
}

/// Maps a dotted relative Python module onto a relative TypeScript path.
fn relative_module(module: &str) -> String {
    let dots = module.chars().take_while(|c| *c == '.').count();
    let path = module[dots..].replace('.', "/");
    let prefix = match dots {
        1 => "./".to_owned(),
        n => "../".repeat(n - 1),
    };

    if path.is_empty() {
        prefix.trim_end_matches('/').to_owned()
    } else {
        format!("{prefix}{path}")
    }
}

#[cfg(test)]
mod tests {
    use portage_core::RepoKind;

    use super::*;

    fn pair(dst_relpath: &str) -> SrcDstFilePair {
        SrcDstFilePair::new(
            RepoKind::Backend,
            "/backend",
            "app/schemas/x.py",
            RepoKind::Frontend,
            "/frontend",
            dst_relpath,
        )
        .unwrap()
    }

    fn rules() -> SchemaImportRules {
        SchemaImportRules {
            engine_qualifiers: vec!["ProjectPublicity".into(), "SecretRetrievalBy".into()],
            excluded_qualifiers: vec!["MyBaseModel".into()],
            ..SchemaImportRules::default()
        }
    }

    const IMPORTS: &str = "from typing import Optional\n\
        from pydantic import BaseModel\n\
        from .base import MyBaseModel, Timestamped, utils\n\
        from engine.schemas.project import ProjectPublicity, Internal\n\
        from ..common.ids import ProjectId\n";

    #[test]
    fn rewrites_relative_and_engine_imports() {
        let converted = convert_schema_imports(IMPORTS, &pair("types/project.ts"), &rules()).unwrap();
        assert_eq!(
            converted,
            "import { Timestamped } from \"./base\";\n\
             import { ProjectId } from \"../common/ids\";\n\
             import { ProjectPublicity } from \"./engine_schemas\";"
        );
    }

    #[test]
    fn engine_module_follows_destination_depth() {
        let converted = convert_schema_imports(
            "from engine import SecretRetrievalBy as Retrieval\n",
            &pair("types/a/b/item.ts"),
            &rules(),
        )
        .unwrap();
        assert_eq!(
            converted,
            "import { SecretRetrievalBy as Retrieval } from \"../../engine_schemas\";"
        );
    }

    #[test]
    fn destination_outside_types_is_rejected() {
        let error = convert_schema_imports(IMPORTS, &pair("lib/project.ts"), &rules()).unwrap_err();
        assert_eq!(error.kind(), portage_core::ErrorKind::InvalidInput);
    }

    #[test]
    fn nothing_to_import_yields_empty_text() {
        let converted =
            convert_schema_imports("import uuid\n", &pair("types/x.ts"), &rules()).unwrap();
        assert!(converted.is_empty());
    }

    #[test]
    fn maps_relative_modules() {
        assert_eq!(relative_module(".user"), "./user");
        assert_eq!(relative_module(".a.b"), "./a/b");
        assert_eq!(relative_module("..x"), "../x");
        assert_eq!(relative_module("...x.y"), "../../x/y");
        assert_eq!(relative_module(".."), "..");
    }
}
