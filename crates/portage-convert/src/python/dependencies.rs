//! Resolution of the classes a function signature depends on.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use portage_core::Result;
use serde::{Deserialize, Serialize};

use super::imports::ImportsInfo;
use super::parser::{
    FunctionHeader, PythonModule, find_class_source_in_dir, find_class_source_in_file,
};
use crate::TRACING_TARGET_PYTHON;

/// Annotation names that only carry framework wiring and are never resolved.
pub const DEFAULT_FRAMEWORK_NAMES: &[&str] = &["BackgroundTasks", "Depends", "Session"];

/// A function header followed by the sources of the classes it uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionWithDependencies {
    /// Rendered function header.
    pub header: String,
    /// Class sources in import order.
    pub dependencies: Vec<String>,
}

impl FunctionWithDependencies {
    /// Returns the header and the dependencies separated by blank lines.
    pub fn to_source(&self) -> String {
        std::iter::once(self.header.as_str())
            .chain(self.dependencies.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Finds the class definitions behind the annotations of a function.
///
/// Absolute imports are looked up below every root in order, the first root
/// holding a match wins. Relative imports are looked up next to the module
/// file when its path is known.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    roots: Vec<PathBuf>,
    excluded: BTreeSet<String>,
}

impl DependencyResolver {
    /// Creates a resolver searching `roots` and skipping the default framework names.
    pub fn new(roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            roots: roots.into_iter().collect(),
            excluded: DEFAULT_FRAMEWORK_NAMES.iter().map(|s| (*s).to_owned()).collect(),
        }
    }

    /// Replaces the annotation names that are never resolved.
    pub fn with_excluded(mut self, excluded: impl IntoIterator<Item = String>) -> Self {
        self.excluded = excluded.into_iter().collect();
        self
    }

    /// Resolves the dependencies of `header`, a function of `module`.
    pub fn resolve(
        &self,
        module: &PythonModule,
        header: &FunctionHeader,
    ) -> Result<FunctionWithDependencies> {
        let wanted: BTreeSet<&str> = header
            .annotation_names
            .iter()
            .map(String::as_str)
            .filter(|name| !self.excluded.contains(*name))
            .collect();

        let imports = ImportsInfo::extract(&module.imports.join("\n"));
        let mut dependencies = Vec::new();
        for entry in &imports.import_froms {
            for (original, local) in entry.bindings() {
                if !wanted.contains(local) {
                    continue;
                }

                let sources = self.find_class(&entry.module, original, module.path.as_deref())?;
                if sources.is_empty() {
                    tracing::debug!(
                        target: TRACING_TARGET_PYTHON,
                        function = %header.name,
                        class = original,
                        module = %entry.module,
                        "Imported annotation not found"
                    );
                }
                dependencies.extend(sources);
            }
        }

        Ok(FunctionWithDependencies {
            header: header.text.clone(),
            dependencies,
        })
    }

    fn find_class(&self, module: &str, class: &str, file: Option<&Path>) -> Result<Vec<String>> {
        for base in self.module_locations(module, file) {
            let sources = if base.is_dir() {
                find_class_source_in_dir(&base, &[class])?
            } else {
                let file = base.with_extension("py");
                if !file.is_file() {
                    continue;
                }
                find_class_source_in_file(&file, &[class])?
            };
            if !sources.is_empty() {
                return Ok(sources);
            }
        }
        Ok(Vec::new())
    }

    /// Candidate paths (without `.py`) a dotted module may live at.
    fn module_locations(&self, module: &str, file: Option<&Path>) -> Vec<PathBuf> {
        let dots = module.chars().take_while(|c| *c == '.').count();
        let relative: PathBuf = module[dots..].split('.').filter(|s| !s.is_empty()).collect();

        if dots == 0 {
            return self.roots.iter().map(|root| root.join(&relative)).collect();
        }

        let Some(mut base) = file.and_then(Path::parent).map(Path::to_path_buf) else {
            return Vec::new();
        };
        for _ in 1..dots {
            if !base.pop() {
                return Vec::new();
            }
        }
        vec![base.join(relative)]
    }
}

/// Resolves the dependencies of `header` against a single project root.
pub fn function_dependencies(
    project_root: &Path,
    module: &PythonModule,
    header: &FunctionHeader,
) -> Result<FunctionWithDependencies> {
    DependencyResolver::new([project_root.to_path_buf()]).resolve(module, header)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::python::parse_file;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("app/schemas")).unwrap();
        fs::create_dir_all(root.join("app/api")).unwrap();
        fs::write(
            root.join("app/schemas/user.py"),
            "class UserCreate(BaseModel):\n    email: str\n\nclass Unused:\n    pass\n",
        )
        .unwrap();
        fs::write(root.join("app/models.py"), "class Item:\n    id: int\n").unwrap();
        fs::write(
            root.join("app/api/users.py"),
            "from sqlalchemy.orm import Session\n\
             from app.schemas import UserCreate\n\
             from ..models import Item as ItemModel\n\n\
             def create(body: UserCreate, item: ItemModel, db: Session) -> None:\n    pass\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn resolves_package_and_relative_imports() {
        let dir = project();
        let module = parse_file(&dir.path().join("app/api/users.py")).unwrap();
        let header = module.function("create").unwrap();

        let resolved = function_dependencies(dir.path(), &module, header).unwrap();
        assert_eq!(
            resolved.dependencies,
            vec![
                "class UserCreate(BaseModel):\n    email: str",
                "class Item:\n    id: int"
            ]
        );
        assert!(resolved.to_source().starts_with("def create("));
    }

    #[test]
    fn framework_names_are_skipped() {
        let dir = project();
        fs::create_dir_all(dir.path().join("sqlalchemy")).unwrap();
        fs::write(dir.path().join("sqlalchemy/orm.py"), "class Session:\n    pass\n").unwrap();

        let module = parse_file(&dir.path().join("app/api/users.py")).unwrap();
        let header = module.function("create").unwrap();
        let resolved = function_dependencies(dir.path(), &module, header).unwrap();
        assert!(resolved.dependencies.iter().all(|d| !d.contains("Session")));

        let resolved = DependencyResolver::new([dir.path().to_path_buf()])
            .with_excluded(Vec::new())
            .resolve(&module, header)
            .unwrap();
        assert!(resolved.dependencies.iter().any(|d| d.starts_with("class Session")));
    }

    #[test]
    fn header_alone_when_nothing_resolves() {
        let resolved = FunctionWithDependencies {
            header: "def f() -> None:\n    pass".into(),
            dependencies: Vec::new(),
        };
        assert_eq!(resolved.to_source(), "def f() -> None:\n    pass");
    }
}
