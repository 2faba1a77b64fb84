//! Python source analysis.
//!
//! Parsing is backed by tree-sitter and only looks at top-level statements:
//! imports, function definitions (sync and async) and class definitions.

mod dependencies;
mod imports;
mod parser;
mod splitter;

pub use dependencies::{
    DEFAULT_FRAMEWORK_NAMES, DependencyResolver, FunctionWithDependencies, function_dependencies,
};
pub use imports::{ImportFrom, ImportsInfo};
pub(crate) use imports::split_alias;
pub use parser::{
    ClassSource, FunctionHeader, PythonModule, find_class_source_in_dir,
    find_class_source_in_file, parse_file, parse_module,
};
pub use splitter::{SplitPythonSource, split_imports};
