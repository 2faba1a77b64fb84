//! Separation of a module's import block from the rest of its source.

use std::path::{Path, PathBuf};

use portage_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Python source split into its import statements and everything else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPythonSource {
    /// File the source was read from.
    pub filepath: PathBuf,
    /// Top-level import statements, continuation lines included.
    pub imports: String,
    /// All remaining lines in their original order.
    pub remains: String,
}

/// Splits `source` into its top-level import statements and the remaining code.
///
/// Only unindented `import` and `from ... import` statements move to
/// [`SplitPythonSource::imports`]; parenthesised and backslash-continued
/// statements move as a whole. Line endings are preserved.
///
/// # Errors
///
/// Returns [`InvalidInput`](portage_core::ErrorKind::InvalidInput) when
/// `path` does not name a `.py` file.
pub fn split_imports(path: &Path, source: &str) -> Result<SplitPythonSource> {
    if path.extension().is_none_or(|ext| ext != "py") {
        return Err(Error::invalid_input()
            .with_message(format!("{} is not a python file", path.display())));
    }

    let mut imports = String::new();
    let mut remains = String::new();
    let mut open_parens = 0usize;
    let mut continued = false;

    for line in source.split_inclusive('\n') {
        let in_statement = open_parens > 0 || continued;
        if !in_statement && !is_import_start(line) {
            remains.push_str(line);
            continue;
        }

        imports.push_str(line);
        let code = line.split('#').next().unwrap_or_default().trim_end();
        open_parens += code.matches('(').count();
        open_parens = open_parens.saturating_sub(code.matches(')').count());
        continued = code.ends_with('\\');
    }

    Ok(SplitPythonSource {
        filepath: path.to_path_buf(),
        imports,
        remains,
    })
}

fn is_import_start(line: &str) -> bool {
    ["import", "from"].iter().any(|keyword| {
        line.strip_prefix(keyword)
            .is_some_and(|rest| rest.starts_with([' ', '\t']))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "\"\"\"User schemas.\"\"\"\n\
        from typing import Optional\n\
        from .base import (\n    Base,\n    Timestamped,\n)\n\
        import uuid\n\
        \n\
        class User(Base):\n    from_cache: bool = False\n\n\
        def helper():\n    import json\n    return json\n";

    #[test]
    fn moves_top_level_imports_only() {
        let split = split_imports(Path::new("app/schemas/user.py"), SOURCE).unwrap();
        assert_eq!(
            split.imports,
            "from typing import Optional\nfrom .base import (\n    Base,\n    Timestamped,\n)\nimport uuid\n"
        );
        assert!(split.remains.starts_with("\"\"\"User schemas.\"\"\"\n\nclass User(Base):"));
        assert!(split.remains.contains("    import json\n"));
        assert!(split.remains.contains("    from_cache: bool = False"));
    }

    #[test]
    fn rejects_non_python_paths() {
        let error = split_imports(Path::new("types/user.ts"), "import x").unwrap_err();
        assert_eq!(error.kind(), portage_core::ErrorKind::InvalidInput);
    }

    #[test]
    fn keeps_backslash_continuations_together() {
        let split = split_imports(Path::new("m.py"), "from m import a, \\\n    b\nx = 1\n").unwrap();
        assert_eq!(split.imports, "from m import a, \\\n    b\n");
        assert_eq!(split.remains, "x = 1\n");
    }
}
