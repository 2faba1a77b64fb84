//! Line-oriented extraction of Python import statements.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static FROM_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^from\s+([\w.]+)\s+import\s+(.+)$").expect("valid from-import pattern")
});

static PLAIN_IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^import\s+(.+)$").expect("valid import pattern")
});

/// Names imported from one module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFrom {
    /// Module path as written, leading dots included.
    pub module: String,
    /// Imported names, aliases kept as `name as alias`.
    pub names: Vec<String>,
}

impl ImportFrom {
    /// Returns true if the module is imported relative to the current package.
    pub fn is_relative(&self) -> bool {
        self.module.starts_with('.')
    }

    /// Returns `(original, local)` name pairs.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|name| split_alias(name))
    }
}

/// Import statements found in a piece of Python source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportsInfo {
    /// Modules imported with `import m`.
    pub imports: Vec<String>,
    /// `from m import a, b` statements, one entry per module in first-seen order.
    pub import_froms: Vec<ImportFrom>,
}

impl ImportsInfo {
    /// Extracts import statements from `text`.
    ///
    /// Parenthesised and backslash-continued statements are joined before
    /// matching. Lines that are not import statements are ignored, and
    /// statements naming the same module are merged.
    pub fn extract(text: &str) -> Self {
        let mut info = Self::default();
        for statement in logical_lines(text) {
            if let Some(captures) = FROM_IMPORT.captures(&statement) {
                let names = split_names(&captures[2]);
                info.add_from(&captures[1], names);
            } else if let Some(captures) = PLAIN_IMPORT.captures(&statement) {
                for name in split_names(&captures[1]) {
                    let (module, _) = split_alias(&name);
                    info.imports.push(module.to_owned());
                }
            }
        }
        info
    }

    /// Returns the entry for `module`.
    pub fn from_module(&self, module: &str) -> Option<&ImportFrom> {
        self.import_froms.iter().find(|entry| entry.module == module)
    }

    fn add_from(&mut self, module: &str, names: Vec<String>) {
        match self.import_froms.iter_mut().find(|entry| entry.module == module) {
            Some(entry) => {
                for name in names {
                    if !entry.names.contains(&name) {
                        entry.names.push(name);
                    }
                }
            }
            None => self.import_froms.push(ImportFrom {
                module: module.to_owned(),
                names,
            }),
        }
    }
}

/// Splits `name as alias` into `(name, alias)`; unaliased names map to themselves.
pub(crate) fn split_alias(name: &str) -> (&str, &str) {
    match name.split_once(" as ") {
        Some((original, alias)) => (original.trim(), alias.trim()),
        None => (name.trim(), name.trim()),
    }
}

fn split_names(names: &str) -> Vec<String> {
    names
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(|name| name.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Joins continued import statements into single lines with comments removed.
fn logical_lines(text: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut open_parens = 0usize;

    for line in text.lines() {
        let code = line.split('#').next().unwrap_or_default().trim();
        if current.is_empty() && !(code.starts_with("import") || code.starts_with("from")) {
            continue;
        }

        let (code, continued) = match code.strip_suffix('\\') {
            Some(code) => (code.trim_end(), true),
            None => (code, false),
        };
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(code);

        open_parens += code.matches('(').count();
        open_parens = open_parens.saturating_sub(code.matches(')').count());
        if open_parens == 0 && !continued {
            statements.push(std::mem::take(&mut current));
        }
    }

    if !current.is_empty() {
        statements.push(current);
    }
    statements
}
