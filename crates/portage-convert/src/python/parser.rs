//! Tree-sitter based extraction of top-level Python definitions.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use portage_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Parser, Tree};
use walkdir::WalkDir;

use crate::TRACING_TARGET_PYTHON;

/// Signature of a top-level function, stripped of its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionHeader {
    /// Function name.
    pub name: String,
    /// Decorators, the signature, the docstring and `pass`, one per line.
    pub text: String,
    /// Identifiers referenced by the parameter annotations.
    pub annotation_names: BTreeSet<String>,
}

/// Source of a top-level class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSource {
    /// Class name.
    pub name: String,
    /// Class source, decorators included.
    pub source: String,
}

/// Top-level parts of a Python module.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PythonModule {
    /// Path the module was read from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Normalized import statements in source order.
    pub imports: Vec<String>,
    /// Function headers in source order.
    pub functions: Vec<FunctionHeader>,
    /// Classes in source order.
    pub classes: Vec<ClassSource>,
}

impl PythonModule {
    /// Returns the header of the named function.
    pub fn function(&self, name: &str) -> Option<&FunctionHeader> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Returns the source of the named class.
    pub fn class(&self, name: &str) -> Option<&ClassSource> {
        self.classes.iter().find(|c| c.name == name)
    }
}

/// Parses Python source into its top-level imports, functions and classes.
///
/// # Errors
///
/// Returns a [`Parse`](portage_core::ErrorKind::Parse) error when the source
/// contains a syntax error.
pub fn parse_module(source: &str) -> Result<PythonModule> {
    let tree = parse_tree(source)?;
    let root = tree.root_node();
    let bytes = source.as_bytes();

    let mut module = PythonModule::default();
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        match child.kind() {
            "import_statement" | "import_from_statement" | "future_import_statement" => {
                module.imports.push(normalize_import(child, bytes));
            }
            "function_definition" => {
                module.functions.push(function_header(child, &[], bytes));
            }
            "class_definition" => {
                module.classes.push(class_source(child, child, bytes));
            }
            "decorated_definition" => {
                let Some(definition) = child.child_by_field_name("definition") else {
                    continue;
                };
                match definition.kind() {
                    "function_definition" => {
                        let decorators = decorators(child, bytes);
                        module
                            .functions
                            .push(function_header(definition, &decorators, bytes));
                    }
                    "class_definition" => {
                        module.classes.push(class_source(child, definition, bytes));
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    Ok(module)
}

/// Reads and parses a Python file.
pub fn parse_file(path: &Path) -> Result<PythonModule> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        Error::io()
            .with_message(format!("cannot read {}", path.display()))
            .with_source(e)
    })?;
    let mut module = parse_module(&source).map_err(|e| {
        let message = format!("{}: {}", path.display(), message_of(&e));
        e.with_message(message)
    })?;
    module.path = Some(path.to_path_buf());

    tracing::debug!(
        target: TRACING_TARGET_PYTHON,
        path = %path.display(),
        functions = module.functions.len(),
        classes = module.classes.len(),
        "Parsed python module"
    );
    Ok(module)
}

/// Returns the sources of the classes named in `names` defined at the top of `path`.
///
/// Classes are returned in source order; a file defining none of them yields
/// an empty list.
pub fn find_class_source_in_file(path: &Path, names: &[&str]) -> Result<Vec<String>> {
    let module = parse_file(path)?;
    Ok(module
        .classes
        .into_iter()
        .filter(|class| names.contains(&class.name.as_str()))
        .map(|class| class.source)
        .collect())
}

/// Searches every `.py` file below `dir` for the classes named in `names`.
///
/// Files are visited in path order so the result is deterministic.
pub fn find_class_source_in_dir(dir: &Path, names: &[&str]) -> Result<Vec<String>> {
    let mut sources = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            Error::io()
                .with_message(format!("cannot walk {}", dir.display()))
                .with_source(e)
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "py") {
            sources.extend(find_class_source_in_file(path, names)?);
        }
    }
    Ok(sources)
}

fn parse_tree(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| {
            Error::internal_error().with_message(format!("cannot load the python grammar: {e}"))
        })?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| Error::parse().with_message("python parser produced no tree"))?;

    if let Some(node) = first_error(tree.root_node()) {
        let position = node.start_position();
        return Err(Error::parse().with_message(format!(
            "syntax error at line {}, column {}",
            position.row + 1,
            position.column + 1
        )));
    }
    Ok(tree)
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn message_of(error: &Error) -> String {
    error.message.clone().unwrap_or_else(|| error.kind_str().to_owned())
}

fn text<'a>(node: Node<'_>, bytes: &'a [u8]) -> &'a str {
    node.utf8_text(bytes).unwrap_or_default()
}

/// Collapses whitespace runs, including newlines, into single spaces.
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn normalize_import(node: Node<'_>, bytes: &[u8]) -> String {
    let mut cursor = node.walk();
    let names: Vec<String> = node
        .children_by_field_name("name", &mut cursor)
        .map(|name| collapse_whitespace(text(name, bytes)))
        .collect();

    if node.kind() == "import_statement" {
        return format!("import {}", names.join(", "));
    }

    let module = match node.kind() {
        "future_import_statement" => "__future__".to_owned(),
        _ => node
            .child_by_field_name("module_name")
            .map(|m| collapse_whitespace(text(m, bytes)))
            .unwrap_or_default(),
    };

    let mut wildcard = node.walk();
    let has_wildcard = node
        .named_children(&mut wildcard)
        .any(|child| child.kind() == "wildcard_import");
    if has_wildcard {
        format!("from {module} import *")
    } else {
        format!("from {module} import {}", names.join(", "))
    }
}

fn decorators(decorated: Node<'_>, bytes: &[u8]) -> Vec<String> {
    let mut cursor = decorated.walk();
    decorated
        .named_children(&mut cursor)
        .filter(|child| child.kind() == "decorator")
        .map(|child| collapse_whitespace(text(child, bytes)))
        .collect()
}

fn function_header(node: Node<'_>, decorators: &[String], bytes: &[u8]) -> FunctionHeader {
    let name = node
        .child_by_field_name("name")
        .map(|n| text(n, bytes).to_owned())
        .unwrap_or_default();
    let parameters = node
        .child_by_field_name("parameters")
        .map(|p| format_parameters(p, bytes))
        .unwrap_or_else(|| "()".to_owned());
    let return_type = node
        .child_by_field_name("return_type")
        .map(|r| collapse_whitespace(text(r, bytes)))
        .unwrap_or_else(|| "None".to_owned());
    let is_async = node
        .child(0)
        .is_some_and(|first| first.kind() == "async");

    let mut lines: Vec<String> = decorators.to_vec();
    let keyword = if is_async { "async def" } else { "def" };
    lines.push(format!("{keyword} {name}{parameters} -> {return_type}:"));
    if let Some(docstring) = node
        .child_by_field_name("body")
        .and_then(|body| docstring(body, bytes))
    {
        lines.push(format!("    \"\"\"{docstring}\"\"\""));
    }
    lines.push("    pass".to_owned());

    let mut annotation_names = BTreeSet::new();
    if let Some(parameters) = node.child_by_field_name("parameters") {
        let mut cursor = parameters.walk();
        for parameter in parameters.named_children(&mut cursor) {
            if let Some(annotation) = parameter.child_by_field_name("type") {
                collect_identifiers(annotation, bytes, &mut annotation_names);
            }
        }
    }

    FunctionHeader {
        name,
        text: lines.join("\n"),
        annotation_names,
    }
}

/// Renders a parameter list on one line, each parameter kept verbatim.
fn format_parameters(parameters: Node<'_>, bytes: &[u8]) -> String {
    let mut cursor = parameters.walk();
    let rendered: Vec<&str> = parameters
        .named_children(&mut cursor)
        .filter(|parameter| parameter.kind() != "comment")
        .map(|parameter| text(parameter, bytes))
        .collect();
    format!("({})", rendered.join(", "))
}

fn docstring(body: Node<'_>, bytes: &[u8]) -> Option<String> {
    let statement = body.named_child(0)?;
    if statement.kind() != "expression_statement" {
        return None;
    }
    let string = statement.named_child(0)?;
    if string.kind() != "string" {
        return None;
    }

    let raw = text(string, bytes);
    let unprefixed = raw.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let inner = ["\"\"\"", "'''", "\"", "'"]
        .iter()
        .find_map(|quote| {
            unprefixed
                .strip_prefix(quote)
                .and_then(|s| s.strip_suffix(quote))
        })?;

    let cleaned = clean_docstring(inner);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Removes the common indentation of all lines after the first and trims
/// leading and trailing blank lines.
fn clean_docstring(doc: &str) -> String {
    let lines: Vec<&str> = doc.lines().collect();
    let indent = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut cleaned: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.trim().to_owned()
            } else {
                line.get(indent..).unwrap_or("").trim_end().to_owned()
            }
        })
        .collect();

    while cleaned.first().is_some_and(|line| line.is_empty()) {
        cleaned.remove(0);
    }
    while cleaned.last().is_some_and(|line| line.is_empty()) {
        cleaned.pop();
    }

    cleaned
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 || line.is_empty() {
                line.clone()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn collect_identifiers(node: Node<'_>, bytes: &[u8], names: &mut BTreeSet<String>) {
    if node.kind() == "identifier" {
        names.insert(text(node, bytes).to_owned());
        return;
    }
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        collect_identifiers(child, bytes, names);
    }
}

fn class_source(outer: Node<'_>, definition: Node<'_>, bytes: &[u8]) -> ClassSource {
    let name = definition
        .child_by_field_name("name")
        .map(|n| text(n, bytes).to_owned())
        .unwrap_or_default();
    ClassSource {
        name,
        source: text(outer, bytes).trim_end().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    const ROUTER: &str = r#"from typing import Annotated
from fastapi import (
    APIRouter,
    Depends,
)
import app.schemas as schemas

router = APIRouter()


@router.get("/users/{user_id}", response_model=schemas.User)
def read_user(
    user_id: int,
    db: Annotated[Session, Depends(get_db)],
    password: str = "",
) -> schemas.User:
    """Read a user.

    Returns the user with the given id.
    """
    return crud.get(db, user_id)


async def list_users(skip: int = 0):
    return []


class Helper(BaseModel):
    name: str
"#;

    #[test]
    fn extracts_imports_in_normalized_form() {
        let module = parse_module(ROUTER).unwrap();
        assert_eq!(
            module.imports,
            vec![
                "from typing import Annotated",
                "from fastapi import APIRouter, Depends",
                "import app.schemas as schemas",
            ]
        );
    }

    #[test]
    fn renders_function_headers() {
        let module = parse_module(ROUTER).unwrap();
        let header = module.function("read_user").unwrap();
        assert_eq!(
            header.text,
            "@router.get(\"/users/{user_id}\", response_model=schemas.User)\n\
             def read_user(user_id: int, db: Annotated[Session, Depends(get_db)], password: str = \"\") -> schemas.User:\n    \
             \"\"\"Read a user.\n\n    Returns the user with the given id.\"\"\"\n    \
             pass"
        );
        assert!(header.annotation_names.contains("Session"));
        assert!(header.annotation_names.contains("Annotated"));
    }

    #[test]
    fn includes_async_functions_without_annotations() {
        let module = parse_module(ROUTER).unwrap();
        let header = module.function("list_users").unwrap();
        assert_eq!(
            header.text,
            "async def list_users(skip: int = 0) -> None:\n    pass"
        );
    }

    #[test]
    fn keeps_parameter_defaults_verbatim() {
        let module = parse_module(
            "def f(\n    x: str = \"a  b\",\n    t=(1,),\n    *,\n    flag: bool = False,  # trailing\n) -> int:\n    pass\n",
        )
        .unwrap();
        assert_eq!(
            module.function("f").unwrap().text,
            "def f(x: str = \"a  b\", t=(1,), *, flag: bool = False) -> int:\n    pass"
        );
    }

    #[test]
    fn collects_classes() {
        let module = parse_module(ROUTER).unwrap();
        let class = module.class("Helper").unwrap();
        assert!(class.source.starts_with("class Helper(BaseModel):"));
        assert_eq!(module.functions.len(), 2);
    }

    #[test]
    fn rejects_syntax_errors() {
        let error = parse_module("def broken(:\n    pass\n").unwrap_err();
        assert_eq!(error.kind(), portage_core::ErrorKind::Parse);
    }

    #[test]
    fn finds_classes_across_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("models")).unwrap();
        fs::write(
            dir.path().join("models/user.py"),
            "class User:\n    id: int\n\nclass Other:\n    pass\n",
        )
        .unwrap();
        fs::write(dir.path().join("models/item.py"), "class Item:\n    pass\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "class User: nope").unwrap();

        let sources = find_class_source_in_dir(dir.path(), &["User", "Item"]).unwrap();
        assert_eq!(sources, vec!["class Item:\n    pass", "class User:\n    id: int"]);
    }
}
