//! TypeScript output helpers.
//!
//! [`export_index`] regenerates the `index.ts` barrel files of a module tree
//! and [`convert_schema_imports`] rewrites the import block of a Python schema
//! module into TypeScript imports.

mod export;
mod imports;

pub use export::export_index;
pub use imports::{SchemaImportRules, convert_schema_imports};
