#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

pub mod action;
pub mod api;
mod config;
mod context;
pub mod files;
mod layout;
mod project;
pub mod python;
pub mod schema;
pub mod segment;
pub mod typescript;

pub use config::{ConvertConfig, ConvertOptions};
pub use context::ConvertContext;
pub use layout::ProjectLayout;
pub use project::{ConvertTarget, ProjectConverter};

/// Tracing target for Python source analysis.
pub const TRACING_TARGET_PYTHON: &str = "portage_convert::python";

/// Tracing target for file dumping and `index.ts` export.
pub const TRACING_TARGET_FILES: &str = "portage_convert::files";

/// Tracing target for schema conversion.
pub const TRACING_TARGET_SCHEMA: &str = "portage_convert::schema";

/// Tracing target for api conversion.
pub const TRACING_TARGET_API: &str = "portage_convert::api";

/// Tracing target for action conversion.
pub const TRACING_TARGET_ACTION: &str = "portage_convert::action";

/// Tracing target for whole-project conversion.
pub const TRACING_TARGET_PROJECT: &str = "portage_convert::project";
