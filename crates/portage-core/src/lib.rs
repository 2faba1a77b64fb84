#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod error;
mod files;
mod provider;
mod repo;
mod usage;

pub use error::{BoxedError, Error, ErrorKind, Result};
pub use files::{FileContent, FilesContent};
pub use provider::IntoProvider;
pub use repo::{ProgrammingLanguage, RepoKind, SrcDstFilePair};
pub use usage::{LlmUsage, ModelUsage, UsageSummary};

/// Tracing target for file system operations.
pub const TRACING_TARGET_FILES: &str = "portage_core::files";
