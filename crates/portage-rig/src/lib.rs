#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod completion;
mod config;
mod error;
#[cfg(any(test, feature = "mock"))]
#[cfg_attr(docsrs, doc(cfg(feature = "mock")))]
pub mod mock;
pub mod provider;
mod structured;

pub use completion::{Completion, CompletionRequest, CompletionResponse};
pub use config::RigConfig;
pub use error::{Error, Result};
pub use provider::CompletionProvider;
pub use structured::{Structured, StructuredOutput};

/// Tracing target for the main library.
pub const TRACING_TARGET: &str = "portage_rig";
