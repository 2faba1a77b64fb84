//! Workflow execution engine.

mod config;
mod context;
mod executor;
mod report;

pub use config::{EngineConfig, EngineConfigBuilder, EngineConfigBuilderError};
pub use context::ExecutionContext;
pub use executor::Engine;
pub(crate) use executor::run_graph;
pub use report::RunReport;
