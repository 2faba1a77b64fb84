//! Prelude module for convenient imports.
//!
//! This module re-exports commonly used types for ergonomic imports:
//!
//! ```rust
//! use portage_runtime::prelude::*;
//! ```

pub use crate::engine::{Engine, EngineConfig, EngineConfigBuilder, RunReport};
pub use crate::error::{WorkflowError, WorkflowResult};
pub use crate::graph::{NodeId, WorkflowGraph};
pub use crate::link::{
    Bridge, CollectPlugger, DispatchBridge, IdentityBridge, NullPlugger, Plugger, SocketCall,
    bridge_fn, collect_fn, dispatch_fn, plug_fn,
};
pub use crate::node::{
    Aggregator, AggregatorState, GraphWorker, Holder, Socket, Worker, WorkerContext,
};
