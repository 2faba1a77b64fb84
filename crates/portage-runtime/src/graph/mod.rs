//! Workflow graph: nodes, links, validation and scheduling.

mod describe;
mod graph;
mod id;

pub use describe::{GraphDescription, LinkDescription, NodeDescription};
pub use graph::WorkflowGraph;
pub use id::NodeId;
