//! Node types: workers and aggregators.

mod aggregator;
mod holder;
mod nested;
mod worker;

use std::sync::Arc;

pub use aggregator::{Aggregator, AggregatorState, Socket};
pub(crate) use aggregator::{DynAggregator, SocketTable};
pub use holder::Holder;
pub use nested::GraphWorker;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
pub use worker::{Worker, WorkerContext};
pub(crate) use worker::DynWorker;

/// Kind of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    /// Runs async logic on a payload.
    Worker,
    /// Builds an output from socket calls.
    Aggregator,
}

/// Node payload stored in the graph.
#[derive(Clone)]
pub(crate) enum NodeData {
    Worker {
        name: Arc<str>,
        worker: Arc<dyn DynWorker>,
    },
    Aggregator {
        name: Arc<str>,
        aggregator: Arc<dyn DynAggregator>,
        sockets: Arc<SocketTable>,
    },
}

impl NodeData {
    pub(crate) fn worker<W: Worker>(name: &str, worker: W) -> Self {
        Self::Worker {
            name: Arc::from(name),
            worker: Arc::new(worker),
        }
    }

    pub(crate) fn aggregator<A: Aggregator>(name: &str, aggregator: A) -> Self {
        let sockets = Aggregator::sockets(&aggregator)
            .into_iter()
            .map(|socket| (socket.name().to_owned(), socket))
            .collect();
        Self::Aggregator {
            name: Arc::from(name),
            aggregator: Arc::new(aggregator),
            sockets: Arc::new(sockets),
        }
    }

    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Worker { name, .. } | Self::Aggregator { name, .. } => name,
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        match self {
            Self::Worker { .. } => NodeKind::Worker,
            Self::Aggregator { .. } => NodeKind::Aggregator,
        }
    }
}

impl std::fmt::Debug for NodeData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeData")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_shows_name_and_kind() {
        let node = NodeData::worker("entry", Holder::<i64>::new());
        assert_eq!(node.name(), "entry");
        assert_eq!(node.kind(), NodeKind::Worker);
        assert_eq!(format!("{node:?}"), r#"NodeData { name: "entry", kind: Worker }"#);
    }
}
