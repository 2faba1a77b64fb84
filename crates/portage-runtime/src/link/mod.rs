//! Links between nodes: bridges, dispatch bridges, pluggers and collect pluggers.

mod bridge;
mod dispatch;
mod plug;

use std::sync::Arc;

pub use bridge::{Bridge, FnBridge, IdentityBridge, bridge_fn};
pub(crate) use bridge::DynBridge;
pub use dispatch::{DispatchBridge, FnDispatch, dispatch_fn};
pub(crate) use dispatch::DynDispatch;
pub use plug::{
    CollectPlugger, FnCollect, FnPlugger, NullPlugger, Plugger, SocketCall, collect_fn, plug_fn,
};
pub(crate) use plug::{DynCollect, DynPlugger};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Kind of a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LinkKind {
    /// One payload to one worker input.
    Bridge,
    /// One payload to a batch of worker inputs.
    Dispatch,
    /// One payload to aggregator socket calls.
    Plug,
    /// A batch to aggregator socket calls.
    Collect,
}

impl LinkKind {
    /// Returns true if the link targets a worker.
    pub fn targets_worker(self) -> bool {
        matches!(self, Self::Bridge | Self::Dispatch)
    }
}

/// Link payload stored on a graph edge.
#[derive(Clone)]
pub(crate) enum LinkData {
    Bridge(Arc<dyn DynBridge>),
    Dispatch(Arc<dyn DynDispatch>),
    Plug(Arc<dyn DynPlugger>),
    Collect(Arc<dyn DynCollect>),
}

impl LinkData {
    pub(crate) fn kind(&self) -> LinkKind {
        match self {
            Self::Bridge(_) => LinkKind::Bridge,
            Self::Dispatch(_) => LinkKind::Dispatch,
            Self::Plug(_) => LinkKind::Plug,
            Self::Collect(_) => LinkKind::Collect,
        }
    }
}

impl std::fmt::Debug for LinkData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LinkData").field(&self.kind()).finish()
    }
}
