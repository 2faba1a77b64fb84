//! One-to-one links between workers.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{WorkflowError, WorkflowResult};

/// Maps the output of one node to the input of a worker.
///
/// When the source node is batched, the bridge applies to every item and
/// the target worker stays batched.
pub trait Bridge: Send + Sync + 'static {
    /// Payload produced by the source node.
    type Source: DeserializeOwned;
    /// Payload handed to the target worker.
    type Target: Serialize;

    /// Maps one payload.
    fn bridge(&self, source: Self::Source) -> WorkflowResult<Self::Target>;
}

pub(crate) trait DynBridge: Send + Sync {
    fn bridge_value(&self, source: Value) -> WorkflowResult<Value>;
}

impl<B: Bridge> DynBridge for B {
    fn bridge_value(&self, source: Value) -> WorkflowResult<Value> {
        let source = serde_json::from_value(source)
            .map_err(|e| WorkflowError::payload("bridge source", e))?;
        Ok(serde_json::to_value(self.bridge(source)?)?)
    }
}

/// Bridge that passes the payload through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityBridge;

impl Bridge for IdentityBridge {
    type Source = Value;
    type Target = Value;

    fn bridge(&self, source: Value) -> WorkflowResult<Value> {
        Ok(source)
    }
}

/// Bridge backed by a closure. See [`bridge_fn`].
pub struct FnBridge<F, S, T> {
    f: F,
    _marker: PhantomData<fn(S) -> T>,
}

/// Creates a bridge from a closure.
pub fn bridge_fn<S, T, F>(f: F) -> FnBridge<F, S, T>
where
    F: Fn(S) -> WorkflowResult<T> + Send + Sync + 'static,
{
    FnBridge {
        f,
        _marker: PhantomData,
    }
}

impl<F, S, T> Bridge for FnBridge<F, S, T>
where
    F: Fn(S) -> WorkflowResult<T> + Send + Sync + 'static,
    S: DeserializeOwned + 'static,
    T: Serialize + 'static,
{
    type Source = S;
    type Target = T;

    fn bridge(&self, source: S) -> WorkflowResult<T> {
        (self.f)(source)
    }
}

impl<F, S, T> fmt::Debug for FnBridge<F, S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnBridge").finish_non_exhaustive()
    }
}
