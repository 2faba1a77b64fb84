//! Fan-out links.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{WorkflowError, WorkflowResult};

/// Splits one payload into a batch of worker inputs.
///
/// Each element of the returned list becomes one batch item of the target
/// worker, indexed by its position.
pub trait DispatchBridge: Send + Sync + 'static {
    /// Payload produced by the source node.
    type Source: DeserializeOwned;
    /// Payload of one batch item.
    type Target: Serialize;

    /// Splits one payload.
    fn dispatch(&self, source: Self::Source) -> WorkflowResult<Vec<Self::Target>>;
}

pub(crate) trait DynDispatch: Send + Sync {
    fn dispatch_value(&self, source: Value) -> WorkflowResult<Vec<Value>>;
}

impl<D: DispatchBridge> DynDispatch for D {
    fn dispatch_value(&self, source: Value) -> WorkflowResult<Vec<Value>> {
        let source = serde_json::from_value(source)
            .map_err(|e| WorkflowError::payload("dispatch source", e))?;
        self.dispatch(source)?
            .into_iter()
            .map(|item| serde_json::to_value(item).map_err(WorkflowError::from))
            .collect()
    }
}

/// Dispatch bridge backed by a closure. See [`dispatch_fn`].
pub struct FnDispatch<F, S, T> {
    f: F,
    _marker: PhantomData<fn(S) -> T>,
}

/// Creates a dispatch bridge from a closure.
pub fn dispatch_fn<S, T, F>(f: F) -> FnDispatch<F, S, T>
where
    F: Fn(S) -> WorkflowResult<Vec<T>> + Send + Sync + 'static,
{
    FnDispatch {
        f,
        _marker: PhantomData,
    }
}

impl<F, S, T> DispatchBridge for FnDispatch<F, S, T>
where
    F: Fn(S) -> WorkflowResult<Vec<T>> + Send + Sync + 'static,
    S: DeserializeOwned + 'static,
    T: Serialize + 'static,
{
    type Source = S;
    type Target = T;

    fn dispatch(&self, source: S) -> WorkflowResult<Vec<T>> {
        (self.f)(source)
    }
}

impl<F, S, T> fmt::Debug for FnDispatch<F, S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDispatch").finish_non_exhaustive()
    }
}
