//! Identity worker used as a workflow entry.

use std::fmt;
use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::{Worker, WorkerContext};
use crate::error::WorkflowResult;

/// Worker that returns its input unchanged.
///
/// Placing a `Holder<T>` at the entry of a graph rejects any run input
/// that does not deserialize into `T`.
pub struct Holder<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> Holder<T> {
    /// Creates a new holder.
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for Holder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Holder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Holder")
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait::async_trait]
impl<T> Worker for Holder<T>
where
    T: Serialize + DeserializeOwned + Send + 'static,
{
    type Input = T;
    type Output = T;

    async fn invoke(&self, input: T, _ctx: &WorkerContext) -> WorkflowResult<T> {
        Ok(input)
    }
}
