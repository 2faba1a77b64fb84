//! Links into aggregators.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{WorkflowError, WorkflowResult};

/// A value addressed to a named socket of an aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketCall {
    /// Target socket.
    pub socket: String,
    /// Payload passed to the socket handler.
    pub data: Value,
}

impl SocketCall {
    /// Creates a socket call from any serializable payload.
    pub fn new(socket: impl Into<String>, data: impl Serialize) -> WorkflowResult<Self> {
        Ok(Self {
            socket: socket.into(),
            data: serde_json::to_value(data)?,
        })
    }
}

/// Maps the output of one node to socket calls on an aggregator.
///
/// When the source node is batched, the plugger applies to every item in
/// index order.
pub trait Plugger: Send + Sync + 'static {
    /// Payload produced by the source node.
    type Source: DeserializeOwned;

    /// Maps one payload to socket calls.
    fn plug(&self, source: Self::Source) -> WorkflowResult<Vec<SocketCall>>;
}

/// Maps a whole batch to socket calls on an aggregator.
pub trait CollectPlugger: Send + Sync + 'static {
    /// Payload of one batch item.
    type Source: DeserializeOwned;

    /// Maps the indexed batch to socket calls.
    fn collect(&self, batch: BTreeMap<usize, Self::Source>) -> WorkflowResult<Vec<SocketCall>>;
}

pub(crate) trait DynPlugger: Send + Sync {
    fn plug_value(&self, source: Value) -> WorkflowResult<Vec<SocketCall>>;
}

impl<P: Plugger> DynPlugger for P {
    fn plug_value(&self, source: Value) -> WorkflowResult<Vec<SocketCall>> {
        let source = serde_json::from_value(source)
            .map_err(|e| WorkflowError::payload("plugger source", e))?;
        self.plug(source)
    }
}

pub(crate) trait DynCollect: Send + Sync {
    fn collect_value(&self, batch: BTreeMap<usize, Value>) -> WorkflowResult<Vec<SocketCall>>;
}

impl<C: CollectPlugger> DynCollect for C {
    fn collect_value(&self, batch: BTreeMap<usize, Value>) -> WorkflowResult<Vec<SocketCall>> {
        let batch = batch
            .into_iter()
            .map(|(index, value)| {
                serde_json::from_value(value)
                    .map(|item| (index, item))
                    .map_err(|e| WorkflowError::payload(format!("collect item {index}"), e))
            })
            .collect::<WorkflowResult<BTreeMap<_, _>>>()?;
        self.collect(batch)
    }
}

/// Plugger that emits no socket calls.
///
/// Only orders the target aggregator after the source node.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullPlugger;

impl Plugger for NullPlugger {
    type Source = Value;

    fn plug(&self, _source: Value) -> WorkflowResult<Vec<SocketCall>> {
        Ok(Vec::new())
    }
}

/// Plugger backed by a closure. See [`plug_fn`].
pub struct FnPlugger<F, S> {
    f: F,
    _marker: PhantomData<fn(S)>,
}

/// Creates a plugger from a closure.
pub fn plug_fn<S, F>(f: F) -> FnPlugger<F, S>
where
    F: Fn(S) -> WorkflowResult<Vec<SocketCall>> + Send + Sync + 'static,
{
    FnPlugger {
        f,
        _marker: PhantomData,
    }
}

impl<F, S> Plugger for FnPlugger<F, S>
where
    F: Fn(S) -> WorkflowResult<Vec<SocketCall>> + Send + Sync + 'static,
    S: DeserializeOwned + 'static,
{
    type Source = S;

    fn plug(&self, source: S) -> WorkflowResult<Vec<SocketCall>> {
        (self.f)(source)
    }
}

impl<F, S> fmt::Debug for FnPlugger<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPlugger").finish_non_exhaustive()
    }
}

/// Collect plugger backed by a closure. See [`collect_fn`].
pub struct FnCollect<F, S> {
    f: F,
    _marker: PhantomData<fn(S)>,
}

/// Creates a collect plugger from a closure.
pub fn collect_fn<S, F>(f: F) -> FnCollect<F, S>
where
    F: Fn(BTreeMap<usize, S>) -> WorkflowResult<Vec<SocketCall>> + Send + Sync + 'static,
{
    FnCollect {
        f,
        _marker: PhantomData,
    }
}

impl<F, S> CollectPlugger for FnCollect<F, S>
where
    F: Fn(BTreeMap<usize, S>) -> WorkflowResult<Vec<SocketCall>> + Send + Sync + 'static,
    S: DeserializeOwned + 'static,
{
    type Source = S;

    fn collect(&self, batch: BTreeMap<usize, S>) -> WorkflowResult<Vec<SocketCall>> {
        (self.f)(batch)
    }
}

impl<F, S> fmt::Debug for FnCollect<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCollect").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn collect_deserializes_every_item() {
        let collect = collect_fn(|batch: BTreeMap<usize, String>| {
            let joined = batch.into_values().collect::<Vec<_>>().join("+");
            Ok(vec![SocketCall::new("joined", joined)?])
        });
        let batch = BTreeMap::from([(1, json!("b")), (0, json!("a"))]);
        let calls = collect.collect_value(batch).unwrap();
        assert_eq!(calls, vec![SocketCall::new("joined", "a+b").unwrap()]);
    }

    #[test]
    fn collect_reports_bad_item_index() {
        let collect = collect_fn(|_batch: BTreeMap<usize, String>| Ok(Vec::new()));
        let batch = BTreeMap::from([(0, json!("a")), (3, json!(7))]);
        let error = collect.collect_value(batch).unwrap_err();
        assert!(error.to_string().contains("collect item 3"));
    }

    #[test]
    fn null_plugger_accepts_anything() {
        assert!(NullPlugger.plug_value(json!({"any": [1, 2]})).unwrap().is_empty());
    }
}
