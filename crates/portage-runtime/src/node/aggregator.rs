//! Socket-based aggregator nodes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{WorkflowError, WorkflowResult};

/// A node that accumulates socket calls and builds one output from them.
///
/// Aggregators are the fan-in point of a workflow: pluggers and collect
/// pluggers translate upstream payloads into [`SocketCall`](crate::link::SocketCall)s,
/// each socket mutates the [`AggregatorState`], and [`Aggregator::build`]
/// turns the final state into the output.
pub trait Aggregator: Send + Sync + 'static {
    /// Built output.
    type Output: Serialize + DeserializeOwned + Send + 'static;

    /// Sockets accepted by this aggregator.
    fn sockets(&self) -> Vec<Socket>;

    /// Builds the output from the accumulated state.
    ///
    /// The default implementation deserializes the state object into the output.
    fn build(&self, state: AggregatorState) -> WorkflowResult<Self::Output> {
        state.into_typed()
    }
}

/// Type-erased aggregator stored in the graph.
pub(crate) trait DynAggregator: Send + Sync {
    fn build_value(&self, state: AggregatorState) -> WorkflowResult<Value>;
}

impl<A: Aggregator> DynAggregator for A {
    fn build_value(&self, state: AggregatorState) -> WorkflowResult<Value> {
        let output = self.build(state)?;
        Ok(serde_json::to_value(output)?)
    }
}

type SocketHandler = dyn Fn(&mut AggregatorState, Value) -> WorkflowResult<()> + Send + Sync;

/// A named entry point of an aggregator.
#[derive(Clone)]
pub struct Socket {
    name: String,
    handler: Arc<SocketHandler>,
}

impl Socket {
    /// Creates a socket from a raw handler.
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut AggregatorState, Value) -> WorkflowResult<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    /// Socket that stores the received value in `field`, replacing the previous one.
    pub fn set(name: impl Into<String>, field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(name, move |state, value| {
            state.set(field.clone(), value);
            Ok(())
        })
    }

    /// Socket that merges the received object into the object stored in `field`.
    pub fn merge(name: impl Into<String>, field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(name, move |state, value| state.merge(&field, value))
    }

    /// Socket that appends the received value to the array stored in `field`.
    pub fn append(name: impl Into<String>, field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(name, move |state, value| state.append(&field, value))
    }

    /// Socket with a typed handler.
    pub fn typed<T, F>(name: impl Into<String>, handler: F) -> Self
    where
        T: DeserializeOwned,
        F: Fn(&mut AggregatorState, T) -> WorkflowResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        let at = format!("socket '{name}'");
        Self::new(name, move |state, value| {
            let value = serde_json::from_value(value)
                .map_err(|e| WorkflowError::payload(at.clone(), e))?;
            handler(state, value)
        })
    }

    /// Name of the socket.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn call(&self, state: &mut AggregatorState, value: Value) -> WorkflowResult<()> {
        (self.handler)(state, value)
    }
}

impl fmt::Debug for Socket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Socket").field("name", &self.name).finish()
    }
}

/// Sockets of an aggregator indexed by name.
pub(crate) type SocketTable = HashMap<String, Socket>;

/// Accumulated state of an aggregator: a JSON object keyed by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatorState {
    fields: Map<String, Value>,
}

impl AggregatorState {
    /// Creates an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field.
    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Returns a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Removes and returns a field.
    pub fn take(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    /// Removes a field and deserializes it.
    pub fn take_typed<T: DeserializeOwned>(&mut self, field: &str) -> WorkflowResult<Option<T>> {
        self.fields
            .remove(field)
            .map(|value| {
                serde_json::from_value(value)
                    .map_err(|e| WorkflowError::payload(format!("field '{field}'"), e))
            })
            .transpose()
    }

    /// Merges the entries of `value` (an object) into the object stored in `field`.
    pub fn merge(&mut self, field: &str, value: Value) -> WorkflowResult<()> {
        let Value::Object(entries) = value else {
            return Err(WorkflowError::Internal(format!(
                "cannot merge a non-object into field '{field}'"
            )));
        };

        let slot = self
            .fields
            .entry(field.to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
        match slot {
            Value::Object(existing) => {
                existing.extend(entries);
                Ok(())
            }
            _ => Err(WorkflowError::Internal(format!(
                "field '{field}' does not hold an object"
            ))),
        }
    }

    /// Appends `value` to the array stored in `field`.
    pub fn append(&mut self, field: &str, value: Value) -> WorkflowResult<()> {
        let slot = self
            .fields
            .entry(field.to_owned())
            .or_insert_with(|| Value::Array(Vec::new()));
        match slot {
            Value::Array(items) => {
                items.push(value);
                Ok(())
            }
            _ => Err(WorkflowError::Internal(format!(
                "field '{field}' does not hold an array"
            ))),
        }
    }

    /// Returns true if no field is set.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Deserializes the whole state into `T`.
    pub fn into_typed<T: DeserializeOwned>(self) -> WorkflowResult<T> {
        serde_json::from_value(Value::Object(self.fields))
            .map_err(|e| WorkflowError::payload("aggregator state", e))
    }

    /// Returns the state as a JSON object.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}
