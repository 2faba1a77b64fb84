//! Workflow graph runtime representation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use petgraph::Direction;
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};

use super::describe::{GraphDescription, LinkDescription, NodeDescription};
use super::id::NodeId;
use crate::error::{WorkflowError, WorkflowResult};
use crate::link::{Bridge, CollectPlugger, DispatchBridge, LinkData, LinkKind, Plugger};
use crate::node::{Aggregator, NodeData, NodeKind, Worker};

/// Edge payload.
#[derive(Debug, Clone)]
pub(crate) struct EdgeData {
    pub(crate) link: LinkData,
}

/// A workflow graph of workers and aggregators connected by links.
///
/// Internally uses petgraph's `DiGraph` for efficient graph operations.
/// Every run starts at the entry worker and returns the output of the
/// exit node.
pub struct WorkflowGraph {
    name: String,
    /// The underlying directed graph.
    graph: DiGraph<NodeData, EdgeData>,
    /// Mapping from NodeId to petgraph's NodeIndex.
    node_indices: HashMap<NodeId, NodeIndex>,
    /// Reverse mapping from NodeIndex to NodeId.
    index_to_id: HashMap<NodeIndex, NodeId>,
    entry: Option<NodeId>,
    exit: Option<NodeId>,
}

impl WorkflowGraph {
    /// Creates a new empty workflow graph.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            graph: DiGraph::new(),
            node_indices: HashMap::new(),
            index_to_id: HashMap::new(),
            entry: None,
            exit: None,
        }
    }

    /// Name of the workflow.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of links in the graph.
    pub fn link_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Adds a worker node and returns its ID.
    pub fn add_worker<W: Worker>(&mut self, name: &str, worker: W) -> NodeId {
        self.add_node(NodeData::worker(name, worker))
    }

    /// Adds an aggregator node and returns its ID.
    pub fn add_aggregator<A: Aggregator>(&mut self, name: &str, aggregator: A) -> NodeId {
        self.add_node(NodeData::aggregator(name, aggregator))
    }

    fn add_node(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::new();
        let index = self.graph.add_node(data);
        self.node_indices.insert(id, index);
        self.index_to_id.insert(index, id);
        id
    }

    /// Connects two nodes with a bridge. The target must be a worker.
    pub fn bridge<B: Bridge>(&mut self, from: NodeId, to: NodeId, bridge: B) -> WorkflowResult<()> {
        self.add_link(from, to, LinkData::Bridge(std::sync::Arc::new(bridge)))
    }

    /// Connects two nodes with a dispatch bridge. The target must be a worker.
    pub fn dispatch<D: DispatchBridge>(
        &mut self,
        from: NodeId,
        to: NodeId,
        dispatch: D,
    ) -> WorkflowResult<()> {
        self.add_link(from, to, LinkData::Dispatch(std::sync::Arc::new(dispatch)))
    }

    /// Connects a node to an aggregator with a plugger.
    pub fn plug<P: Plugger>(&mut self, from: NodeId, to: NodeId, plugger: P) -> WorkflowResult<()> {
        self.add_link(from, to, LinkData::Plug(std::sync::Arc::new(plugger)))
    }

    /// Connects a batched node to an aggregator with a collect plugger.
    pub fn collect<C: CollectPlugger>(
        &mut self,
        from: NodeId,
        to: NodeId,
        collect: C,
    ) -> WorkflowResult<()> {
        self.add_link(from, to, LinkData::Collect(std::sync::Arc::new(collect)))
    }

    fn add_link(&mut self, from: NodeId, to: NodeId, link: LinkData) -> WorkflowResult<()> {
        let from_index = self.require(from)?;
        let to_index = self.require(to)?;

        let target = &self.graph[to_index];
        let expected = if link.kind().targets_worker() {
            NodeKind::Worker
        } else {
            NodeKind::Aggregator
        };
        if target.kind() != expected {
            return Err(WorkflowError::InvalidDefinition(format!(
                "{} link into '{}' requires a {expected} target, found {}",
                link.kind(),
                target.name(),
                target.kind()
            )));
        }

        self.graph.add_edge(from_index, to_index, EdgeData { link });
        Ok(())
    }

    /// Marks the entry node. It must be a worker.
    pub fn set_entry(&mut self, node: NodeId) -> WorkflowResult<()> {
        let index = self.require(node)?;
        if self.graph[index].kind() != NodeKind::Worker {
            return Err(WorkflowError::InvalidDefinition(format!(
                "entry node '{}' must be a worker",
                self.graph[index].name()
            )));
        }
        self.entry = Some(node);
        Ok(())
    }

    /// Marks the exit node.
    pub fn set_exit(&mut self, node: NodeId) -> WorkflowResult<()> {
        self.require(node)?;
        self.exit = Some(node);
        Ok(())
    }

    /// Entry node, if set.
    pub fn entry(&self) -> Option<NodeId> {
        self.entry
    }

    /// Exit node, if set.
    pub fn exit(&self) -> Option<NodeId> {
        self.exit
    }

    /// Returns the name of a node.
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let index = self.node_indices.get(&id)?;
        self.graph.node_weight(*index).map(|data| data.name())
    }

    /// Returns whether a node exists.
    pub fn contains_node(&self, id: NodeId) -> bool {
        self.node_indices.contains_key(&id)
    }

    fn require(&self, id: NodeId) -> WorkflowResult<NodeIndex> {
        self.node_indices.get(&id).copied().ok_or_else(|| {
            WorkflowError::InvalidDefinition(format!("node {id} does not exist in '{}'", self.name))
        })
    }

    pub(crate) fn index_of(&self, id: NodeId) -> WorkflowResult<NodeIndex> {
        self.require(id)
    }

    pub(crate) fn node(&self, index: NodeIndex) -> &NodeData {
        &self.graph[index]
    }

    /// Incoming links of a node in the order they were added.
    pub(crate) fn incoming(&self, index: NodeIndex) -> Vec<(NodeIndex, &LinkData)> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| (edge.id(), edge.source(), &edge.weight().link))
            .collect();
        edges.sort_by_key(|(id, ..)| id.index());
        edges
            .into_iter()
            .map(|(_, source, link)| (source, link))
            .collect()
    }

    /// Validates the workflow graph structure.
    ///
    /// Checks that:
    /// - Entry and exit nodes are set
    /// - The graph is acyclic
    /// - Every worker except the entry has exactly one incoming bridge or dispatch
    /// - Every aggregator has at least one incoming plug or collect link
    /// - Dispatch sources are not batched and collect sources are batched
    /// - Every node is reachable from the entry
    pub fn validate(&self) -> WorkflowResult<()> {
        let entry = self.entry.ok_or_else(|| {
            WorkflowError::InvalidDefinition(format!("workflow '{}' has no entry node", self.name))
        })?;
        let exit = self.exit.ok_or_else(|| {
            WorkflowError::InvalidDefinition(format!("workflow '{}' has no exit node", self.name))
        })?;
        let entry_index = self.require(entry)?;
        self.require(exit)?;

        if is_cyclic_directed(&self.graph) {
            return Err(WorkflowError::InvalidDefinition(format!(
                "cycle detected in workflow '{}'",
                self.name
            )));
        }

        for index in self.graph.node_indices() {
            let data = &self.graph[index];
            let incoming = self.incoming(index);

            match data.kind() {
                NodeKind::Worker if index == entry_index => {
                    if !incoming.is_empty() {
                        return Err(WorkflowError::InvalidDefinition(format!(
                            "entry node '{}' cannot have incoming links",
                            data.name()
                        )));
                    }
                }
                NodeKind::Worker => {
                    if incoming.len() != 1 {
                        return Err(WorkflowError::InvalidDefinition(format!(
                            "worker '{}' must have exactly one incoming bridge, found {}",
                            data.name(),
                            incoming.len()
                        )));
                    }
                }
                NodeKind::Aggregator => {
                    if incoming.is_empty() {
                        return Err(WorkflowError::InvalidDefinition(format!(
                            "aggregator '{}' has no incoming links",
                            data.name()
                        )));
                    }
                }
            }

            for (_, link) in &incoming {
                if link.kind().targets_worker() != (data.kind() == NodeKind::Worker) {
                    return Err(WorkflowError::InvalidDefinition(format!(
                        "{} link cannot target {} '{}'",
                        link.kind(),
                        data.kind(),
                        data.name()
                    )));
                }
            }
        }

        self.batched_nodes()?;

        let mut reachable = HashSet::new();
        let mut dfs = Dfs::new(&self.graph, entry_index);
        while let Some(index) = dfs.next(&self.graph) {
            reachable.insert(index);
        }
        let unreachable: Vec<&str> = self
            .graph
            .node_indices()
            .filter(|index| !reachable.contains(index))
            .map(|index| self.graph[index].name())
            .collect();
        if !unreachable.is_empty() {
            return Err(WorkflowError::InvalidDefinition(format!(
                "nodes unreachable from the entry of '{}': {}",
                self.name,
                unreachable.join(", ")
            )));
        }

        Ok(())
    }

    /// Computes which nodes run once per batch item.
    ///
    /// A worker is batched when it is fed by a dispatch, or by a bridge from
    /// a batched node. Aggregators are never batched.
    pub(crate) fn batched_nodes(&self) -> WorkflowResult<HashSet<NodeIndex>> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            WorkflowError::InvalidDefinition(format!(
                "cycle detected at node '{}'",
                self.graph[cycle.node_id()].name()
            ))
        })?;

        let mut batched = HashSet::new();
        for index in order {
            let data = &self.graph[index];
            for (source, link) in self.incoming(index) {
                let source_batched = batched.contains(&source);
                match link.kind() {
                    LinkKind::Dispatch if source_batched => {
                        return Err(WorkflowError::InvalidDefinition(format!(
                            "nested dispatch into '{}': source '{}' is already batched",
                            data.name(),
                            self.graph[source].name()
                        )));
                    }
                    LinkKind::Dispatch => {
                        batched.insert(index);
                    }
                    LinkKind::Bridge if source_batched => {
                        batched.insert(index);
                    }
                    LinkKind::Collect if !source_batched => {
                        return Err(WorkflowError::InvalidDefinition(format!(
                            "collect into '{}' requires a batched source, '{}' is not",
                            data.name(),
                            self.graph[source].name()
                        )));
                    }
                    _ => {}
                }
            }
        }
        Ok(batched)
    }

    /// Groups nodes into levels: every node depends only on nodes of earlier levels.
    pub(crate) fn levels(&self) -> WorkflowResult<Vec<Vec<NodeIndex>>> {
        let order = toposort(&self.graph, None).map_err(|cycle| {
            WorkflowError::InvalidDefinition(format!(
                "cycle detected at node '{}'",
                self.graph[cycle.node_id()].name()
            ))
        })?;

        let mut depth: HashMap<NodeIndex, usize> = HashMap::new();
        let mut levels: BTreeMap<usize, Vec<NodeIndex>> = BTreeMap::new();
        for index in order {
            let level = self
                .graph
                .neighbors_directed(index, Direction::Incoming)
                .filter_map(|source| depth.get(&source))
                .map(|d| d + 1)
                .max()
                .unwrap_or(0);
            depth.insert(index, level);
            levels.entry(level).or_default().push(index);
        }
        Ok(levels.into_values().collect())
    }

    /// Returns a serializable description of the graph.
    pub fn describe(&self) -> GraphDescription {
        let id_of = |index: NodeIndex| self.index_to_id.get(&index).copied().unwrap_or_default();

        let nodes = self
            .graph
            .node_indices()
            .map(|index| NodeDescription {
                id: id_of(index),
                name: self.graph[index].name().to_string(),
                kind: self.graph[index].kind(),
            })
            .collect();

        let links = self
            .graph
            .edge_references()
            .map(|edge| LinkDescription {
                from: self.graph[edge.source()].name().to_string(),
                to: self.graph[edge.target()].name().to_string(),
                kind: edge.weight().link.kind(),
            })
            .collect();

        GraphDescription {
            name: self.name.clone(),
            entry: self.entry.and_then(|id| self.node_name(id)).map(str::to_owned),
            exit: self.exit.and_then(|id| self.node_name(id)).map(str::to_owned),
            nodes,
            links,
        }
    }
}

impl fmt::Debug for WorkflowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkflowGraph")
            .field("name", &self.name)
            .field("nodes", &self.graph.node_count())
            .field("links", &self.graph.edge_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use serde_json::Value;

    use super::*;
    use crate::link::{IdentityBridge, NullPlugger, SocketCall, collect_fn, dispatch_fn};
    use crate::node::{AggregatorState, Holder, Socket};

    struct Sink;

    impl Aggregator for Sink {
        type Output = Value;

        fn sockets(&self) -> Vec<crate::node::Socket> {
            vec![Socket::append("item", "items")]
        }

        fn build(&self, state: AggregatorState) -> WorkflowResult<Value> {
            Ok(state.into_value())
        }
    }

    fn split() -> impl DispatchBridge {
        dispatch_fn(|v: Vec<Value>| Ok(v))
    }

    fn gather() -> impl CollectPlugger {
        collect_fn(|batch: BTreeMap<usize, Value>| {
            batch
                .into_values()
                .map(|v| SocketCall::new("item", v))
                .collect()
        })
    }

    #[test]
    fn valid_fan_out_fan_in() {
        let mut graph = WorkflowGraph::new("fan");
        let entry = graph.add_worker("entry", Holder::<Vec<Value>>::new());
        let each = graph.add_worker("each", Holder::<Value>::new());
        let exit = graph.add_aggregator("exit", Sink);
        graph.dispatch(entry, each, split()).unwrap();
        graph.collect(each, exit, gather()).unwrap();
        graph.set_entry(entry).unwrap();
        graph.set_exit(exit).unwrap();

        graph.validate().unwrap();
        let levels = graph.levels().unwrap();
        assert_eq!(levels.len(), 3);
        assert!(graph.batched_nodes().unwrap().contains(&graph.index_of(each).unwrap()));
    }

    #[test]
    fn rejects_missing_entry() {
        let mut graph = WorkflowGraph::new("empty");
        let node = graph.add_worker("only", Holder::<Value>::new());
        graph.set_exit(node).unwrap();
        assert!(graph.validate().is_err());
    }

    #[test]
    fn rejects_plug_into_worker() {
        let mut graph = WorkflowGraph::new("bad");
        let a = graph.add_worker("a", Holder::<Value>::new());
        let b = graph.add_worker("b", Holder::<Value>::new());
        assert!(graph.plug(a, b, NullPlugger).is_err());
    }

    #[test]
    fn rejects_worker_with_two_bridges() {
        let mut graph = WorkflowGraph::new("bad");
        let entry = graph.add_worker("entry", Holder::<Value>::new());
        let a = graph.add_worker("a", Holder::<Value>::new());
        let b = graph.add_worker("b", Holder::<Value>::new());
        graph.bridge(entry, a, IdentityBridge).unwrap();
        graph.bridge(entry, b, IdentityBridge).unwrap();
        graph.bridge(a, b, IdentityBridge).unwrap();
        graph.set_entry(entry).unwrap();
        graph.set_exit(b).unwrap();

        let error = graph.validate().unwrap_err();
        assert!(error.to_string().contains("exactly one incoming bridge"));
    }

    #[test]
    fn rejects_collect_from_unbatched_source() {
        let mut graph = WorkflowGraph::new("bad");
        let entry = graph.add_worker("entry", Holder::<Value>::new());
        let exit = graph.add_aggregator("exit", Sink);
        graph.collect(entry, exit, gather()).unwrap();
        graph.set_entry(entry).unwrap();
        graph.set_exit(exit).unwrap();

        let error = graph.validate().unwrap_err();
        assert!(error.to_string().contains("requires a batched source"));
    }

    #[test]
    fn rejects_nested_dispatch() {
        let mut graph = WorkflowGraph::new("bad");
        let entry = graph.add_worker("entry", Holder::<Vec<Value>>::new());
        let a = graph.add_worker("a", Holder::<Vec<Value>>::new());
        let b = graph.add_worker("b", Holder::<Value>::new());
        graph.dispatch(entry, a, dispatch_fn(|v: Vec<Value>| Ok(vec![v]))).unwrap();
        graph.dispatch(a, b, split()).unwrap();
        graph.set_entry(entry).unwrap();
        graph.set_exit(b).unwrap();

        let error = graph.validate().unwrap_err();
        assert!(error.to_string().contains("nested dispatch"));
    }

    #[test]
    fn rejects_unreachable_nodes() {
        let mut graph = WorkflowGraph::new("bad");
        let entry = graph.add_worker("entry", Holder::<Value>::new());
        let exit = graph.add_aggregator("exit", Sink);
        let orphan = graph.add_worker("orphan", Holder::<Value>::new());
        let other = graph.add_worker("other", Holder::<Value>::new());
        graph.plug(entry, exit, NullPlugger).unwrap();
        graph.bridge(orphan, other, IdentityBridge).unwrap();
        graph.set_entry(entry).unwrap();
        graph.set_exit(exit).unwrap();

        let error = graph.validate().unwrap_err();
        assert!(error.to_string().contains("orphan"));
    }

    #[test]
    fn describe_lists_nodes_and_links() {
        let mut graph = WorkflowGraph::new("describe");
        let entry = graph.add_worker("entry", Holder::<Value>::new());
        let exit = graph.add_aggregator("exit", Sink);
        graph.plug(entry, exit, NullPlugger).unwrap();
        graph.set_entry(entry).unwrap();
        graph.set_exit(exit).unwrap();

        let description = graph.describe();
        assert_eq!(description.nodes.len(), 2);
        assert_eq!(description.links[0].kind, LinkKind::Plug);
        assert_eq!(description.entry.as_deref(), Some("entry"));
        let json = serde_json::to_value(&description).unwrap();
        assert_eq!(json["links"][0]["kind"], "plug");
    }
}
