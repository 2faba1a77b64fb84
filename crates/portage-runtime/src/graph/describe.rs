//! Serializable graph descriptions.

use serde::{Deserialize, Serialize};

use super::id::NodeId;
use crate::link::LinkKind;
use crate::node::NodeKind;

/// Structure of a workflow graph, without its behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDescription {
    pub name: String,
    pub entry: Option<String>,
    pub exit: Option<String>,
    pub nodes: Vec<NodeDescription>,
    pub links: Vec<LinkDescription>,
}

/// One node of a [`GraphDescription`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
}

/// One link of a [`GraphDescription`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkDescription {
    pub from: String,
    pub to: String,
    pub kind: LinkKind,
}
