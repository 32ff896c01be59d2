//! Graph domain: the state and animation graphs every sprite walks.
//!
//! This module handles:
//! - The immutable arena model shared by all sprites of one source
//! - Serialisable graph descriptions (`sprite.ron`)
//! - Structural validation run before a description is built

mod def;
mod model;
mod validation;

pub use def::{EdgeDef, GraphDef, NodeDef, SpriteDef};
pub use model::{
    DEFAULT_FRAME_TIME, Edge, EdgeData, EdgeId, Graph, GraphBuilder, GraphKind, GraphModel, Node,
    NodeData, NodeId,
};
pub use validation::validate_graph_def;

use thiserror::Error;

/// A structural problem in a graph description.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("{kind} graph: contains an unlabeled node")]
    UnlabeledNode { kind: GraphKind },
    #[error("{kind} graph: node name '{name}' is used more than once")]
    DuplicateNode { kind: GraphKind, name: String },
    #[error("{kind} graph: {context} references unknown node '{name}'")]
    UnknownNode {
        kind: GraphKind,
        context: &'static str,
        name: String,
    },
    #[error("{kind} graph: group nesting of '{name}' forms a cycle")]
    GroupCycle { kind: GraphKind, name: String },
    #[error("{kind} graph: no start node was found")]
    NoStart { kind: GraphKind },
    #[error("{kind} graph: more than one node is marked as the start node")]
    MultipleStarts { kind: GraphKind },
    #[error("{kind} graph: not all nodes are reachable from the start node ({unreachable:?})")]
    Unreachable {
        kind: GraphKind,
        unreachable: Vec<String>,
    },
    #[error("{kind} graph: node '{node}' has an unknown tag ({tag})")]
    UnknownNodeTag {
        kind: GraphKind,
        node: String,
        tag: String,
    },
    #[error("{kind} graph: edge {edge} has an unknown tag ({tag})")]
    UnknownEdgeTag {
        kind: GraphKind,
        edge: String,
        tag: String,
    },
    #[error("{kind} graph: invalid value '{value}' for tag '{tag}' on {owner}")]
    BadTagValue {
        kind: GraphKind,
        owner: String,
        tag: String,
        value: String,
    },
    #[error("State graph: the start node has an unlabeled output edge")]
    UnlabeledStartOutput,
    #[error("State graph: found more than one unlabeled output edge on node '{0}'")]
    AmbiguousFreeEdges(String),
    #[error("State graph: cannot contain groups")]
    StateGroups,
}
