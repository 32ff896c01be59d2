//! Serialisable graph descriptions, as authored in `sprite.ron`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::model::{Graph, GraphBuilder, GraphKind, GraphModel};
use super::validation::validate_graph_def;
use super::GraphError;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NodeDef {
    pub name: String,
    /// Extra label lines after the name.
    #[serde(default)]
    pub lines: Vec<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Name of the enclosing group node.
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EdgeDef {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GraphDef {
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub edges: Vec<EdgeDef>,
}

/// Both graphs of a sprite.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SpriteDef {
    pub state: GraphDef,
    pub anim: GraphDef,
}

impl GraphDef {
    pub(crate) fn index_of(&self, name: &str) -> Option<usize> {
        self.nodes.iter().position(|n| n.name == name)
    }
}

impl Graph {
    /// Validates `def` and builds it. When validation finds several problems
    /// only the first is returned; the rest are logged.
    pub fn from_def(def: &GraphDef, kind: GraphKind) -> Result<Graph, GraphError> {
        let mut errors = validate_graph_def(def, kind).into_iter();
        if let Some(first) = errors.next() {
            for other in errors {
                bevy::log::warn!("{}", other);
            }
            return Err(first);
        }

        let mut builder = GraphBuilder::new(kind);
        let ids: Vec<_> = def.nodes.iter().map(|n| builder.node(&n.name)).collect();
        for (node, id) in def.nodes.iter().zip(&ids) {
            for line in &node.lines {
                builder.line(*id, line);
            }
            for (key, value) in &node.tags {
                builder.tag(*id, key, value);
            }
        }
        for (node, id) in def.nodes.iter().zip(&ids) {
            if let Some(parent) = node.group.as_deref().and_then(|g| def.index_of(g)) {
                builder.group(*id, ids[parent]);
            }
        }
        for edge in &def.edges {
            let (Some(src), Some(dst)) = (def.index_of(&edge.from), def.index_of(&edge.to)) else {
                continue;
            };
            let id = builder.edge(ids[src], ids[dst], edge.label.as_deref());
            for (key, value) in &edge.tags {
                builder.edge_tag(id, key, value);
            }
        }
        builder.build()
    }
}

impl GraphModel {
    pub fn from_def(def: &SpriteDef) -> Result<GraphModel, GraphError> {
        Ok(GraphModel {
            state: Graph::from_def(&def.state, GraphKind::State)?,
            anim: Graph::from_def(&def.anim, GraphKind::Anim)?,
        })
    }
}
