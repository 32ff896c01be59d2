//! Graph domain: arena-backed directed graph with nested groups.
//!
//! Nodes and edges live in flat vectors and refer to each other by index.
//! Group membership is a parent index plus a list of child indices, and the
//! per-node group-output edge lists are computed once when the graph is built.

use std::collections::HashMap;
use std::fmt;

use super::GraphError;

/// Frame duration, in milliseconds, for anim nodes without a `time` tag.
pub const DEFAULT_FRAME_TIME: i64 = 100;

/// Which of the two sprite graphs a graph plays the role of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphKind {
    State,
    Anim,
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphKind::State => write!(f, "State"),
            GraphKind::Anim => write!(f, "Anim"),
        }
    }
}

/// Stable index of a node inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Stable index of an edge inside its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    lines: Vec<String>,
    tags: HashMap<String, String>,
    group: Option<NodeId>,
    children: Vec<NodeId>,
    outputs: Vec<EdgeId>,
    inputs: Vec<EdgeId>,
    group_outputs: Vec<EdgeId>,
}

impl Node {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The logical name of the node (its first label line).
    pub fn name(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or("")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// The group this node belongs to, if any.
    pub fn group(&self) -> Option<NodeId> {
        self.group
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn outputs(&self) -> &[EdgeId] {
        &self.outputs
    }

    pub fn inputs(&self) -> &[EdgeId] {
        &self.inputs
    }

    /// Outputs of this node followed by the outputs of every enclosing group,
    /// nearest group first.
    pub fn group_outputs(&self) -> &[EdgeId] {
        &self.group_outputs
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    id: EdgeId,
    src: NodeId,
    dst: NodeId,
    label: Option<String>,
    tags: HashMap<String, String>,
}

impl Edge {
    pub fn id(&self) -> EdgeId {
        self.id
    }

    pub fn src(&self) -> NodeId {
        self.src
    }

    pub fn dst(&self) -> NodeId {
        self.dst
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Per-node values derived from tags at build time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeData {
    /// Frame duration in milliseconds.
    pub time: i64,
    pub sync_tag: String,
    /// Semantic state this frame belongs to.
    pub state: String,
    /// Trigger text fired when the node is reached, empty for none.
    pub func: String,
}

/// Per-edge values derived from tags at build time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EdgeData {
    pub facing: i32,
    pub weight: f64,
    /// Command name required to take this edge, empty for a free edge.
    pub cmd: String,
}

/// Immutable directed graph with one designated start node.
#[derive(Debug, Clone)]
pub struct Graph {
    kind: GraphKind,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_data: Vec<NodeData>,
    edge_data: Vec<EdgeData>,
    start: NodeId,
    by_name: HashMap<String, NodeId>,
}

impl Graph {
    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.nodes[id.0].name()
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    pub fn node_data(&self, id: NodeId) -> &NodeData {
        &self.node_data[id.0]
    }

    pub fn edge_data(&self, id: EdgeId) -> &EdgeData {
        &self.edge_data[id.0]
    }

    /// Duration of a node's frame in milliseconds.
    pub fn time(&self, id: NodeId) -> i64 {
        self.node_data[id.0].time
    }

    /// Untagged nodes match the empty sync tag.
    pub fn is_sync(&self, id: NodeId, sync_tag: &str) -> bool {
        self.node_data[id.0].sync_tag == sync_tag
    }

    /// Returns the group-output edge that leads from `a` to `b` or to a group
    /// enclosing `b`.
    pub fn edge_to(&self, a: NodeId, b: NodeId) -> Option<EdgeId> {
        self.node(a).group_outputs().iter().copied().find(|&edge| {
            let dst = self.edge(edge).dst();
            self.ancestors_or_self(b).any(|cb| cb == dst)
        })
    }

    /// True when `a` can step to `b` over an edge authored on one of `a`'s
    /// enclosing groups rather than on `a` itself.
    pub fn connected_by_group_edge(&self, a: NodeId, b: NodeId) -> bool {
        self.node(a).group_outputs().iter().any(|&edge| {
            let edge = self.edge(edge);
            edge.src() != a && edge.dst() == b
        })
    }

    /// Iterates `id` and then each enclosing group, innermost first.
    pub fn ancestors_or_self(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut cur = Some(id);
        let mut remaining = self.nodes.len();
        std::iter::from_fn(move || {
            let node = cur?;
            if remaining == 0 {
                return None;
            }
            remaining -= 1;
            cur = self.nodes[node.0].group;
            Some(node)
        })
    }
}

/// Incrementally assembles a [`Graph`].
///
/// The builder trusts its input: structural checks belong to
/// [`validate_graph_def`](super::validate_graph_def). It only refuses to build
/// a graph without exactly one start node.
#[derive(Debug)]
pub struct GraphBuilder {
    kind: GraphKind,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

impl GraphBuilder {
    pub fn new(kind: GraphKind) -> Self {
        Self {
            kind,
            nodes: Vec::new(),
            edges: Vec::new(),
        }
    }

    pub fn node(&mut self, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            id,
            lines: vec![name.to_string()],
            tags: HashMap::new(),
            group: None,
            children: Vec::new(),
            outputs: Vec::new(),
            inputs: Vec::new(),
            group_outputs: Vec::new(),
        });
        id
    }

    pub fn line(&mut self, node: NodeId, line: &str) -> &mut Self {
        self.nodes[node.0].lines.push(line.to_string());
        self
    }

    pub fn tag(&mut self, node: NodeId, key: &str, value: impl ToString) -> &mut Self {
        self.nodes[node.0]
            .tags
            .insert(key.to_string(), value.to_string());
        self
    }

    /// Marks `node` as the graph's start node.
    pub fn start(&mut self, node: NodeId) -> &mut Self {
        self.tag(node, "mark", "start")
    }

    /// Places `child` inside the group `parent`.
    pub fn group(&mut self, child: NodeId, parent: NodeId) -> &mut Self {
        if let Some(old) = self.nodes[child.0].group.take() {
            self.nodes[old.0].children.retain(|&c| c != child);
        }
        self.nodes[child.0].group = Some(parent);
        self.nodes[parent.0].children.push(child);
        self
    }

    pub fn edge(&mut self, src: NodeId, dst: NodeId, label: Option<&str>) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(Edge {
            id,
            src,
            dst,
            label: label.filter(|l| !l.is_empty()).map(str::to_string),
            tags: HashMap::new(),
        });
        self.nodes[src.0].outputs.push(id);
        self.nodes[dst.0].inputs.push(id);
        id
    }

    pub fn edge_tag(&mut self, edge: EdgeId, key: &str, value: impl ToString) -> &mut Self {
        self.edges[edge.0]
            .tags
            .insert(key.to_string(), value.to_string());
        self
    }

    pub fn build(mut self) -> Result<Graph, GraphError> {
        let mut starts = self
            .nodes
            .iter()
            .filter(|n| n.tag("mark") == Some("start"))
            .map(|n| n.id);
        let start = starts.next().ok_or(GraphError::NoStart { kind: self.kind })?;
        if starts.next().is_some() {
            return Err(GraphError::MultipleStarts { kind: self.kind });
        }

        let limit = self.nodes.len();
        for i in 0..self.nodes.len() {
            let mut outputs = Vec::new();
            let mut cur = Some(NodeId(i));
            let mut depth = 0;
            while let Some(node) = cur {
                if depth > limit {
                    return Err(GraphError::GroupCycle {
                        kind: self.kind,
                        name: self.nodes[i].name().to_string(),
                    });
                }
                outputs.extend_from_slice(&self.nodes[node.0].outputs);
                cur = self.nodes[node.0].group;
                depth += 1;
            }
            self.nodes[i].group_outputs = outputs;
        }

        let node_data = self
            .nodes
            .iter()
            .map(|node| derive_node_data(&self.nodes, node))
            .collect();
        let edge_data = self.edges.iter().map(derive_edge_data).collect();
        let by_name = self
            .nodes
            .iter()
            .map(|n| (n.name().to_string(), n.id))
            .collect();

        Ok(Graph {
            kind: self.kind,
            nodes: self.nodes,
            edges: self.edges,
            node_data,
            edge_data,
            start,
            by_name,
        })
    }
}

fn derive_node_data(nodes: &[Node], node: &Node) -> NodeData {
    let time = node
        .tag("time")
        .and_then(|t| t.trim().parse::<i64>().ok())
        .filter(|t| *t >= 0)
        .unwrap_or(DEFAULT_FRAME_TIME);

    // Frames inherit the state of their nearest enclosing group.
    let mut state = String::new();
    let mut cur = Some(node.id);
    let mut depth = 0;
    while let Some(id) = cur {
        if depth > nodes.len() {
            break;
        }
        if let Some(s) = nodes[id.0].tag("state") {
            state = s.to_string();
            break;
        }
        cur = nodes[id.0].group;
        depth += 1;
    }

    NodeData {
        time,
        sync_tag: node.tag("sync").unwrap_or_default().to_string(),
        state,
        func: node.tag("func").unwrap_or_default().to_string(),
    }
}

fn derive_edge_data(edge: &Edge) -> EdgeData {
    EdgeData {
        facing: edge
            .tag("facing")
            .and_then(|f| f.trim().parse().ok())
            .unwrap_or(0),
        weight: edge
            .tag("weight")
            .and_then(|w| w.trim().parse().ok())
            .unwrap_or(1.0),
        cmd: edge
            .tag("cmd")
            .or(edge.label())
            .unwrap_or_default()
            .to_string(),
    }
}

/// The pair of graphs shared by every sprite loaded from the same source.
#[derive(Debug, Clone)]
pub struct GraphModel {
    pub state: Graph,
    pub anim: Graph,
}
