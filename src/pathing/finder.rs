//! Command-restricted path selection through the animation graph.

use rand::Rng;
use std::collections::HashSet;

use super::dijkstra::shortest_path;
use crate::graph::{EdgeId, Graph, NodeId};

/// Picks one of `node`'s own outputs whose command is listed in `cmds`,
/// weighted by the edges' `weight` tags. An empty string in `cmds` selects
/// free edges.
pub fn select_edge<R: Rng + ?Sized>(
    graph: &Graph,
    node: NodeId,
    cmds: &[&str],
    rng: &mut R,
) -> Option<EdgeId> {
    let candidates: Vec<(EdgeId, f64)> = graph
        .node(node)
        .outputs()
        .iter()
        .map(|&e| (e, graph.edge_data(e)))
        .filter(|(_, data)| cmds.contains(&data.cmd.as_str()) && data.weight > 0.0)
        .map(|(e, data)| (e, data.weight))
        .collect();

    let total: f64 = candidates.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return None;
    }

    let mut roll: f64 = rng.random_range(0.0..total);
    for &(edge, weight) in &candidates {
        roll -= weight;
        if roll < 0.0 {
            return Some(edge);
        }
    }

    candidates.last().map(|(e, _)| *e)
}

/// Finds the path for a single command label, excluding `from` itself.
fn find_label_path(graph: &Graph, cmd: &str, from: NodeId) -> Option<Vec<NodeId>> {
    // Vertex `root` stands in for `from` so a path back to `from` is never empty.
    let root = graph.node_count();

    let targets: Vec<usize> = graph
        .edges()
        .filter(|e| graph.edge_data(e.id()).cmd == cmd)
        .map(|e| e.dst().0)
        .collect();
    if targets.is_empty() {
        return None;
    }

    let (_, path) = shortest_path(root + 1, &[root], &targets, |v, out| {
        let node = if v == root { from } else { NodeId(v) };
        let group = graph.node(node).group();
        for &edge in graph.node(node).group_outputs() {
            let data = graph.edge_data(edge);
            if !data.cmd.is_empty() && data.cmd != cmd {
                continue;
            }
            let dst = graph.edge(edge).dst();
            // Leaving the current group can happen without waiting out the frame.
            let cost = if group.is_some() && graph.node(dst).group() != group {
                0
            } else {
                1
            };
            out.push((dst.0, cost));
        }
    })?;

    Some(path.into_iter().skip(1).map(NodeId).collect())
}

/// Computes the anim nodes to visit to carry out `names`, in order.
///
/// Each label is searched from the end of the previous label's path. An empty
/// result means at least one label could not be reached.
pub fn find_path(graph: &Graph, names: &[String], from: NodeId) -> Vec<NodeId> {
    let mut node_path = Vec::new();
    let mut anim_node = from;
    for name in names {
        let Some(path) = find_label_path(graph, name, anim_node) else {
            return Vec::new();
        };
        if let Some(&last) = path.last() {
            anim_node = last;
        }
        node_path.extend(path);
    }
    node_path
}

/// Like [`find_path`], but extends the path along free edges until it holds a
/// node tagged with `sync_tag`. If no such node can be reached the base path is
/// returned unchanged.
pub fn find_synced_path<R: Rng + ?Sized>(
    graph: &Graph,
    names: &[String],
    sync_tag: &str,
    from: NodeId,
    rng: &mut R,
) -> Vec<NodeId> {
    let mut path = find_path(graph, names, from);
    let Some(&last) = path.last() else {
        return path;
    };
    if path.iter().any(|&n| graph.is_sync(n, sync_tag)) {
        return path;
    }

    let mut extra = Vec::new();
    let mut visited = HashSet::new();
    let mut tail = last;
    let mut edge = select_edge(graph, tail, &[""], rng);
    while let Some(e) = edge {
        if !visited.insert(tail) {
            break;
        }
        tail = graph.edge(e).dst();
        extra.push(tail);
        if graph.is_sync(tail, sync_tag) {
            break;
        }
        edge = select_edge(graph, tail, &[""], rng);
    }

    if extra.last().is_some_and(|&n| graph.is_sync(n, sync_tag)) {
        path.extend(extra);
    }
    path
}
