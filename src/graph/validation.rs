//! Structural validation of graph descriptions before they are built.

use std::collections::{HashMap, HashSet, VecDeque};

use super::def::GraphDef;
use super::model::GraphKind;
use super::GraphError;

const ANIM_NODE_TAGS: &[&str] = &["time", "sync", "func", "state"];
const STATE_NODE_TAGS: &[&str] = &[];

fn is_labeled(label: Option<&str>) -> bool {
    label.is_some_and(|l| !l.is_empty() && !l.contains(':'))
}

/// Validate a graph description.
/// Returns every problem found, empty if the graph is usable.
pub fn validate_graph_def(def: &GraphDef, kind: GraphKind) -> Vec<GraphError> {
    let mut errors = Vec::new();

    // Names
    let mut seen = HashSet::new();
    for node in &def.nodes {
        if node.name.is_empty() || node.name.contains(':') {
            errors.push(GraphError::UnlabeledNode { kind });
        } else if !seen.insert(node.name.as_str()) {
            errors.push(GraphError::DuplicateNode {
                kind,
                name: node.name.clone(),
            });
        }
    }

    // References
    let index: HashMap<&str, usize> = def
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.name.as_str(), i))
        .collect();
    for node in &def.nodes {
        if let Some(group) = &node.group {
            if !index.contains_key(group.as_str()) {
                errors.push(GraphError::UnknownNode {
                    kind,
                    context: "group",
                    name: group.clone(),
                });
            }
        }
    }
    for edge in &def.edges {
        for name in [&edge.from, &edge.to] {
            if !index.contains_key(name.as_str()) {
                errors.push(GraphError::UnknownNode {
                    kind,
                    context: "edge",
                    name: name.clone(),
                });
            }
        }
    }
    if !errors.is_empty() {
        return errors;
    }

    let parent: Vec<Option<usize>> = def
        .nodes
        .iter()
        .map(|n| n.group.as_deref().and_then(|g| index.get(g).copied()))
        .collect();
    for (i, node) in def.nodes.iter().enumerate() {
        let mut cur = parent[i];
        let mut depth = 0;
        while let Some(p) = cur {
            if p == i || depth > def.nodes.len() {
                errors.push(GraphError::GroupCycle {
                    kind,
                    name: node.name.clone(),
                });
                break;
            }
            cur = parent[p];
            depth += 1;
        }
    }

    // Start node
    let starts: Vec<usize> = def
        .nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.tags.get("mark").map(String::as_str) == Some("start"))
        .map(|(i, _)| i)
        .collect();
    let start = match starts.as_slice() {
        [] => {
            errors.push(GraphError::NoStart { kind });
            None
        }
        [one] => Some(*one),
        _ => {
            errors.push(GraphError::MultipleStarts { kind });
            None
        }
    };

    // Reachability over group parents, children and outputs
    if let Some(start) = start {
        let mut adjacent: Vec<Vec<usize>> = vec![Vec::new(); def.nodes.len()];
        for (i, p) in parent.iter().enumerate() {
            if let Some(p) = p {
                adjacent[i].push(*p);
                adjacent[*p].push(i);
            }
        }
        for edge in &def.edges {
            adjacent[index[edge.from.as_str()]].push(index[edge.to.as_str()]);
        }
        let mut used = vec![false; def.nodes.len()];
        let mut next = VecDeque::from([start]);
        used[start] = true;
        while let Some(node) = next.pop_front() {
            for &adj in &adjacent[node] {
                if !used[adj] {
                    used[adj] = true;
                    next.push_back(adj);
                }
            }
        }
        let unreachable: Vec<String> = def
            .nodes
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
            .map(|(n, _)| n.name.clone())
            .collect();
        if !unreachable.is_empty() {
            errors.push(GraphError::Unreachable { kind, unreachable });
        }
    }

    // Tags
    let node_tags = match kind {
        GraphKind::State => STATE_NODE_TAGS,
        GraphKind::Anim => ANIM_NODE_TAGS,
    };
    for (i, node) in def.nodes.iter().enumerate() {
        for (tag, value) in &node.tags {
            let is_start_mark = Some(i) == start && tag == "mark";
            if !(node_tags.contains(&tag.as_str()) || is_start_mark) {
                errors.push(GraphError::UnknownNodeTag {
                    kind,
                    node: node.name.clone(),
                    tag: tag.clone(),
                });
            } else if tag == "time" && value.trim().parse::<u32>().is_err() {
                errors.push(GraphError::BadTagValue {
                    kind,
                    owner: node.name.clone(),
                    tag: tag.clone(),
                    value: value.clone(),
                });
            }
        }
    }
    for edge in &def.edges {
        let owner = format!("{} -> {}", edge.from, edge.to);
        for (tag, value) in &edge.tags {
            let valid = match tag.as_str() {
                "facing" => value.trim().parse::<i32>().is_ok(),
                "weight" => value
                    .trim()
                    .parse::<f64>()
                    .is_ok_and(|w| w.is_finite() && w >= 0.0),
                "cmd" => true,
                _ => {
                    errors.push(GraphError::UnknownEdgeTag {
                        kind,
                        edge: owner.clone(),
                        tag: tag.clone(),
                    });
                    continue;
                }
            };
            if !valid {
                errors.push(GraphError::BadTagValue {
                    kind,
                    owner: owner.clone(),
                    tag: tag.clone(),
                    value: value.clone(),
                });
            }
        }
    }

    if kind == GraphKind::State {
        errors.extend(validate_state_rules(def, start));
    }

    errors
}

/// Rules that only apply to state graphs.
fn validate_state_rules(def: &GraphDef, start: Option<usize>) -> Vec<GraphError> {
    let mut errors = Vec::new();

    if let Some(start) = start {
        let start_name = &def.nodes[start].name;
        if def
            .edges
            .iter()
            .any(|e| &e.from == start_name && !is_labeled(e.label.as_deref()))
        {
            errors.push(GraphError::UnlabeledStartOutput);
        }
    }

    for node in &def.nodes {
        let unlabeled = def
            .edges
            .iter()
            .filter(|e| e.from == node.name && !is_labeled(e.label.as_deref()))
            .count();
        if unlabeled > 1 {
            errors.push(GraphError::AmbiguousFreeEdges(node.name.clone()));
        }
    }

    if def.nodes.iter().any(|n| n.group.is_some()) {
        errors.push(GraphError::StateGroups);
    }

    errors
}
