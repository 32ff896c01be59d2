//! Pathing domain: tests for shortest paths, command paths and edge selection.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::dijkstra::shortest_path;
use super::{find_path, find_synced_path, select_edge};
use crate::graph::{Graph, GraphBuilder, GraphKind, NodeId};

fn names(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

/// idle -walk-> walk_1 <-> walk_2 -stop-> idle
fn walk_graph() -> (Graph, [NodeId; 3]) {
    let mut b = GraphBuilder::new(GraphKind::Anim);
    let idle = b.node("idle");
    let w1 = b.node("walk_1");
    let w2 = b.node("walk_2");
    b.start(idle);
    b.edge(idle, w1, Some("walk"));
    b.edge(w1, w2, None);
    b.edge(w2, w1, None);
    b.edge(w2, idle, Some("stop"));
    b.edge(idle, idle, Some("poke"));
    (b.build().unwrap(), [idle, w1, w2])
}

/// idle -attack-> wind -> strike(sync: hit) -> recover -> idle
fn attack_graph() -> (Graph, [NodeId; 4]) {
    let mut b = GraphBuilder::new(GraphKind::Anim);
    let idle = b.node("idle");
    let wind = b.node("wind");
    let strike = b.node("strike");
    let recover = b.node("recover");
    b.start(idle).tag(strike, "sync", "hit");
    b.edge(idle, wind, Some("attack"));
    b.edge(wind, strike, None);
    b.edge(strike, recover, None);
    b.edge(recover, idle, None);
    (b.build().unwrap(), [idle, wind, strike, recover])
}

// -----------------------------------------------------------------------------
// Dijkstra
// -----------------------------------------------------------------------------

#[test]
fn test_shortest_path_prefers_cheaper_route() {
    // 0 -> 1 -> 3 costs 2, 0 -> 2 -> 3 costs 0
    let edges: [(usize, usize, u64); 4] = [(0, 1, 1), (1, 3, 1), (0, 2, 0), (2, 3, 0)];
    let result = shortest_path(4, &[0], &[3], |v, out| {
        out.extend(edges.iter().filter(|e| e.0 == v).map(|e| (e.1, e.2)));
    });
    assert_eq!(result, Some((0, vec![0, 2, 3])));
}

#[test]
fn test_shortest_path_unreachable() {
    let result = shortest_path(3, &[0], &[2], |v, out| {
        if v == 0 {
            out.push((1, 1));
        }
    });
    assert_eq!(result, None);
}

// -----------------------------------------------------------------------------
// find_path
// -----------------------------------------------------------------------------

#[test]
fn test_find_path_single_label() {
    let (graph, [idle, w1, w2]) = walk_graph();
    assert_eq!(find_path(&graph, &names(&["walk"]), idle), vec![w1]);
    assert_eq!(find_path(&graph, &names(&["stop"]), w2), vec![idle]);
}

#[test]
fn test_find_path_follows_free_edges_to_command() {
    let (graph, [idle, w1, w2]) = walk_graph();
    assert_eq!(find_path(&graph, &names(&["stop"]), w1), vec![w2, idle]);
}

#[test]
fn test_find_path_to_own_node_is_not_empty() {
    let (graph, [idle, _, _]) = walk_graph();
    assert_eq!(find_path(&graph, &names(&["poke"]), idle), vec![idle]);
}

#[test]
fn test_find_path_chains_labels() {
    let (graph, [idle, w1, w2]) = walk_graph();
    assert_eq!(
        find_path(&graph, &names(&["walk", "stop"]), idle),
        vec![w1, w2, idle]
    );
}

#[test]
fn test_find_path_missing_label_is_empty() {
    let (graph, [idle, _, _]) = walk_graph();
    assert!(find_path(&graph, &names(&["fly"]), idle).is_empty());
    assert!(find_path(&graph, &names(&["walk", "fly"]), idle).is_empty());
}

#[test]
fn test_find_path_ignores_other_commands() {
    let (graph, [idle, _, _]) = walk_graph();
    // "stop" is only reachable through the "walk" edge, which is not allowed.
    assert!(find_path(&graph, &names(&["stop"]), idle).is_empty());
}

#[test]
fn test_find_path_group_exits_are_free() {
    let mut b = GraphBuilder::new(GraphKind::Anim);
    let g = b.node("g");
    let h = b.node("h");
    let k = b.node("k");
    let g1 = b.node("g1");
    let g2 = b.node("g2");
    let h1 = b.node("h1");
    let k1 = b.node("k1");
    let dest = b.node("dest");
    b.start(g1).group(g1, g).group(g2, g).group(h1, h).group(k1, k);
    // Short route: stays inside g for one step.
    b.edge(g1, g2, None);
    b.edge(g2, dest, Some("go"));
    // Long route: hops across groups, every hop leaves a group.
    b.edge(g1, h1, None);
    b.edge(h1, k1, None);
    b.edge(k1, dest, Some("go"));
    let graph = b.build().unwrap();

    assert_eq!(find_path(&graph, &names(&["go"]), g1), vec![h1, k1, dest]);
}

// -----------------------------------------------------------------------------
// find_synced_path
// -----------------------------------------------------------------------------

#[test]
fn test_synced_path_extends_to_sync_node() {
    let (graph, [idle, wind, strike, _]) = attack_graph();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    assert_eq!(
        find_synced_path(&graph, &names(&["attack"]), "hit", idle, &mut rng),
        vec![wind, strike]
    );
}

#[test]
fn test_synced_path_unchanged_when_sync_missing() {
    let (graph, [idle, wind, _, _]) = attack_graph();
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    assert_eq!(
        find_synced_path(&graph, &names(&["attack"]), "miss", idle, &mut rng),
        vec![wind]
    );
}

#[test]
fn test_synced_path_kept_when_already_synced() {
    let mut b = GraphBuilder::new(GraphKind::Anim);
    let idle = b.node("idle");
    let strike = b.node("strike");
    let after = b.node("after");
    b.start(idle).tag(strike, "sync", "hit");
    b.edge(idle, strike, Some("attack"));
    b.edge(strike, after, None);
    let graph = b.build().unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    assert_eq!(
        find_synced_path(&graph, &names(&["attack"]), "hit", idle, &mut rng),
        vec![strike]
    );
}

#[test]
fn test_synced_path_empty_base_stays_empty() {
    let (graph, [idle, _, _, _]) = attack_graph();
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    assert!(find_synced_path(&graph, &names(&["dance"]), "hit", idle, &mut rng).is_empty());
}

// -----------------------------------------------------------------------------
// select_edge
// -----------------------------------------------------------------------------

#[test]
fn test_select_edge_respects_weights() {
    let mut b = GraphBuilder::new(GraphKind::Anim);
    let a = b.node("a");
    let heavy = b.node("heavy");
    let light = b.node("light");
    let never = b.node("never");
    b.start(a);
    let e_heavy = b.edge(a, heavy, None);
    b.edge_tag(e_heavy, "weight", 3);
    let e_light = b.edge(a, light, None);
    let e_never = b.edge(a, never, None);
    b.edge_tag(e_never, "weight", 0);
    let graph = b.build().unwrap();

    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut heavy_count = 0;
    for _ in 0..4000 {
        let picked = select_edge(&graph, a, &[""], &mut rng).unwrap();
        assert_ne!(picked, e_never);
        if picked == e_heavy {
            heavy_count += 1;
        } else {
            assert_eq!(picked, e_light);
        }
    }
    let ratio = heavy_count as f64 / 4000.0;
    assert!(ratio > 0.7 && ratio < 0.8, "ratio was {ratio}");
}

#[test]
fn test_select_edge_filters_commands() {
    let (graph, [idle, w1, w2]) = walk_graph();
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    assert!(select_edge(&graph, idle, &[""], &mut rng).is_none());
    let walk = select_edge(&graph, idle, &["walk"], &mut rng).unwrap();
    assert_eq!(graph.edge(walk).dst(), w1);
    let free = select_edge(&graph, w1, &[""], &mut rng).unwrap();
    assert_eq!(graph.edge(free).dst(), w2);
}
