//! Shortest paths over non-negative integer costs.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Finds the cheapest path from any of `sources` to any of `targets`.
///
/// `adjacent(v, out)` must push `(neighbour, cost)` pairs for vertex `v`.
/// Returns the total cost and the vertices of the path, source first.
pub(crate) fn shortest_path<F>(
    vertex_count: usize,
    sources: &[usize],
    targets: &[usize],
    mut adjacent: F,
) -> Option<(u64, Vec<usize>)>
where
    F: FnMut(usize, &mut Vec<(usize, u64)>),
{
    let mut is_target = vec![false; vertex_count];
    for &t in targets {
        is_target[t] = true;
    }

    let mut dist = vec![u64::MAX; vertex_count];
    let mut prev = vec![usize::MAX; vertex_count];
    let mut done = vec![false; vertex_count];
    let mut heap = BinaryHeap::new();
    for &s in sources {
        dist[s] = 0;
        heap.push(Reverse((0u64, s)));
    }

    let mut neighbours = Vec::new();
    while let Some(Reverse((cost, v))) = heap.pop() {
        if done[v] {
            continue;
        }
        done[v] = true;

        if is_target[v] {
            let mut path = vec![v];
            let mut cur = v;
            while prev[cur] != usize::MAX {
                cur = prev[cur];
                path.push(cur);
            }
            path.reverse();
            return Some((cost, path));
        }

        neighbours.clear();
        adjacent(v, &mut neighbours);
        for &(next, step) in &neighbours {
            let candidate = cost.saturating_add(step);
            if !done[next] && candidate < dist[next] {
                dist[next] = candidate;
                prev[next] = v;
                heap.push(Reverse((candidate, next)));
            }
        }
    }

    None
}
