//! Node type assignment
//!
//! Exactly one Hub near the geometric center (the subzone entry), Boss at
//! the deepest leaf, Frontier at two or more boundary leaves, remaining
//! leaves DeadEnd, internal nodes Branching/Linear by degree.

use rand::rngs::StdRng;
use rand::Rng;

use delver_domain::NodeType;

use super::mst::{degrees, WeightedEdge};

/// A laid-out, connected, typed subzone graph (by node index)
#[derive(Debug, Clone)]
pub struct AssignedGraph {
    pub positions: Vec<(i32, i32)>,
    pub edges: Vec<WeightedEdge>,
    pub types: Vec<NodeType>,
    /// Index of the Hub; the subzone's designated entry
    pub entry: usize,
}

/// Adjacency list for an edge set
pub fn adjacency(node_count: usize, edges: &[WeightedEdge]) -> Vec<Vec<usize>> {
    let mut adj = vec![Vec::new(); node_count];
    for edge in edges {
        adj[edge.a].push(edge.b);
        adj[edge.b].push(edge.a);
    }
    adj
}

/// BFS depth of every node from `start`; usize::MAX marks unreachable
pub fn bfs_depths(node_count: usize, edges: &[WeightedEdge], start: usize) -> Vec<usize> {
    let adj = adjacency(node_count, edges);
    let mut depth = vec![usize::MAX; node_count];
    let mut queue = std::collections::VecDeque::new();
    depth[start] = 0;
    queue.push_back(start);
    while let Some(node) = queue.pop_front() {
        for &next in &adj[node] {
            if depth[next] == usize::MAX {
                depth[next] = depth[node] + 1;
                queue.push_back(next);
            }
        }
    }
    depth
}

fn centroid(positions: &[(i32, i32)]) -> (f64, f64) {
    let n = positions.len().max(1) as f64;
    let sx: i64 = positions.iter().map(|p| i64::from(p.0)).sum();
    let sy: i64 = positions.iter().map(|p| i64::from(p.1)).sum();
    (sx as f64 / n, sy as f64 / n)
}

fn distance_to(point: (i32, i32), target: (f64, f64)) -> f64 {
    let dx = f64::from(point.0) - target.0;
    let dy = f64::from(point.1) - target.1;
    (dx * dx + dy * dy).sqrt()
}

/// Assign node types over positioned, connected nodes
pub fn assign_types(
    positions: Vec<(i32, i32)>,
    edges: Vec<WeightedEdge>,
    rng: &mut StdRng,
) -> AssignedGraph {
    let n = positions.len();
    let degrees = degrees(n, &edges);
    let center = centroid(&positions);

    // Hub: closest to the geometric center
    let entry = (0..n)
        .min_by(|&a, &b| {
            distance_to(positions[a], center).total_cmp(&distance_to(positions[b], center))
        })
        .unwrap_or(0);

    let depths = bfs_depths(n, &edges, entry);
    let mut types = vec![NodeType::Linear; n];
    types[entry] = NodeType::Hub;

    let leaves: Vec<usize> = (0..n)
        .filter(|&i| i != entry && degrees[i] == 1)
        .collect();

    // Boss: the deepest leaf (deepest node at all, when there are no leaves)
    let boss = leaves
        .iter()
        .copied()
        .max_by_key(|&i| depths[i])
        .or_else(|| (0..n).filter(|&i| i != entry).max_by_key(|&i| depths[i]));
    if let Some(boss) = boss {
        types[boss] = NodeType::Boss;
    }

    // Frontier: at least two boundary nodes pointing at unmaterialized
    // neighbors; prefer the leaves farthest from the center
    let mut frontier_candidates: Vec<usize> = leaves
        .iter()
        .copied()
        .filter(|&i| Some(i) != boss)
        .collect();
    frontier_candidates.sort_by(|&a, &b| {
        distance_to(positions[b], center).total_cmp(&distance_to(positions[a], center))
    });
    let mut frontier_count = 0;
    for &index in frontier_candidates.iter().take(2) {
        types[index] = NodeType::Frontier;
        frontier_count += 1;
    }
    // Not enough leaves: promote the farthest internal nodes
    if frontier_count < 2 {
        let mut fallback: Vec<usize> = (0..n)
            .filter(|&i| i != entry && Some(i) != boss && types[i] == NodeType::Linear)
            .collect();
        fallback.sort_by(|&a, &b| {
            distance_to(positions[b], center).total_cmp(&distance_to(positions[a], center))
        });
        for &index in fallback.iter().take(2 - frontier_count) {
            types[index] = NodeType::Frontier;
            frontier_count += 1;
        }
    }

    // Remaining leaves are dead ends; internal nodes split by degree
    for i in 0..n {
        if types[i] != NodeType::Linear {
            continue;
        }
        types[i] = if degrees[i] == 1 {
            NodeType::DeadEnd
        } else if degrees[i] >= 3 {
            NodeType::Branching
        } else {
            NodeType::Linear
        };
    }

    // Occasionally earmark one branching node for quest content
    let branching: Vec<usize> = (0..n).filter(|&i| types[i] == NodeType::Branching).collect();
    if !branching.is_empty() && rng.gen_bool(0.3) {
        let chosen = branching[rng.gen_range(0..branching.len())];
        types[chosen] = NodeType::Questable;
    }

    AssignedGraph {
        positions,
        edges,
        types,
        entry,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn cross_graph() -> (Vec<(i32, i32)>, Vec<WeightedEdge>) {
        // center at 0,0 with four arms of length 2
        let positions = vec![
            (0, 0),
            (1, 0),
            (2, 0),
            (-1, 0),
            (-2, 0),
            (0, 1),
            (0, 2),
            (0, -1),
            (0, -2),
        ];
        let pairs = [(0, 1), (1, 2), (0, 3), (3, 4), (0, 5), (5, 6), (0, 7), (7, 8)];
        let edges = pairs
            .iter()
            .map(|&(a, b)| WeightedEdge { a, b, weight: 1.0 })
            .collect();
        (positions, edges)
    }

    #[test]
    fn test_exactly_one_hub_at_center() {
        let (positions, edges) = cross_graph();
        let graph = assign_types(positions, edges, &mut StdRng::seed_from_u64(1));
        assert_eq!(graph.entry, 0);
        let hubs = graph.types.iter().filter(|t| **t == NodeType::Hub).count();
        assert_eq!(hubs, 1);
        assert_eq!(graph.types[0], NodeType::Hub);
    }

    #[test]
    fn test_boss_is_a_deepest_leaf() {
        let (positions, edges) = cross_graph();
        let graph = assign_types(positions, edges, &mut StdRng::seed_from_u64(1));
        let boss_index = graph
            .types
            .iter()
            .position(|t| *t == NodeType::Boss)
            .expect("boss assigned");
        // all arm tips sit at depth 2
        let depths = bfs_depths(graph.positions.len(), &graph.edges, graph.entry);
        assert_eq!(depths[boss_index], 2);
    }

    #[test]
    fn test_at_least_two_frontiers() {
        let (positions, edges) = cross_graph();
        let graph = assign_types(positions, edges, &mut StdRng::seed_from_u64(1));
        let frontiers = graph
            .types
            .iter()
            .filter(|t| **t == NodeType::Frontier)
            .count();
        assert!(frontiers >= 2);
    }

    #[test]
    fn test_internal_degree_rules() {
        let (positions, edges) = cross_graph();
        let graph = assign_types(positions, edges, &mut StdRng::seed_from_u64(4));
        // arm middles have degree 2: Linear (unless promoted to Frontier/Questable)
        for &i in &[1usize, 3, 5, 7] {
            assert!(
                matches!(
                    graph.types[i],
                    NodeType::Linear | NodeType::Frontier | NodeType::Questable
                ),
                "unexpected type {:?} at {i}",
                graph.types[i]
            );
        }
    }
}
