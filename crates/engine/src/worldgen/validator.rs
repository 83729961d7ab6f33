//! Graph validator
//!
//! Checks the generated subzone graph against the structural invariants and
//! returns a report the generator consumes to retry or repair.

use delver_domain::NodeType;

use super::assign::{adjacency, bfs_depths, AssignedGraph};

/// Minimum average degree over non-DeadEnd nodes
pub const MIN_AVG_DEGREE: f64 = 3.0;

/// Minimum Frontier nodes per subzone
pub const MIN_FRONTIERS: usize = 2;

/// Structured validation outcome
#[derive(Debug, Clone, PartialEq)]
pub struct GraphReport {
    pub node_count: usize,
    pub unreachable: Vec<usize>,
    pub has_cycle: bool,
    pub avg_degree: f64,
    pub frontier_count: usize,
}

impl GraphReport {
    pub fn is_valid(&self) -> bool {
        self.unreachable.is_empty()
            && self.has_cycle
            && self.avg_degree >= MIN_AVG_DEGREE
            && self.frontier_count >= MIN_FRONTIERS
    }

    /// Human-readable failure list for logs
    pub fn failures(&self) -> Vec<String> {
        let mut failures = Vec::new();
        if !self.unreachable.is_empty() {
            failures.push(format!("{} unreachable nodes", self.unreachable.len()));
        }
        if !self.has_cycle {
            failures.push("no cycle".to_string());
        }
        if self.avg_degree < MIN_AVG_DEGREE {
            failures.push(format!("avg degree {:.2} < {MIN_AVG_DEGREE}", self.avg_degree));
        }
        if self.frontier_count < MIN_FRONTIERS {
            failures.push(format!("{} frontier nodes", self.frontier_count));
        }
        failures
    }
}

/// Validate a typed graph
pub fn validate(graph: &AssignedGraph) -> GraphReport {
    let n = graph.positions.len();
    let depths = bfs_depths(n, &graph.edges, graph.entry);
    let unreachable: Vec<usize> = (0..n).filter(|&i| depths[i] == usize::MAX).collect();

    GraphReport {
        node_count: n,
        unreachable,
        has_cycle: has_cycle(n, graph),
        avg_degree: average_degree(graph),
        frontier_count: graph
            .types
            .iter()
            .filter(|t| **t == NodeType::Frontier)
            .count(),
    }
}

/// DFS back-edge detection on the undirected graph
fn has_cycle(n: usize, graph: &AssignedGraph) -> bool {
    let adj = adjacency(n, &graph.edges);
    let mut visited = vec![false; n];
    for start in 0..n {
        if visited[start] {
            continue;
        }
        // iterative DFS carrying the parent
        let mut stack = vec![(start, usize::MAX)];
        while let Some((node, parent)) = stack.pop() {
            if visited[node] {
                return true;
            }
            visited[node] = true;
            let mut skipped_parent = false;
            for &next in &adj[node] {
                // one parent edge is legitimate; a second means a multi-edge
                if next == parent && !skipped_parent {
                    skipped_parent = true;
                    continue;
                }
                if visited[next] {
                    return true;
                }
                stack.push((next, node));
            }
        }
    }
    false
}

/// Average degree over nodes that are not DeadEnd terminals
fn average_degree(graph: &AssignedGraph) -> f64 {
    let degrees = super::mst::degrees(graph.positions.len(), &graph.edges);
    let counted: Vec<usize> = (0..graph.positions.len())
        .filter(|&i| graph.types[i] != NodeType::DeadEnd)
        .collect();
    if counted.is_empty() {
        return 0.0;
    }
    let total: usize = counted.iter().map(|&i| degrees[i]).sum();
    total as f64 / counted.len() as f64
}
