//! Connectivity-quality metrics.
//!
//! [`FabricMetrics`] is a point-in-time snapshot computed as a pure function
//! of a [`Topology`] plus link aggregates from the node arena. Quality
//! thresholds here are advisory: violations are logged when the fabric
//! initializes and never block anything.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::node::{FabricNode, NodeId};
use crate::topology::Topology;

/// Efficiency index below this value is logged as a quality violation.
pub const QUALITY_EFFICIENCY_MIN: f64 = 0.85;

/// Clustering coefficient below this value is logged as a quality violation.
pub const QUALITY_CLUSTERING_MIN: f64 = 0.5;

/// Hop cutoff for the sampled path-redundancy diagnostic.
const REDUNDANCY_PATH_CUTOFF: usize = 4;

/// Number of source nodes sampled for path redundancy.
const REDUNDANCY_SAMPLE: usize = 10;

/// Point-in-time connectivity snapshot of the fabric.
///
/// Recomputed whenever the topology changes; read-only to consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FabricMetrics {
    /// Nodes in the topology
    pub node_count: usize,
    /// Undirected edges in the topology
    pub edge_count: usize,
    /// 2E / (N·(N−1))
    pub density: f64,
    /// Average local clustering coefficient
    pub avg_clustering_coefficient: f64,
    /// Average shortest-path length over the largest connected component
    pub avg_path_length: f64,
    /// Connectivity proxy: minimum degree / N.
    ///
    /// Deliberately approximates algebraic connectivity: the exact Fiedler
    /// eigenvalue is O(n³) and hangs on larger fabrics. The approximation
    /// captures the weakest link and is part of the contract; do not replace
    /// it with an eigen computation.
    pub connectivity_proxy: f64,
    /// Global efficiency: mean of 1/d over all ordered node pairs, in [0, 1]
    pub efficiency_index: f64,
    /// Whether any articulation point exists
    pub has_bottlenecks: bool,
    /// The articulation points, if any
    pub bottleneck_nodes: Vec<NodeId>,
    /// Minimum simple-path count over a bounded pair sample (diagnostic only)
    pub min_path_redundancy: usize,
    /// Mean link latency across the arena, microseconds
    pub avg_latency_us: f64,
    /// Maximum link latency across the arena, microseconds
    pub max_latency_us: f64,
    /// Sum of link bandwidths, Gbps
    pub total_bandwidth_gbps: f64,
}

impl FabricMetrics {
    /// Compute all graph-derived metrics for a topology.
    pub fn compute(topology: &Topology) -> Self {
        let node_count = topology.node_count();
        let edge_count = topology.edge_count();

        let components = topology.connected_components();
        if components.len() > 1 {
            tracing::warn!(
                components = components.len(),
                "topology is disconnected; path length computed over largest component"
            );
        }
        let largest = components
            .iter()
            .max_by_key(|c| c.len())
            .cloned()
            .unwrap_or_default();

        let (avg_path_length, efficiency_index) = path_statistics(topology, &largest);
        let bottleneck_nodes = articulation_points(topology)
            .into_iter()
            .map(NodeId)
            .collect::<Vec<_>>();

        Self {
            node_count,
            edge_count,
            density: topology.density(),
            avg_clustering_coefficient: average_clustering(topology),
            avg_path_length,
            connectivity_proxy: connectivity_proxy(topology),
            efficiency_index,
            has_bottlenecks: !bottleneck_nodes.is_empty(),
            min_path_redundancy: min_path_redundancy(topology),
            bottleneck_nodes,
            avg_latency_us: 0.0,
            max_latency_us: 0.0,
            total_bandwidth_gbps: 0.0,
        }
    }

    /// Fold link latency/bandwidth aggregates from the node arena into the
    /// snapshot.
    pub fn with_link_stats(mut self, nodes: &HashMap<NodeId, FabricNode>) -> Self {
        let mut count = 0usize;
        let mut latency_sum = 0.0;
        let mut latency_max: f64 = 0.0;
        let mut bandwidth_sum = 0.0;
        for node in nodes.values() {
            for conn in node.connections.values() {
                count += 1;
                latency_sum += conn.latency_us;
                latency_max = latency_max.max(conn.latency_us);
                bandwidth_sum += conn.bandwidth_bps as f64 / 1e9;
            }
        }
        if count > 0 {
            self.avg_latency_us = latency_sum / count as f64;
            self.max_latency_us = latency_max;
            self.total_bandwidth_gbps = bandwidth_sum;
        }
        self
    }

    /// Advisory quality violations, empty when all thresholds pass.
    pub fn quality_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.efficiency_index < QUALITY_EFFICIENCY_MIN {
            violations.push(format!(
                "efficiency index {:.3} below {:.2}",
                self.efficiency_index, QUALITY_EFFICIENCY_MIN
            ));
        }
        if self.avg_clustering_coefficient < QUALITY_CLUSTERING_MIN {
            violations.push(format!(
                "clustering coefficient {:.3} below {:.2}",
                self.avg_clustering_coefficient, QUALITY_CLUSTERING_MIN
            ));
        }
        if self.has_bottlenecks {
            violations.push(format!(
                "{} articulation point(s): {}",
                self.bottleneck_nodes.len(),
                self.bottleneck_nodes
                    .iter()
                    .map(|n| n.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        violations
    }

    /// Log each advisory violation at warn level.
    pub fn log_quality(&self) {
        for violation in self.quality_violations() {
            tracing::warn!(violation = %violation, "fabric quality violation");
        }
    }
}

/// Average local clustering coefficient.
///
/// Nodes with fewer than two neighbors contribute zero, matching the
/// standard definition.
fn average_clustering(topology: &Topology) -> f64 {
    let n = topology.node_count();
    if n == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for node in 0..n as u32 {
        let neighbors = topology.neighbors(node);
        let k = neighbors.len();
        if k < 2 {
            continue;
        }
        let mut links = 0usize;
        for (i, &a) in neighbors.iter().enumerate() {
            for &b in &neighbors[i + 1..] {
                if topology.has_edge(a, b) {
                    links += 1;
                }
            }
        }
        total += 2.0 * links as f64 / (k * (k - 1)) as f64;
    }
    total / n as f64
}

/// Minimum degree / N.
fn connectivity_proxy(topology: &Topology) -> f64 {
    let n = topology.node_count();
    if n == 0 {
        return 0.0;
    }
    let min_degree = (0..n as u32)
        .map(|node| topology.degree(node))
        .min()
        .unwrap_or(0);
    min_degree as f64 / n as f64
}

/// BFS distances from one source; unreachable nodes stay `usize::MAX`.
fn bfs_distances(topology: &Topology, source: u32) -> Vec<usize> {
    let mut distances = vec![usize::MAX; topology.node_count()];
    let mut frontier = std::collections::VecDeque::from([source]);
    distances[source as usize] = 0;
    while let Some(current) = frontier.pop_front() {
        let next_distance = distances[current as usize] + 1;
        for &neighbor in topology.neighbors(current) {
            if distances[neighbor as usize] == usize::MAX {
                distances[neighbor as usize] = next_distance;
                frontier.push_back(neighbor);
            }
        }
    }
    distances
}

/// Average path length over the given component and global efficiency over
/// the whole topology, from one all-pairs BFS sweep.
fn path_statistics(topology: &Topology, largest_component: &[u32]) -> (f64, f64) {
    let n = topology.node_count();
    if n < 2 {
        return (0.0, 0.0);
    }

    let in_largest: std::collections::HashSet<u32> = largest_component.iter().copied().collect();
    let mut component_sum = 0.0;
    let mut component_pairs = 0usize;
    let mut inverse_sum = 0.0;

    for source in 0..n as u32 {
        let distances = bfs_distances(topology, source);
        for (target, &d) in distances.iter().enumerate() {
            if target as u32 == source || d == usize::MAX {
                continue;
            }
            inverse_sum += 1.0 / d as f64;
            if in_largest.contains(&source) && in_largest.contains(&(target as u32)) {
                component_sum += d as f64;
                component_pairs += 1;
            }
        }
    }

    let avg_path_length = if component_pairs > 0 {
        component_sum / component_pairs as f64
    } else {
        0.0
    };
    let efficiency = (inverse_sum / (n * (n - 1)) as f64).min(1.0);
    (avg_path_length, efficiency)
}

/// Articulation points via iterative Tarjan low-link.
///
/// A node is an articulation point when removing it disconnects the graph,
/// the structural signature of a feed-forward bottleneck.
fn articulation_points(topology: &Topology) -> Vec<u32> {
    let n = topology.node_count();
    let mut discovery = vec![usize::MAX; n];
    let mut low = vec![0usize; n];
    let mut parent = vec![u32::MAX; n];
    let mut is_articulation = vec![false; n];
    let mut timer = 0usize;

    for root in 0..n as u32 {
        if discovery[root as usize] != usize::MAX {
            continue;
        }
        // Explicit stack of (node, neighbor cursor) frames.
        let mut stack: Vec<(u32, usize)> = vec![(root, 0)];
        let mut root_children = 0usize;
        discovery[root as usize] = timer;
        low[root as usize] = timer;
        timer += 1;

        while let Some(&(node, cursor)) = stack.last() {
            let neighbors = topology.neighbors(node);
            if cursor < neighbors.len() {
                if let Some(frame) = stack.last_mut() {
                    frame.1 += 1;
                }
                let next = neighbors[cursor];
                if discovery[next as usize] == usize::MAX {
                    parent[next as usize] = node;
                    if node == root {
                        root_children += 1;
                    }
                    discovery[next as usize] = timer;
                    low[next as usize] = timer;
                    timer += 1;
                    stack.push((next, 0));
                } else if next != parent[node as usize] {
                    low[node as usize] = low[node as usize].min(discovery[next as usize]);
                }
            } else {
                stack.pop();
                if let Some(&(up, _)) = stack.last() {
                    low[up as usize] = low[up as usize].min(low[node as usize]);
                    if up != root && low[node as usize] >= discovery[up as usize] {
                        is_articulation[up as usize] = true;
                    }
                }
            }
        }

        if root_children > 1 {
            is_articulation[root as usize] = true;
        }
    }

    (0..n as u32)
        .filter(|&node| is_articulation[node as usize])
        .collect()
}

/// Minimum simple-path count over a bounded pair sample.
///
/// Samples the first [`REDUNDANCY_SAMPLE`] nodes against their following ten
/// indices and counts simple paths up to [`REDUNDANCY_PATH_CUTOFF`] hops.
/// Diagnostic only; never gates anything.
fn min_path_redundancy(topology: &Topology) -> usize {
    let n = topology.node_count();
    if n < 2 {
        return 0;
    }
    let mut minimum = usize::MAX;
    for a in 0..n.min(REDUNDANCY_SAMPLE) as u32 {
        let upper = ((a as usize + 1 + REDUNDANCY_SAMPLE).min(n)) as u32;
        for b in (a + 1)..upper {
            let count = count_simple_paths(topology, a, b, REDUNDANCY_PATH_CUTOFF);
            minimum = minimum.min(count);
        }
    }
    if minimum == usize::MAX {
        0
    } else {
        minimum
    }
}

fn count_simple_paths(topology: &Topology, source: u32, target: u32, cutoff: usize) -> usize {
    fn recurse(
        topology: &Topology,
        current: u32,
        target: u32,
        cutoff: usize,
        visited: &mut Vec<bool>,
    ) -> usize {
        if current == target {
            return 1;
        }
        if cutoff == 0 {
            return 0;
        }
        let mut count = 0;
        visited[current as usize] = true;
        for &next in topology.neighbors(current) {
            if !visited[next as usize] {
                count += recurse(topology, next, target, cutoff - 1, visited);
            }
        }
        visited[current as usize] = false;
        count
    }

    let mut visited = vec![false; topology.node_count()];
    recurse(topology, source, target, cutoff, &mut visited)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete(n: usize) -> Topology {
        let mut edges = Vec::new();
        for a in 0..n as u32 {
            for b in (a + 1)..n as u32 {
                edges.push((a, b));
            }
        }
        Topology::from_edges(n, &edges)
    }

    /// Two 4-cliques joined through a single bridge node.
    fn bridged_cliques() -> Topology {
        let mut edges = Vec::new();
        // Clique A: 0..4, clique B: 5..9, bridge node 4 touching both.
        for a in 0..4u32 {
            for b in (a + 1)..4 {
                edges.push((a, b));
            }
        }
        for a in 5..9u32 {
            for b in (a + 1)..9 {
                edges.push((a, b));
            }
        }
        edges.push((3, 4));
        edges.push((4, 5));
        Topology::from_edges(9, &edges)
    }

    #[test]
    fn complete_graph_has_ideal_metrics() {
        let metrics = FabricMetrics::compute(&complete(6));
        assert_eq!(metrics.node_count, 6);
        assert_eq!(metrics.edge_count, 15);
        assert!((metrics.density - 1.0).abs() < 1e-9);
        assert!((metrics.avg_clustering_coefficient - 1.0).abs() < 1e-9);
        assert!((metrics.avg_path_length - 1.0).abs() < 1e-9);
        assert!((metrics.efficiency_index - 1.0).abs() < 1e-9);
        assert!(!metrics.has_bottlenecks);
        assert!(metrics.quality_violations().is_empty());
    }

    #[test]
    fn bridge_node_is_reported_as_bottleneck() {
        let metrics = FabricMetrics::compute(&bridged_cliques());
        assert!(metrics.has_bottlenecks);
        assert!(
            metrics.bottleneck_nodes.contains(&NodeId(4)),
            "bridge node must be listed, got {:?}",
            metrics.bottleneck_nodes
        );
    }

    #[test]
    fn path_graph_interior_nodes_are_articulation_points() {
        let topology = Topology::from_edges(4, &[(0, 1), (1, 2), (2, 3)]);
        let points = articulation_points(&topology);
        assert_eq!(points, vec![1, 2]);
    }

    #[test]
    fn ring_has_no_articulation_points() {
        let topology = Topology::from_edges(5, &[(0, 1), (1, 2), (2, 3), (3, 4), (4, 0)]);
        assert!(articulation_points(&topology).is_empty());
    }

    #[test]
    fn disconnected_graph_uses_largest_component() {
        // Triangle plus an isolated edge: path length must come from the
        // triangle, efficiency from all pairs.
        let topology = Topology::from_edges(5, &[(0, 1), (1, 2), (2, 0), (3, 4)]);
        let metrics = FabricMetrics::compute(&topology);
        assert!((metrics.avg_path_length - 1.0).abs() < 1e-9);
        assert!(metrics.efficiency_index < 1.0);
    }

    #[test]
    fn connectivity_proxy_is_min_degree_over_n() {
        // Star graph: leaves have degree 1, n = 5.
        let topology = Topology::from_edges(5, &[(0, 1), (0, 2), (0, 3), (0, 4)]);
        let metrics = FabricMetrics::compute(&topology);
        assert!((metrics.connectivity_proxy - 1.0 / 5.0).abs() < 1e-9);
    }

    #[test]
    fn redundancy_counts_parallel_paths() {
        // Square: two simple paths between opposite corners within 4 hops.
        let topology = Topology::from_edges(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]);
        assert_eq!(count_simple_paths(&topology, 0, 2, 4), 2);
        // Adjacent corners: the edge plus the long way around.
        assert_eq!(count_simple_paths(&topology, 0, 1, 4), 2);
    }

    #[test]
    fn link_stats_fold_in_connection_aggregates() {
        use crate::node::{Connection, FabricNode};

        let topology = Topology::from_edges(2, &[(0, 1)]);
        let mut nodes = HashMap::new();
        let mut a = FabricNode::new(NodeId(0));
        a.connections
            .insert(NodeId(1), Connection::new(NodeId(1), 1.0, 10_000_000_000));
        let mut b = FabricNode::new(NodeId(1));
        b.connections
            .insert(NodeId(0), Connection::new(NodeId(0), 2.0, 40_000_000_000));
        nodes.insert(NodeId(0), a);
        nodes.insert(NodeId(1), b);

        let metrics = FabricMetrics::compute(&topology).with_link_stats(&nodes);
        assert!((metrics.avg_latency_us - 1.5).abs() < 1e-9);
        assert!((metrics.max_latency_us - 2.0).abs() < 1e-9);
        assert!((metrics.total_bandwidth_gbps - 50.0).abs() < 1e-9);
    }

    #[test]
    fn low_efficiency_is_advisory_not_fatal() {
        // Long path graph: efficiency well below 0.85.
        let edges: Vec<(u32, u32)> = (0..9).map(|i| (i, i + 1)).collect();
        let topology = Topology::from_edges(10, &edges);
        let metrics = FabricMetrics::compute(&topology);
        assert!(metrics.efficiency_index < QUALITY_EFFICIENCY_MIN);
        let violations = metrics.quality_violations();
        assert!(!violations.is_empty());
    }
}
