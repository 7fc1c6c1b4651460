//! Node and connection model.
//!
//! Nodes live in an index-stable arena keyed by [`NodeId`]; connections
//! reference remote ids, never pointers, so shutdown is a plain `clear()`
//! with no cycle-breaking pass. Bidirectional links are represented as two
//! independent [`Connection`] records, one per endpoint.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a fabric node.
///
/// Renders as `node-007` in logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{:03}", self.0)
    }
}

/// Lifecycle state of a fabric node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeState {
    /// Created but not yet wired into the fabric
    Initializing,
    /// Fully operational
    Active,
    /// Participating in an ignition window (boosted connection weights)
    IgnitionMode,
    /// Failing health probes; excluded from recruitment and delivery
    Degraded,
}

impl NodeState {
    /// Whether the node can participate in broadcasts and ignition rounds.
    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, NodeState::Active | NodeState::IgnitionMode)
    }
}

/// A simulated one-way link to a remote node.
#[derive(Debug, Clone)]
pub struct Connection {
    /// Remote endpoint id
    pub remote: NodeId,
    /// Simulated one-way latency in microseconds
    pub latency_us: f64,
    /// Simulated bandwidth in bits per second
    pub bandwidth_bps: u64,
    /// Mutable weight; ignition mode scales this up (capped) and restores it
    pub weight: f64,
    /// Whether the link currently carries traffic
    pub active: bool,
}

impl Connection {
    /// Create an active connection with the default weight of 1.0.
    pub fn new(remote: NodeId, latency_us: f64, bandwidth_bps: u64) -> Self {
        Self {
            remote,
            latency_us,
            bandwidth_bps,
            weight: 1.0,
            active: true,
        }
    }
}

/// A single compute node in the fabric arena.
#[derive(Debug, Clone)]
pub struct FabricNode {
    /// Stable arena key
    pub id: NodeId,
    /// Current lifecycle state
    pub state: NodeState,
    /// Externally driven activation level in [0, 1]
    pub attention_level: f64,
    /// Outgoing links keyed by remote id
    pub connections: HashMap<NodeId, Connection>,
    /// Count of messages delivered to this node
    pub messages_received: u64,
}

impl FabricNode {
    /// Create a node in the `Initializing` state with no connections.
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            state: NodeState::Initializing,
            attention_level: 0.0,
            connections: HashMap::new(),
            messages_received: 0,
        }
    }

    /// Whether the node can receive traffic right now.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.state.is_available()
    }

    /// Mean latency across this node's links, in microseconds.
    ///
    /// Used to simulate delivery cost; falls back to 1.0 µs for a node with
    /// no wired connections yet.
    pub fn mean_latency_us(&self) -> f64 {
        if self.connections.is_empty() {
            return 1.0;
        }
        let total: f64 = self.connections.values().map(|c| c.latency_us).sum();
        total / self.connections.len() as f64
    }

    /// Ids of remotes reachable over currently active links.
    pub fn active_neighbors(&self) -> Vec<NodeId> {
        self.connections
            .values()
            .filter(|c| c.active)
            .map(|c| c.remote)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_id_display_is_zero_padded() {
        assert_eq!(NodeId(0).to_string(), "node-000");
        assert_eq!(NodeId(42).to_string(), "node-042");
        assert_eq!(NodeId(117).to_string(), "node-117");
    }

    #[test]
    fn availability_follows_state() {
        let mut node = FabricNode::new(NodeId(1));
        assert!(!node.is_available(), "initializing node is not available");

        node.state = NodeState::Active;
        assert!(node.is_available());

        node.state = NodeState::IgnitionMode;
        assert!(node.is_available());

        node.state = NodeState::Degraded;
        assert!(!node.is_available());
    }

    #[test]
    fn new_connection_defaults() {
        let conn = Connection::new(NodeId(2), 1.5, 10_000_000_000);
        assert_eq!(conn.remote, NodeId(2));
        assert!((conn.weight - 1.0).abs() < f64::EPSILON);
        assert!(conn.active);
    }

    #[test]
    fn mean_latency_over_links() {
        let mut node = FabricNode::new(NodeId(0));
        assert!((node.mean_latency_us() - 1.0).abs() < f64::EPSILON);

        node.connections
            .insert(NodeId(1), Connection::new(NodeId(1), 1.0, 10));
        node.connections
            .insert(NodeId(2), Connection::new(NodeId(2), 3.0, 10));
        assert!((node.mean_latency_us() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn inactive_links_excluded_from_neighbors() {
        let mut node = FabricNode::new(NodeId(0));
        node.connections
            .insert(NodeId(1), Connection::new(NodeId(1), 1.0, 10));
        let mut dead = Connection::new(NodeId(2), 1.0, 10);
        dead.active = false;
        node.connections.insert(NodeId(2), dead);

        assert_eq!(node.active_neighbors(), vec![NodeId(1)]);
    }
}
