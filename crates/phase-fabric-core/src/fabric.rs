//! Fabric orchestration.
//!
//! [`Fabric`] owns the node arena and topology, drives (re)initialization in
//! the foreground or as a named background task, fans broadcasts out across
//! the arena, and performs bulk ignition-mode transitions. CPU-heavy steps
//! (topology generation, metric computation) run under `spawn_blocking` so
//! concurrent fabric operations are never starved.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio::task::{JoinHandle, JoinSet};

use crate::config::{HealthConfig, TopologyConfig};
use crate::error::{FabricError, FabricResult};
use crate::health::{HealthManager, HealthSnapshot};
use crate::metrics::FabricMetrics;
use crate::node::{Connection, FabricNode, NodeId, NodeState};
use crate::topology::{Topology, TopologyGenerator};

/// Simulated link bandwidth tiers in bits per second (10/40/100 Gbps).
const BANDWIDTH_TIERS_BPS: [u64; 3] = [10_000_000_000, 40_000_000_000, 100_000_000_000];

/// Activation level above which a node spreads activation to its neighbors.
const ACTIVATION_SPREAD_THRESHOLD: f64 = 0.5;

/// Weight multiplier applied to connections on ignition-mode entry.
const IGNITION_WEIGHT_BOOST: f64 = 1.5;

/// Upper bound for boosted connection weights.
const IGNITION_WEIGHT_CAP: f64 = 2.0;

/// Shared mutable fabric state: the node arena plus derived topology data.
#[derive(Debug, Default)]
pub(crate) struct FabricState {
    pub(crate) nodes: HashMap<NodeId, FabricNode>,
    pub(crate) topology: Option<Topology>,
    pub(crate) metrics: Option<FabricMetrics>,
}

/// Coarse initialization state for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitState {
    NotStarted,
    Initializing,
    Ready,
}

/// Detailed initialization status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitStatus {
    pub ready: bool,
    pub initializing: bool,
    pub node_count: usize,
    pub target_node_count: usize,
    pub state: InitState,
}

/// The synchronization fabric: node arena, topology, health monitoring.
pub struct Fabric {
    config: TopologyConfig,
    state: Arc<RwLock<FabricState>>,
    health: Arc<HealthManager>,
    initialized: Arc<AtomicBool>,
    initializing: Arc<AtomicBool>,
    init_task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    broadcast_failures: AtomicU64,
    send_timeout: Duration,
}

impl Fabric {
    /// Create an uninitialized fabric.
    pub fn new(config: TopologyConfig, health_config: HealthConfig) -> Self {
        let state = Arc::new(RwLock::new(FabricState::default()));
        let send_timeout = Duration::from_millis(health_config.send_timeout_ms);
        let health = Arc::new(HealthManager::new(Arc::clone(&state), health_config));
        Self {
            config,
            state,
            health,
            initialized: Arc::new(AtomicBool::new(false)),
            initializing: Arc::new(AtomicBool::new(false)),
            init_task: tokio::sync::Mutex::new(None),
            broadcast_failures: AtomicU64::new(0),
            send_timeout,
        }
    }

    /// Initialize in the foreground: generate topology, instantiate nodes,
    /// wire connections, compute metrics, activate nodes, start monitoring.
    ///
    /// Fails with [`FabricError::AlreadyInitialized`] on a ready fabric and
    /// [`FabricError::InitializationInProgress`] while a background
    /// initialization is running.
    pub async fn initialize(&self) -> FabricResult<()> {
        if self.initialized.load(Ordering::SeqCst) {
            return Err(FabricError::AlreadyInitialized);
        }
        if self.initializing.swap(true, Ordering::SeqCst) {
            return Err(FabricError::InitializationInProgress);
        }

        let result = run_init_pipeline(Arc::clone(&self.state), self.config.clone()).await;
        match result {
            Ok(()) => {
                self.health.start_monitoring().await;
                self.initialized.store(true, Ordering::SeqCst);
                self.initializing.store(false, Ordering::SeqCst);
                tracing::info!(nodes = self.config.node_count, "fabric initialized");
                Ok(())
            }
            Err(e) => {
                self.initializing.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Initialize in the background and return immediately.
    ///
    /// The dependent service can start right away and poll
    /// [`is_ready`](Self::is_ready) / [`init_status`](Self::init_status).
    /// Calling while a background run is already in flight is a logged
    /// no-op; calling on a ready fabric is an error.
    pub async fn initialize_background(&self) -> FabricResult<()> {
        if self.initialized.load(Ordering::SeqCst) {
            return Err(FabricError::AlreadyInitialized);
        }
        if self.initializing.swap(true, Ordering::SeqCst) {
            tracing::warn!("fabric already initializing in background");
            return Ok(());
        }

        tracing::info!(
            nodes = self.config.node_count,
            "starting background fabric initialization"
        );

        let state = Arc::clone(&self.state);
        let config = self.config.clone();
        let health = Arc::clone(&self.health);
        let initialized = Arc::clone(&self.initialized);
        let initializing = Arc::clone(&self.initializing);

        let handle = tokio::spawn(async move {
            match run_init_pipeline(state, config).await {
                Ok(()) => {
                    health.start_monitoring().await;
                    initialized.store(true, Ordering::SeqCst);
                    initializing.store(false, Ordering::SeqCst);
                    tracing::info!("background fabric initialization complete");
                }
                Err(e) => {
                    initializing.store(false, Ordering::SeqCst);
                    tracing::error!(error = %e, "background fabric initialization failed");
                }
            }
        });
        *self.init_task.lock().await = Some(handle);
        Ok(())
    }

    /// Whether initialization has completed.
    #[inline]
    pub fn is_ready(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Whether a (background) initialization is currently running.
    #[inline]
    pub fn is_initializing(&self) -> bool {
        self.initializing.load(Ordering::SeqCst)
    }

    /// Detailed initialization status.
    pub async fn init_status(&self) -> InitStatus {
        let ready = self.is_ready();
        let initializing = self.is_initializing();
        let node_count = self.state.read().await.nodes.len();
        let state = if ready {
            InitState::Ready
        } else if initializing {
            InitState::Initializing
        } else {
            InitState::NotStarted
        };
        InitStatus {
            ready,
            initializing,
            node_count,
            target_node_count: self.config.node_count,
            state,
        }
    }

    /// Broadcast a message to every node concurrently.
    ///
    /// Per-node failures are isolated and counted; the broadcast itself
    /// never aborts. Returns the number of nodes successfully reached.
    pub async fn broadcast_global(
        &self,
        message: serde_json::Value,
        priority: u8,
    ) -> FabricResult<usize> {
        self.ensure_ready()?;

        let targets: Vec<(NodeId, bool, f64)> = {
            let state = self.state.read().await;
            state
                .nodes
                .values()
                .map(|node| (node.id, node.is_available(), node.mean_latency_us()))
                .collect()
        };

        let (reached, failed) = self.fan_out(targets).await;
        self.broadcast_failures
            .fetch_add(failed as u64, Ordering::Relaxed);
        tracing::debug!(
            reached,
            failed,
            priority,
            payload = %message,
            "global broadcast complete"
        );
        Ok(reached)
    }

    /// Concurrent delivery to a target set; returns (reached, failed).
    async fn fan_out(&self, targets: Vec<(NodeId, bool, f64)>) -> (usize, usize) {
        let mut tasks: JoinSet<Result<NodeId, NodeId>> = JoinSet::new();
        for (id, available, latency_us) in targets {
            tasks.spawn(async move {
                if !available {
                    return Err(id);
                }
                tokio::time::sleep(Duration::from_micros(latency_us.ceil() as u64)).await;
                Ok(id)
            });
        }

        let mut delivered = Vec::new();
        let mut failed = 0usize;
        while let Some(result) = tasks.join_next().await {
            match result {
                Ok(Ok(id)) => delivered.push(id),
                Ok(Err(id)) => {
                    failed += 1;
                    tracing::trace!(node = %id, "delivery skipped: node unavailable");
                }
                Err(e) => {
                    failed += 1;
                    tracing::warn!(error = ?e, "delivery task failed");
                }
            }
        }

        let reached = delivered.len();
        let mut state = self.state.write().await;
        for id in delivered {
            if let Some(node) = state.nodes.get_mut(&id) {
                node.messages_received += 1;
            }
        }
        (reached, failed)
    }

    /// Transition the fabric into ignition mode.
    ///
    /// Active nodes flip to [`NodeState::IgnitionMode`]; degraded nodes stay
    /// degraded. Connection weights get a bounded multiplicative boost.
    pub async fn enter_ignition_mode(&self) -> FabricResult<()> {
        self.ensure_ready()?;
        let mut state = self.state.write().await;
        for node in state.nodes.values_mut() {
            if node.state == NodeState::Active {
                node.state = NodeState::IgnitionMode;
            }
            for conn in node.connections.values_mut() {
                conn.weight = (conn.weight * IGNITION_WEIGHT_BOOST).min(IGNITION_WEIGHT_CAP);
            }
        }
        tracing::debug!("fabric entered ignition mode");
        Ok(())
    }

    /// Return the fabric to normal operation, restoring connection weights.
    pub async fn exit_ignition_mode(&self) -> FabricResult<()> {
        self.ensure_ready()?;
        let mut state = self.state.write().await;
        for node in state.nodes.values_mut() {
            if node.state == NodeState::IgnitionMode {
                node.state = NodeState::Active;
            }
            for conn in node.connections.values_mut() {
                conn.weight = (conn.weight / IGNITION_WEIGHT_BOOST).max(1.0);
            }
        }
        tracing::debug!("fabric exited ignition mode");
        Ok(())
    }

    /// Set a node's activation level.
    ///
    /// Levels above the spread threshold propagate an activation-spread
    /// broadcast to the node's active neighbors, with priority scaled by the
    /// level.
    pub async fn activate_node(&self, id: NodeId, level: f64) -> FabricResult<()> {
        self.ensure_ready()?;
        let level = level.clamp(0.0, 1.0);

        let neighbors: Vec<NodeId> = {
            let mut state = self.state.write().await;
            let node = state
                .nodes
                .get_mut(&id)
                .ok_or(FabricError::NodeNotFound { id })?;
            node.attention_level = level;
            node.active_neighbors()
        };

        if level > ACTIVATION_SPREAD_THRESHOLD {
            let targets: Vec<(NodeId, bool, f64)> = {
                let state = self.state.read().await;
                neighbors
                    .iter()
                    .filter_map(|n| state.nodes.get(n))
                    .map(|node| (node.id, node.is_available(), node.mean_latency_us()))
                    .collect()
            };
            let priority = (level * 10.0) as u8;
            let (reached, _) = self.fan_out(targets).await;
            tracing::debug!(
                source = %id,
                level,
                priority,
                reached,
                "activation spread to neighbors"
            );
        }
        Ok(())
    }

    /// Send a payload to one node under a timeout and the messaging breaker.
    pub async fn send_to_node(
        &self,
        id: NodeId,
        payload: serde_json::Value,
        timeout: Option<Duration>,
    ) -> FabricResult<bool> {
        self.ensure_ready()?;
        let timeout = timeout.unwrap_or(self.send_timeout);
        Ok(self.health.send_to_node(id, &payload, timeout).await)
    }

    /// Force a node into a specific state (external health signal).
    pub async fn set_node_state(&self, id: NodeId, state: NodeState) -> FabricResult<()> {
        let mut guard = self.state.write().await;
        let node = guard
            .nodes
            .get_mut(&id)
            .ok_or(FabricError::NodeNotFound { id })?;
        node.state = state;
        Ok(())
    }

    /// Latest metric snapshot, if the fabric has one.
    pub async fn metrics(&self) -> Option<FabricMetrics> {
        self.state.read().await.metrics.clone()
    }

    /// A node by id, cloned out of the arena.
    pub async fn node(&self, id: NodeId) -> Option<FabricNode> {
        self.state.read().await.nodes.get(&id).cloned()
    }

    /// Number of nodes currently in the arena.
    pub async fn node_count(&self) -> usize {
        self.state.read().await.nodes.len()
    }

    /// Ids of nodes currently available for recruitment, sorted.
    pub async fn available_nodes(&self) -> Vec<NodeId> {
        let state = self.state.read().await;
        let mut ids: Vec<NodeId> = state
            .nodes
            .values()
            .filter(|node| node.is_available())
            .map(|node| node.id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of nodes in a given state.
    pub async fn count_in_state(&self, target: NodeState) -> usize {
        let state = self.state.read().await;
        state.nodes.values().filter(|n| n.state == target).count()
    }

    /// Active-link adjacency over the whole arena.
    pub async fn active_adjacency(&self) -> HashMap<NodeId, Vec<NodeId>> {
        let state = self.state.read().await;
        state
            .nodes
            .values()
            .map(|node| (node.id, node.active_neighbors()))
            .collect()
    }

    /// Aggregate health picture (breaker state, reachability, failures).
    pub fn health_snapshot(&self) -> HealthSnapshot {
        self.health.snapshot()
    }

    /// Total broadcast deliveries that failed since startup.
    pub fn broadcast_failures(&self) -> u64 {
        self.broadcast_failures.load(Ordering::Relaxed)
    }

    /// Stop the fabric: cancel any in-flight background initialization,
    /// stop health monitoring, release node and topology state.
    ///
    /// Idempotent and safe at any point, including mid-initialization.
    pub async fn stop(&self) {
        if let Some(handle) = self.init_task.lock().await.take() {
            if !handle.is_finished() {
                handle.abort();
                let _ = handle.await;
                tracing::warn!("background initialization cancelled");
            }
        }

        self.health.stop_monitoring().await;

        {
            let mut state = self.state.write().await;
            state.nodes.clear();
            state.topology = None;
            state.metrics = None;
        }
        self.initialized.store(false, Ordering::SeqCst);
        self.initializing.store(false, Ordering::SeqCst);
        tracing::info!("fabric stopped");
    }

    fn ensure_ready(&self) -> FabricResult<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(FabricError::NotInitialized)
        }
    }
}

impl std::fmt::Debug for Fabric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fabric")
            .field("node_count", &self.config.node_count)
            .field("ready", &self.is_ready())
            .field("initializing", &self.is_initializing())
            .finish()
    }
}

/// The shared initialization pipeline: generate → instantiate → wire →
/// measure → activate. CPU-bound steps run under `spawn_blocking`.
async fn run_init_pipeline(
    state: Arc<RwLock<FabricState>>,
    config: TopologyConfig,
) -> FabricResult<()> {
    let gen_config = config.clone();
    let topology = tokio::task::spawn_blocking(move || {
        let mut generator = TopologyGenerator::new(&gen_config)?;
        Ok::<Topology, FabricError>(generator.generate())
    })
    .await
    .map_err(|e| FabricError::TaskFailure(e.to_string()))??;

    {
        let mut guard = state.write().await;
        let mut rng = rand::thread_rng();
        guard.nodes.clear();
        for index in 0..topology.node_count() as u32 {
            guard.nodes.insert(NodeId(index), FabricNode::new(NodeId(index)));
        }
        for &(a, b) in topology.edges() {
            let latency_us = rng.gen_range(0.5..2.0);
            let bandwidth = BANDWIDTH_TIERS_BPS[rng.gen_range(0..BANDWIDTH_TIERS_BPS.len())];
            if let Some(node) = guard.nodes.get_mut(&NodeId(a)) {
                node.connections
                    .insert(NodeId(b), Connection::new(NodeId(b), latency_us, bandwidth));
            }
            if let Some(node) = guard.nodes.get_mut(&NodeId(b)) {
                node.connections
                    .insert(NodeId(a), Connection::new(NodeId(a), latency_us, bandwidth));
            }
        }
    }

    let metric_topology = topology.clone();
    let metrics = tokio::task::spawn_blocking(move || FabricMetrics::compute(&metric_topology))
        .await
        .map_err(|e| FabricError::TaskFailure(e.to_string()))?;

    let mut guard = state.write().await;
    let metrics = metrics.with_link_stats(&guard.nodes);
    metrics.log_quality();
    tracing::info!(
        nodes = metrics.node_count,
        edges = metrics.edge_count,
        clustering = format!("{:.3}", metrics.avg_clustering_coefficient),
        path_length = format!("{:.2}", metrics.avg_path_length),
        efficiency = format!("{:.3}", metrics.efficiency_index),
        connectivity = format!("{:.3}", metrics.connectivity_proxy),
        "fabric topology ready"
    );

    for node in guard.nodes.values_mut() {
        node.state = NodeState::Active;
    }
    guard.topology = Some(topology);
    guard.metrics = Some(metrics);
    Ok(())
}
