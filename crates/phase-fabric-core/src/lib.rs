//! Phase Fabric Core
//!
//! The substrate of the synchronization fabric: a node/connection arena, a
//! seeded topology generator, connectivity-quality metrics, and health
//! monitoring with circuit-breaker-guarded node messaging.
//!
//! # Architecture
//!
//! - [`TopologyGenerator`] builds connected, clustered, hub-skewed graphs
//!   against density/clustering targets (deviations recorded, never fatal).
//! - [`FabricMetrics`] is a pure snapshot of connectivity quality:
//!   clustering, path length, a deliberate min-degree/N connectivity proxy,
//!   global efficiency, articulation-point bottlenecks.
//! - [`Fabric`] orchestrates initialization (foreground or background),
//!   global broadcast with isolated per-node failures, ignition-mode
//!   transitions, and shutdown.
//! - [`HealthManager`] probes the arena periodically and wraps node sends in
//!   a timeout plus a [`CircuitBreaker`].
//!
//! # Example
//!
//! ```no_run
//! use phase_fabric_core::{Fabric, HealthConfig, TopologyConfig};
//!
//! # async fn demo() -> phase_fabric_core::FabricResult<()> {
//! let fabric = Fabric::new(TopologyConfig::default(), HealthConfig::default());
//! fabric.initialize().await?;
//!
//! let reached = fabric
//!     .broadcast_global(serde_json::json!({"type": "ping"}), 1)
//!     .await?;
//! tracing::info!(reached, "broadcast done");
//!
//! fabric.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod fabric;
pub mod health;
pub mod metrics;
pub mod node;
pub mod topology;

pub use config::{HealthConfig, TopologyConfig};
pub use error::{FabricError, FabricResult};
pub use fabric::{Fabric, InitState, InitStatus};
pub use health::{BreakerState, CircuitBreaker, HealthManager, HealthSnapshot};
pub use metrics::FabricMetrics;
pub use node::{Connection, FabricNode, NodeId, NodeState};
pub use topology::{Topology, TopologyGenerator};
