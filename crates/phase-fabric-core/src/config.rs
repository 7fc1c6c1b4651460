//! Configuration for the fabric substrate.
//!
//! Plain serde-derived structs with defaults and `validate()` methods; the
//! process bootstrap that layers file/env loading on top lives outside this
//! crate.

use serde::{Deserialize, Serialize};

use crate::error::{FabricError, FabricResult};

/// Parameters driving topology generation.
///
/// Density and clustering are *targets*: the generator approximates them and
/// deviations are recorded, never fatal. Only structurally impossible inputs
/// (`node_count < 2`, density outside `(0, 1]`) are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyConfig {
    /// Number of nodes in the fabric
    pub node_count: usize,
    /// Target edge density in (0, 1]
    pub target_density: f64,
    /// Degree-distribution exponent; higher values flatten the hub skew
    pub gamma: f64,
    /// Target average local clustering coefficient
    pub clustering_target: f64,
    /// Seed for deterministic generation; `None` draws from entropy
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            node_count: 32,
            target_density: 0.25,
            gamma: 2.5,
            clustering_target: 0.75,
            seed: None,
        }
    }
}

impl TopologyConfig {
    /// Check the hard parameter constraints.
    pub fn validate(&self) -> FabricResult<()> {
        if self.node_count < 2 {
            return Err(FabricError::InvalidTopology {
                reason: format!("node_count must be >= 2, got {}", self.node_count),
            });
        }
        if !(self.target_density > 0.0 && self.target_density <= 1.0) {
            return Err(FabricError::InvalidTopology {
                reason: format!(
                    "target_density must be in (0, 1], got {}",
                    self.target_density
                ),
            });
        }
        Ok(())
    }
}

/// Health-monitoring and node-messaging parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthConfig {
    /// Interval between probe rounds over the node arena
    pub probe_interval_ms: u64,
    /// Default wall-clock bound for a single node send
    pub send_timeout_ms: u64,
    /// Consecutive failures before the messaging breaker opens
    pub failure_threshold: u32,
    /// Cooldown before an open breaker admits a trial call
    pub recovery_timeout_ms: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            probe_interval_ms: 500,
            send_timeout_ms: 1_000,
            failure_threshold: 5,
            recovery_timeout_ms: 10_000,
        }
    }
}

impl HealthConfig {
    /// Check the hard parameter constraints.
    pub fn validate(&self) -> FabricResult<()> {
        if self.probe_interval_ms == 0 {
            return Err(FabricError::InvalidHealthConfig {
                reason: "probe_interval_ms must be greater than 0".into(),
            });
        }
        if self.failure_threshold == 0 {
            return Err(FabricError::InvalidHealthConfig {
                reason: "failure_threshold must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topology_config_is_valid() {
        assert!(TopologyConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_single_node() {
        let config = TopologyConfig {
            node_count: 1,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(FabricError::InvalidTopology { .. })
        ));
    }

    #[test]
    fn rejects_density_outside_unit_interval() {
        for density in [0.0, -0.2, 1.5] {
            let config = TopologyConfig {
                target_density: density,
                ..Default::default()
            };
            assert!(
                config.validate().is_err(),
                "density {} must be rejected",
                density
            );
        }

        let config = TopologyConfig {
            target_density: 1.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok(), "density 1.0 is allowed");
    }

    #[test]
    fn health_config_rejects_zero_interval() {
        let config = HealthConfig {
            probe_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
