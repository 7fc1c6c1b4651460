//! Error types for phase-fabric-core.
//!
//! This module defines the central error type [`FabricError`] used throughout
//! the fabric substrate, along with the [`FabricResult<T>`] type alias.
//!
//! Only misuse of the fabric surface (operating on an uninitialized fabric,
//! double initialization, invalid generator parameters) is an error here.
//! Degraded nodes, failed deliveries and quality-threshold violations are
//! data, reported through counters and metric snapshots instead.

use thiserror::Error;

use crate::node::NodeId;

/// Top-level error type for fabric operations.
///
/// # Examples
///
/// ```rust
/// use phase_fabric_core::{FabricError, NodeId};
///
/// let error = FabricError::NodeNotFound { id: NodeId(7) };
/// assert!(error.to_string().contains("node-007"));
/// ```
#[derive(Debug, Error)]
pub enum FabricError {
    /// An operation that requires a ready fabric was called before
    /// initialization completed.
    ///
    /// # When This Occurs
    ///
    /// - Broadcasting before `initialize()` / background init finished
    /// - Entering or exiting ignition mode on an empty fabric
    /// - Sending to a node before the arena is populated
    #[error("fabric not initialized")]
    NotInitialized,

    /// `initialize` was called on a fabric that is already ready.
    #[error("fabric already initialized")]
    AlreadyInitialized,

    /// `initialize` was called while a background initialization is still
    /// running.
    #[error("fabric initialization already in progress")]
    InitializationInProgress,

    /// The topology generator was given parameters outside its contract.
    ///
    /// # When This Occurs
    ///
    /// - `node_count < 2`
    /// - `target_density` outside `(0, 1]`
    #[error("invalid topology parameters: {reason}")]
    InvalidTopology {
        /// Description of the parameter violation
        reason: String,
    },

    /// A health/monitoring parameter is outside its contract.
    #[error("invalid health parameters: {reason}")]
    InvalidHealthConfig {
        /// Description of the parameter violation
        reason: String,
    },

    /// A requested node id does not exist in the arena.
    #[error("node not found: {id}")]
    NodeNotFound {
        /// The id that failed to resolve
        id: NodeId,
    },

    /// A background worker (topology generation, metric computation) failed
    /// or was cancelled before producing its result.
    #[error("background task failed: {0}")]
    TaskFailure(String),
}

/// Result alias for fabric operations.
pub type FabricResult<T> = Result<T, FabricError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_name_the_offender() {
        let err = FabricError::NodeNotFound { id: NodeId(3) };
        assert_eq!(err.to_string(), "node not found: node-003");

        let err = FabricError::InvalidTopology {
            reason: "node_count must be >= 2, got 1".into(),
        };
        assert!(err.to_string().contains("node_count"));
    }

    #[test]
    fn lifecycle_errors_are_distinct() {
        assert_ne!(
            FabricError::NotInitialized.to_string(),
            FabricError::AlreadyInitialized.to_string()
        );
    }
}
