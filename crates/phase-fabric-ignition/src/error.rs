//! Error types for phase-fabric-ignition.
//!
//! By design almost nothing on the ignition path is an `Err`: admission
//! rejections and protocol failures are data, returned as failed
//! [`IgnitionEvent`](crate::event::IgnitionEvent)s so callers can inspect
//! outcomes without error-handling overhead on the hot path. Only misuse of
//! the coordinator surface propagates as an error.

use thiserror::Error;

use phase_fabric_core::FabricError;

/// Hard errors from the coordinator surface.
#[derive(Debug, Error)]
pub enum IgnitionError {
    /// `initiate_esgt` was called before `start()` (or after `stop()`).
    #[error("coordinator not running")]
    NotRunning,

    /// A fabric precondition violation surfaced outside the guarded
    /// protocol path.
    #[error(transparent)]
    Fabric(#[from] FabricError),
}

/// Result alias for coordinator operations.
pub type IgnitionResult<T> = Result<T, IgnitionError>;
