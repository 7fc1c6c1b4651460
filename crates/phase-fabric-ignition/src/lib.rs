//! Phase Fabric Ignition
//!
//! The coordinator layer of the synchronization fabric: a Kuramoto
//! oscillator network, layered admission gating (frequency limiter,
//! concurrency cap, circuit breaker, degraded-mode salience bar), and the
//! five-phase ignition protocol that transiently raises fabric-wide phase
//! coherence above a target threshold.
//!
//! # Protocol
//!
//! `Prepare → Synchronize → Broadcast → Sustain → Dissolve → Complete`,
//! with `Failed` reachable from any phase. Admission rejections are
//! synthetic failed events (returned, never recorded); every post-admission
//! outcome is a recorded event. Errors on the ignition path are data by
//! design: callers inspect [`IgnitionEvent`]s, not `Err`s.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use phase_fabric_core::{Fabric, HealthConfig, TopologyConfig};
//! use phase_fabric_ignition::{
//!     Coordinator, OscillatorConfig, SalienceScore, TriggerConditions,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let fabric = Arc::new(Fabric::new(
//!     TopologyConfig::default(),
//!     HealthConfig::default(),
//! ));
//! fabric.initialize().await?;
//!
//! let coordinator = Coordinator::new(
//!     Arc::clone(&fabric),
//!     TriggerConditions::default(),
//!     OscillatorConfig::default(),
//! );
//! coordinator.start();
//!
//! let event = coordinator
//!     .initiate_esgt(
//!         SalienceScore::new(0.85, 0.9, 0.75),
//!         serde_json::json!({"topic": "alert"}),
//!         "demo",
//!         200.0,
//!         0.70,
//!     )
//!     .await?;
//! println!("success={} coherence={:.3}", event.success, event.achieved_coherence);
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod error;
pub mod event;
pub mod hooks;
pub mod limiter;
pub mod oscillator;
pub mod salience;
pub mod triggers;

pub use coordinator::{
    Coordinator, CoordinatorHealth, DEGRADED_SALIENCE_MIN, MAX_CONCURRENT_EVENTS,
    MAX_FREQUENCY_HZ, REASON_BREAKER_OPEN, REASON_DEGRADED_SALIENCE, REASON_FREQUENCY_LIMIT,
    REASON_MAX_CONCURRENT,
};
pub use error::{IgnitionError, IgnitionResult};
pub use event::{IgnitionEvent, IgnitionPhase};
pub use hooks::{ContentEnricher, IgnitionObserver, IgnitionSignal, ObserverRegistry};
pub use limiter::FrequencyLimiter;
pub use oscillator::{
    CoherenceSample, Oscillator, OscillatorConfig, OscillatorNetwork, ParticipantTopology,
    SyncOutcome, CONSCIOUS_COHERENCE_MIN,
};
pub use salience::SalienceScore;
pub use triggers::TriggerConditions;
