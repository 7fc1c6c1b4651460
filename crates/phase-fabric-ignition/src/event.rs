//! Ignition events and the phase state machine.

use std::collections::HashSet;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use phase_fabric_core::NodeId;

/// Protocol phase of an ignition event.
///
/// Progression is strictly forward (`Prepare → Synchronize → Broadcast →
/// Sustain → Dissolve → Complete`) with `Failed` reachable from anywhere.
/// `Complete` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnitionPhase {
    Prepare,
    Synchronize,
    Broadcast,
    Sustain,
    Dissolve,
    Complete,
    Failed,
}

impl IgnitionPhase {
    /// Whether the phase ends the event.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, IgnitionPhase::Complete | IgnitionPhase::Failed)
    }

    /// Position in the forward progression; `Failed` sits outside it.
    fn ordinal(&self) -> Option<u8> {
        match self {
            IgnitionPhase::Prepare => Some(0),
            IgnitionPhase::Synchronize => Some(1),
            IgnitionPhase::Broadcast => Some(2),
            IgnitionPhase::Sustain => Some(3),
            IgnitionPhase::Dissolve => Some(4),
            IgnitionPhase::Complete => Some(5),
            IgnitionPhase::Failed => None,
        }
    }
}

/// A single ignition attempt, from admission to a terminal phase.
///
/// Owned by the coordinator for its lifetime and appended to the bounded
/// event history on finalization, except synthetic blocked events, which
/// are returned to the caller but never stored or counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnitionEvent {
    /// Unique event id
    pub id: String,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Monotonic start, for rate math; absent after deserialization
    #[serde(skip)]
    pub started_instant: Option<Instant>,
    /// Content payload being broadcast
    pub content: serde_json::Value,
    /// Label of the upstream content source
    pub content_source: String,
    /// Coherence the caller asked for
    pub target_coherence: f64,
    /// Sustain window the caller asked for, milliseconds
    pub target_duration_ms: f64,
    /// Current phase; `None` until the protocol starts
    pub phase: Option<IgnitionPhase>,
    /// Every phase entered, in order
    pub phase_history: Vec<IgnitionPhase>,
    /// Nodes recruited for this event
    pub participants: HashSet<NodeId>,
    /// Prepare-phase latency, milliseconds
    pub prepare_latency_ms: Option<f64>,
    /// Synchronize-phase latency, milliseconds
    pub sync_latency_ms: Option<f64>,
    /// Broadcast-phase latency, milliseconds
    pub broadcast_latency_ms: Option<f64>,
    /// Simulated time to reach the target coherence, if reached
    pub time_to_sync_ms: Option<f64>,
    /// Coherence samples collected during sustain
    pub coherence_history: Vec<f64>,
    /// Best coherence achieved, in [0, 1]
    pub achieved_coherence: f64,
    /// Whether the event completed successfully
    pub success: bool,
    /// Reason recorded on failure
    pub failure_reason: Option<String>,
    /// Wall-clock finalization time
    pub completed_at: Option<DateTime<Utc>>,
}

impl IgnitionEvent {
    /// Create an event at admission time.
    pub fn new(
        content: serde_json::Value,
        content_source: &str,
        target_coherence: f64,
        target_duration_ms: f64,
    ) -> Self {
        Self {
            id: format!("ignition-{}", Uuid::new_v4().simple()),
            started_at: Utc::now(),
            started_instant: Some(Instant::now()),
            content,
            content_source: content_source.to_string(),
            target_coherence,
            target_duration_ms,
            phase: None,
            phase_history: Vec::new(),
            participants: HashSet::new(),
            prepare_latency_ms: None,
            sync_latency_ms: None,
            broadcast_latency_ms: None,
            time_to_sync_ms: None,
            coherence_history: Vec::new(),
            achieved_coherence: 0.0,
            success: false,
            failure_reason: None,
            completed_at: None,
        }
    }

    /// Build a synthetic failed event for an admission rejection.
    ///
    /// Returned to the caller for inspection but never recorded in history
    /// or statistics.
    pub fn blocked(content_source: &str, target_coherence: f64, reason: &str) -> Self {
        let mut event = Self::new(
            serde_json::Value::Null,
            content_source,
            target_coherence,
            0.0,
        );
        event.transition(IgnitionPhase::Failed);
        event.finalize(false, Some(reason.to_string()));
        event
    }

    /// Enter a phase, enforcing strict forward progression and
    /// terminal-once-set.
    ///
    /// Invalid transitions are logged and ignored; state is preserved.
    pub fn transition(&mut self, next: IgnitionPhase) {
        if self.phase.map(|p| p.is_terminal()).unwrap_or(false) {
            tracing::warn!(
                event = %self.id,
                current = ?self.phase,
                requested = ?next,
                "phase transition after terminal state ignored"
            );
            return;
        }

        let valid = match (self.phase, next) {
            (_, IgnitionPhase::Failed) => true,
            (None, IgnitionPhase::Prepare) => true,
            (Some(current), next) => match (current.ordinal(), next.ordinal()) {
                (Some(a), Some(b)) => b == a + 1,
                _ => false,
            },
            (None, _) => false,
        };

        if valid {
            self.phase = Some(next);
            self.phase_history.push(next);
        } else {
            tracing::warn!(
                event = %self.id,
                current = ?self.phase,
                requested = ?next,
                "non-monotonic phase transition ignored"
            );
        }
    }

    /// Mark the event finished. Idempotent; the first call wins.
    pub fn finalize(&mut self, success: bool, reason: Option<String>) {
        if self.completed_at.is_some() {
            return;
        }
        self.success = success;
        self.failure_reason = reason;
        self.completed_at = Some(Utc::now());
    }

    /// Whether the event finished successfully.
    #[inline]
    pub fn was_successful(&self) -> bool {
        self.success
    }

    /// Total wall-clock duration from admission to finalization.
    pub fn total_duration_ms(&self) -> Option<f64> {
        self.completed_at
            .map(|end| (end - self.started_at).num_microseconds().unwrap_or(0) as f64 / 1_000.0)
    }

    /// Number of recruited participants.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.participants.len()
    }
}
