//! Trigger conditions for ignition admission.
//!
//! A whole-value configuration: immutable per coordinator instance but
//! hot-swappable atomically via `Coordinator::set_triggers`.

use serde::{Deserialize, Serialize};

use crate::salience::SalienceScore;

/// Thresholds an ignition request must clear after passing the hard
/// admission gates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConditions {
    /// Minimum total salience
    pub min_salience: f64,
    /// Minimum participants the Prepare phase must recruit
    pub min_available_nodes: usize,
    /// Minimum gap between ignitions, milliseconds
    pub refractory_period_ms: f64,
    /// Minimum arousal level supplied by the external controller
    pub min_arousal: f64,
    /// Maximum tolerated mean fabric latency, milliseconds
    pub max_fabric_latency_ms: f64,
    /// Minimum simulated CPU capacity
    pub min_cpu_capacity: f64,
    /// Structural node floor for the resource gate; synchronization needs
    /// at least two participants regardless of the recruitment minimum
    pub min_resource_nodes: usize,
    /// Cap on recorded events inside the trailing second
    pub max_events_per_second: usize,
}

impl Default for TriggerConditions {
    fn default() -> Self {
        Self {
            min_salience: 0.65,
            min_available_nodes: 4,
            refractory_period_ms: 100.0,
            min_arousal: 0.5,
            max_fabric_latency_ms: 10.0,
            min_cpu_capacity: 0.30,
            min_resource_nodes: 2,
            max_events_per_second: 5,
        }
    }
}

impl TriggerConditions {
    /// Salience gate.
    pub fn check_salience(&self, salience: &SalienceScore) -> bool {
        salience.total() >= self.min_salience
    }

    /// Resource gate: fabric latency, a structural node floor, CPU headroom.
    ///
    /// The recruitment minimum (`min_available_nodes`) is enforced later by
    /// the Prepare phase against the nodes actually recruited.
    pub fn check_resources(
        &self,
        fabric_latency_ms: f64,
        available_nodes: usize,
        cpu_capacity: f64,
    ) -> bool {
        fabric_latency_ms <= self.max_fabric_latency_ms
            && available_nodes >= self.min_resource_nodes
            && cpu_capacity >= self.min_cpu_capacity
    }

    /// Temporal gate: refractory period plus recent-event rate.
    ///
    /// `elapsed_since_last_ms` of `None` means no prior ignition.
    pub fn check_temporal(&self, elapsed_since_last_ms: Option<f64>, recent_events: usize) -> bool {
        let refractory_ok = match elapsed_since_last_ms {
            Some(elapsed) => elapsed >= self.refractory_period_ms,
            None => true,
        };
        refractory_ok && recent_events < self.max_events_per_second
    }

    /// Arousal gate.
    pub fn check_arousal(&self, arousal: f64) -> bool {
        arousal >= self.min_arousal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn salience_gate_uses_total() {
        let triggers = TriggerConditions::default();
        assert!(triggers.check_salience(&SalienceScore::new(0.85, 0.9, 0.75)));
        assert!(!triggers.check_salience(&SalienceScore::new(0.2, 0.2, 0.2)));
    }

    #[test]
    fn resource_gate_checks_all_three() {
        let triggers = TriggerConditions::default();
        assert!(triggers.check_resources(1.0, 8, 0.6));
        assert!(!triggers.check_resources(50.0, 8, 0.6), "latency too high");
        assert!(!triggers.check_resources(1.0, 1, 0.6), "below node floor");
        assert!(!triggers.check_resources(1.0, 8, 0.1), "no cpu headroom");
    }

    #[test]
    fn recruitment_minimum_is_not_a_resource_concern() {
        let triggers = TriggerConditions {
            min_available_nodes: 20,
            ..Default::default()
        };
        // The resource gate passes on the structural floor; Prepare enforces
        // the recruitment minimum.
        assert!(triggers.check_resources(1.0, 8, 0.6));
    }

    #[test]
    fn temporal_gate_enforces_refractory_and_rate() {
        let triggers = TriggerConditions::default();
        assert!(triggers.check_temporal(None, 0), "first ignition passes");
        assert!(triggers.check_temporal(Some(150.0), 2));
        assert!(!triggers.check_temporal(Some(50.0), 2), "inside refractory");
        assert!(!triggers.check_temporal(Some(150.0), 5), "rate cap reached");
    }

    #[test]
    fn arousal_gate() {
        let triggers = TriggerConditions::default();
        assert!(triggers.check_arousal(0.7));
        assert!(!triggers.check_arousal(0.3));
    }
}
