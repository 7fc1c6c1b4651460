//! Kuramoto oscillator network for fabric-wide phase synchronization.
//!
//! Implements the Kuramoto model over the participant topology:
//!
//! ```text
//! dθᵢ/dt = ωᵢ + (K/|Nᵢ|) Σⱼ∈Nᵢ sin(θⱼ - θᵢ)
//! ```
//!
//! integrated by explicit forward Euler. The order parameter r measures
//! synchronization:
//!
//! ```text
//! r · e^(iψ) = (1/N) Σⱼ e^(iθⱼ)
//! ```
//!
//! When r → 1 all phases are aligned; when r → 0 they are uniformly
//! distributed. Synchronization at or above [`CONSCIOUS_COHERENCE_MIN`]
//! counts as a successful ignition sync.
//!
//! One network instance belongs to exactly one in-flight ignition event;
//! concurrent events each build their own instance over their participant
//! set, so no phase state is ever shared between attempts.

use std::collections::HashMap;
use std::f64::consts::TAU;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use phase_fabric_core::NodeId;

/// Coherence at or above this level counts as synchronized.
pub const CONSCIOUS_COHERENCE_MIN: f64 = 0.50;

/// Golden-ratio conjugate; spreads lazily created phases evenly without a
/// shared counter.
const PHASE_SPREAD: f64 = 0.618_033_988_749_894_9;

/// Arc over which initial phases are spread. Three quarters of the circle
/// leaves the network clearly incoherent (r ≈ 0.3) while keeping the
/// locking transient inside the bounded synchronization window.
const PHASE_ARC: f64 = 0.75 * TAU;

/// Oscillator parameters shared by a network instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OscillatorConfig {
    /// Global coupling strength K
    pub coupling_strength: f64,
    /// Base natural frequency in Hz
    pub natural_frequency_hz: f64,
    /// Relative per-oscillator frequency spread
    pub frequency_spread: f64,
}

impl Default for OscillatorConfig {
    fn default() -> Self {
        Self {
            coupling_strength: 60.0,
            natural_frequency_hz: 40.0,
            frequency_spread: 0.02,
        }
    }
}

/// A single phase oscillator bound to one fabric node.
#[derive(Debug, Clone)]
pub struct Oscillator {
    /// Phase θ in [0, 2π)
    pub phase: f64,
    /// Natural frequency ω in radians/second
    pub natural_frequency: f64,
    /// Per-oscillator coupling strength; dissolve halves it
    pub coupling_strength: f64,
}

/// Order-parameter sample at a simulation tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoherenceSample {
    /// Magnitude r of the mean unit-phase vector, in [0, 1]
    pub order_parameter: f64,
    /// Mean phase ψ in [0, 2π)
    pub mean_phase: f64,
}

impl CoherenceSample {
    /// Whether the sample clears the conscious-level threshold.
    #[inline]
    pub fn is_conscious_level(&self) -> bool {
        self.order_parameter >= CONSCIOUS_COHERENCE_MIN
    }
}

/// Outcome of a bounded synchronization run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// Simulated time at which the target was first reached, if it was
    pub time_to_sync: Option<Duration>,
    /// Ticks actually executed
    pub ticks: usize,
    /// Coherence after the final tick
    pub final_coherence: f64,
}

/// Adjacency restricted to one synchronization round's participants.
pub type ParticipantTopology = HashMap<NodeId, Vec<NodeId>>;

/// One oscillator per participating node, created lazily when a node first
/// joins a round.
#[derive(Debug, Clone)]
pub struct OscillatorNetwork {
    oscillators: HashMap<NodeId, Oscillator>,
    config: OscillatorConfig,
}

impl OscillatorNetwork {
    /// Create an empty network with the given parameters.
    pub fn new(config: OscillatorConfig) -> Self {
        Self {
            oscillators: HashMap::new(),
            config,
        }
    }

    /// Add an oscillator for a node if it does not have one yet.
    ///
    /// Initial phases follow a golden-ratio spread so a freshly built
    /// network starts incoherent; natural frequencies fan out around the
    /// configured base by the configured relative spread.
    pub fn add_oscillator(&mut self, id: NodeId) {
        if self.oscillators.contains_key(&id) {
            return;
        }
        let index = self.oscillators.len();
        let phase = (index as f64 * PHASE_SPREAD).fract() * PHASE_ARC;
        let detune = ((index % 7) as f64 / 6.0 - 0.5) * self.config.frequency_spread;
        let natural_frequency = self.config.natural_frequency_hz * (1.0 + detune) * TAU;
        self.oscillators.insert(
            id,
            Oscillator {
                phase,
                natural_frequency,
                coupling_strength: self.config.coupling_strength,
            },
        );
    }

    /// Number of oscillators in the network.
    #[inline]
    pub fn len(&self) -> usize {
        self.oscillators.len()
    }

    /// Whether the network holds no oscillators.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.oscillators.is_empty()
    }

    /// Advance every oscillator by one Euler step of size `dt` seconds.
    ///
    /// Coupling follows the participant topology; a node with no listed
    /// neighbors couples to the global mean field so nothing free-runs.
    pub fn update_network(&mut self, topology: &ParticipantTopology, dt: f64) {
        if self.oscillators.is_empty() {
            return;
        }

        let phases: HashMap<NodeId, f64> = self
            .oscillators
            .iter()
            .map(|(id, osc)| (*id, osc.phase))
            .collect();
        let mean = self.coherence();

        for (id, osc) in self.oscillators.iter_mut() {
            let theta = osc.phase;
            let coupling = match topology.get(id) {
                Some(neighbors) if !neighbors.is_empty() => {
                    let sum: f64 = neighbors
                        .iter()
                        .filter_map(|n| phases.get(n))
                        .map(|&other| (other - theta).sin())
                        .sum();
                    osc.coupling_strength / neighbors.len() as f64 * sum
                }
                _ => {
                    osc.coupling_strength
                        * mean.order_parameter
                        * (mean.mean_phase - theta).sin()
                }
            };
            let derivative = osc.natural_frequency + coupling;
            osc.phase = (theta + derivative * dt).rem_euclid(TAU);
        }
    }

    /// Current order parameter (r, ψ) over all oscillators.
    pub fn coherence(&self) -> CoherenceSample {
        let n = self.oscillators.len();
        if n == 0 {
            return CoherenceSample {
                order_parameter: 0.0,
                mean_phase: 0.0,
            };
        }
        let mut sum_cos = 0.0;
        let mut sum_sin = 0.0;
        for osc in self.oscillators.values() {
            sum_cos += osc.phase.cos();
            sum_sin += osc.phase.sin();
        }
        let avg_cos = sum_cos / n as f64;
        let avg_sin = sum_sin / n as f64;
        // min() guards the [0, 1] contract against float error at perfect
        // alignment.
        CoherenceSample {
            order_parameter: (avg_cos * avg_cos + avg_sin * avg_sin).sqrt().min(1.0),
            mean_phase: avg_sin.atan2(avg_cos).rem_euclid(TAU),
        }
    }

    /// Run ticks of size `dt` seconds until the duration elapses or the
    /// coherence reaches `target`, recording the first simulated instant at
    /// which the target was reached.
    ///
    /// Each tick yields for `dt` of wall-clock time, making the simulated
    /// window wall-clock-equivalent.
    pub async fn synchronize(
        &mut self,
        topology: &ParticipantTopology,
        duration_ms: f64,
        target_coherence: f64,
        dt: f64,
    ) -> SyncOutcome {
        let tick = Duration::from_secs_f64(dt);
        let max_ticks = (duration_ms / (dt * 1_000.0)).ceil().max(1.0) as usize;
        let mut time_to_sync = None;
        let mut ticks = 0usize;
        let mut coherence = self.coherence().order_parameter;

        for index in 0..max_ticks {
            self.update_network(topology, dt);
            ticks = index + 1;
            coherence = self.coherence().order_parameter;
            if coherence >= target_coherence {
                time_to_sync = Some(tick * ticks as u32);
                break;
            }
            tokio::time::sleep(tick).await;
        }

        tracing::debug!(
            ticks,
            coherence = format!("{:.3}", coherence),
            synced = time_to_sync.is_some(),
            "synchronization window finished"
        );
        SyncOutcome {
            time_to_sync,
            ticks,
            final_coherence: coherence,
        }
    }

    /// Halve every oscillator's coupling strength (dissolve ramp-down).
    pub fn halve_coupling(&mut self) {
        for osc in self.oscillators.values_mut() {
            osc.coupling_strength *= 0.5;
        }
    }

    /// Re-spread all phases, returning the network to an incoherent state.
    pub fn reset_all(&mut self) {
        for (index, osc) in self.oscillators.values_mut().enumerate() {
            osc.phase = (index as f64 * PHASE_SPREAD).fract() * PHASE_ARC;
        }
    }

    /// Current phases keyed by node, for inspection.
    pub fn phases(&self) -> HashMap<NodeId, f64> {
        self.oscillators
            .iter()
            .map(|(id, osc)| (*id, osc.phase))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_topology(n: u32) -> ParticipantTopology {
        (0..n)
            .map(|i| {
                let neighbors = (0..n).filter(|&j| j != i).map(NodeId).collect();
                (NodeId(i), neighbors)
            })
            .collect()
    }

    fn network_of(n: u32) -> OscillatorNetwork {
        let mut network = OscillatorNetwork::new(OscillatorConfig::default());
        for i in 0..n {
            network.add_oscillator(NodeId(i));
        }
        network
    }

    #[test]
    fn oscillators_are_created_lazily_and_once() {
        let mut network = OscillatorNetwork::new(OscillatorConfig::default());
        assert!(network.is_empty());

        network.add_oscillator(NodeId(1));
        network.add_oscillator(NodeId(1));
        network.add_oscillator(NodeId(2));
        assert_eq!(network.len(), 2);
    }

    #[test]
    fn coherence_stays_in_unit_interval_across_ticks() {
        let mut network = network_of(8);
        let topology = full_topology(8);
        for _ in 0..500 {
            network.update_network(&topology, 0.005);
            let r = network.coherence().order_parameter;
            assert!((0.0..=1.0).contains(&r), "r out of bounds: {}", r);
        }
    }

    #[test]
    fn empty_network_reports_zero_coherence() {
        let network = OscillatorNetwork::new(OscillatorConfig::default());
        assert_eq!(network.coherence().order_parameter, 0.0);
    }

    #[test]
    fn strong_coupling_synchronizes() {
        let mut network = network_of(12);
        let topology = full_topology(12);

        let initial = network.coherence().order_parameter;
        for _ in 0..200 {
            network.update_network(&topology, 0.005);
        }
        let synced = network.coherence().order_parameter;
        assert!(
            synced >= CONSCIOUS_COHERENCE_MIN,
            "strong coupling must sync: {} -> {}",
            initial,
            synced
        );
    }

    #[test]
    fn weak_coupling_stays_incoherent() {
        let mut network = OscillatorNetwork::new(OscillatorConfig {
            coupling_strength: 0.0,
            ..Default::default()
        });
        for i in 0..12 {
            network.add_oscillator(NodeId(i));
        }
        let topology = full_topology(12);
        for _ in 0..200 {
            network.update_network(&topology, 0.005);
        }
        let r = network.coherence().order_parameter;
        assert!(r < 0.9, "uncoupled oscillators must not lock, r = {}", r);
    }

    #[tokio::test]
    async fn synchronize_records_time_to_sync() {
        let mut network = network_of(10);
        let topology = full_topology(10);

        let outcome = network.synchronize(&topology, 300.0, 0.70, 0.005).await;
        assert!(
            outcome.time_to_sync.is_some(),
            "target must be reached, final r = {}",
            outcome.final_coherence
        );
        assert!(outcome.final_coherence >= 0.70);
        assert!(outcome.ticks <= 60);
    }

    #[tokio::test]
    async fn synchronize_gives_up_at_duration() {
        let mut network = OscillatorNetwork::new(OscillatorConfig {
            coupling_strength: 0.05,
            ..Default::default()
        });
        for i in 0..10 {
            network.add_oscillator(NodeId(i));
        }
        let topology = full_topology(10);

        let outcome = network.synchronize(&topology, 50.0, 0.99, 0.005).await;
        assert!(outcome.time_to_sync.is_none());
        assert_eq!(outcome.ticks, 10);
    }

    #[test]
    fn reset_respreads_phases() {
        let mut network = network_of(8);
        let topology = full_topology(8);
        for _ in 0..200 {
            network.update_network(&topology, 0.005);
        }
        assert!(network.coherence().order_parameter > 0.5);

        network.reset_all();
        assert!(
            network.coherence().order_parameter < 0.5,
            "reset must leave the network incoherent"
        );
    }

    #[test]
    fn halve_coupling_halves_every_oscillator() {
        let mut network = network_of(4);
        let before: Vec<f64> = network
            .oscillators
            .values()
            .map(|o| o.coupling_strength)
            .collect();
        network.halve_coupling();
        for (osc, old) in network.oscillators.values().zip(before) {
            assert!((osc.coupling_strength - old / 2.0).abs() < 1e-12);
        }
    }

    #[test]
    fn isolated_node_couples_to_mean_field() {
        let mut network = network_of(6);
        // Topology that omits node 5 entirely.
        let mut topology = full_topology(6);
        topology.remove(&NodeId(5));

        for _ in 0..400 {
            network.update_network(&topology, 0.005);
        }
        let r = network.coherence().order_parameter;
        assert!(
            r >= CONSCIOUS_COHERENCE_MIN,
            "mean-field fallback must still pull the stray oscillator in, r = {}",
            r
        );
    }
}
