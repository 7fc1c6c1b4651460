//! The ignition coordinator.
//!
//! Runs the five-phase ignition protocol (Prepare → Synchronize →
//! Broadcast → Sustain → Dissolve) under layered safety gating. The gate
//! order is fixed and evaluated before an event is even constructed:
//!
//! 1. frequency limiter,
//! 2. concurrency cap (checked and reserved atomically),
//! 3. ignition circuit breaker,
//! 4. degraded-mode salience bar.
//!
//! Admission rejections return a synthetic failed event that is never
//! recorded or counted. Everything after admission is data too: trigger and
//! protocol failures finalize a recorded Failed event and the coordinator
//! keeps running. A single ignition failure never propagates as an error.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use phase_fabric_core::{BreakerState, CircuitBreaker, Fabric, NodeId};

use crate::error::{IgnitionError, IgnitionResult};
use crate::event::{IgnitionEvent, IgnitionPhase};
use crate::hooks::{ContentEnricher, IgnitionSignal, ObserverRegistry};
use crate::limiter::FrequencyLimiter;
use crate::oscillator::{OscillatorConfig, OscillatorNetwork, ParticipantTopology};
use crate::salience::SalienceScore;
use crate::triggers::TriggerConditions;

/// Hard cap on ignition attempts per second.
pub const MAX_FREQUENCY_HZ: f64 = 10.0;

/// Concurrent in-flight events allowed in normal operation.
pub const MAX_CONCURRENT_EVENTS: usize = 3;

/// Concurrent in-flight events allowed in degraded mode.
const DEGRADED_MAX_CONCURRENT: usize = 1;

/// Total-salience floor enforced while degraded.
pub const DEGRADED_SALIENCE_MIN: f64 = 0.85;

/// Most-recent events retained in history.
const EVENT_HISTORY_CAP: usize = 100;

/// Rolling window of achieved-coherence samples.
const COHERENCE_WINDOW: usize = 10;

/// Admission timestamps retained for rate accounting.
const ADMISSION_WINDOW_CAP: usize = 100;

/// Synchronize-phase window, milliseconds.
const SYNC_WINDOW_MS: f64 = 300.0;

/// Simulation tick, seconds.
const SYNC_DT_S: f64 = 0.005;

/// Dissolve-phase ticks (50 ms at the simulation tick).
const DISSOLVE_TICKS: usize = 10;

/// Priority used for ignition content broadcasts.
const BROADCAST_PRIORITY: u8 = 10;

/// Simulated CPU capacity fed to the resource gate.
const SIMULATED_CPU_CAPACITY: f64 = 0.60;

/// Default arousal level until the external controller supplies one.
const DEFAULT_AROUSAL: f64 = 0.70;

/// Breaker defaults for the ignition path.
const BREAKER_FAILURE_THRESHOLD: u32 = 5;
const BREAKER_RECOVERY: Duration = Duration::from_secs(10);

/// Admission rejection reason: attempt rate exceeded.
pub const REASON_FREQUENCY_LIMIT: &str = "frequency_limit_exceeded";
/// Admission rejection reason: concurrency cap reached.
pub const REASON_MAX_CONCURRENT: &str = "max_concurrent_events";
/// Admission rejection reason: ignition breaker open.
pub const REASON_BREAKER_OPEN: &str = "circuit_breaker_open";
/// Admission rejection reason: degraded mode with insufficient salience.
pub const REASON_DEGRADED_SALIENCE: &str = "degraded_mode_low_salience";

/// Aggregate coordinator health for safety integration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorHealth {
    /// Admitted attempts inside the trailing second
    pub frequency_hz: usize,
    /// Events currently in flight
    pub active_events: usize,
    /// Whether degraded mode is active
    pub degraded_mode: bool,
    /// Mean achieved coherence over the rolling window
    pub average_coherence: f64,
    /// Ignition breaker state
    pub breaker_state: BreakerState,
    /// Attempts counted past the admission gates
    pub total_attempts: u64,
    /// Successfully completed events
    pub successful_events: u64,
}

/// Coordinates ignition events over a fabric.
///
/// Each in-flight event owns its own [`OscillatorNetwork`] built over its
/// participant set, so concurrent attempts never share phase state.
pub struct Coordinator {
    id: String,
    fabric: Arc<Fabric>,
    triggers: RwLock<TriggerConditions>,
    oscillator_config: OscillatorConfig,

    active_events: parking_lot::Mutex<HashSet<String>>,
    history: RwLock<VecDeque<IgnitionEvent>>,
    admissions: parking_lot::Mutex<VecDeque<Instant>>,
    last_ignition: parking_lot::Mutex<Option<Instant>>,
    coherence_window: parking_lot::Mutex<VecDeque<f64>>,

    total_attempts: AtomicU64,
    successful_events: AtomicU64,
    degraded: AtomicBool,
    max_concurrent: AtomicUsize,
    running: AtomicBool,

    limiter: FrequencyLimiter,
    breaker: parking_lot::Mutex<CircuitBreaker>,
    arousal: parking_lot::Mutex<f64>,

    enricher: Option<Arc<dyn ContentEnricher>>,
    observers: ObserverRegistry,
}

impl Coordinator {
    /// Create a coordinator over a fabric.
    pub fn new(
        fabric: Arc<Fabric>,
        triggers: TriggerConditions,
        oscillator_config: OscillatorConfig,
    ) -> Self {
        Self {
            id: "ignition-coordinator".to_string(),
            fabric,
            triggers: RwLock::new(triggers),
            oscillator_config,
            active_events: parking_lot::Mutex::new(HashSet::new()),
            history: RwLock::new(VecDeque::new()),
            admissions: parking_lot::Mutex::new(VecDeque::new()),
            last_ignition: parking_lot::Mutex::new(None),
            coherence_window: parking_lot::Mutex::new(VecDeque::new()),
            total_attempts: AtomicU64::new(0),
            successful_events: AtomicU64::new(0),
            degraded: AtomicBool::new(false),
            max_concurrent: AtomicUsize::new(MAX_CONCURRENT_EVENTS),
            running: AtomicBool::new(false),
            limiter: FrequencyLimiter::new(MAX_FREQUENCY_HZ),
            breaker: parking_lot::Mutex::new(CircuitBreaker::new(
                BREAKER_FAILURE_THRESHOLD,
                BREAKER_RECOVERY,
            )),
            arousal: parking_lot::Mutex::new(DEFAULT_AROUSAL),
            enricher: None,
            observers: ObserverRegistry::new(),
        }
    }

    /// Attach a content-enrichment hook for the Broadcast phase.
    pub fn with_enricher(mut self, enricher: Arc<dyn ContentEnricher>) -> Self {
        self.enricher = Some(enricher);
        self
    }

    /// Override the ignition breaker parameters.
    pub fn with_breaker(self, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        *self.breaker.lock() = CircuitBreaker::new(failure_threshold, recovery_timeout);
        self
    }

    /// Observer registry for the presentation layer to subscribe to.
    pub fn observers(&self) -> &ObserverRegistry {
        &self.observers
    }

    /// Mark the coordinator as running.
    pub fn start(&self) {
        if !self.running.swap(true, Ordering::SeqCst) {
            tracing::info!(coordinator = %self.id, "coordinator started");
        }
    }

    /// Mark the coordinator as stopped and drop in-flight bookkeeping.
    pub fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.active_events.lock().clear();
            tracing::info!(coordinator = %self.id, "coordinator stopped");
        }
    }

    /// Whether the coordinator accepts ignition requests.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Replace the trigger conditions as a whole value.
    pub async fn set_triggers(&self, triggers: TriggerConditions) {
        *self.triggers.write().await = triggers;
    }

    /// Supply the external arousal signal, clamped to [0, 1].
    pub fn set_arousal(&self, level: f64) {
        *self.arousal.lock() = level.clamp(0.0, 1.0);
    }

    /// Enter degraded mode: concurrency cap drops to 1 and the effective
    /// salience bar rises.
    pub async fn enter_degraded_mode(&self) {
        if !self.degraded.swap(true, Ordering::SeqCst) {
            self.max_concurrent
                .store(DEGRADED_MAX_CONCURRENT, Ordering::SeqCst);
            tracing::warn!("entering degraded mode: reducing ignition rate");
            self.observers
                .broadcast(IgnitionSignal::DegradedEntered {
                    timestamp: Utc::now(),
                })
                .await;
        }
    }

    /// Exit degraded mode, restoring normal admission limits.
    pub async fn exit_degraded_mode(&self) {
        if self.degraded.swap(false, Ordering::SeqCst) {
            self.max_concurrent
                .store(MAX_CONCURRENT_EVENTS, Ordering::SeqCst);
            tracing::info!("exiting degraded mode: normal operation restored");
            self.observers
                .broadcast(IgnitionSignal::DegradedExited {
                    timestamp: Utc::now(),
                })
                .await;
        }
    }

    /// Whether degraded mode is active.
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::SeqCst)
    }

    /// Initiate a transient fabric-wide synchronization event.
    ///
    /// Always returns an [`IgnitionEvent`] describing the outcome; the only
    /// `Err` is the misuse of calling before [`start`](Self::start).
    pub async fn initiate_esgt(
        &self,
        salience: SalienceScore,
        content: serde_json::Value,
        content_source: &str,
        target_duration_ms: f64,
        target_coherence: f64,
    ) -> IgnitionResult<IgnitionEvent> {
        if !self.is_running() {
            return Err(IgnitionError::NotRunning);
        }

        // Gate 1: frequency limiter.
        if !self.limiter.allow() {
            tracing::warn!("ignition blocked by frequency limiter");
            return Ok(IgnitionEvent::blocked(
                content_source,
                target_coherence,
                REASON_FREQUENCY_LIMIT,
            ));
        }

        // Gates 2-4 run under the active-set lock so the concurrency check
        // and the slot reservation are atomic.
        let mut event = {
            let mut active = self.active_events.lock();

            let cap = self.max_concurrent.load(Ordering::SeqCst);
            if active.len() >= cap {
                tracing::warn!(in_flight = active.len(), cap, "ignition blocked by concurrency cap");
                return Ok(IgnitionEvent::blocked(
                    content_source,
                    target_coherence,
                    REASON_MAX_CONCURRENT,
                ));
            }

            {
                let mut breaker = self.breaker.lock();
                if !breaker.check_admission() {
                    tracing::warn!("ignition blocked by circuit breaker");
                    return Ok(IgnitionEvent::blocked(
                        content_source,
                        target_coherence,
                        REASON_BREAKER_OPEN,
                    ));
                }

                if self.degraded.load(Ordering::SeqCst)
                    && salience.total() < DEGRADED_SALIENCE_MIN
                {
                    breaker.abandon_trial();
                    tracing::warn!(
                        salience = format!("{:.2}", salience.total()),
                        "ignition blocked: low salience in degraded mode"
                    );
                    return Ok(IgnitionEvent::blocked(
                        content_source,
                        target_coherence,
                        REASON_DEGRADED_SALIENCE,
                    ));
                }
            }

            let event = IgnitionEvent::new(
                content,
                content_source,
                target_coherence,
                target_duration_ms,
            );
            active.insert(event.id.clone());
            event
        };

        self.total_attempts.fetch_add(1, Ordering::SeqCst);
        {
            let mut admissions = self.admissions.lock();
            admissions.push_back(Instant::now());
            while admissions.len() > ADMISSION_WINDOW_CAP {
                admissions.pop_front();
            }
        }
        self.observers
            .broadcast(IgnitionSignal::Admitted {
                event_id: event.id.clone(),
                timestamp: Utc::now(),
            })
            .await;

        if let Err(reason) = self.check_triggers(&salience).await {
            event.transition(IgnitionPhase::Failed);
            return Ok(self.finalize_recorded(event, false, Some(reason)).await);
        }

        match self.run_phases(&mut event).await {
            Ok(()) => Ok(self.finalize_recorded(event, true, None).await),
            Err(reason) => {
                event.transition(IgnitionPhase::Failed);
                Ok(self.finalize_recorded(event, false, Some(reason)).await)
            }
        }
    }

    /// Validate trigger conditions; the returned string is the recorded
    /// failure reason.
    async fn check_triggers(&self, salience: &SalienceScore) -> Result<(), String> {
        let triggers = self.triggers.read().await.clone();

        if !triggers.check_salience(salience) {
            return Err(format!(
                "salience too low ({:.2} < {:.2})",
                salience.total(),
                triggers.min_salience
            ));
        }

        let latency_ms = self
            .fabric
            .metrics()
            .await
            .map(|m| m.avg_latency_us / 1_000.0)
            .unwrap_or(f64::MAX);
        let available = self.fabric.available_nodes().await.len();
        if !triggers.check_resources(latency_ms, available, SIMULATED_CPU_CAPACITY) {
            return Err(format!(
                "insufficient resources (nodes={}, latency={:.3}ms)",
                available, latency_ms
            ));
        }

        let last_ignition = *self.last_ignition.lock();
        let elapsed_ms = last_ignition.map(|t| t.elapsed().as_secs_f64() * 1_000.0);
        let recent = self.recent_event_count(Duration::from_secs(1)).await;
        if !triggers.check_temporal(elapsed_ms, recent) {
            return Err(match elapsed_ms {
                Some(elapsed) if elapsed < triggers.refractory_period_ms => format!(
                    "refractory period violation ({:.1}ms < {:.1}ms)",
                    elapsed, triggers.refractory_period_ms
                ),
                _ => format!("ignition rate too high ({} events in the last second)", recent),
            });
        }

        let arousal = *self.arousal.lock();
        if !triggers.check_arousal(arousal) {
            return Err(format!(
                "arousal too low ({:.2} < {:.2})",
                arousal, triggers.min_arousal
            ));
        }

        Ok(())
    }

    /// Execute the protocol phases. Returns the failure reason on any
    /// non-success outcome; ignition mode is always exited on failure paths
    /// that entered it.
    async fn run_phases(&self, event: &mut IgnitionEvent) -> Result<(), String> {
        // PREPARE: recruit every currently available node.
        event.transition(IgnitionPhase::Prepare);
        self.emit_phase(event).await;
        let prepare_start = Instant::now();

        let participants: HashSet<NodeId> =
            self.fabric.available_nodes().await.into_iter().collect();
        event.participants = participants.clone();
        event.prepare_latency_ms = Some(elapsed_ms(prepare_start));

        let min_nodes = self.triggers.read().await.min_available_nodes;
        if participants.len() < min_nodes {
            return Err(format!(
                "insufficient nodes recruited ({} < {})",
                participants.len(),
                min_nodes
            ));
        }

        // SYNCHRONIZE: a fresh oscillator network over the participant set.
        event.transition(IgnitionPhase::Synchronize);
        self.emit_phase(event).await;
        let sync_start = Instant::now();

        let topology = self.participant_topology(&participants).await;
        let mut network = OscillatorNetwork::new(self.oscillator_config.clone());
        for id in &participants {
            network.add_oscillator(*id);
        }

        let outcome = network
            .synchronize(&topology, SYNC_WINDOW_MS, event.target_coherence, SYNC_DT_S)
            .await;
        event.sync_latency_ms = Some(elapsed_ms(sync_start));
        event.time_to_sync_ms = outcome
            .time_to_sync
            .map(|d| d.as_secs_f64() * 1_000.0);

        let sample = network.coherence();
        event.achieved_coherence = sample.order_parameter;
        if !sample.is_conscious_level() {
            return Err(format!(
                "synchronization below conscious level (coherence={:.3})",
                sample.order_parameter
            ));
        }

        // BROADCAST onward; once ignition mode is entered, any failure must
        // exit it before surfacing.
        event.transition(IgnitionPhase::Broadcast);
        self.emit_phase(event).await;
        let broadcast_start = Instant::now();

        self.fabric
            .enter_ignition_mode()
            .await
            .map_err(|e| e.to_string())?;

        if let Err(reason) = self
            .broadcast_sustain_dissolve(event, &mut network, &topology, broadcast_start)
            .await
        {
            if let Err(e) = self.fabric.exit_ignition_mode().await {
                tracing::error!(error = %e, "failed to restore fabric mode after ignition failure");
            }
            return Err(reason);
        }
        Ok(())
    }

    /// Broadcast, Sustain and Dissolve; the fabric is in ignition mode for
    /// the whole span and restored by Dissolve on success.
    async fn broadcast_sustain_dissolve(
        &self,
        event: &mut IgnitionEvent,
        network: &mut OscillatorNetwork,
        topology: &ParticipantTopology,
        broadcast_start: Instant,
    ) -> Result<(), String> {
        if let Some(enricher) = &self.enricher {
            if let Some(extra) = enricher.enrich(&event.content).await {
                match &mut event.content {
                    serde_json::Value::Object(map) => {
                        map.insert("enrichment".to_string(), extra);
                    }
                    other => {
                        *other = serde_json::json!({
                            "content": other.clone(),
                            "enrichment": extra,
                        });
                    }
                }
            }
        }

        let coherence = network.coherence().order_parameter;
        let message = serde_json::json!({
            "type": "ignition_content",
            "event_id": event.id,
            "content": event.content,
            "coherence": coherence,
            "timestamp": event.started_at.to_rfc3339(),
        });
        let reached = self
            .fabric
            .broadcast_global(message, BROADCAST_PRIORITY)
            .await
            .map_err(|e| e.to_string())?;
        event.broadcast_latency_ms = Some(elapsed_ms(broadcast_start));
        tracing::debug!(event = %event.id, reached, "ignition content broadcast");

        // SUSTAIN: tick and sample for the requested window.
        event.transition(IgnitionPhase::Sustain);
        self.emit_phase(event).await;

        let tick = Duration::from_secs_f64(SYNC_DT_S);
        let sustain_window = Duration::from_secs_f64(event.target_duration_ms.max(0.0) / 1_000.0);
        let sustain_start = Instant::now();
        while sustain_start.elapsed() < sustain_window {
            network.update_network(topology, SYNC_DT_S);
            event
                .coherence_history
                .push(network.coherence().order_parameter);
            tokio::time::sleep(tick).await;
        }

        // DISSOLVE: halve coupling, ramp down, reset phases, restore mode.
        event.transition(IgnitionPhase::Dissolve);
        self.emit_phase(event).await;

        network.halve_coupling();
        for _ in 0..DISSOLVE_TICKS {
            network.update_network(topology, SYNC_DT_S);
            tokio::time::sleep(tick).await;
        }
        network.reset_all();

        self.fabric
            .exit_ignition_mode()
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Finalize an admitted event: terminal transition, breaker and counter
    /// bookkeeping, bounded history append, active-slot release.
    async fn finalize_recorded(
        &self,
        mut event: IgnitionEvent,
        success: bool,
        reason: Option<String>,
    ) -> IgnitionEvent {
        if success {
            let peak = event
                .coherence_history
                .iter()
                .copied()
                .fold(None::<f64>, |acc, v| Some(acc.map_or(v, |a| a.max(v))));
            if let Some(peak) = peak {
                event.achieved_coherence = peak;
            }
            event.transition(IgnitionPhase::Complete);
        }
        event.finalize(success, reason.clone());

        {
            let mut breaker = self.breaker.lock();
            if success {
                breaker.record_success();
            } else {
                breaker.record_failure();
            }
        }

        if success {
            self.successful_events.fetch_add(1, Ordering::SeqCst);
            *self.last_ignition.lock() = Some(Instant::now());
            let mut window = self.coherence_window.lock();
            window.push_back(event.achieved_coherence);
            while window.len() > COHERENCE_WINDOW {
                window.pop_front();
            }
        }

        {
            let mut history = self.history.write().await;
            history.push_back(event.clone());
            while history.len() > EVENT_HISTORY_CAP {
                history.pop_front();
            }
        }

        self.active_events.lock().remove(&event.id);

        if success {
            tracing::info!(
                event = %event.id,
                coherence = format!("{:.3}", event.achieved_coherence),
                duration_ms = format!("{:.1}", event.total_duration_ms().unwrap_or(0.0)),
                nodes = event.node_count(),
                "ignition complete"
            );
            self.observers
                .broadcast(IgnitionSignal::Completed {
                    event_id: event.id.clone(),
                    achieved_coherence: event.achieved_coherence,
                    timestamp: Utc::now(),
                })
                .await;
        } else {
            let reason = reason.unwrap_or_else(|| "unknown".to_string());
            tracing::warn!(event = %event.id, reason = %reason, "ignition failed");
            self.observers
                .broadcast(IgnitionSignal::Failed {
                    event_id: event.id.clone(),
                    reason,
                    timestamp: Utc::now(),
                })
                .await;
        }

        event
    }

    async fn emit_phase(&self, event: &IgnitionEvent) {
        if let Some(phase) = event.phase {
            self.observers
                .broadcast(IgnitionSignal::PhaseChanged {
                    event_id: event.id.clone(),
                    phase,
                    timestamp: Utc::now(),
                })
                .await;
        }
    }

    /// Participant-to-participant adjacency over active links.
    async fn participant_topology(
        &self,
        participants: &HashSet<NodeId>,
    ) -> ParticipantTopology {
        let adjacency = self.fabric.active_adjacency().await;
        participants
            .iter()
            .map(|id| {
                let neighbors = adjacency
                    .get(id)
                    .map(|all| {
                        all.iter()
                            .copied()
                            .filter(|remote| participants.contains(remote))
                            .collect()
                    })
                    .unwrap_or_default();
                (*id, neighbors)
            })
            .collect()
    }

    /// Recorded events inside the window, bounded to the last ten.
    async fn recent_event_count(&self, window: Duration) -> usize {
        let history = self.history.read().await;
        history
            .iter()
            .rev()
            .take(10)
            .filter(|event| {
                event
                    .started_instant
                    .map(|t| t.elapsed() < window)
                    .unwrap_or(false)
            })
            .count()
    }

    /// Fraction of admitted attempts that completed successfully.
    pub fn success_rate(&self) -> f64 {
        let total = self.total_attempts.load(Ordering::SeqCst);
        if total == 0 {
            return 0.0;
        }
        self.successful_events.load(Ordering::SeqCst) as f64 / total as f64
    }

    /// Mean achieved coherence of the last `window` successful events.
    pub async fn recent_coherence(&self, window: usize) -> f64 {
        let history = self.history.read().await;
        let values: Vec<f64> = history
            .iter()
            .rev()
            .take(window)
            .filter(|e| e.was_successful())
            .map(|e| e.achieved_coherence)
            .collect();
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    /// Snapshot of the recorded event history, oldest first.
    pub async fn event_history(&self) -> Vec<IgnitionEvent> {
        self.history.read().await.iter().cloned().collect()
    }

    /// Events currently in flight.
    pub fn active_event_count(&self) -> usize {
        self.active_events.lock().len()
    }

    /// Aggregate health picture for safety integration.
    pub fn health_snapshot(&self) -> CoordinatorHealth {
        let frequency_hz = {
            let admissions = self.admissions.lock();
            admissions
                .iter()
                .filter(|t| t.elapsed() < Duration::from_secs(1))
                .count()
        };
        let average_coherence = {
            let window = self.coherence_window.lock();
            if window.is_empty() {
                0.0
            } else {
                window.iter().sum::<f64>() / window.len() as f64
            }
        };
        CoordinatorHealth {
            frequency_hz,
            active_events: self.active_event_count(),
            degraded_mode: self.is_degraded(),
            average_coherence,
            breaker_state: self.breaker.lock().state(),
            total_attempts: self.total_attempts.load(Ordering::SeqCst),
            successful_events: self.successful_events.load(Ordering::SeqCst),
        }
    }

    /// One-line diagnostic summary.
    pub fn describe(&self) -> String {
        format!(
            "Coordinator(id={}, attempts={}, success_rate={:.1}%, running={})",
            self.id,
            self.total_attempts.load(Ordering::SeqCst),
            self.success_rate() * 100.0,
            self.is_running()
        )
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("id", &self.id)
            .field("running", &self.is_running())
            .field("degraded", &self.is_degraded())
            .field("active_events", &self.active_event_count())
            .finish()
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1_000.0
}
