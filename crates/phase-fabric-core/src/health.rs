//! Health monitoring and circuit breaking.
//!
//! The [`HealthManager`] runs a periodic probe loop over the node arena and
//! wraps node messaging in a wall-clock timeout plus a [`CircuitBreaker`].
//! The probe loop is an explicit, named, cancellable worker: `Arc<Notify>`
//! shutdown signal, an atomic running flag, and a `JoinHandle` joined with a
//! bounded grace period on stop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::config::HealthConfig;
use crate::fabric::FabricState;
use crate::node::NodeId;

/// Grace period for joining the probe worker on shutdown.
const STOP_GRACE: Duration = Duration::from_secs(2);

/// Breaker state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Calls flow normally; failures accumulate
    Closed,
    /// Calls fail fast until the recovery timeout elapses
    Open,
    /// One trial call is in flight; its outcome decides the next state
    HalfOpen,
}

/// Closed/Open/HalfOpen breaker with a single-trial half-open discipline.
///
/// - `Closed`: every failure increments the consecutive counter; reaching
///   the threshold opens the breaker.
/// - `Open`: admission is refused until the recovery timeout elapses, at
///   which point exactly one trial call is admitted (`HalfOpen`).
/// - `HalfOpen`: trial success closes the breaker and resets the counter;
///   trial failure reopens it and restarts the timeout.
#[derive(Debug)]
pub struct CircuitBreaker {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    trial_in_flight: bool,
    failure_threshold: u32,
    recovery_timeout: Duration,
}

impl CircuitBreaker {
    /// Create a closed breaker.
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            trial_in_flight: false,
            failure_threshold: failure_threshold.max(1),
            recovery_timeout,
        }
    }

    /// Whether a call may proceed right now.
    ///
    /// Transitions `Open → HalfOpen` once the recovery timeout has elapsed
    /// and hands out the single trial slot. Callers that are admitted MUST
    /// eventually report [`record_success`](Self::record_success) or
    /// [`record_failure`](Self::record_failure), or release the slot with
    /// [`abandon_trial`](Self::abandon_trial) if the call never happened.
    pub fn check_admission(&mut self) -> bool {
        match self.state {
            BreakerState::Closed => true,
            BreakerState::Open => {
                let elapsed = self
                    .opened_at
                    .map(|t| t.elapsed() >= self.recovery_timeout)
                    .unwrap_or(true);
                if elapsed {
                    self.state = BreakerState::HalfOpen;
                    self.trial_in_flight = true;
                    tracing::debug!("circuit breaker half-open, admitting trial call");
                    true
                } else {
                    false
                }
            }
            BreakerState::HalfOpen => {
                if self.trial_in_flight {
                    false
                } else {
                    self.trial_in_flight = true;
                    true
                }
            }
        }
    }

    /// Release an admitted trial slot without an outcome.
    ///
    /// Used when an attempt was admitted through the breaker but rejected by
    /// a later gate, so the call it would have guarded never ran.
    pub fn abandon_trial(&mut self) {
        if self.state == BreakerState::HalfOpen {
            self.trial_in_flight = false;
        }
    }

    /// Record a successful call: closes the breaker and resets the counter.
    pub fn record_success(&mut self) {
        if self.state != BreakerState::Closed {
            tracing::info!("circuit breaker closed after successful call");
        }
        self.state = BreakerState::Closed;
        self.consecutive_failures = 0;
        self.opened_at = None;
        self.trial_in_flight = false;
    }

    /// Record a failed call.
    pub fn record_failure(&mut self) {
        match self.state {
            BreakerState::HalfOpen => {
                self.state = BreakerState::Open;
                self.opened_at = Some(Instant::now());
                self.trial_in_flight = false;
                tracing::warn!("circuit breaker reopened after failed trial");
            }
            BreakerState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.failure_threshold {
                    self.state = BreakerState::Open;
                    self.opened_at = Some(Instant::now());
                    tracing::warn!(
                        failures = self.consecutive_failures,
                        "circuit breaker opened"
                    );
                }
            }
            BreakerState::Open => {
                // Late failure report while already open; keep the clock.
                self.consecutive_failures += 1;
            }
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> BreakerState {
        self.state
    }

    /// Consecutive failures recorded since the last success.
    #[inline]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// Aggregate health picture exposed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSnapshot {
    /// Messaging breaker state
    pub breaker_state: BreakerState,
    /// Consecutive messaging failures since the last success
    pub consecutive_failures: u32,
    /// Nodes the last probe round saw as reachable
    pub reachable_nodes: usize,
    /// Nodes covered by the last probe round
    pub total_nodes: usize,
    /// Completed probe rounds
    pub probe_rounds: u64,
    /// Total failed or timed-out sends
    pub failed_sends: u64,
    /// Whether the probe worker is running
    pub monitoring: bool,
}

/// Periodic node prober plus breaker-guarded node messaging.
pub struct HealthManager {
    state: Arc<tokio::sync::RwLock<FabricState>>,
    config: HealthConfig,
    breaker: parking_lot::Mutex<CircuitBreaker>,
    reachability: Arc<parking_lot::RwLock<HashMap<NodeId, bool>>>,
    probe_rounds: Arc<AtomicU64>,
    failed_sends: AtomicU64,
    shutdown: parking_lot::Mutex<Arc<Notify>>,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    running: Arc<AtomicBool>,
}

impl HealthManager {
    /// Create a manager over the shared node arena. Monitoring does not
    /// start until [`start_monitoring`](Self::start_monitoring).
    pub(crate) fn new(state: Arc<tokio::sync::RwLock<FabricState>>, config: HealthConfig) -> Self {
        let breaker = CircuitBreaker::new(
            config.failure_threshold,
            Duration::from_millis(config.recovery_timeout_ms),
        );
        Self {
            state,
            config,
            breaker: parking_lot::Mutex::new(breaker),
            reachability: Arc::new(parking_lot::RwLock::new(HashMap::new())),
            probe_rounds: Arc::new(AtomicU64::new(0)),
            failed_sends: AtomicU64::new(0),
            shutdown: parking_lot::Mutex::new(Arc::new(Notify::new())),
            task: tokio::sync::Mutex::new(None),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the probe worker. Calling while already running is a logged
    /// no-op.
    pub async fn start_monitoring(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            tracing::warn!("health monitoring already running");
            return;
        }

        let notify = Arc::new(Notify::new());
        *self.shutdown.lock() = Arc::clone(&notify);

        let state = Arc::clone(&self.state);
        let reachability = Arc::clone(&self.reachability);
        let probe_rounds = Arc::clone(&self.probe_rounds);
        let running = Arc::clone(&self.running);
        let interval_ms = self.config.probe_interval_ms;

        let handle = tokio::spawn(async move {
            probe_loop(state, reachability, probe_rounds, running, notify, interval_ms).await;
        });
        *self.task.lock().await = Some(handle);

        tracing::info!(interval_ms, "health monitoring started");
    }

    /// Stop the probe worker, joining it with a bounded grace period and
    /// swallowing cancellation. Idempotent.
    pub async fn stop_monitoring(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        self.shutdown.lock().notify_one();

        let handle = self.task.lock().await.take();
        if let Some(mut handle) = handle {
            match tokio::time::timeout(STOP_GRACE, &mut handle).await {
                Ok(Ok(())) => tracing::info!("health monitoring stopped"),
                Ok(Err(e)) => tracing::error!(error = ?e, "health probe worker panicked"),
                Err(_) => {
                    handle.abort();
                    tracing::error!("health probe worker did not stop in time; aborted");
                }
            }
        }
    }

    /// Whether the probe worker is running.
    #[inline]
    pub fn is_monitoring(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Send a payload to one node under a timeout and the breaker.
    ///
    /// Returns `true` only when the delivery completed within the timeout.
    /// Breaker-refused calls fail immediately without touching the node.
    pub async fn send_to_node(
        &self,
        id: NodeId,
        payload: &serde_json::Value,
        timeout: Duration,
    ) -> bool {
        if !self.breaker.lock().check_admission() {
            tracing::warn!(node = %id, "send refused: circuit breaker open");
            return false;
        }

        let delivered = matches!(
            tokio::time::timeout(timeout, self.deliver(id, payload)).await,
            Ok(true)
        );

        let mut breaker = self.breaker.lock();
        if delivered {
            breaker.record_success();
        } else {
            breaker.record_failure();
            self.failed_sends.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(node = %id, "node send failed");
        }
        delivered
    }

    /// Simulated delivery: latency sleep, then receipt accounting.
    async fn deliver(&self, id: NodeId, payload: &serde_json::Value) -> bool {
        let latency_us = {
            let state = self.state.read().await;
            match state.nodes.get(&id) {
                Some(node) if node.is_available() => node.mean_latency_us(),
                _ => return false,
            }
        };
        tokio::time::sleep(Duration::from_micros(latency_us.ceil() as u64)).await;

        let mut state = self.state.write().await;
        match state.nodes.get_mut(&id) {
            Some(node) if node.is_available() => {
                node.messages_received += 1;
                tracing::trace!(node = %id, payload = %payload, "payload delivered");
                true
            }
            _ => false,
        }
    }

    /// Current aggregate health picture.
    pub fn snapshot(&self) -> HealthSnapshot {
        let breaker = self.breaker.lock();
        let reachability = self.reachability.read();
        HealthSnapshot {
            breaker_state: breaker.state(),
            consecutive_failures: breaker.consecutive_failures(),
            reachable_nodes: reachability.values().filter(|&&up| up).count(),
            total_nodes: reachability.len(),
            probe_rounds: self.probe_rounds.load(Ordering::Relaxed),
            failed_sends: self.failed_sends.load(Ordering::Relaxed),
            monitoring: self.is_monitoring(),
        }
    }

    /// Per-node reachability as seen by the last probe round.
    pub fn reachability(&self) -> HashMap<NodeId, bool> {
        self.reachability.read().clone()
    }
}

impl std::fmt::Debug for HealthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthManager")
            .field("monitoring", &self.is_monitoring())
            .field("probe_rounds", &self.probe_rounds.load(Ordering::Relaxed))
            .finish()
    }
}

async fn probe_loop(
    state: Arc<tokio::sync::RwLock<FabricState>>,
    reachability: Arc<parking_lot::RwLock<HashMap<NodeId, bool>>>,
    probe_rounds: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    shutdown: Arc<Notify>,
    interval_ms: u64,
) {
    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
    tracing::debug!("health probe loop started");

    loop {
        tokio::select! {
            biased;

            _ = shutdown.notified() => {
                tracing::debug!("health probe loop received shutdown signal");
                break;
            }

            _ = interval.tick() => {
                if !running.load(Ordering::Relaxed) {
                    break;
                }

                let probed: Vec<(NodeId, bool)> = {
                    let state = state.read().await;
                    state
                        .nodes
                        .values()
                        .map(|node| (node.id, node.is_available()))
                        .collect()
                };

                let unreachable = probed.iter().filter(|(_, up)| !up).count();
                {
                    let mut map = reachability.write();
                    map.clear();
                    map.extend(probed);
                }
                probe_rounds.fetch_add(1, Ordering::Relaxed);

                if unreachable > 0 {
                    tracing::debug!(unreachable, "probe round found unreachable nodes");
                }
            }
        }
    }

    tracing::debug!("health probe loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_breaker() -> CircuitBreaker {
        CircuitBreaker::new(3, Duration::from_millis(50))
    }

    #[test]
    fn breaker_opens_at_threshold() {
        let mut breaker = fast_breaker();
        assert_eq!(breaker.state(), BreakerState::Closed);

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);

        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.check_admission());
    }

    #[test]
    fn success_resets_failure_count() {
        let mut breaker = fast_breaker();
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.consecutive_failures(), 0);

        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_admits_exactly_one_trial() {
        let mut breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.check_admission());

        std::thread::sleep(Duration::from_millis(15));
        assert!(breaker.check_admission(), "first post-timeout call is the trial");
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        assert!(
            !breaker.check_admission(),
            "second call must wait for the trial outcome"
        );
    }

    #[test]
    fn trial_failure_reopens_with_fresh_timeout() {
        let mut breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(25));
        assert!(breaker.check_admission());

        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(!breaker.check_admission(), "freshly reopened breaker refuses");
    }

    #[test]
    fn trial_success_closes() {
        let mut breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert!(breaker.check_admission());

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
        assert!(breaker.check_admission());
    }

    #[test]
    fn abandoned_trial_frees_the_slot() {
        let mut breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        assert!(breaker.check_admission());

        breaker.abandon_trial();
        assert!(
            breaker.check_admission(),
            "slot must be reusable after an abandoned trial"
        );
    }
}
