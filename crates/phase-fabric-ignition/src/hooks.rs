//! Collaboration hooks for the excluded presentation layer.
//!
//! Two seams: an optional [`ContentEnricher`] invoked during the Broadcast
//! phase, and [`IgnitionObserver`]s that receive [`IgnitionSignal`]s as
//! events move through the protocol. Dashboards, queues and push channels
//! subscribe here instead of living inside the core.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::event::IgnitionPhase;

/// Optional hook that enriches the content payload before broadcast.
///
/// A returned value is merged into the payload under the `"enrichment"`
/// key; returning `None` leaves the payload untouched.
#[async_trait]
pub trait ContentEnricher: Send + Sync {
    async fn enrich(&self, content: &serde_json::Value) -> Option<serde_json::Value>;
}

/// Signals emitted as the coordinator processes ignition attempts.
#[derive(Debug, Clone)]
pub enum IgnitionSignal {
    /// An attempt cleared the admission gates
    Admitted {
        event_id: String,
        timestamp: DateTime<Utc>,
    },
    /// An event entered a protocol phase
    PhaseChanged {
        event_id: String,
        phase: IgnitionPhase,
        timestamp: DateTime<Utc>,
    },
    /// An event finalized successfully
    Completed {
        event_id: String,
        achieved_coherence: f64,
        timestamp: DateTime<Utc>,
    },
    /// An event finalized as failed
    Failed {
        event_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// The coordinator entered degraded mode
    DegradedEntered { timestamp: DateTime<Utc> },
    /// The coordinator exited degraded mode
    DegradedExited { timestamp: DateTime<Utc> },
}

/// Receives ignition signals; implementations must not block.
pub trait IgnitionObserver: Send + Sync {
    fn on_signal(&self, signal: &IgnitionSignal);
}

/// Fans signals out to registered observers.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    observers: Arc<tokio::sync::RwLock<Vec<Box<dyn IgnitionObserver>>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer for all future signals.
    pub async fn register(&self, observer: Box<dyn IgnitionObserver>) {
        self.observers.write().await.push(observer);
    }

    /// Deliver a signal to every observer.
    pub async fn broadcast(&self, signal: IgnitionSignal) {
        let observers = self.observers.read().await;
        for observer in observers.iter() {
            observer.on_signal(&signal);
        }
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    impl IgnitionObserver for Counter {
        fn on_signal(&self, _signal: &IgnitionSignal) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn registered_observers_receive_signals() {
        let registry = ObserverRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        registry
            .register(Box::new(Counter(Arc::clone(&count))))
            .await;
        registry
            .register(Box::new(Counter(Arc::clone(&count))))
            .await;

        registry
            .broadcast(IgnitionSignal::DegradedEntered {
                timestamp: Utc::now(),
            })
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
