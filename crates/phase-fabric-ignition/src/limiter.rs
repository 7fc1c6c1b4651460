//! Ignition attempt rate limiting.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Rolling-window limiter bounding ignition attempts per second.
///
/// `allow()` admits an attempt only when the count inside the trailing
/// one-second window is below the maximum; rejected attempts do not consume
/// a slot.
#[derive(Debug)]
pub struct FrequencyLimiter {
    max_per_window: usize,
    window: Duration,
    timestamps: parking_lot::Mutex<VecDeque<Instant>>,
}

impl FrequencyLimiter {
    /// Create a limiter admitting at most `max_hz` attempts per second.
    pub fn new(max_hz: f64) -> Self {
        Self {
            max_per_window: max_hz.max(1.0) as usize,
            window: Duration::from_secs(1),
            timestamps: parking_lot::Mutex::new(VecDeque::new()),
        }
    }

    /// Admit and record an attempt, or reject it without consuming a slot.
    pub fn allow(&self) -> bool {
        let now = Instant::now();
        let mut timestamps = self.timestamps.lock();
        while timestamps
            .front()
            .is_some_and(|&t| now.duration_since(t) >= self.window)
        {
            timestamps.pop_front();
        }
        if timestamps.len() < self.max_per_window {
            timestamps.push_back(now);
            true
        } else {
            false
        }
    }

    /// Attempts recorded inside the current window.
    pub fn current_rate(&self) -> usize {
        let now = Instant::now();
        let timestamps = self.timestamps.lock();
        timestamps
            .iter()
            .filter(|&&t| now.duration_since(t) < self.window)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_cap_then_rejects() {
        let limiter = FrequencyLimiter::new(3.0);
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(limiter.allow());
        assert!(!limiter.allow(), "fourth attempt in the window is rejected");
        assert_eq!(limiter.current_rate(), 3);
    }

    #[test]
    fn rejections_do_not_consume_slots() {
        let limiter = FrequencyLimiter::new(2.0);
        assert!(limiter.allow());
        assert!(limiter.allow());
        for _ in 0..10 {
            assert!(!limiter.allow());
        }
        assert_eq!(limiter.current_rate(), 2, "rejected attempts left no trace");
    }

    #[test]
    fn window_expiry_frees_slots() {
        let limiter = FrequencyLimiter::new(1.0);
        assert!(limiter.allow());
        assert!(!limiter.allow());

        std::thread::sleep(Duration::from_millis(1_050));
        assert!(limiter.allow(), "slot must free after the window passes");
    }
}
