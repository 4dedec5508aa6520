//! Flip throughput monitoring

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

pub struct FlipMonitor {
    start_time: Instant,
    settled_flips: AtomicU64,
    rejected_flips: AtomicU64,
}

impl FlipMonitor {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            settled_flips: AtomicU64::new(0),
            rejected_flips: AtomicU64::new(0),
        }
    }

    pub fn record_settled(&self) {
        self.settled_flips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected_flips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn settled(&self) -> u64 {
        self.settled_flips.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected_flips.load(Ordering::Relaxed)
    }

    pub fn total_runtime(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn average_flips_per_second(&self) -> f64 {
        let total_seconds = self.total_runtime().as_secs_f64();
        if total_seconds <= f64::EPSILON {
            return 0.0;
        }
        self.settled() as f64 / total_seconds
    }
}

impl Default for FlipMonitor {
    fn default() -> Self {
        Self::new()
    }
}
