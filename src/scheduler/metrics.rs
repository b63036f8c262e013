//! Counters for graph runs, shared across runs of one runner.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct RunMetrics {
    runs_started: AtomicU64,
    runs_failed: AtomicU64,
    nodes_succeeded: AtomicU64,
    nodes_failed: AtomicU64,
    nodes_timed_out: AtomicU64,
    nodes_skipped: AtomicU64,
    iterations: AtomicU64,
    busy_time_ms: AtomicU64,
}

/// Point-in-time copy of [`RunMetrics`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub runs_started: u64,
    pub runs_failed: u64,
    pub nodes_succeeded: u64,
    pub nodes_failed: u64,
    pub nodes_timed_out: u64,
    pub nodes_skipped: u64,
    pub iterations: u64,
    pub busy_time_ms: u64,
}

impl MetricsSnapshot {
    pub fn nodes_executed(&self) -> u64 {
        self.nodes_succeeded + self.nodes_failed + self.nodes_timed_out
    }
}

impl RunMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_run_started(&self) {
        self.runs_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_run_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_node(&self, failed: bool, iterations: u32, elapsed: Duration) {
        if failed {
            self.nodes_failed.fetch_add(1, Ordering::Relaxed);
        } else {
            self.nodes_succeeded.fetch_add(1, Ordering::Relaxed);
        }
        self.iterations
            .fetch_add(u64::from(iterations), Ordering::Relaxed);
        self.busy_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self, elapsed: Duration) {
        self.nodes_timed_out.fetch_add(1, Ordering::Relaxed);
        self.busy_time_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.nodes_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            runs_started: self.runs_started.load(Ordering::Relaxed),
            runs_failed: self.runs_failed.load(Ordering::Relaxed),
            nodes_succeeded: self.nodes_succeeded.load(Ordering::Relaxed),
            nodes_failed: self.nodes_failed.load(Ordering::Relaxed),
            nodes_timed_out: self.nodes_timed_out.load(Ordering::Relaxed),
            nodes_skipped: self.nodes_skipped.load(Ordering::Relaxed),
            iterations: self.iterations.load(Ordering::Relaxed),
            busy_time_ms: self.busy_time_ms.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.runs_started,
            &self.runs_failed,
            &self.nodes_succeeded,
            &self.nodes_failed,
            &self.nodes_timed_out,
            &self.nodes_skipped,
            &self.iterations,
            &self.busy_time_ms,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
