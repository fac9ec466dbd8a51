//! Dispatch loop metrics.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};

/// Counters maintained by a thread's dispatch loop.
#[derive(Debug, Default)]
pub struct ThreadMetrics {
    /// Total number of loop iterations.
    pub iterations: AtomicU64,

    /// Queued calls executed by polls (own queue and children).
    pub invokes_executed: AtomicU64,

    /// Polls that ended with an error from a queued call.
    pub poll_errors: AtomicU64,

    /// Total `run_task` calls.
    pub task_runs: AtomicU64,

    /// `run_task` calls that exceeded the configured runtime budget.
    pub task_overruns: AtomicU64,

    /// Time spent inside `run_task` (microseconds).
    pub task_time_us: AtomicU64,

    /// Loop start time.
    start_time: parking_lot::RwLock<Option<Instant>>,
}

impl ThreadMetrics {
    /// Create new metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the start of the loop.
    pub fn mark_start(&self) {
        *self.start_time.write() = Some(Instant::now());
    }

    /// Get uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time
            .read()
            .map(|t| t.elapsed().as_secs())
            .unwrap_or(0)
    }

    /// Record a loop iteration.
    pub fn record_iteration(&self) {
        self.iterations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record executed invokes.
    pub fn record_invokes(&self, count: u64) {
        self.invokes_executed.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a failed poll.
    pub fn record_poll_error(&self) {
        self.poll_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one `run_task` call and how long it took.
    pub fn record_task_run(&self, duration_us: u64) {
        self.task_runs.fetch_add(1, Ordering::Relaxed);
        self.task_time_us.fetch_add(duration_us, Ordering::Relaxed);
    }

    /// Record a task that blew its runtime budget.
    pub fn record_overrun(&self) {
        self.task_overruns.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of the metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            uptime_secs: self.uptime_secs(),
            iterations: self.iterations.load(Ordering::Relaxed),
            invokes_executed: self.invokes_executed.load(Ordering::Relaxed),
            poll_errors: self.poll_errors.load(Ordering::Relaxed),
            task_runs: self.task_runs.load(Ordering::Relaxed),
            task_overruns: self.task_overruns.load(Ordering::Relaxed),
            task_time_us: self.task_time_us.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub uptime_secs: u64,
    pub iterations: u64,
    pub invokes_executed: u64,
    pub poll_errors: u64,
    pub task_runs: u64,
    pub task_overruns: u64,
    pub task_time_us: u64,
}

impl MetricsSnapshot {
    /// Iterations per second since the loop started.
    pub fn iterations_per_second(&self) -> f64 {
        if self.uptime_secs == 0 {
            return 0.0;
        }
        self.iterations as f64 / self.uptime_secs as f64
    }

    /// Average `run_task` time in milliseconds.
    pub fn avg_task_time_ms(&self) -> f64 {
        if self.task_runs == 0 {
            return 0.0;
        }
        (self.task_time_us as f64 / self.task_runs as f64) / 1000.0
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
