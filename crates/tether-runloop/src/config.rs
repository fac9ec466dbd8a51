//! Configuration for worker threads.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// What the dispatch loop does when a queued call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Log the error and carry on with the next iteration.
    #[default]
    Continue,
    /// Log the error and leave the loop.
    Stop,
}

/// Worker thread configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadConfig {
    /// Default timeout used by callers that stop the thread without one.
    #[serde(default = "default_stop_timeout_secs")]
    pub stop_timeout_secs: u64,

    /// Upper bound on the synchronous commit phase of an ownership transfer.
    #[serde(default = "default_transfer_timeout_ms")]
    pub transfer_timeout_ms: u64,

    /// Runtime budget for one `run_task` call (0 = unchecked).
    #[serde(default = "default_max_task_runtime_ms")]
    pub max_task_runtime_ms: u64,

    /// Pause at the end of each iteration (0 = just yield the processor).
    #[serde(default = "default_idle_sleep_us")]
    pub idle_sleep_us: u64,

    /// Policy for errors raised by queued calls.
    #[serde(default)]
    pub on_error: ErrorPolicy,
}

fn default_stop_timeout_secs() -> u64 {
    5
}

fn default_transfer_timeout_ms() -> u64 {
    5000
}

fn default_max_task_runtime_ms() -> u64 {
    250
}

fn default_idle_sleep_us() -> u64 {
    1000
}

impl Default for ThreadConfig {
    fn default() -> Self {
        Self {
            stop_timeout_secs: default_stop_timeout_secs(),
            transfer_timeout_ms: default_transfer_timeout_ms(),
            max_task_runtime_ms: default_max_task_runtime_ms(),
            idle_sleep_us: default_idle_sleep_us(),
            on_error: ErrorPolicy::default(),
        }
    }
}

impl ThreadConfig {
    /// Get the stop timeout as Duration.
    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_secs)
    }

    /// Get the transfer timeout as Duration.
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }

    /// Get the per-task runtime budget, if one is set.
    pub fn max_task_runtime(&self) -> Option<Duration> {
        (self.max_task_runtime_ms > 0).then(|| Duration::from_millis(self.max_task_runtime_ms))
    }

    /// Get the end-of-iteration pause.
    pub fn idle_sleep(&self) -> Duration {
        Duration::from_micros(self.idle_sleep_us)
    }
}
