//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use tether_runloop::ThreadConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub thread: ThreadSection,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// The worker thread that drives the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadSection {
    /// OS thread name.
    #[serde(default = "default_thread_name")]
    pub name: String,

    #[serde(flatten)]
    pub runtime: ThreadConfig,
}

impl Default for ThreadSection {
    fn default() -> Self {
        Self {
            name: default_thread_name(),
            runtime: ThreadConfig::default(),
        }
    }
}

fn default_thread_name() -> String {
    "main".to_string()
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily rolling log files (`~` is expanded).
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Scheduler configuration for cron jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether scheduler is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Scheduled jobs.
    #[serde(default)]
    pub jobs: Vec<ScheduledJob>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            jobs: Vec::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// A scheduled job definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    /// Unique job ID.
    pub id: String,
    /// Five-field cron expression.
    pub schedule: String,
    /// What to do when the schedule matches.
    pub action: JobAction,
    /// Fire at most once per matching minute instead of on every
    /// matching one-second tick.
    #[serde(default = "default_true")]
    pub once_per_minute: bool,
}

/// Action run by a scheduled job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobAction {
    /// Emit a log line.
    Log { message: String },
    /// Spawn a process and do not wait for it.
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}
