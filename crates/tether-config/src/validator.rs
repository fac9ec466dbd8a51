//! Semantic checks that serde cannot express.

use std::collections::HashSet;
use std::fmt;

use tether_cron::CronSchedule;

use crate::error::ConfigError;
use crate::schema::{Config, JobAction};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// One finding of [`ConfigValidator::validate`], keyed by its TOML path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Errors block a run; warnings are only logged.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Turn the first error, if any, into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationIssue>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(ValidationIssue { path, message }) => Err(ConfigError::InvalidValue {
                field: path,
                message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// Checks a loaded [`Config`] before any thread is started.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Collect every problem in `config` instead of stopping at the first.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();
        Self::validate_thread(config, &mut result);
        Self::validate_logging(config, &mut result);
        Self::validate_jobs(config, &mut result);
        result
    }

    fn validate_thread(config: &Config, result: &mut ValidationResult) {
        if config.thread.name.trim().is_empty() {
            result.error("thread.name", "Thread name cannot be empty");
        }

        let runtime = &config.thread.runtime;
        if runtime.transfer_timeout_ms == 0 {
            result.error("thread.transfer_timeout_ms", "transfer_timeout_ms must be greater than 0");
        }
        if runtime.stop_timeout_secs == 0 {
            result.warn("thread.stop_timeout_secs", "stop_timeout_secs is 0, every stop will be forced");
        }
        if runtime.idle_sleep_us > 1_000_000 {
            result.warn(
                "thread.idle_sleep_us",
                "idle_sleep_us is above one second, cron jobs may fire late",
            );
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        let level = config.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            result.error("logging.level", format!("Unknown log level '{}'", config.logging.level));
        }
    }

    fn validate_jobs(config: &Config, result: &mut ValidationResult) {
        if !config.scheduler.enabled && !config.scheduler.jobs.is_empty() {
            result.warn("scheduler.enabled", "Scheduler is disabled, configured jobs will not run");
        }

        let mut seen = HashSet::new();
        for (i, job) in config.scheduler.jobs.iter().enumerate() {
            let path = format!("scheduler.jobs[{}]", i);

            if job.id.trim().is_empty() {
                result.error(format!("{}.id", path), "Job id cannot be empty");
            } else if !seen.insert(job.id.as_str()) {
                result.error(format!("{}.id", path), format!("Duplicate job id '{}'", job.id));
            }

            match CronSchedule::parse(&job.schedule) {
                Ok(schedule) if schedule.is_never() => {
                    result.warn(format!("{}.schedule", path), format!("'{}' can never fire", job.schedule));
                }
                Ok(_) => {}
                Err(e) => result.error(format!("{}.schedule", path), e.to_string()),
            }

            if let JobAction::Command { program, .. } = &job.action {
                if program.trim().is_empty() {
                    result.error(format!("{}.action.program", path), "Command program cannot be empty");
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
