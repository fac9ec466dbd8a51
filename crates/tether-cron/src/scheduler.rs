//! Scheduler - evaluates cron tasks from a thread's dispatch loop.
//!
//! The scheduler is an [`Invokable`] child plus a [`ThreadTask`]: attach it
//! to a [`tether_runloop::Thread`] and every cron action runs on that
//! thread. Job registration is queued through the scheduler's invoker, so
//! `add_task` and `remove_task` are safe from any thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{NaiveDateTime, TimeDelta, Timelike};
use parking_lot::Mutex;
use tether_runloop::{Invokable, Invoker, ThreadTask};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{Clock, LocalClock};
use crate::error::CronResult;
use crate::task::CronTask;

/// Scheduled job identifier.
pub type JobId = Uuid;

struct Job {
    id: JobId,
    task: Arc<CronTask>,
}

/// Runs cron tasks at most once per second of wall-clock time.
pub struct Scheduler {
    invoker: Invoker,
    jobs: Arc<Mutex<Vec<Job>>>,
    next_tick: Mutex<NaiveDateTime>,
    clock: Arc<dyn Clock>,
    stopped: AtomicBool,
}

impl Scheduler {
    /// Create a scheduler driven by the local clock.
    pub fn new(name: &str) -> Self {
        Self::with_clock(name, Arc::new(LocalClock))
    }

    /// Create a scheduler driven by `clock`.
    pub fn with_clock(name: &str, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        let next_tick = now
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now);
        Self {
            invoker: Invoker::new(format!("Scheduler: {name}")),
            jobs: Arc::new(Mutex::new(Vec::new())),
            next_tick: Mutex::new(next_tick),
            clock,
            stopped: AtomicBool::new(false),
        }
    }

    /// Parse `expr` and schedule `action` for it.
    ///
    /// Parse errors are returned here and nothing is registered. The job
    /// itself is added on the owning thread.
    pub fn add_task<F>(&self, expr: &str, action: F) -> CronResult<JobId>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add_cron_task(CronTask::parse(expr, action)?)
    }

    /// Schedule `action` from five separate field strings.
    pub fn add_task_fields<F>(
        &self,
        minute: &str,
        hour: &str,
        day: &str,
        month: &str,
        weekday: &str,
        action: F,
    ) -> CronResult<JobId>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add_cron_task(CronTask::from_fields(minute, hour, day, month, weekday, action)?)
    }

    /// Schedule an already built task.
    pub fn add_cron_task(&self, task: CronTask) -> CronResult<JobId> {
        if task.schedule().is_never() {
            warn!(scheduler = %self.invoker, expr = task.expr(), "Cron expression can never fire");
        }

        let id = Uuid::new_v4();
        let jobs = self.jobs.clone();
        let task = Arc::new(task);
        self.invoker.invoke_async(move || {
            debug!(job = %id, expr = task.expr(), "Cron job added");
            jobs.lock().push(Job { id, task });
            Ok(())
        })?;
        Ok(id)
    }

    /// Remove a job. Unknown ids are ignored.
    pub fn remove_task(&self, id: JobId) -> CronResult<()> {
        let jobs = self.jobs.clone();
        self.invoker.invoke_async(move || {
            let mut jobs = jobs.lock();
            let before = jobs.len();
            jobs.retain(|job| job.id != id);
            if jobs.len() == before {
                debug!(job = %id, "Cron job not found");
            } else {
                debug!(job = %id, "Cron job removed");
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Number of jobs added so far on the owning thread.
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Get the scheduler's invoker.
    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Whether `stop` has been called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> Vec<Arc<CronTask>> {
        self.jobs.lock().iter().map(|job| job.task.clone()).collect()
    }
}

impl Invokable for Scheduler {
    fn invoker(&self) -> &Invoker {
        &self.invoker
    }
}

impl ThreadTask for Scheduler {
    fn name(&self) -> &str {
        self.invoker.name()
    }

    fn start(&self) {
        info!(scheduler = %self.invoker, jobs = self.len(), "Scheduler started");
    }

    fn stop(&self, force: bool) {
        self.stopped.store(true, Ordering::SeqCst);
        if force {
            warn!(scheduler = %self.invoker, "Scheduler force-stopped");
        } else {
            info!(scheduler = %self.invoker, "Scheduler stopped");
        }
    }

    fn run_task(&self) {
        if self.is_stopped() {
            return;
        }

        let now = self.clock.now();
        {
            let mut next_tick = self.next_tick.lock();
            if now < *next_tick {
                return;
            }
            *next_tick += TimeDelta::seconds(1);
        }

        for task in self.snapshot() {
            if task.check_task_time(&now) {
                debug!(scheduler = %self.invoker, expr = task.expr(), %now, "Cron task fired");
            }
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("invoker", &self.invoker)
            .field("jobs", &self.len())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
