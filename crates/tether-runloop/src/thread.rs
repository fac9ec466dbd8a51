//! Thread - one OS thread running one cooperative dispatch loop.
//!
//! Each iteration drains the thread's manager (its own queue, then every
//! owned child), runs every periodic task once, then yields.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ErrorPolicy, ThreadConfig};
use crate::error::{RunLoopError, RunLoopResult};
use crate::invoker::{Invokable, Invoker};
use crate::manager::InvokeManager;
use crate::metrics::ThreadMetrics;
use crate::state::{StopOutcome, ThreadState};
use crate::thread_task::ThreadTask;

struct ThreadShared {
    name: String,
    config: ThreadConfig,
    manager: InvokeManager,

    /// Cleared once to ask the loop to exit.
    running: AtomicBool,

    state: AtomicU8,

    /// Periodic tasks in the order they were added.
    tasks: Mutex<Vec<Arc<dyn ThreadTask>>>,

    /// Set once the `stop(false)` round has been delivered.
    graceful_sent: AtomicBool,

    /// Set once the `stop(true)` round has been delivered.
    forced_sent: AtomicBool,

    /// Fired by a forced stop.
    cancel: CancellationToken,

    exited: Mutex<bool>,
    exit_signal: Condvar,

    metrics: Arc<ThreadMetrics>,
}

impl ThreadShared {
    fn state(&self) -> ThreadState {
        ThreadState::from(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: ThreadState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn transition(&self, from: ThreadState, to: ThreadState) -> bool {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    fn keep_going(&self) -> bool {
        self.running.load(Ordering::SeqCst) && !self.cancel.is_cancelled()
    }

    fn tasks_stopped(&self) -> bool {
        self.graceful_sent.load(Ordering::SeqCst) || self.forced_sent.load(Ordering::SeqCst)
    }

    /// Call `stop(force)` on every task. Each kind of round is delivered at
    /// most once, so a forced stop still reaches tasks that were already
    /// asked to stop gracefully.
    fn stop_tasks(&self, force: bool) {
        let sent = if force { &self.forced_sent } else { &self.graceful_sent };
        if sent.swap(true, Ordering::SeqCst) {
            return;
        }
        let tasks = self.tasks.lock().clone();
        for task in tasks {
            debug!(thread = %self.name, task = task.name(), force, "Stopping task");
            task.stop(force);
        }
    }

    fn run_loop(&self) {
        Invokable::change_owner(&self.manager, thread::current().id());
        self.metrics.mark_start();
        info!(thread = %self.name, "Thread loop started");

        let idle = self.config.idle_sleep();
        while self.keep_going() {
            self.metrics.record_iteration();

            match self.manager.poll(&self.cancel) {
                Ok(executed) => {
                    if executed > 0 {
                        self.metrics.record_invokes(executed as u64);
                    }
                }
                Err(e) => {
                    self.metrics.record_poll_error();
                    error!(thread = %self.name, error = %e, "Invoke failed");
                    if self.config.on_error == ErrorPolicy::Stop {
                        break;
                    }
                }
            }

            if !self.keep_going() {
                break;
            }
            self.run_tasks();

            if idle.is_zero() {
                thread::yield_now();
            } else {
                thread::sleep(idle);
            }
        }

        self.finish();
    }

    fn run_tasks(&self) {
        let tasks = self.tasks.lock().clone();
        let budget = self.config.max_task_runtime();
        for task in tasks {
            if !self.keep_going() {
                break;
            }
            let started = Instant::now();
            task.run_task();
            let elapsed = started.elapsed();
            self.metrics.record_task_run(elapsed.as_micros() as u64);

            if let Some(budget) = budget {
                if elapsed > budget {
                    self.metrics.record_overrun();
                    warn!(
                        thread = %self.name,
                        task = task.name(),
                        elapsed_ms = elapsed.as_millis() as u64,
                        budget_ms = budget.as_millis() as u64,
                        "Task exceeded its runtime budget"
                    );
                }
            }
        }
    }

    fn finish(&self) {
        self.running.store(false, Ordering::SeqCst);

        let pending = self.manager.pending();
        if pending > 0 {
            warn!(thread = %self.name, pending, "Thread loop exited with pending invokes");
        }

        // A forced stop already delivered stop(true) from the waiting thread.
        if !self.cancel.is_cancelled() {
            self.stop_tasks(false);
        }

        self.set_state(ThreadState::Stopped);
        *self.exited.lock() = true;
        self.exit_signal.notify_all();
        info!(thread = %self.name, "Thread loop exited");
    }

    /// Wait for the loop to signal its exit. Returns false on timeout.
    fn wait_for_exit(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut exited = self.exited.lock();
        while !*exited {
            if self.exit_signal.wait_until(&mut exited, deadline).timed_out() {
                return *exited;
            }
        }
        true
    }
}

/// A named worker thread with its own [`InvokeManager`] and periodic tasks.
pub struct Thread {
    shared: Arc<ThreadShared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Thread {
    /// Create a thread. Nothing is spawned until [`Thread::start`].
    pub fn new(name: impl Into<String>, config: ThreadConfig) -> Self {
        let name = name.into();
        let manager =
            InvokeManager::with_transfer_timeout(format!("Thread: {name}"), config.transfer_timeout());
        Self {
            shared: Arc::new(ThreadShared {
                name,
                config,
                manager,
                running: AtomicBool::new(false),
                state: AtomicU8::new(ThreadState::Created as u8),
                tasks: Mutex::new(Vec::new()),
                graceful_sent: AtomicBool::new(false),
                forced_sent: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                exited: Mutex::new(false),
                exit_signal: Condvar::new(),
                metrics: Arc::new(ThreadMetrics::new()),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Get the thread name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Get the current lifecycle state.
    pub fn state(&self) -> ThreadState {
        self.shared.state()
    }

    /// True between `start` and the loop's exit.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Get the configuration.
    pub fn config(&self) -> &ThreadConfig {
        &self.shared.config
    }

    /// Get metrics.
    pub fn metrics(&self) -> &Arc<ThreadMetrics> {
        &self.shared.metrics
    }

    /// Get the thread's manager.
    pub fn manager(&self) -> &InvokeManager {
        &self.shared.manager
    }

    /// Get the thread's own invoker.
    pub fn invoker(&self) -> &Invoker {
        self.shared.manager.invoker()
    }

    /// Spawn the OS thread and enter the dispatch loop.
    pub fn start(&self) -> RunLoopResult<()> {
        if !self.shared.transition(ThreadState::Created, ThreadState::Running) {
            return Err(RunLoopError::AlreadyStarted(self.shared.name.clone()));
        }
        self.shared.running.store(true, Ordering::SeqCst);

        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(self.shared.name.clone())
            .spawn(move || shared.run_loop());

        match spawned {
            Ok(handle) => {
                *self.handle.lock() = Some(handle);
                info!(thread = %self.shared.name, "Thread started");
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                self.shared.set_state(ThreadState::Created);
                error!(thread = %self.shared.name, error = %e, "Failed to spawn thread");
                Err(e.into())
            }
        }
    }

    /// Add a periodic task; it is started on the owning thread.
    ///
    /// Before [`Thread::start`] the task is queued and started on the loop's
    /// first poll.
    pub fn add_task(&self, task: Arc<dyn ThreadTask>) -> RunLoopResult<()> {
        if self.state() == ThreadState::Stopped {
            return Err(RunLoopError::NotRunning(self.shared.name.clone()));
        }
        let shared = Arc::downgrade(&self.shared);
        self.shared.manager.invoker().invoke_async(move || {
            let Some(shared) = shared.upgrade() else {
                return Ok(());
            };
            if shared.tasks_stopped() {
                warn!(thread = %shared.name, task = task.name(), "Task added after shutdown; ignored");
                return Ok(());
            }
            shared.tasks.lock().push(task.clone());
            debug!(thread = %shared.name, task = task.name(), "Task added");
            task.start();
            Ok(())
        })
    }

    /// Register `task` as a child of this thread's manager and add it as a
    /// periodic task.
    pub fn attach<T>(&self, task: Arc<T>) -> RunLoopResult<()>
    where
        T: ThreadTask + Invokable + 'static,
    {
        self.register(task.clone())?;
        self.add_task(task)
    }

    /// Register a child invoker with this thread's manager.
    pub fn register(&self, child: Arc<dyn Invokable>) -> RunLoopResult<()> {
        self.shared.manager.register(child)
    }

    /// Number of tasks added so far.
    pub fn task_count(&self) -> usize {
        self.shared.tasks.lock().len()
    }

    /// Stop the loop, waiting up to `timeout` for it to exit.
    ///
    /// Called from the loop itself, this only requests the exit and returns
    /// [`StopOutcome::Graceful`]. When the loop does not exit in time it is
    /// cancelled, every task gets `stop(true)` from the calling thread and
    /// the OS thread is detached.
    pub fn stop(&self, timeout: Duration) -> RunLoopResult<StopOutcome> {
        if !self.shared.transition(ThreadState::Running, ThreadState::Stopping) {
            return Err(RunLoopError::NotRunning(self.shared.name.clone()));
        }
        info!(thread = %self.shared.name, ?timeout, "Stopping thread");

        let shared: Weak<ThreadShared> = Arc::downgrade(&self.shared);
        self.shared.manager.invoker().invoke_async(move || {
            if let Some(shared) = shared.upgrade() {
                shared.running.store(false, Ordering::SeqCst);
                shared.stop_tasks(false);
            }
            Ok(())
        })?;

        if !self.shared.manager.invoke_required() {
            return Ok(StopOutcome::Graceful);
        }

        if self.shared.wait_for_exit(timeout) {
            if let Some(handle) = self.handle.lock().take() {
                if handle.join().is_err() {
                    error!(thread = %self.shared.name, "Thread loop panicked");
                }
            }
            info!(thread = %self.shared.name, "Thread stopped");
            return Ok(StopOutcome::Graceful);
        }

        warn!(
            thread = %self.shared.name,
            ?timeout,
            "Thread did not exit in time, forcing stop"
        );
        self.shared.cancel.cancel();
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.set_state(ThreadState::Stopped);
        self.shared.stop_tasks(true);
        // Detached: the loop leaves on its own at the next cancellation check.
        drop(self.handle.lock().take());
        Ok(StopOutcome::Forced)
    }
}

impl Drop for Thread {
    fn drop(&mut self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            warn!(
                thread = %self.shared.name,
                "Thread dropped while running; the loop exits on its next iteration, detached"
            );
        }
    }
}

impl std::fmt::Debug for Thread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Thread")
            .field("name", &self.shared.name)
            .field("state", &self.state())
            .field("tasks", &self.task_count())
            .finish()
    }
}

#[cfg(test)]
#[path = "thread_tests.rs"]
mod tests;
