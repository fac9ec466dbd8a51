//! Periodic tasks driven by a thread's dispatch loop.

/// A unit of work the loop runs once per iteration.
///
/// `start` is called once when the task is added, `stop` once when the
/// thread shuts down, and `run_task` on every iteration in between. All
/// three run on the owning thread except `stop(true)`, which comes from the
/// thread that gave up waiting for the loop.
pub trait ThreadTask: Send + Sync {
    /// Name used in log output.
    fn name(&self) -> &str {
        "task"
    }

    /// Called once after the task joins the loop.
    fn start(&self) {}

    /// Called once on shutdown. `force` is true when the loop did not exit
    /// within the stop timeout.
    fn stop(&self, force: bool) {
        let _ = force;
    }

    /// One slice of work. Must not block.
    fn run_task(&self);
}
