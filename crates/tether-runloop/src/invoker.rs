//! Invoker - the ownership and deferred-call primitive.
//!
//! Every thread-affine object is, or embeds, an [`Invoker`]. An invoker has
//! at most one owning OS thread and a FIFO queue of calls that only that
//! thread executes (from its dispatch loop, via [`Invoker::poll_invokes`]).
//! Calls made on the owning thread run inline; calls made anywhere else are
//! queued.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

use crate::completion::Completion;
use crate::error::{RunLoopError, RunLoopResult};

/// Invoker identifier.
pub type InvokerId = Uuid;

/// A queued call.
pub(crate) type Job = Box<dyn FnOnce() -> RunLoopResult<()> + Send + 'static>;

struct InvokerState {
    /// Current owning thread (`None` until first assignment).
    owner: Option<ThreadId>,

    /// Manager whose child set holds this invoker, if any.
    manager: Option<InvokerId>,

    /// Pending calls in enqueue order.
    queue: VecDeque<Job>,
}

struct InvokerInner {
    id: InvokerId,
    name: String,
    state: Mutex<InvokerState>,
}

/// Handle to an owner + deferred-call queue pair.
///
/// Cloning is cheap; clones refer to the same queue.
#[derive(Clone)]
pub struct Invoker {
    inner: Arc<InvokerInner>,
}

impl Invoker {
    /// Create an unowned invoker.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(InvokerInner {
                id: Uuid::new_v4(),
                name: name.into(),
                state: Mutex::new(InvokerState {
                    owner: None,
                    manager: None,
                    queue: VecDeque::new(),
                }),
            }),
        }
    }

    /// Get the invoker ID.
    pub fn id(&self) -> InvokerId {
        self.inner.id
    }

    /// Get the invoker name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Get the current owning thread.
    pub fn owner(&self) -> Option<ThreadId> {
        self.inner.state.lock().owner
    }

    /// Get the manager currently holding this invoker.
    pub fn manager_id(&self) -> Option<InvokerId> {
        self.inner.state.lock().manager
    }

    pub(crate) fn set_manager(&self, manager: Option<InvokerId>) {
        self.inner.state.lock().manager = manager;
    }

    /// True iff the calling thread is not the current owner.
    pub fn invoke_required(&self) -> bool {
        self.inner.state.lock().owner != Some(thread::current().id())
    }

    /// Number of calls waiting in the queue.
    pub fn pending(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Run `action` on the owning thread without waiting for it.
    ///
    /// On the owner the action runs inline and its error is returned here.
    /// Anywhere else it is queued and `Ok(())` is returned immediately; a
    /// failure then surfaces from the owner's next poll.
    pub fn invoke_async<F>(&self, action: F) -> RunLoopResult<()>
    where
        F: FnOnce() -> RunLoopResult<()> + Send + 'static,
    {
        {
            let mut state = self.inner.state.lock();
            if state.owner != Some(thread::current().id()) {
                state.queue.push_back(Box::new(action));
                debug!(invoker = %self.inner.name, pending = state.queue.len(), "Invoke queued");
                return Ok(());
            }
        }
        action()
    }

    /// Run `action` on the owning thread and wait for its result.
    ///
    /// Blocks the calling thread (never the owner) until the owner's loop
    /// has executed the call. Calling this from a loop that the owner is
    /// itself waiting on deadlocks; use [`Invoker::invoke_sync_timeout`]
    /// where that can happen.
    pub fn invoke_sync<R, F>(&self, action: F) -> RunLoopResult<R>
    where
        R: Send + 'static,
        F: FnOnce() -> RunLoopResult<R> + Send + 'static,
    {
        match self.enqueue_sync(action)? {
            SyncCall::Inline(result) => result,
            SyncCall::Queued(slot) => slot.wait(),
        }
    }

    /// Like [`Invoker::invoke_sync`], but withdraws the call if the owner has
    /// not started it within `timeout`. A withdrawn call never runs.
    pub fn invoke_sync_timeout<R, F>(&self, action: F, timeout: Duration) -> RunLoopResult<R>
    where
        R: Send + 'static,
        F: FnOnce() -> RunLoopResult<R> + Send + 'static,
    {
        match self.enqueue_sync(action)? {
            SyncCall::Inline(result) => result,
            SyncCall::Queued(slot) => slot.wait_timeout(timeout),
        }
    }

    fn enqueue_sync<R, F>(&self, action: F) -> RunLoopResult<SyncCall<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> RunLoopResult<R> + Send + 'static,
    {
        let mut state = self.inner.state.lock();
        if state.owner == Some(thread::current().id()) {
            drop(state);
            return Ok(SyncCall::Inline(action()));
        }

        let (slot, completer) = Completion::pair(self.inner.name.clone());
        state.queue.push_back(Box::new(move || {
            completer.run(action);
            Ok(())
        }));
        debug!(invoker = %self.inner.name, pending = state.queue.len(), "Synchronous invoke queued");
        Ok(SyncCall::Queued(slot))
    }

    /// Drain and execute the calls queued when polling starts.
    ///
    /// Must be called from the owning thread. Calls queued while draining run
    /// on the next poll. If a call fails, the rest of the batch goes back to
    /// the head of the queue and the error is returned.
    pub fn poll_invokes(&self) -> RunLoopResult<usize> {
        self.drain(None)
    }

    /// [`Invoker::poll_invokes`] that also stops between calls once `cancel`
    /// fires, leaving the remainder queued.
    pub fn poll_invokes_until(&self, cancel: &CancellationToken) -> RunLoopResult<usize> {
        self.drain(Some(cancel))
    }

    fn drain(&self, cancel: Option<&CancellationToken>) -> RunLoopResult<usize> {
        let mut batch = {
            let mut state = self.inner.state.lock();
            if state.owner != Some(thread::current().id()) {
                return Err(RunLoopError::NotOwner {
                    invoker: self.inner.name.clone(),
                });
            }
            std::mem::take(&mut state.queue)
        };

        let mut executed = 0;
        while let Some(job) = batch.pop_front() {
            if cancel.is_some_and(|c| c.is_cancelled()) {
                self.requeue_front(batch);
                return Ok(executed);
            }
            let result = job();
            executed += 1;
            if let Err(e) = result {
                self.requeue_front(batch);
                return Err(e);
            }
        }
        Ok(executed)
    }

    fn requeue_front(&self, mut batch: VecDeque<Job>) {
        if batch.is_empty() {
            return;
        }
        let mut state = self.inner.state.lock();
        batch.append(&mut state.queue);
        state.queue = batch;
    }

    /// Reassign the owner without running any queued calls.
    pub fn change_owner(&self, owner: ThreadId) {
        let mut state = self.inner.state.lock();
        if state.owner != Some(owner) {
            debug!(invoker = %self.inner.name, ?owner, "Owner changed");
        }
        state.owner = Some(owner);
    }

    /// Make the calling thread the owner.
    pub fn claim(&self) {
        self.change_owner(thread::current().id());
    }
}

enum SyncCall<R> {
    Inline(RunLoopResult<R>),
    Queued(Arc<Completion<R>>),
}

impl std::fmt::Debug for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Invoker")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("owner", &state.owner)
            .field("pending", &state.queue.len())
            .finish()
    }
}

impl std::fmt::Display for Invoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner.name)
    }
}

/// Anything a manager can own, poll and hand over to another manager.
pub trait Invokable: Send + Sync {
    /// The invoker carrying this object's owner and queue.
    fn invoker(&self) -> &Invoker;

    /// Drain pending calls on the owning thread.
    fn poll(&self, cancel: &CancellationToken) -> RunLoopResult<usize> {
        self.invoker().poll_invokes_until(cancel)
    }

    /// Reassign ownership (recursively for managers).
    fn change_owner(&self, owner: ThreadId) {
        self.invoker().change_owner(owner);
    }

    /// Pending calls, including those of owned children.
    fn pending(&self) -> usize {
        self.invoker().pending()
    }
}

impl Invokable for Invoker {
    fn invoker(&self) -> &Invoker {
        self
    }
}

#[cfg(test)]
#[path = "invoker_tests.rs"]
mod tests;
