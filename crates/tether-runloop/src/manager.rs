//! InvokeManager - an invoker that owns child invokers.
//!
//! A manager polls its own queue and then every child it owns, and can hand
//! a child over to another manager. The handover is two-phase:
//!
//! 1. On the source's thread, confirm the source still owns the item.
//! 2. Synchronously on the target's thread, lock both child sets (in
//!    manager-id order), move the item, and make the target's thread the
//!    item's owner.
//!
//! The source's loop is parked inside step 1 while step 2 runs, so the item
//! is never polled by two threads and never left without a manager. Calls
//! queued on the item before the handover stay in its queue and are drained
//! by the new owner.

use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{RunLoopError, RunLoopResult};
use crate::invoker::{Invokable, Invoker, InvokerId};

/// Default bound on the synchronous commit phase of a transfer.
pub const DEFAULT_TRANSFER_TIMEOUT: Duration = Duration::from_secs(5);

type Children = Vec<Arc<dyn Invokable>>;

struct ManagerInner {
    invoker: Invoker,
    children: Mutex<Children>,
    transfer_timeout: Duration,
}

/// An invoker plus the set of child invokers it owns and polls.
#[derive(Clone)]
pub struct InvokeManager {
    inner: Arc<ManagerInner>,
}

impl InvokeManager {
    /// Create an unowned manager with no children.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_transfer_timeout(name, DEFAULT_TRANSFER_TIMEOUT)
    }

    /// Create a manager with a custom bound on the transfer commit phase.
    pub fn with_transfer_timeout(name: impl Into<String>, transfer_timeout: Duration) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                invoker: Invoker::new(name),
                children: Mutex::new(Vec::new()),
                transfer_timeout,
            }),
        }
    }

    /// Get the manager's own invoker.
    pub fn invoker(&self) -> &Invoker {
        &self.inner.invoker
    }

    /// Get the manager ID.
    pub fn id(&self) -> InvokerId {
        self.inner.invoker.id()
    }

    /// True iff the calling thread does not own this manager.
    pub fn invoke_required(&self) -> bool {
        self.inner.invoker.invoke_required()
    }

    /// Number of owned children.
    pub fn children_len(&self) -> usize {
        self.inner.children.lock().len()
    }

    /// Check whether `item` is in the owned set.
    pub fn owns(&self, item: &Arc<dyn Invokable>) -> bool {
        let id = item.invoker().id();
        self.inner
            .children
            .lock()
            .iter()
            .any(|c| c.invoker().id() == id)
    }

    /// Adopt `child` on the owning thread.
    ///
    /// Safe to call from any thread: the adoption itself is an async invoke.
    /// Adopting an invoker that another manager holds fails on the owner's
    /// poll with [`RunLoopError::NotOwned`]; use [`InvokeManager::transfer_to`]
    /// to move it instead.
    pub fn register(&self, child: Arc<dyn Invokable>) -> RunLoopResult<()> {
        let this = self.clone();
        self.inner.invoker.invoke_async(move || this.adopt(child))
    }

    fn adopt(&self, child: Arc<dyn Invokable>) -> RunLoopResult<()> {
        let child_id = child.invoker().id();
        match child.invoker().manager_id() {
            Some(id) if id == self.id() => return Ok(()),
            Some(_) => {
                return Err(RunLoopError::NotOwned {
                    item: child.invoker().name().to_string(),
                    manager: self.inner.invoker.name().to_string(),
                });
            }
            None => {}
        }

        child.change_owner(thread::current().id());
        child.invoker().set_manager(Some(self.id()));
        self.inner.children.lock().push(child);
        debug!(manager = %self.inner.invoker, child = %child_id, "Child registered");
        Ok(())
    }

    /// Move `item` from this manager to `target`.
    ///
    /// Fails immediately with [`RunLoopError::NotOwned`] if `item` is not in
    /// this manager's set. When the calling thread owns both managers the
    /// move happens right away. Otherwise the two-phase handover is queued on
    /// this manager; its outcome surfaces from this manager's poll.
    pub fn transfer_to(&self, target: &InvokeManager, item: &Arc<dyn Invokable>) -> RunLoopResult<()> {
        if !self.owns(item) {
            return Err(self.not_owned(item));
        }
        if self.id() == target.id() {
            return Ok(());
        }

        if !target.invoke_required() && !self.invoke_required() {
            return self.commit_transfer(target, item);
        }

        let source = self.clone();
        let target = target.clone();
        let item = item.clone();
        let timeout = self.inner.transfer_timeout;
        self.inner.invoker.invoke_async(move || {
            if !source.owns(&item) {
                return Err(source.not_owned(&item));
            }
            let commit_source = source.clone();
            let commit_target = target.clone();
            let commit_item = item.clone();
            target.invoker().invoke_sync_timeout(
                move || commit_source.commit_transfer(&commit_target, &commit_item),
                timeout,
            )
        })
    }

    /// Move `item` between the child sets and hand it to the calling thread.
    fn commit_transfer(&self, target: &InvokeManager, item: &Arc<dyn Invokable>) -> RunLoopResult<()> {
        let item_id = item.invoker().id();
        {
            let (mut source_children, mut target_children) = self.lock_pair(target);
            let position = source_children
                .iter()
                .position(|c| c.invoker().id() == item_id)
                .ok_or_else(|| self.not_owned(item))?;
            let moved = source_children.swap_remove(position);
            target_children.push(moved);
        }

        item.invoker().set_manager(Some(target.id()));
        item.change_owner(thread::current().id());
        info!(
            item = %item.invoker(),
            from = %self.inner.invoker,
            to = %target.inner.invoker,
            "Invoker transferred"
        );
        Ok(())
    }

    /// Lock `self` and `other` child sets in manager-id order.
    ///
    /// Returns the guards as (self, other) regardless of acquisition order.
    fn lock_pair<'a>(
        &'a self,
        other: &'a InvokeManager,
    ) -> (MutexGuard<'a, Children>, MutexGuard<'a, Children>) {
        if self.id() < other.id() {
            let first = self.inner.children.lock();
            let second = other.inner.children.lock();
            (first, second)
        } else {
            let first = other.inner.children.lock();
            let second = self.inner.children.lock();
            (second, first)
        }
    }

    fn not_owned(&self, item: &Arc<dyn Invokable>) -> RunLoopError {
        RunLoopError::NotOwned {
            item: item.invoker().name().to_string(),
            manager: self.inner.invoker.name().to_string(),
        }
    }

    fn snapshot(&self) -> Children {
        self.inner.children.lock().clone()
    }

    /// Poll the manager's queue, then every owned child once.
    pub fn poll_invokes(&self) -> RunLoopResult<usize> {
        self.poll(&CancellationToken::new())
    }
}

impl Invokable for InvokeManager {
    fn invoker(&self) -> &Invoker {
        &self.inner.invoker
    }

    fn poll(&self, cancel: &CancellationToken) -> RunLoopResult<usize> {
        let mut executed = self.inner.invoker.poll_invokes_until(cancel)?;
        for child in self.snapshot() {
            if cancel.is_cancelled() {
                break;
            }
            // Handed away since the snapshot was taken.
            if child.invoker().invoke_required() {
                continue;
            }
            executed += child.poll(cancel)?;
        }
        Ok(executed)
    }

    fn change_owner(&self, owner: ThreadId) {
        for child in self.snapshot() {
            child.change_owner(owner);
        }
        self.inner.invoker.change_owner(owner);
    }

    fn pending(&self) -> usize {
        self.inner.invoker.pending() + self.snapshot().iter().map(|c| c.pending()).sum::<usize>()
    }
}

impl std::fmt::Debug for InvokeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeManager")
            .field("invoker", &self.inner.invoker)
            .field("children", &self.children_len())
            .finish()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
