//! One-shot completion slot used by synchronous invokes.
//!
//! The blocked caller holds the [`Completion`]; the queued call owns a
//! [`Completer`]. The slot moves `Pending -> Running -> Done`, or
//! `Pending -> Withdrawn` when the caller gives up before the owner
//! picks the call up. A completer dropped without finishing (queue
//! released, or the call panicked) wakes the caller with `Dropped`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::error::{RunLoopError, RunLoopResult};

enum SlotState<R> {
    Pending,
    Running,
    Done(RunLoopResult<R>),
    Withdrawn,
    Dropped,
    Taken,
}

/// Waiter side of a synchronous invoke.
pub(crate) struct Completion<R> {
    state: Mutex<SlotState<R>>,
    signal: Condvar,
    label: String,
}

impl<R> Completion<R> {
    /// Create a slot and the completer that fills it.
    pub(crate) fn pair(label: impl Into<String>) -> (Arc<Self>, Completer<R>) {
        let slot = Arc::new(Self {
            state: Mutex::new(SlotState::Pending),
            signal: Condvar::new(),
            label: label.into(),
        });
        let completer = Completer {
            slot: slot.clone(),
            finished: false,
        };
        (slot, completer)
    }

    /// Block until the call has run.
    pub(crate) fn wait(&self) -> RunLoopResult<R> {
        let mut state = self.state.lock();
        loop {
            if let Some(result) = self.take_finished(&mut state) {
                return result;
            }
            self.signal.wait(&mut state);
        }
    }

    /// Block until the call has run, withdrawing it if it has not started
    /// within `timeout`. A call that already started is always waited for.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> RunLoopResult<R> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        loop {
            if let Some(result) = self.take_finished(&mut state) {
                return result;
            }
            if matches!(*state, SlotState::Pending) && Instant::now() >= deadline {
                *state = SlotState::Withdrawn;
                return Err(RunLoopError::Timeout);
            }
            if matches!(*state, SlotState::Running) {
                self.signal.wait(&mut state);
            } else {
                let _ = self.signal.wait_until(&mut state, deadline);
            }
        }
    }

    fn take_finished(&self, state: &mut SlotState<R>) -> Option<RunLoopResult<R>> {
        match std::mem::replace(state, SlotState::Taken) {
            SlotState::Done(result) => Some(result),
            SlotState::Dropped => Some(Err(RunLoopError::Dropped(self.label.clone()))),
            other => {
                *state = other;
                None
            }
        }
    }
}

/// Executor side of a synchronous invoke, moved into the queued call.
pub(crate) struct Completer<R> {
    slot: Arc<Completion<R>>,
    finished: bool,
}

impl<R> Completer<R> {
    /// Run `action` unless the waiter already withdrew the call.
    pub(crate) fn run<F>(mut self, action: F)
    where
        F: FnOnce() -> RunLoopResult<R>,
    {
        {
            let mut state = self.slot.state.lock();
            if !matches!(*state, SlotState::Pending) {
                self.finished = true;
                return;
            }
            *state = SlotState::Running;
        }

        let result = action();

        *self.slot.state.lock() = SlotState::Done(result);
        self.finished = true;
        self.slot.signal.notify_all();
    }
}

impl<R> Drop for Completer<R> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.slot.state.lock();
        if matches!(*state, SlotState::Pending | SlotState::Running) {
            *state = SlotState::Dropped;
        }
        drop(state);
        self.slot.signal.notify_all();
    }
}
