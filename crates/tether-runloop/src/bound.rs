//! Values that may only be touched on their owning thread.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{RunLoopError, RunLoopResult};
use crate::invoker::{Invokable, Invoker};

/// A value paired with an [`Invoker`].
///
/// Direct access through [`ThreadBound::with`] is only granted on the owning
/// thread. Everyone else goes through [`ThreadBound::invoke_async`] or
/// [`ThreadBound::invoke_sync`], which run the closure on the owner.
pub struct ThreadBound<T> {
    invoker: Invoker,
    value: Arc<Mutex<T>>,
}

impl<T: Send + 'static> ThreadBound<T> {
    /// Wrap `value` in an unowned handle.
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            invoker: Invoker::new(name),
            value: Arc::new(Mutex::new(value)),
        }
    }

    /// Lend `&mut T` to `f` on the owning thread.
    ///
    /// Fails with [`RunLoopError::NotOwner`] anywhere else. Not reentrant.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> RunLoopResult<R> {
        if self.invoker.invoke_required() {
            return Err(RunLoopError::NotOwner {
                invoker: self.invoker.name().to_string(),
            });
        }
        let mut value = self.value.lock();
        Ok(f(&mut value))
    }

    /// Mutate the value on the owning thread without waiting.
    pub fn invoke_async<F>(&self, f: F) -> RunLoopResult<()>
    where
        F: FnOnce(&mut T) + Send + 'static,
    {
        let value = self.value.clone();
        self.invoker.invoke_async(move || {
            f(&mut value.lock());
            Ok(())
        })
    }

    /// Run `f` against the value on the owning thread and return its result.
    pub fn invoke_sync<R, F>(&self, f: F) -> RunLoopResult<R>
    where
        R: Send + 'static,
        F: FnOnce(&mut T) -> R + Send + 'static,
    {
        let value = self.value.clone();
        self.invoker.invoke_sync(move || Ok(f(&mut value.lock())))
    }
}

impl<T> Clone for ThreadBound<T> {
    fn clone(&self) -> Self {
        Self {
            invoker: self.invoker.clone(),
            value: self.value.clone(),
        }
    }
}

impl<T: Send + 'static> Invokable for ThreadBound<T> {
    fn invoker(&self) -> &Invoker {
        &self.invoker
    }
}

impl<T> std::fmt::Debug for ThreadBound<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadBound")
            .field("invoker", &self.invoker)
            .finish_non_exhaustive()
    }
}
