//! # Tether RunLoop
//!
//! Thread-affine objects and the cooperative loops that drive them.
//!
//! ## Model
//!
//! Every object that must only be touched from one OS thread carries an
//! [`Invoker`]: an owning thread plus a FIFO queue of deferred calls. A call
//! made on the owner runs inline; a call made anywhere else is queued and
//! executed later by the owner's loop.
//!
//! ```text
//! ┌──────────────────────────── Thread "main" ────────────────────────────┐
//! │  InvokeManager ── own queue                                          │
//! │        ├── child: Scheduler (Invoker + CronTasks)                    │
//! │        └── child: ThreadBound<T>                                     │
//! │                                                                      │
//! │  loop { poll manager + children → run_task() for each task → yield } │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Children move between managers with [`InvokeManager::transfer_to`]; calls
//! already queued on a child follow it to the new owner.
//!
//! ## Key Components
//!
//! - [`Invoker`]: ownership and deferred-call queue
//! - [`InvokeManager`]: an invoker that owns, polls and hands over children
//! - [`Thread`]: one OS thread running one dispatch loop
//! - [`ThreadTask`]: periodic work run once per loop iteration
//! - [`ThreadBound`]: a value only lent out on its owning thread
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use tether_runloop::{Thread, ThreadConfig};
//!
//! let worker = Thread::new("worker", ThreadConfig::default());
//! worker.start().unwrap();
//!
//! let name = worker
//!     .invoker()
//!     .invoke_sync(|| Ok(std::thread::current().name().map(str::to_string)))
//!     .unwrap();
//! assert_eq!(name.as_deref(), Some("worker"));
//!
//! worker.stop(Duration::from_secs(5)).unwrap();
//! ```

pub mod bound;
mod completion;
pub mod config;
pub mod error;
pub mod invoker;
pub mod manager;
pub mod metrics;
pub mod state;
pub mod thread;
pub mod thread_task;

// Re-exports
pub use bound::ThreadBound;
pub use config::{ErrorPolicy, ThreadConfig};
pub use error::{RunLoopError, RunLoopResult};
pub use invoker::{Invokable, Invoker, InvokerId};
pub use manager::{InvokeManager, DEFAULT_TRANSFER_TIMEOUT};
pub use metrics::{MetricsSnapshot, ThreadMetrics};
pub use state::{StopOutcome, ThreadState};
pub use thread::Thread;
pub use thread_task::ThreadTask;
// Re-export CancellationToken for convenience
pub use tokio_util::sync::CancellationToken;
