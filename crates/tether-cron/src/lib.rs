//! # Tether Cron
//!
//! Five-field cron expressions and a scheduler that runs on a
//! [`tether_runloop::Thread`].
//!
//! ```text
//!  ┌───────────── minute (0 - 59)
//!  │ ┌───────────── hour (0 - 23)
//!  │ │ ┌───────────── day of month (1 - 31)
//!  │ │ │ ┌───────────── month (1 - 12, jan - dec)
//!  │ │ │ │ ┌───────────── day of week (0 - 7, sun - sat; 0 and 7 are Sunday)
//!  │ │ │ │ │
//!  * * * * *
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tether_cron::Scheduler;
//! use tether_runloop::{Thread, ThreadConfig};
//!
//! let thread = Thread::new("cron", ThreadConfig::default());
//! let scheduler = Arc::new(Scheduler::new("cron"));
//! scheduler.add_task("*/5 * * * *", || println!("tick")).unwrap();
//!
//! thread.attach(scheduler.clone()).unwrap();
//! thread.start().unwrap();
//! // ...
//! thread.stop(Duration::from_secs(5)).unwrap();
//! ```

pub mod clock;
pub mod error;
pub mod field;
pub mod scheduler;
pub mod task;

pub use clock::{Clock, LocalClock, ManualClock};
pub use error::{CronError, CronResult, FieldErrorKind};
pub use field::{CronField, FieldKind};
pub use scheduler::{JobId, Scheduler};
pub use task::{CronSchedule, CronTask};
