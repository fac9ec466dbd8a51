//! Thread lifecycle state.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`crate::Thread`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ThreadState {
    /// Constructed, loop not spawned yet.
    Created = 0,
    /// Loop is spinning.
    Running = 1,
    /// Stop requested, waiting for the loop to exit.
    Stopping = 2,
    /// Loop exited or was abandoned by a forced stop.
    Stopped = 3,
}

impl From<u8> for ThreadState {
    fn from(v: u8) -> Self {
        match v {
            0 => ThreadState::Created,
            1 => ThreadState::Running,
            2 => ThreadState::Stopping,
            _ => ThreadState::Stopped,
        }
    }
}

impl std::fmt::Display for ThreadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ThreadState::Created => write!(f, "created"),
            ThreadState::Running => write!(f, "running"),
            ThreadState::Stopping => write!(f, "stopping"),
            ThreadState::Stopped => write!(f, "stopped"),
        }
    }
}

/// How a call to [`crate::Thread::stop`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The loop noticed the cleared running flag and exited in time.
    Graceful,
    /// The timeout elapsed; the loop was cancelled and its tasks force-stopped.
    Forced,
}
