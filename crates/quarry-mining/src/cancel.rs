//! Cooperative cancellation.

use std::sync::Mutex;

/// A shared cancellation flag set by asynchronous chain-tip
/// notifications and polled by the solver between work units.
///
/// The flag is a boolean guarded by a lock: writers and the cooperative
/// poll serialize on it, and the poll is a bounded critical section
/// that never waits on anything else.
#[derive(Debug, Default)]
pub struct CancelToken {
    flag: Mutex<bool>,
}

impl CancelToken {
    /// Creates a cleared token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the in-progress search.
    pub fn set(&self) {
        *self.flag.lock().expect("cancel flag lock poisoned") = true;
    }

    /// Non-blocking poll.
    pub fn is_set(&self) -> bool {
        *self.flag.lock().expect("cancel flag lock poisoned")
    }

    /// Clears the flag once a loop has observed it and restarted, or
    /// when the tip change was caused by our own submission.
    pub fn acknowledge(&self) {
        *self.flag.lock().expect("cancel flag lock poisoned") = false;
    }
}
