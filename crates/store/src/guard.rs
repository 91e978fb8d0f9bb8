//! In-flight guard.

use dayflow_core::WorkflowError;
use std::sync::atomic::{AtomicBool, Ordering};

/// Holds the store's in-flight flag until dropped.
///
/// Dropping releases the flag, so a cancelled call frees the store too.
pub(crate) struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    /// Set the flag, or fail with `Busy` if another call holds it.
    pub(crate) fn acquire(flag: &'a AtomicBool) -> Result<Self, WorkflowError> {
        flag.compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .map_err(|_| WorkflowError::Busy)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
