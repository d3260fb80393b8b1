//! Cooperative cancellation.
//! A cheap, cloneable flag handed to long-running operations; the copy loop
//! checks it before each file and each subdirectory.
//!
//! Notes:
//! - Relaxed atomics are sufficient for a one-way "stop" flag.
//! - `cancel()` is safe to call from a signal handler thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::errors::CopyError;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation (idempotent).
    #[inline]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Cancellation point: `Err(CopyError::Cancelled)` once cancel() was called.
    #[inline]
    pub(crate) fn checkpoint(&self) -> Result<(), CopyError> {
        if self.is_cancelled() {
            Err(CopyError::Cancelled)
        } else {
            Ok(())
        }
    }
}
