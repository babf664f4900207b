//! Cooperative cancellation signals polled by the scanner.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio_util::sync::CancellationToken;

/// A signal the scanner polls on entry to each node and before each
/// directory entry.
pub trait CancelCheck {
    /// Returns `true` once the scan should stop.
    fn is_canceled(&self) -> bool;
}

/// A signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelCheck for NeverCancel {
    fn is_canceled(&self) -> bool {
        false
    }
}

impl CancelCheck for CancellationToken {
    fn is_canceled(&self) -> bool {
        self.is_cancelled()
    }
}

impl CancelCheck for AtomicBool {
    fn is_canceled(&self) -> bool {
        self.load(Ordering::Relaxed)
    }
}

impl<T: CancelCheck + ?Sized> CancelCheck for &T {
    fn is_canceled(&self) -> bool {
        (**self).is_canceled()
    }
}

impl<T: CancelCheck + ?Sized> CancelCheck for Arc<T> {
    fn is_canceled(&self) -> bool {
        (**self).is_canceled()
    }
}
