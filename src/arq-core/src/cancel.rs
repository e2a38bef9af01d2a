//! Cooperative cancellation for enumerations.
//!
//! Both sides wrap a [`tokio_util::sync::CancellationToken`]; the split only
//! keeps `cancel` off the side handed to selectors.

use common_error::{ArqError, ArqResult};
use tokio_util::sync;

pub use tokio_util::sync::WaitForCancellationFuture;

/// Owner side of a cancellation signal.
///
/// Cloning shares the same signal. Cancellation is sticky.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    signal: sync::CancellationToken,
}

impl CancellationHandle {
    /// Create an untriggered handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// A token observing this handle.
    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            signal: self.signal.clone(),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.signal.cancel();
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }
}

/// Observer side of a cancellation signal, handed to cancellable selectors.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    signal: sync::CancellationToken,
}

impl CancellationToken {
    /// A token that is never cancelled.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Resolve once cancellation is requested.
    ///
    /// Never resolves for [`CancellationToken::none`] or when every handle
    /// was dropped without cancelling.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.signal.cancelled()
    }

    /// Fail with `OperationCancelled` if cancellation was requested.
    pub fn ensure_not_cancelled(&self, context: &str) -> ArqResult<()> {
        if self.is_cancelled() {
            return Err(ArqError::cancelled(format!("cancelled during {context}")));
        }
        Ok(())
    }
}
