//! Cooperative cancellation and the per-run job context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::log::JobLog;

/// Shared stop flag checked by a job once per loop iteration.
///
/// Clones observe the same flag. Cancelling never interrupts an engine call
/// already in progress.
///
/// # Examples
/// ```
/// use beamsec::CancelToken;
///
/// let token = CancelToken::new();
/// let observer = token.clone();
/// token.cancel();
/// assert!(observer.is_cancelled());
/// ```
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the job stop before its next item.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Everything a running job needs besides its engine and configuration.
#[derive(Clone, Debug)]
pub struct JobContext {
    /// Progress log of the run.
    pub log: JobLog,
    /// Stop flag of the run.
    pub cancel: CancelToken,
}

impl JobContext {
    /// Context with a fresh cancel token.
    #[must_use]
    pub fn new(log: JobLog) -> Self {
        Self {
            log,
            cancel: CancelToken::new(),
        }
    }

    /// Context that observes an existing cancel token.
    #[must_use]
    pub fn with_cancel(log: JobLog, cancel: CancelToken) -> Self {
        Self { log, cancel }
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
