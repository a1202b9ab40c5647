//! Cancellation and deadline carrier forwarded through every store call.
//!
//! # Responsibility
//! - Let callers abort in-flight storage work by cancelling or timing out.
//!
//! # Invariants
//! - Clones share one cancellation flag; cancelling any clone cancels all.
//! - Once done (cancelled or past deadline) a context never becomes live again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Reason a context is no longer live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context cancelled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Execution context for a single store operation.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl ExecContext {
    /// Context with no deadline that is only done when cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::default(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Cancels this context and every clone of it.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns why the context is done, or `None` while it is still live.
    ///
    /// Cancellation wins over an expired deadline.
    pub fn err(&self) -> Option<ContextError> {
        if self.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn check(&self) -> Result<(), ContextError> {
        match self.err() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ContextError, ExecContext};
    use std::time::{Duration, Instant};

    #[test]
    fn background_context_is_live_until_cancelled() {
        let ctx = ExecContext::background();
        assert!(ctx.check().is_ok());
        assert_eq!(ctx.deadline(), None);

        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
    }

    #[test]
    fn cancelling_a_clone_cancels_the_original() {
        let ctx = ExecContext::with_timeout(Duration::from_secs(60));
        let handle = ctx.clone();
        handle.cancel();
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
    }

    #[test]
    fn expired_deadline_reports_deadline_exceeded() {
        let ctx = ExecContext::with_deadline(Instant::now() - Duration::from_millis(1));
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));

        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Cancelled));
    }
}
