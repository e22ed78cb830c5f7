//! Request-scoped execution context
//!
//! Every store call receives a [`CallContext`] from the calling layer. It
//! carries the request and account ids used to tag log events, an optional
//! deadline, a cancellation flag shared by all clones, and the parent
//! tracing span under which the store opens its own span.
//!
//! ```ignore
//! let ctx = CallContext::new("req-1", "acct-1").with_timeout(Duration::from_secs(30));
//! let handle = ctx.cancel_handle();
//! // from another thread:
//! handle.cancel();
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::Span;

/// Why a call stopped before completing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Interrupted {
    /// Cancelled through a [`CancelHandle`]
    #[error("call cancelled")]
    Cancelled,
    /// The deadline passed
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Bounded execution context for one store call
#[derive(Debug, Clone)]
pub struct CallContext {
    request_id: String,
    account_id: String,
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
    span: Span,
}

impl CallContext {
    /// Create a context with no deadline, parented on the current span.
    pub fn new(request_id: impl Into<String>, account_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            account_id: account_id.into(),
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
            span: Span::current(),
        }
    }

    /// Context with empty request/account ids, for tooling and tests.
    pub fn background() -> Self {
        Self::new("", "")
    }

    /// Bound the call to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    /// Bound the call to an absolute deadline.
    ///
    /// An earlier deadline already set is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Use `span` as the parent of the spans opened by the store.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Request id used in log events
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Account id used in log events
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Parent span for store spans
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Absolute deadline, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline.
    ///
    /// `None` when unbounded, `Some(ZERO)` once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Handle that cancels this context and all its clones.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancelled: Arc::clone(&self.cancelled),
        }
    }

    /// Cancel this context.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Check if the context was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Fail if the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<(), Interrupted> {
        if self.is_cancelled() {
            return Err(Interrupted::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupted::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

/// Cancels the [`CallContext`] it was taken from
#[derive(Debug, Clone)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Cancel the context.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }
}
