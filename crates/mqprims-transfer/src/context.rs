use std::time::{Duration, SystemTime};

use mqprims_queue::KernelTime;
use tokio_util::sync::CancellationToken;

/// The caller's deadline and cancellation signal for one or more calls.
///
/// A context without a deadline makes every call immediate: it succeeds or
/// fails on the queue's current state without blocking. Cancellation is
/// observed before the first kernel attempt and between retries, never
/// inside a blocking kernel call.
///
/// Cloning is cheap; clones share the cancellation signal.
#[derive(Debug, Clone)]
pub struct Context {
    deadline: Option<SystemTime>,
    cancel: CancellationToken,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl Context {
    /// No deadline, not cancelled.
    pub fn background() -> Self {
        Self::default()
    }

    /// Deadline `timeout` from now.
    ///
    /// A timeout reaching past the latest instant the kernel accepts, such
    /// as `Duration::MAX`, is clamped to that instant, so the call blocks
    /// until the transfer completes or the context is cancelled.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Self::deadline_after(timeout)),
            cancel: CancellationToken::new(),
        }
    }

    /// The instant `timeout` from now, clamped to [`KernelTime::MAX`].
    pub fn deadline_after(timeout: Duration) -> SystemTime {
        let latest = KernelTime::MAX.to_system_time();
        SystemTime::now()
            .checked_add(timeout)
            .map_or(latest, |at| at.min(latest))
    }

    /// Absolute wall-clock deadline.
    pub fn with_deadline(deadline: SystemTime) -> Self {
        Self {
            deadline: Some(deadline),
            cancel: CancellationToken::new(),
        }
    }

    /// Use `token` as the cancellation signal.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Replace the deadline, keeping the cancellation signal.
    pub fn deadline_at(mut self, deadline: Option<SystemTime>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Derived context that is cancelled with `self` but can also be
    /// cancelled on its own.
    pub fn child(&self) -> Self {
        Self {
            deadline: self.deadline,
            cancel: self.cancel.child_token(),
        }
    }

    pub fn deadline(&self) -> Option<SystemTime> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The cancellation token, for wiring into signal handlers.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }
}
