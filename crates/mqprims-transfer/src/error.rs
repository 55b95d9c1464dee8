use mqprims_queue::QueueError;

/// Errors returned by a send or receive call.
///
/// Interrupted kernel calls are retried internally and never appear here.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// Opening, closing, or addressing the queue failed, or the deadline
    /// could not be converted to a kernel timestamp.
    #[error(transparent)]
    Queue(#[from] QueueError),

    /// The message exceeds the queue's maximum message size.
    #[error("message too large ({size} bytes, max {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// The queue was full and the call had no deadline.
    #[error("queue is full")]
    QueueFull,

    /// The queue was empty and the call had no deadline.
    #[error("queue is empty")]
    QueueEmpty,

    /// The deadline passed before the message was transferred.
    #[error("deadline exceeded")]
    Timeout,

    /// The caller cancelled the call before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// The kernel rejected the call.
    #[error("queue I/O error: {0}")]
    Os(std::io::Error),
}

/// Coarse classification of a [`TransferError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Invalid name, capacity, deadline, or message size.
    Configuration,
    /// Permission, descriptor limits, queue destroyed, other OS failures.
    Resource,
    /// Immediate-mode call found the queue full or empty.
    QueueState,
    /// The deadline elapsed.
    Timeout,
    /// The caller cancelled.
    Cancellation,
}

impl TransferError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TransferError::Queue(err) if err.is_configuration() => ErrorClass::Configuration,
            TransferError::Queue(_) | TransferError::Os(_) => ErrorClass::Resource,
            TransferError::MessageTooLarge { .. } => ErrorClass::Configuration,
            TransferError::QueueFull | TransferError::QueueEmpty => ErrorClass::QueueState,
            TransferError::Timeout => ErrorClass::Timeout,
            TransferError::Cancelled => ErrorClass::Cancellation,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, TransferError::Timeout)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }

    /// True for the immediate-mode "would block" outcomes.
    pub fn is_would_block(&self) -> bool {
        matches!(self, TransferError::QueueFull | TransferError::QueueEmpty)
    }
}

pub type Result<T> = std::result::Result<T, TransferError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes() {
        assert_eq!(TransferError::Timeout.class(), ErrorClass::Timeout);
        assert_eq!(TransferError::Cancelled.class(), ErrorClass::Cancellation);
        assert_eq!(TransferError::QueueFull.class(), ErrorClass::QueueState);
        assert_eq!(
            TransferError::MessageTooLarge { size: 11, max: 10 }.class(),
            ErrorClass::Configuration
        );
        assert_eq!(
            TransferError::Os(std::io::Error::from_raw_os_error(libc::EBADF)).class(),
            ErrorClass::Resource
        );
        assert_eq!(
            TransferError::from(QueueError::InvalidDeadline("x".into())).class(),
            ErrorClass::Configuration
        );
    }

    #[test]
    fn timeout_and_cancellation_are_distinct() {
        assert!(TransferError::Timeout.is_timeout());
        assert!(!TransferError::Timeout.is_cancelled());
        assert!(TransferError::Cancelled.is_cancelled());
        assert!(!TransferError::Cancelled.is_timeout());
    }
}
