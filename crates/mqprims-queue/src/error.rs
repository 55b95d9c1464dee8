/// Errors that can occur while opening, closing, or addressing a queue.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The queue name is not usable in the message queue namespace.
    #[error("invalid queue name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The requested capacity parameters are not usable.
    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),

    /// A deadline cannot be represented as an absolute kernel timestamp.
    #[error("invalid deadline: {0}")]
    InvalidDeadline(String),

    /// The kernel refused to create or attach to the queue.
    #[error("failed to open queue {name}: {source}")]
    Open {
        name: String,
        source: std::io::Error,
    },

    /// Releasing the queue descriptors failed.
    #[error("failed to close queue: {0}")]
    Close(std::io::Error),

    /// Removing the queue name from the namespace failed.
    #[error("failed to unlink queue {name}: {source}")]
    Unlink {
        name: String,
        source: std::io::Error,
    },
}

impl QueueError {
    /// True when the error was caused by caller-supplied parameters rather
    /// than by the operating system.
    pub fn is_configuration(&self) -> bool {
        match self {
            QueueError::InvalidName { .. }
            | QueueError::InvalidConfig(_)
            | QueueError::InvalidDeadline(_) => true,
            QueueError::Open { source, .. } => {
                source.raw_os_error() == Some(libc::EINVAL)
                    || source.raw_os_error() == Some(libc::ENAMETOOLONG)
            }
            _ => false,
        }
    }

    /// The underlying OS error, if any.
    pub fn os_error(&self) -> Option<&std::io::Error> {
        match self {
            QueueError::Open { source, .. } | QueueError::Unlink { source, .. } => Some(source),
            QueueError::Close(source) => Some(source),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
