//! POSIX message queues with deadlines, cancellation, and pooled receive
//! buffers.
//!
//! # Crate Structure
//!
//! - [`queue`]: Owned queue handles: open, close, unlink, single kernel attempts
//! - [`transfer`]: Deadline-aware, cancellable send/receive and the buffer pool

/// Re-export queue handle types.
pub mod queue {
    pub use mqprims_queue::*;
}

/// Re-export transfer engine types.
pub mod transfer {
    pub use mqprims_transfer::*;
}

pub use mqprims_queue::{QueueConfig, QueueError};
pub use mqprims_transfer::{Context, Message, ReceivedMessage, TransferError};

#[cfg(target_os = "linux")]
pub use mqprims_queue::unlink;
#[cfg(target_os = "linux")]
pub use mqprims_transfer::MessageQueue;
