//! Owned handles for POSIX message queues.
//!
//! This is the lowest layer of mqprims. It owns the kernel descriptors and
//! the negotiated capacity of one queue, and exposes single kernel attempts
//! through the [`QueueOps`] trait:
//! - open (create or attach) with an explicit [`QueueConfig`]
//! - close, exactly once, by consuming the handle
//! - unlink a name from the queue namespace
//!
//! Deadlines, cancellation, and retry policy live one layer up.

pub mod config;
pub mod error;
pub mod ops;

#[cfg(target_os = "linux")]
pub mod handle;

pub use config::{
    QueueConfig, QueueName, DEFAULT_MAX_DEPTH, DEFAULT_MAX_MESSAGE_SIZE, DEFAULT_QUEUE_MODE,
    MAX_NAME_LEN,
};
pub use error::{QueueError, Result};
pub use ops::{KernelTime, QueueOps, Wait};

#[cfg(target_os = "linux")]
pub use handle::{unlink, QueueHandle};
