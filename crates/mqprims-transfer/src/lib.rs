//! Deadline-aware, cancellable send and receive over POSIX message queues.
//!
//! This layer turns a caller's [`Context`] (optional deadline plus a
//! cancellation token) into the kernel's immediate / absolute-timeout
//! vocabulary, retries interrupted calls with the same deadline, and reads
//! messages into pooled buffers so receives do not allocate.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use mqprims_queue::QueueConfig;
//! use mqprims_transfer::{Context, MessageQueue};
//!
//! # fn main() -> mqprims_transfer::Result<()> {
//! let mq = MessageQueue::open("/jobs", &QueueConfig::new(10, 1024))?;
//! mq.send(&Context::background(), b"hello", 1)?;
//!
//! let msg = mq.receive(&Context::with_timeout(Duration::from_secs(1)))?;
//! assert_eq!(&*msg, b"hello");
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod message;
pub mod pool;

#[cfg(target_os = "linux")]
pub mod queue;

pub use context::Context;
pub use engine::{receive, resolve_wait, send};
pub use error::{ErrorClass, Result, TransferError};
pub use message::{Message, ReceivedMessage};
pub use pool::{BufferPool, PoolConfig, PooledBuffer, DEFAULT_MAX_RETAINED};

#[cfg(target_os = "linux")]
pub use queue::MessageQueue;

pub use tokio_util::sync::CancellationToken;
