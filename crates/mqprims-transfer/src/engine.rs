//! The timed transfer state machine.
//!
//! Every logical send or receive runs:
//!
//! ```text
//! START ──► ATTEMPT ──► SUCCESS
//!              │   └──► FATAL       (timeout, would-block, OS error)
//!              ▼
//!          RETRYABLE ──► CANCELLED   (context cancelled)
//!              │    └──► TIMEOUT     (deadline already passed)
//!              └──► ATTEMPT          (same Wait value)
//! ```
//!
//! START checks cancellation and resolves the deadline exactly once. A
//! blocking attempt cannot observe cancellation until the kernel returns, so
//! cancellation latency is bounded by one in-flight attempt.

use std::io;
use std::sync::Arc;

use mqprims_queue::{KernelTime, QueueError, QueueOps, Wait};
use tracing::{debug, trace};

use crate::context::Context;
use crate::error::{Result, TransferError};
use crate::message::ReceivedMessage;
use crate::pool::BufferPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Send,
    Receive,
}

impl Direction {
    fn as_str(self) -> &'static str {
        match self {
            Direction::Send => "send",
            Direction::Receive => "receive",
        }
    }

    fn would_block(self) -> TransferError {
        match self {
            Direction::Send => TransferError::QueueFull,
            Direction::Receive => TransferError::QueueEmpty,
        }
    }
}

enum Classified {
    Retry,
    Fatal(TransferError),
}

/// Map the caller's deadline onto the kernel's wait vocabulary.
pub fn resolve_wait(ctx: &Context) -> Result<Wait> {
    match ctx.deadline() {
        None => Ok(Wait::Immediate),
        Some(at) => Ok(Wait::Until(KernelTime::from_system_time(at)?)),
    }
}

fn classify(err: io::Error, wait: Wait, direction: Direction) -> Classified {
    match err.raw_os_error() {
        Some(libc::EINTR) => Classified::Retry,
        Some(libc::ETIMEDOUT) => Classified::Fatal(TransferError::Timeout),
        Some(libc::EAGAIN) if wait == Wait::Immediate => {
            Classified::Fatal(direction.would_block())
        }
        _ => Classified::Fatal(TransferError::Os(err)),
    }
}

fn run<T>(
    ctx: &Context,
    direction: Direction,
    mut attempt: impl FnMut(Wait) -> io::Result<T>,
) -> Result<T> {
    if ctx.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    let wait = resolve_wait(ctx)?;

    let mut retries = 0u32;
    loop {
        match attempt(wait) {
            Ok(value) => return Ok(value),
            Err(err) => match classify(err, wait, direction) {
                Classified::Retry => {}
                Classified::Fatal(err) => return Err(err),
            },
        }

        retries = retries.saturating_add(1);
        if ctx.is_cancelled() {
            debug!(op = direction.as_str(), retries, "cancelled between attempts");
            return Err(TransferError::Cancelled);
        }
        if wait.deadline().is_some_and(|at| at.has_passed()) {
            return Err(TransferError::Timeout);
        }
        trace!(op = direction.as_str(), retries, "interrupted, retrying");
    }
}

/// Send `data` with `priority`, honouring `ctx`.
///
/// Without a deadline the call is immediate and a full queue yields
/// [`TransferError::QueueFull`]. With a deadline it blocks until space frees
/// up or the deadline passes ([`TransferError::Timeout`]).
pub fn send<Q: QueueOps + ?Sized>(
    queue: &Q,
    ctx: &Context,
    data: &[u8],
    priority: u32,
) -> Result<()> {
    let max = queue.max_message_size();
    if data.len() > max {
        return Err(TransferError::MessageTooLarge {
            size: data.len(),
            max,
        });
    }
    run(ctx, Direction::Send, |wait| {
        queue.try_send(data, priority, wait)
    })
}

/// Receive the next message, honouring `ctx`.
///
/// The message is read into a buffer from `pool`, which must hand out
/// buffers of at least the queue's maximum message size. Without a deadline
/// an empty queue yields [`TransferError::QueueEmpty`].
pub fn receive<Q: QueueOps + ?Sized>(
    queue: &Q,
    ctx: &Context,
    pool: &Arc<BufferPool>,
) -> Result<ReceivedMessage> {
    if ctx.is_cancelled() {
        return Err(TransferError::Cancelled);
    }
    let max = queue.max_message_size();
    if pool.buffer_size() < max {
        return Err(QueueError::InvalidConfig(format!(
            "receive buffers are {} bytes, queue messages may be {max}",
            pool.buffer_size()
        ))
        .into());
    }

    let mut buf = pool.acquire();
    let (len, priority) = run(ctx, Direction::Receive, |wait| {
        queue.try_receive(&mut buf[..max], wait)
    })?;
    Ok(ReceivedMessage::new(buf, len, priority))
}
