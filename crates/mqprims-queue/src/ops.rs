use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::{QueueError, Result};

/// An absolute `CLOCK_REALTIME` instant in the representation the timed
/// queue calls expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct KernelTime {
    secs: i64,
    nanos: u32,
}

impl KernelTime {
    /// The latest instant the platform `time_t` can express.
    pub const MAX: KernelTime = KernelTime {
        secs: libc::time_t::MAX as i64,
        nanos: 999_999_999,
    };

    /// Convert a wall-clock deadline.
    ///
    /// Fails for instants before the Unix epoch and for instants whose
    /// seconds do not fit the platform `time_t`.
    pub fn from_system_time(at: SystemTime) -> Result<Self> {
        let since_epoch = at
            .duration_since(UNIX_EPOCH)
            .map_err(|_| QueueError::InvalidDeadline("deadline precedes the Unix epoch".into()))?;
        let secs = libc::time_t::try_from(since_epoch.as_secs()).map_err(|_| {
            QueueError::InvalidDeadline(format!(
                "{}s since the epoch does not fit time_t",
                since_epoch.as_secs()
            ))
        })?;

        Ok(Self {
            secs: i64::from(secs),
            nanos: since_epoch.subsec_nanos(),
        })
    }

    /// The wall-clock instant this value represents.
    pub fn to_system_time(self) -> SystemTime {
        // from_system_time only produces non-negative seconds
        UNIX_EPOCH + Duration::new(self.secs.unsigned_abs(), self.nanos)
    }

    /// Whether the instant is at or before the current wall-clock time.
    pub fn has_passed(&self) -> bool {
        SystemTime::now() >= self.to_system_time()
    }

    pub(crate) fn as_timespec(&self) -> libc::timespec {
        // SAFETY: timespec is plain old data; zero is a valid bit pattern and
        // lets us ignore platform-specific padding fields.
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        ts.tv_sec = self.secs as libc::time_t;
        ts.tv_nsec = self.nanos as _;
        ts
    }
}

/// How long a single kernel attempt may wait for queue space or a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Never block: succeed or fail on the queue's current state.
    Immediate,
    /// Block until the message is transferred or the instant passes.
    Until(KernelTime),
}

impl Wait {
    /// The absolute deadline, if any.
    pub fn deadline(&self) -> Option<KernelTime> {
        match self {
            Wait::Immediate => None,
            Wait::Until(at) => Some(*at),
        }
    }
}

/// Single kernel attempts against an open queue.
///
/// Each call issues exactly one kernel operation and reports its raw
/// outcome, including `EINTR`. Retry policy belongs to the caller.
pub trait QueueOps {
    /// Maximum message size negotiated at open time.
    fn max_message_size(&self) -> usize;

    /// Enqueue `data` with `priority`.
    ///
    /// Fails with `EAGAIN` under [`Wait::Immediate`] when the queue is full,
    /// and `ETIMEDOUT` when a [`Wait::Until`] deadline passes first.
    fn try_send(&self, data: &[u8], priority: u32, wait: Wait) -> io::Result<()>;

    /// Dequeue the oldest message of the highest priority into `buf`.
    ///
    /// `buf` must be at least [`max_message_size`](Self::max_message_size)
    /// long. Returns the number of bytes written and the message priority.
    fn try_receive(&self, buf: &mut [u8], wait: Wait) -> io::Result<(usize, u32)>;
}

impl<T: QueueOps + ?Sized> QueueOps for &T {
    fn max_message_size(&self) -> usize {
        (**self).max_message_size()
    }

    fn try_send(&self, data: &[u8], priority: u32, wait: Wait) -> io::Result<()> {
        (**self).try_send(data, priority, wait)
    }

    fn try_receive(&self, buf: &mut [u8], wait: Wait) -> io::Result<(usize, u32)> {
        (**self).try_receive(buf, wait)
    }
}

impl<T: QueueOps + ?Sized> QueueOps for std::sync::Arc<T> {
    fn max_message_size(&self) -> usize {
        (**self).max_message_size()
    }

    fn try_send(&self, data: &[u8], priority: u32, wait: Wait) -> io::Result<()> {
        (**self).try_send(data, priority, wait)
    }

    fn try_receive(&self, buf: &mut [u8], wait: Wait) -> io::Result<(usize, u32)> {
        (**self).try_receive(buf, wait)
    }
}
