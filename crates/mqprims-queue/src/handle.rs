use std::io;

use tracing::{debug, info};

use crate::config::{QueueConfig, QueueName};
use crate::error::{QueueError, Result};
use crate::ops::{QueueOps, Wait};

/// One kernel message queue descriptor, closed exactly once.
struct Descriptor {
    mqd: libc::mqd_t,
}

impl Descriptor {
    fn open(
        name: &std::ffi::CStr,
        oflag: libc::c_int,
        mode: u32,
        attr: Option<&libc::mq_attr>,
    ) -> io::Result<Self> {
        let attr_ptr = attr.map_or(std::ptr::null(), |a| a as *const libc::mq_attr);
        // SAFETY: `name` is a valid NUL-terminated string and `attr_ptr` is
        // either null or points to an initialised mq_attr that outlives the call.
        let mqd = unsafe { libc::mq_open(name.as_ptr(), oflag, mode as libc::mode_t, attr_ptr) };
        if mqd == -1 as libc::mqd_t {
            return Err(io::Error::last_os_error());
        }
        Ok(Self { mqd })
    }

    fn attributes(&self) -> io::Result<libc::mq_attr> {
        // SAFETY: mq_attr is plain old data.
        let mut attr: libc::mq_attr = unsafe { std::mem::zeroed() };
        // SAFETY: `self.mqd` is open and `attr` is a valid writable mq_attr.
        if unsafe { libc::mq_getattr(self.mqd, &mut attr) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(attr)
    }

    fn close(self) -> io::Result<()> {
        let mqd = self.mqd;
        std::mem::forget(self);
        // SAFETY: `mqd` was returned by mq_open and ownership ends here, so it
        // is closed exactly once.
        if unsafe { libc::mq_close(mqd) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

impl Drop for Descriptor {
    fn drop(&mut self) {
        // SAFETY: the descriptor is still owned; `close` forgets self first.
        let rc = unsafe { libc::mq_close(self.mqd) };
        debug!(rc, "closed queue descriptor on drop");
    }
}

/// An open POSIX message queue.
///
/// The handle owns two descriptors on the same kernel queue: a blocking one
/// used for deadline-bound attempts and an `O_NONBLOCK` one used for
/// immediate attempts. Neither descriptor's flags change after open.
///
/// The handle is `Send + Sync`; share it with `Arc` for concurrent use. The
/// kernel serialises concurrent calls on one queue.
pub struct QueueHandle {
    name: QueueName,
    blocking: Descriptor,
    nonblocking: Descriptor,
    config: QueueConfig,
}

impl QueueHandle {
    /// Create the named queue, or attach to it if it already exists.
    ///
    /// When the queue already exists the kernel keeps its original capacity;
    /// the handle reports the capacity the kernel actually uses.
    pub fn open(name: &str, config: &QueueConfig) -> Result<Self> {
        let name = QueueName::new(name)?;
        config.validate()?;
        let c_name = name.to_c_string()?;

        // SAFETY: mq_attr is plain old data.
        let mut attr: libc::mq_attr = unsafe { std::mem::zeroed() };
        attr.mq_maxmsg = config.max_depth as _;
        attr.mq_msgsize = config.max_message_size as _;

        let open_err = |source| QueueError::Open {
            name: name.to_string(),
            source,
        };

        let blocking = Descriptor::open(
            &c_name,
            libc::O_RDWR | libc::O_CREAT | libc::O_CLOEXEC,
            config.mode,
            Some(&attr),
        )
        .map_err(open_err)?;
        let nonblocking = Descriptor::open(
            &c_name,
            libc::O_RDWR | libc::O_NONBLOCK | libc::O_CLOEXEC,
            0,
            None,
        )
        .map_err(open_err)?;

        let actual = blocking.attributes().map_err(open_err)?;
        let negotiated = QueueConfig {
            max_depth: usize::try_from(actual.mq_maxmsg).unwrap_or(config.max_depth),
            max_message_size: usize::try_from(actual.mq_msgsize)
                .unwrap_or(config.max_message_size),
            mode: config.mode,
        };
        if negotiated.max_depth != config.max_depth
            || negotiated.max_message_size != config.max_message_size
        {
            debug!(
                %name,
                requested_depth = config.max_depth,
                requested_size = config.max_message_size,
                depth = negotiated.max_depth,
                size = negotiated.max_message_size,
                "attached to existing queue with different capacity"
            );
        }

        info!(
            %name,
            max_depth = negotiated.max_depth,
            max_message_size = negotiated.max_message_size,
            "opened message queue"
        );

        Ok(Self {
            name,
            blocking,
            nonblocking,
            config: negotiated,
        })
    }

    /// Release the kernel descriptors.
    ///
    /// Both descriptors are closed even when the first close fails; the
    /// first failure is returned. The queue itself stays in the namespace
    /// until [`unlink`] removes it.
    pub fn close(self) -> Result<()> {
        let QueueHandle {
            name,
            blocking,
            nonblocking,
            ..
        } = self;
        let first = blocking.close();
        let second = nonblocking.close();
        debug!(%name, "closed message queue");
        first.and(second).map_err(QueueError::Close)
    }

    /// Normalised queue name, including the leading slash.
    pub fn name(&self) -> &QueueName {
        &self.name
    }

    /// Maximum number of unconsumed messages the kernel holds.
    pub fn max_depth(&self) -> usize {
        self.config.max_depth
    }

    /// Maximum message size in bytes.
    pub fn max_message_size(&self) -> usize {
        self.config.max_message_size
    }

    /// Capacity in effect for this queue.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }
}

impl QueueOps for QueueHandle {
    fn max_message_size(&self) -> usize {
        self.config.max_message_size
    }

    fn try_send(&self, data: &[u8], priority: u32, wait: Wait) -> io::Result<()> {
        let ptr = data.as_ptr().cast::<libc::c_char>();
        let rc = match wait {
            // SAFETY: `ptr` is valid for `data.len()` bytes for the duration
            // of the call and the descriptor is open while `self` is alive.
            Wait::Immediate => unsafe {
                libc::mq_send(self.nonblocking.mqd, ptr, data.len(), priority)
            },
            Wait::Until(at) => {
                let ts = at.as_timespec();
                // SAFETY: as above; `ts` lives on this frame for the call.
                unsafe { libc::mq_timedsend(self.blocking.mqd, ptr, data.len(), priority, &ts) }
            }
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn try_receive(&self, buf: &mut [u8], wait: Wait) -> io::Result<(usize, u32)> {
        let ptr = buf.as_mut_ptr().cast::<libc::c_char>();
        let mut priority: libc::c_uint = 0;
        let n = match wait {
            // SAFETY: `ptr` is valid for writes of `buf.len()` bytes and
            // `priority` is a valid out pointer for the call.
            Wait::Immediate => unsafe {
                libc::mq_receive(self.nonblocking.mqd, ptr, buf.len(), &mut priority)
            },
            Wait::Until(at) => {
                let ts = at.as_timespec();
                // SAFETY: as above; `ts` lives on this frame for the call.
                unsafe {
                    libc::mq_timedreceive(self.blocking.mqd, ptr, buf.len(), &mut priority, &ts)
                }
            }
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok((n as usize, priority))
    }
}

impl std::fmt::Debug for QueueHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueHandle")
            .field("name", &self.name)
            .field("max_depth", &self.config.max_depth)
            .field("max_message_size", &self.config.max_message_size)
            .finish()
    }
}

/// Remove a queue name from the kernel namespace.
///
/// Open handles keep working; the queue is destroyed once the last one
/// closes.
pub fn unlink(name: &str) -> Result<()> {
    let name = QueueName::new(name)?;
    let c_name = name.to_c_string()?;
    // SAFETY: `c_name` is a valid NUL-terminated string.
    if unsafe { libc::mq_unlink(c_name.as_ptr()) } != 0 {
        return Err(QueueError::Unlink {
            name: name.to_string(),
            source: io::Error::last_os_error(),
        });
    }
    debug!(%name, "unlinked message queue");
    Ok(())
}
