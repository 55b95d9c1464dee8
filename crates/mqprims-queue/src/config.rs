use std::ffi::CString;
use std::fmt;

use crate::error::{QueueError, Result};

/// Default maximum number of messages held by the kernel queue.
pub const DEFAULT_MAX_DEPTH: usize = 10;
/// Default maximum size of a single message in bytes.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 8192;
/// Default permission bits used when the queue is created.
pub const DEFAULT_QUEUE_MODE: u32 = 0o600;
/// Longest name the kernel accepts, excluding the leading slash.
pub const MAX_NAME_LEN: usize = 255;

/// Capacity and permission parameters passed wholesale to
/// [`QueueHandle::open`](crate::QueueHandle::open).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueConfig {
    /// Maximum number of unconsumed messages. Enforced by the kernel.
    pub max_depth: usize,
    /// Maximum message size in bytes. Sizes every receive buffer.
    pub max_message_size: usize,
    /// Permission bits applied when the open call creates the queue.
    pub mode: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            mode: DEFAULT_QUEUE_MODE,
        }
    }
}

impl QueueConfig {
    /// Config with explicit capacity and the default mode.
    pub fn new(max_depth: usize, max_message_size: usize) -> Self {
        Self {
            max_depth,
            max_message_size,
            ..Self::default()
        }
    }

    /// Reject parameters the kernel can never satisfy.
    ///
    /// Limits that depend on system settings (`/proc/sys/fs/mqueue/*`) are
    /// left to the kernel and surface as [`QueueError::Open`].
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(QueueError::InvalidConfig(
                "max_depth must be greater than zero".to_string(),
            ));
        }
        if self.max_message_size == 0 {
            return Err(QueueError::InvalidConfig(
                "max_message_size must be greater than zero".to_string(),
            ));
        }
        if i64::try_from(self.max_depth).is_err() || i64::try_from(self.max_message_size).is_err()
        {
            return Err(QueueError::InvalidConfig(
                "capacity does not fit the kernel attribute type".to_string(),
            ));
        }
        if self.mode & !0o777 != 0 {
            return Err(QueueError::InvalidConfig(format!(
                "mode {:#o} has bits outside 0o777",
                self.mode
            )));
        }
        Ok(())
    }
}

/// A validated message queue name, always stored with one leading slash.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct QueueName {
    name: String,
}

impl QueueName {
    /// Validate and normalise a queue name.
    ///
    /// Both `jobs` and `/jobs` name the same queue.
    pub fn new(name: &str) -> Result<Self> {
        let bare = name.strip_prefix('/').unwrap_or(name);
        let invalid = |reason| QueueError::InvalidName {
            name: name.to_string(),
            reason,
        };

        if bare.is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if bare.contains('/') {
            return Err(invalid("must not contain '/' after the leading slash"));
        }
        if bare.contains('\0') {
            return Err(invalid("must not contain NUL bytes"));
        }
        if bare.len() > MAX_NAME_LEN {
            return Err(invalid("name longer than 255 bytes"));
        }

        Ok(Self {
            name: format!("/{bare}"),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    pub(crate) fn to_c_string(&self) -> Result<CString> {
        CString::new(self.name.as_str()).map_err(|_| QueueError::InvalidName {
            name: self.name.clone(),
            reason: "must not contain NUL bytes",
        })
    }
}

impl fmt::Display for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for QueueName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.name, f)
    }
}
