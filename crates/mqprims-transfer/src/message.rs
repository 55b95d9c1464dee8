use std::ops::Deref;

use bytes::Bytes;

use crate::pool::PooledBuffer;

/// An owned message and its priority.
///
/// Higher priorities are delivered first; equal priorities are FIFO.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub priority: u32,
    pub payload: Bytes,
}

impl Message {
    pub fn new(priority: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            priority,
            payload: payload.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A received message backed by a pooled buffer.
///
/// Dereferences to exactly the bytes the sender wrote. The buffer returns to
/// its pool when this value is dropped.
#[derive(Debug)]
pub struct ReceivedMessage {
    buf: PooledBuffer,
    len: usize,
    priority: u32,
}

impl ReceivedMessage {
    pub(crate) fn new(buf: PooledBuffer, len: usize, priority: u32) -> Self {
        debug_assert!(len <= buf.len());
        Self { buf, len, priority }
    }

    /// Priority the sender attached.
    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len]
    }

    /// Copy out into an owned message and release the buffer.
    pub fn into_message(self) -> Message {
        Message {
            priority: self.priority,
            payload: Bytes::copy_from_slice(self.as_bytes()),
        }
    }
}

impl Deref for ReceivedMessage {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsRef<[u8]> for ReceivedMessage {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::BufferPool;

    #[test]
    fn view_is_truncated_to_length() {
        let pool = BufferPool::new(10);
        let mut buf = pool.acquire();
        buf[..4].copy_from_slice(b"test");

        let msg = ReceivedMessage::new(buf, 4, 3);
        assert_eq!(&*msg, b"test");
        assert_eq!(msg.len(), 4);
        assert_eq!(msg.priority(), 3);
    }

    #[test]
    fn into_message_releases_buffer() {
        let pool = BufferPool::new(10);
        let mut buf = pool.acquire();
        buf[..2].copy_from_slice(b"hi");

        let owned = ReceivedMessage::new(buf, 2, 1).into_message();
        assert_eq!(owned, Message::new(1, &b"hi"[..]));
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn empty_message() {
        let msg = Message::new(0, Vec::new());
        assert!(msg.is_empty());
        assert_eq!(msg.len(), 0);
    }
}
