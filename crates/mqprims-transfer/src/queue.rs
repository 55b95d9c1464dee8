use std::sync::Arc;

use mqprims_queue::{QueueConfig, QueueHandle};

use crate::context::Context;
use crate::engine;
use crate::error::Result;
use crate::message::{Message, ReceivedMessage};
use crate::pool::{BufferPool, PoolConfig};

/// An open queue with deadline-aware send and receive.
///
/// Owns the [`QueueHandle`] and a receive buffer pool sized to the queue's
/// maximum message size. `MessageQueue` is `Send + Sync`: wrap it in `Arc`
/// to send and receive from several threads at once.
#[derive(Debug)]
pub struct MessageQueue {
    handle: QueueHandle,
    pool: Arc<BufferPool>,
}

impl MessageQueue {
    /// Create or attach to the named queue.
    pub fn open(name: &str, config: &QueueConfig) -> Result<Self> {
        let handle = QueueHandle::open(name, config)?;
        Ok(Self::from_handle(handle))
    }

    /// Wrap an already open handle.
    pub fn from_handle(handle: QueueHandle) -> Self {
        Self::with_pool_config(handle, PoolConfig::default())
    }

    /// Wrap an open handle with explicit pool tuning.
    pub fn with_pool_config(handle: QueueHandle, pool_config: PoolConfig) -> Self {
        let pool = BufferPool::with_config(handle.max_message_size(), pool_config);
        Self { handle, pool }
    }

    /// Send `data` with `priority`. See [`engine::send`].
    pub fn send(&self, ctx: &Context, data: &[u8], priority: u32) -> Result<()> {
        engine::send(&self.handle, ctx, data, priority)
    }

    /// Send an owned message.
    pub fn send_message(&self, ctx: &Context, message: &Message) -> Result<()> {
        self.send(ctx, &message.payload, message.priority)
    }

    /// Receive the next message. See [`engine::receive`].
    pub fn receive(&self, ctx: &Context) -> Result<ReceivedMessage> {
        engine::receive(&self.handle, ctx, &self.pool)
    }

    pub fn handle(&self) -> &QueueHandle {
        &self.handle
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn max_message_size(&self) -> usize {
        self.handle.max_message_size()
    }

    /// Close the queue. Received messages still alive keep their buffers.
    pub fn close(self) -> Result<()> {
        self.handle.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn unique_name(tag: &str) -> String {
        format!(
            "/mqprims-transfer-{tag}-{}-{}",
            std::process::id(),
            SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        )
    }

    #[test]
    fn send_receive_roundtrip() {
        let name = unique_name("roundtrip");
        let mq = MessageQueue::open(&name, &QueueConfig::new(2, 10)).unwrap();
        let ctx = Context::background();

        mq.send(&ctx, b"test", 0).unwrap();
        let received = mq.receive(&ctx).unwrap();
        assert_eq!(&*received, b"test");
        drop(received);
        assert_eq!(mq.pool().idle(), 1);

        mq.close().unwrap();
        mqprims_queue::unlink(&name).unwrap();
    }

    #[test]
    fn send_message_keeps_priority() {
        let name = unique_name("message");
        let mq = MessageQueue::open(&name, &QueueConfig::new(4, 32)).unwrap();
        let ctx = Context::with_timeout(Duration::from_secs(1));

        mq.send_message(&ctx, &Message::new(5, &b"five"[..])).unwrap();
        let owned = mq.receive(&ctx).unwrap().into_message();
        assert_eq!(owned, Message::new(5, &b"five"[..]));

        mq.close().unwrap();
        mqprims_queue::unlink(&name).unwrap();
    }
}
