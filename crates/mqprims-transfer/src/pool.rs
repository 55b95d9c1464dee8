use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::debug;

/// Default number of idle buffers a pool keeps for reuse.
pub const DEFAULT_MAX_RETAINED: usize = 64;

/// Pool tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Idle buffers kept after release. Extra buffers are freed.
    pub max_retained: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_retained: DEFAULT_MAX_RETAINED,
        }
    }
}

/// Reusable receive buffers, all exactly `buffer_size` bytes long.
///
/// The pool only saves allocations. A miss allocates a fresh buffer of the
/// right size, and idle buffers may be dropped at any time.
#[derive(Debug)]
pub struct BufferPool {
    buffer_size: usize,
    max_retained: usize,
    idle: Mutex<Vec<Vec<u8>>>,
}

impl BufferPool {
    pub fn new(buffer_size: usize) -> Arc<Self> {
        Self::with_config(buffer_size, PoolConfig::default())
    }

    pub fn with_config(buffer_size: usize, config: PoolConfig) -> Arc<Self> {
        Arc::new(Self {
            buffer_size,
            max_retained: config.max_retained,
            idle: Mutex::new(Vec::new()),
        })
    }

    /// Take a buffer out of the pool, allocating one on a miss.
    ///
    /// The buffer goes back to the pool when the guard is dropped.
    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let reused = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop();
        let buf = match reused {
            Some(buf) => buf,
            None => {
                debug!(size = self.buffer_size, "buffer pool miss");
                vec![0u8; self.buffer_size]
            }
        };
        PooledBuffer {
            buf: Some(buf),
            pool: Arc::clone(self),
        }
    }

    /// Size of every buffer handed out.
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Number of idle buffers currently retained.
    pub fn idle(&self) -> usize {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Drop every idle buffer.
    pub fn shrink(&self) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        idle.clear();
        idle.shrink_to_fit();
    }

    fn release(&self, buf: Vec<u8>) {
        // Guards never resize, but a wrong-sized buffer must not be reused.
        if buf.len() != self.buffer_size {
            return;
        }
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.max_retained {
            idle.push(buf);
        }
    }
}

/// A buffer checked out of a [`BufferPool`].
///
/// Exclusively owned by one holder until dropped.
#[derive(Debug)]
pub struct PooledBuffer {
    buf: Option<Vec<u8>>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().unwrap_or_default()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.release(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn miss_allocates_exact_size() {
        let pool = BufferPool::new(10);
        let buf = pool.acquire();
        assert_eq!(buf.len(), 10);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn released_buffer_is_reused() {
        let pool = BufferPool::new(16);
        let first = pool.acquire();
        let addr = first.as_ptr() as usize;
        drop(first);
        assert_eq!(pool.idle(), 1);

        let second = pool.acquire();
        assert_eq!(second.as_ptr() as usize, addr);
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn retention_is_capped() {
        let pool = BufferPool::with_config(8, PoolConfig { max_retained: 2 });
        let bufs: Vec<_> = (0..5).map(|_| pool.acquire()).collect();
        drop(bufs);
        assert_eq!(pool.idle(), 2);

        pool.shrink();
        assert_eq!(pool.idle(), 0);
        assert_eq!(pool.acquire().len(), 8);
    }

    #[test]
    fn held_buffers_are_distinct() {
        let pool = BufferPool::new(32);
        let held: Vec<_> = (0..8).map(|_| pool.acquire()).collect();
        let addrs: HashSet<usize> = held.iter().map(|b| b.as_ptr() as usize).collect();
        assert_eq!(addrs.len(), held.len());
    }

    #[test]
    fn concurrent_holders_never_share_a_buffer() {
        let pool = BufferPool::new(64);
        let handles: Vec<_> = (0..4u8)
            .map(|tag| {
                let pool = Arc::clone(&pool);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        let mut buf = pool.acquire();
                        buf.fill(tag);
                        std::thread::yield_now();
                        assert!(buf.iter().all(|&b| b == tag), "buffer shared across holders");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert!(pool.idle() <= 4);
    }
}
