//! Reusable output buffers shared by concurrent encode calls.
//!
//! The pool is unbounded and striped into independently locked shards, so
//! concurrent callers rarely touch the same lock. A buffer is handed out
//! wrapped in a [`PooledBuffer`] guard, which gives the buffer back exactly
//! once when it is dropped, whether the borrowing call returned normally,
//! bailed out with `?`, or unwound.

use bytes::BytesMut;
use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Initial capacity of a freshly allocated output buffer (100 KiB).
pub const DEFAULT_BUFFER_CAPACITY: usize = 100 << 10;
/// Buffers that grew beyond this capacity are dropped instead of pooled.
pub const DEFAULT_MAX_RETAINED_CAPACITY: usize = 16 << 20;
/// Default number of pool shards.
pub const DEFAULT_POOL_SHARDS: usize = 8;

/// A striped pool of growable output buffers.
#[derive(Debug)]
pub struct BufferPool {
    shards: Box<[Mutex<Vec<BytesMut>>]>,
    next_shard: AtomicUsize,
    pooled: AtomicUsize,
    initial_capacity: usize,
    max_retained_capacity: usize,
}

impl BufferPool {
    /// Creates a pool with default settings.
    pub fn new() -> Self {
        Self::with_settings(
            DEFAULT_BUFFER_CAPACITY,
            DEFAULT_MAX_RETAINED_CAPACITY,
            DEFAULT_POOL_SHARDS,
        )
    }

    /// Creates a pool with explicit sizing.
    ///
    /// A shard count of zero is treated as one.
    pub fn with_settings(
        initial_capacity: usize,
        max_retained_capacity: usize,
        shards: usize,
    ) -> Self {
        let shards = (0..shards.max(1))
            .map(|_| Mutex::new(Vec::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Self {
            shards,
            next_shard: AtomicUsize::new(0),
            pooled: AtomicUsize::new(0),
            initial_capacity,
            max_retained_capacity,
        }
    }

    /// Takes an idle buffer from the pool, or allocates a new one.
    pub fn acquire(&self) -> PooledBuffer<'_> {
        let shard_count = self.shards.len();
        let start = self.next_shard.fetch_add(1, Ordering::Relaxed);
        for offset in 0..shard_count {
            let shard = &self.shards[(start + offset) % shard_count];
            // A busy shard is skipped rather than waited on.
            if let Some(mut idle) = shard.try_lock() {
                if let Some(buffer) = idle.pop() {
                    self.pooled.fetch_sub(1, Ordering::Relaxed);
                    return PooledBuffer {
                        buffer,
                        pool: Some(self),
                    };
                }
            }
        }
        PooledBuffer {
            buffer: BytesMut::with_capacity(self.initial_capacity),
            pool: Some(self),
        }
    }

    fn release(&self, mut buffer: BytesMut) {
        if buffer.capacity() > self.max_retained_capacity {
            tracing::warn!(
                capacity = buffer.capacity(),
                limit = self.max_retained_capacity,
                "discarding oversized output buffer instead of pooling it"
            );
            return;
        }
        buffer.clear();
        let index = self.next_shard.fetch_add(1, Ordering::Relaxed) % self.shards.len();
        let mut idle = self.shards[index].lock();
        idle.push(buffer);
        self.pooled.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of idle buffers currently held by the pool.
    pub fn size(&self) -> usize {
        self.pooled.load(Ordering::Relaxed)
    }

    /// Returns the capacity given to newly allocated buffers.
    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Drops every idle buffer.
    pub fn clear(&self) {
        for shard in self.shards.iter() {
            let mut idle = shard.lock();
            let dropped = idle.len();
            idle.clear();
            self.pooled.fetch_sub(dropped, Ordering::Relaxed);
        }
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new()
    }
}

/// An output buffer borrowed from a [`BufferPool`].
///
/// Dropping the guard clears the buffer and returns it to its pool. Guards
/// created with [`PooledBuffer::detached`] belong to no pool and simply free
/// their memory.
#[derive(Debug)]
pub struct PooledBuffer<'a> {
    buffer: BytesMut,
    pool: Option<&'a BufferPool>,
}

impl PooledBuffer<'static> {
    /// Wraps a buffer that is not owned by any pool.
    pub fn detached(buffer: BytesMut) -> Self {
        Self { buffer, pool: None }
    }
}

impl PooledBuffer<'_> {
    /// Returns true if the buffer goes back to a pool when dropped.
    pub fn is_pooled(&self) -> bool {
        self.pool.is_some()
    }
}

impl Deref for PooledBuffer<'_> {
    type Target = BytesMut;

    fn deref(&self) -> &BytesMut {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut BytesMut {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(std::mem::take(&mut self.buffer));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::BufMut;
    use std::panic::{self, AssertUnwindSafe};

    #[test]
    fn test_acquire_allocates_with_initial_capacity() {
        let pool = BufferPool::with_settings(1024, 4096, 2);
        let buffer = pool.acquire();
        assert!(buffer.capacity() >= 1024);
        assert!(buffer.is_empty());
        assert!(buffer.is_pooled());
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_drop_returns_cleared_buffer() {
        let pool = BufferPool::new();
        {
            let mut buffer = pool.acquire();
            buffer.put_i32(42);
            assert_eq!(buffer.len(), 4);
        }
        assert_eq!(pool.size(), 1);

        let buffer = pool.acquire();
        assert!(buffer.is_empty());
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_buffers_are_reused() {
        let pool = BufferPool::with_settings(64, 4096, 1);
        let first_ptr = {
            let buffer = pool.acquire();
            buffer.as_ptr()
        };
        let buffer = pool.acquire();
        assert_eq!(buffer.as_ptr(), first_ptr);
    }

    #[test]
    fn test_oversized_buffer_is_discarded() {
        let pool = BufferPool::with_settings(16, 32, 1);
        {
            let mut buffer = pool.acquire();
            buffer.put_slice(&[0u8; 128]);
        }
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_release_on_unwind() {
        let pool = BufferPool::new();
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut buffer = pool.acquire();
            buffer.put_u8(1);
            panic!("encoder blew up");
        }));
        assert!(result.is_err());
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn test_detached_buffer_is_not_pooled() {
        let buffer = PooledBuffer::detached(BytesMut::with_capacity(8));
        assert!(!buffer.is_pooled());
    }

    #[test]
    fn test_clear_drops_idle_buffers() {
        let pool = BufferPool::with_settings(16, 1024, 4);
        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        drop((a, b, c));
        assert_eq!(pool.size(), 3);
        pool.clear();
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_concurrent_acquire_release() {
        let pool = BufferPool::with_settings(64, 4096, 4);
        std::thread::scope(|scope| {
            for t in 0..8 {
                let pool = &pool;
                scope.spawn(move || {
                    for i in 0..500 {
                        let mut buffer = pool.acquire();
                        assert!(buffer.is_empty());
                        buffer.put_i32(t * 1000 + i);
                    }
                });
            }
        });
        assert!(pool.size() >= 1);
    }

    #[test]
    fn test_zero_shards_is_clamped() {
        let pool = BufferPool::with_settings(16, 1024, 0);
        drop(pool.acquire());
        assert_eq!(pool.size(), 1);
    }
}
