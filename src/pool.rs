//! A bounded pool of reusable output buffers.
//!
//! This is the one deliberately thread-safe piece of the library: outbound
//! buffers are filled on a connection's executor but released from wherever
//! the transport finishes writing them, and the pool itself is shared
//! across connections.

use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::config::PoolConfig;
use crate::errors::{TermError, TermResult};

struct PoolState {
    free: VecDeque<Vec<u8>>,
    /// Buffers currently in existence, pooled or handed out
    allocated: usize,
    closed: bool,
}

struct PoolShared {
    buffer_capacity: usize,
    pool_size: usize,
    acquire_timeout: Duration,
    state: Mutex<PoolState>,
    returned: Condvar,
}

/// Shared, cloneable handle on the buffer pool.
#[derive(Clone)]
pub struct BufferPool {
    shared: Arc<PoolShared>,
}

impl BufferPool {
    pub fn new(config: &PoolConfig) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                buffer_capacity: config.buffer_capacity,
                pool_size: config.pool_size,
                acquire_timeout: config.acquire_timeout,
                state: Mutex::new(PoolState {
                    free: VecDeque::with_capacity(config.pool_size),
                    allocated: 0,
                    closed: false,
                }),
                returned: Condvar::new(),
            }),
        }
    }

    /// Take an empty buffer out of the pool.
    ///
    /// When every pooled buffer is handed out this waits up to the
    /// configured timeout for one to come back, then falls back to a fresh
    /// allocation so a slow consumer degrades throughput instead of
    /// wedging the writer.
    pub fn acquire(&self) -> TermResult<PooledBuf> {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if state.closed {
            return Err(TermError::PoolClosed);
        }

        if state.free.is_empty() && state.allocated >= self.shared.pool_size {
            let (guard, _timeout) = self
                .shared
                .returned
                .wait_timeout(state, self.shared.acquire_timeout)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state = guard;
            if state.closed {
                return Err(TermError::PoolClosed);
            }
        }

        let buf = match state.free.pop_front() {
            Some(buf) => buf,
            None => {
                state.allocated += 1;
                Vec::with_capacity(self.shared.buffer_capacity)
            }
        };

        Ok(PooledBuf {
            buf: Some(buf),
            shared: Arc::clone(&self.shared),
        })
    }

    /// Close the pool: waiting acquirers fail with
    /// [`TermError::PoolClosed`], pooled buffers are dropped, and buffers
    /// still handed out are freed on return instead of being pooled.
    pub fn close(&self) {
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        state.closed = true;
        let pooled = state.free.len();
        state.free.clear();
        state.allocated -= pooled;
        drop(state);
        self.shared.returned.notify_all();
    }

    /// Buffers currently in existence, pooled or handed out.
    pub fn allocated(&self) -> usize {
        self.shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .allocated
    }
}

/// A buffer checked out of a [`BufferPool`].
///
/// Returns itself to the pool on drop, exactly once; [`PooledBuf::discard`]
/// frees it instead when its contents should not be recycled.
pub struct PooledBuf {
    buf: Option<Vec<u8>>,
    shared: Arc<PoolShared>,
}

impl PooledBuf {
    /// Free this buffer instead of returning it to the pool.
    pub fn discard(mut self) {
        if self.buf.take().is_some() {
            let mut state = self
                .shared
                .state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            state.allocated -= 1;
        }
    }
}

impl Deref for PooledBuf {
    type Target = Vec<u8>;

    fn deref(&self) -> &Vec<u8> {
        self.buf.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        self.buf.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        let Some(mut buf) = self.buf.take() else {
            return;
        };
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let oversized = buf.capacity() != self.shared.buffer_capacity;
        if state.closed || oversized || state.free.len() >= self.shared.pool_size {
            state.allocated -= 1;
        } else {
            buf.clear();
            state.free.push_back(buf);
            drop(state);
            self.shared.returned.notify_one();
        }
    }
}
