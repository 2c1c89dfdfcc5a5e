//! Blocking FIFO channel
//!
//! An unbounded queue guarded by a `Mutex` and a `Condvar`. Receivers
//! suspend on the condition variable until an item is available or the
//! channel is closed; senders never block.
//!
//! The channel is point-to-point: each item is handed to exactly one
//! receive call, even when several threads are receiving concurrently.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::ChannelError;

/// Returned by [`BlockingChannel::send`] when the channel is closed.
///
/// Carries the rejected value back to the caller.
#[derive(PartialEq, Eq)]
pub struct SendError<T>(pub T);

impl<T> SendError<T> {
    /// Returns the value that could not be sent.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> std::fmt::Debug for SendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendError").finish_non_exhaustive()
    }
}

impl<T> std::fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("sending on a closed channel")
    }
}

impl<T> std::error::Error for SendError<T> {}

/// State guarded by the channel lock.
struct Inner<T> {
    queue: VecDeque<T>,
    closed: bool,
}

/// Unbounded, thread-safe, blocking FIFO channel.
///
/// Share it between threads behind an `Arc` (or a borrowing scope);
/// every method takes `&self`.
pub struct BlockingChannel<T> {
    inner: Mutex<Inner<T>>,
    available: Condvar,
}

impl<T> BlockingChannel<T> {
    /// Creates an empty, open channel.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    // No user code runs while the lock is held, so a poisoned lock still
    // guards a consistent queue.
    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `value` to the tail of the queue and wakes one receiver.
    ///
    /// Never blocks.
    ///
    /// # Errors
    ///
    /// Returns the value inside [`SendError`] if the channel is closed.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        {
            let mut inner = self.lock();
            if inner.closed {
                return Err(SendError(value));
            }
            inner.queue.push_back(value);
        }
        self.available.notify_one();
        Ok(())
    }

    /// Removes and returns the head of the queue, blocking while it is empty.
    ///
    /// Items queued before [`close`](Self::close) are still delivered.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Closed`] once the channel is closed and drained.
    pub fn recv(&self) -> Result<T, ChannelError> {
        let guard = self.lock();
        let mut inner = self
            .available
            .wait_while(guard, |inner| inner.queue.is_empty() && !inner.closed)
            .unwrap_or_else(PoisonError::into_inner);
        inner.queue.pop_front().ok_or(ChannelError::Closed)
    }

    /// Like [`recv`](Self::recv), but waits at most `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Timeout`] if nothing arrived in time, or
    /// [`ChannelError::Closed`] if the channel is closed and drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T, ChannelError> {
        let guard = self.lock();
        let (mut inner, _) = self
            .available
            .wait_timeout_while(guard, timeout, |inner| {
                inner.queue.is_empty() && !inner.closed
            })
            .unwrap_or_else(PoisonError::into_inner);

        // Re-check the queue rather than the timeout flag: an item may have
        // landed right as the wait expired.
        match inner.queue.pop_front() {
            Some(value) => Ok(value),
            None if inner.closed => Err(ChannelError::Closed),
            None => Err(ChannelError::Timeout),
        }
    }

    /// Removes and returns the head of the queue without blocking.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::Empty`] if nothing is queued, or
    /// [`ChannelError::Closed`] if the channel is closed and drained.
    pub fn try_recv(&self) -> Result<T, ChannelError> {
        let mut inner = self.lock();
        match inner.queue.pop_front() {
            Some(value) => Ok(value),
            None if inner.closed => Err(ChannelError::Closed),
            None => Err(ChannelError::Empty),
        }
    }

    /// Closes the channel and wakes every blocked receiver.
    ///
    /// Further sends fail; queued items remain receivable. Idempotent.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_all();
    }

    /// Returns whether [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns the number of queued items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Returns whether no items are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }
}

impl<T> Default for BlockingChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for BlockingChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("BlockingChannel")
            .field("len", &inner.queue.len())
            .field("closed", &inner.closed)
            .finish_non_exhaustive()
    }
}
