//! A FIFO handoff of values and failures between the I/O side and a waiter.
//!
//! The connection pump puts a response (or a connection failure) into the
//! exchange; the caller takes it, either from async code or from a plain
//! thread. Values and failures share one queue, so a failure put between two
//! values is observed between them.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::error::Elapsed;

pub struct Exchange<T, E> {
    queue: Mutex<VecDeque<Result<T, E>>>,
    notify: Notify,
    ready: Condvar,
}

impl<T, E> Default for Exchange<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> Exchange<T, E> {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Result<T, E>>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, item: Result<T, E>) {
        self.lock().push_back(item);
        self.notify.notify_one();
        self.ready.notify_one();
    }

    /// Enqueues a value. Never blocks.
    pub fn put(&self, value: T) {
        self.push(Ok(value));
    }

    /// Enqueues a failure, to be returned by a later take.
    pub fn put_failure(&self, error: E) {
        self.push(Err(error));
    }

    /// Waits for the next item.
    pub async fn take(&self) -> Result<T, E> {
        loop {
            if let Some(item) = self.lock().pop_front() {
                return item;
            }
            self.notify.notified().await;
        }
    }

    /// Like [`take`](Self::take), bounded by `timeout`.
    pub async fn take_timeout(&self, timeout: Duration) -> Result<Result<T, E>, Elapsed> {
        tokio::time::timeout(timeout, self.take()).await
    }

    /// Waits for the next item on the current OS thread.
    ///
    /// Must not be called from inside an async task.
    pub fn blocking_take(&self) -> Result<T, E> {
        let mut queue = self.lock();
        loop {
            if let Some(item) = queue.pop_front() {
                return item;
            }
            queue = self
                .ready
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Returns the next item if one is already queued.
    pub fn try_take(&self) -> Option<Result<T, E>> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl<T, E> std::fmt::Debug for Exchange<T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("queued", &self.len())
            .finish()
    }
}
