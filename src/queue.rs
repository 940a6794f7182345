//! Closeable synchronized FIFO connecting the pipeline stages.
//!
//! The walker, the scanner pool and the output task are coupled only through
//! these queues; closing a queue is the shutdown signal for its consumers.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

/// Returned by pushes onto a closed queue; carries the rejected value back
/// to the caller so nothing is silently dropped.
#[derive(Debug)]
pub struct Closed<T>(pub T);

struct Inner<T> {
    queue: VecDeque<T>,
    closed: bool,
}

/// Multi-producer/multi-consumer blocking FIFO with an idempotent close.
///
/// Values are moved in and out, never copied. An optional capacity bound
/// makes `push` block while the queue is full; the default is unbounded.
pub struct SyncQueue<T> {
    inner: Mutex<Inner<T>>,
    not_empty: Condvar,
    not_full: Condvar,
    capacity: Option<usize>,
}

impl<T> SyncQueue<T> {
    pub fn new() -> SyncQueue<T> {
        SyncQueue {
            inner: Mutex::new(Inner {
                queue: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            capacity: None,
        }
    }

    pub fn with_capacity(capacity: usize) -> SyncQueue<T> {
        let mut q = SyncQueue::new();
        q.capacity = Some(capacity);
        q
    }

    fn is_full(&self, inner: &Inner<T>, incoming: usize) -> bool {
        match self.capacity {
            Some(cap) => inner.queue.len() + incoming > cap,
            None => false,
        }
    }

    /// Appends one value. Blocks while the queue is at capacity. Fails once
    /// the queue has been closed, handing the value back.
    pub fn push(&self, value: T) -> Result<(), Closed<T>> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");

        while self.is_full(&inner, 1) && !inner.closed {
            inner = self.not_full.wait(inner).expect("queue lock poisoned");
        }

        if inner.closed {
            return Err(Closed(value));
        }

        inner.queue.push_back(value);

        // Unlock before notifying so the woken thread doesn't immediately
        // block on the mutex we still hold.
        drop(inner);

        // One new element, one woken consumer.
        self.not_empty.notify_one();

        Ok(())
    }

    /// Appends a batch of values under a single lock acquisition.
    pub fn push_many(&self, values: Vec<T>) -> Result<(), Closed<Vec<T>>> {
        if values.is_empty() {
            return Ok(());
        }

        let mut inner = self.inner.lock().expect("queue lock poisoned");

        while self.is_full(&inner, values.len()) && !inner.closed {
            inner = self.not_full.wait(inner).expect("queue lock poisoned");
        }

        if inner.closed {
            return Err(Closed(values));
        }

        inner.queue.extend(values);

        drop(inner);
        self.not_empty.notify_all();

        Ok(())
    }

    /// Removes and returns the front value, blocking while the queue is
    /// empty and open. Returns `None` once the queue is closed and drained;
    /// never blocks on a closed empty queue.
    pub fn pull(&self) -> Option<T> {
        let mut inner = self.inner.lock().expect("queue lock poisoned");

        // Re-check the predicate on every wakeup.
        while inner.queue.is_empty() && !inner.closed {
            inner = self.not_empty.wait(inner).expect("queue lock poisoned");
        }

        if inner.queue.is_empty() && inner.closed {
            return None;
        }

        let value = inner.queue.pop_front();

        drop(inner);
        self.not_full.notify_one();

        value
    }

    /// Marks the queue closed and wakes every waiter. Pending elements stay
    /// drainable; further pushes fail. Calling this twice is harmless.
    pub fn close(&self) {
        let mut inner = self.inner.lock().expect("queue lock poisoned");
        inner.closed = true;
        drop(inner);

        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("queue lock poisoned").queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for SyncQueue<T> {
    fn default() -> Self {
        SyncQueue::new()
    }
}
