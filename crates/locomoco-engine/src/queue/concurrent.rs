use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

/// Thread-safe FIFO.
///
/// The lock protects the storage only. Ordering across concurrent pushers is
/// the order in which their pushes complete under the lock.
#[derive(Debug)]
pub struct MessageQueue<T> {
    data: Mutex<VecDeque<T>>,
}

impl<T> MessageQueue<T> {
    pub fn new() -> Self {
        Self {
            data: Mutex::new(VecDeque::new()),
        }
    }

    /// Enqueues `value`, taking ownership of it.
    pub fn push(&self, value: T) {
        self.data.lock().push_back(value);
    }

    /// Removes the oldest pending value.
    ///
    /// Returns `None` when nothing is pending.
    pub fn pop(&self) -> Option<T> {
        self.data.lock().pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.data.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.lock().len()
    }

    /// Pops and hands every pending value to `f`, oldest first.
    ///
    /// Values pushed while draining are consumed in the same call. The lock is
    /// released before `f` runs, so `f` may push back into the queue.
    ///
    /// Returns the number of values consumed.
    pub fn drain<F>(&self, mut f: F) -> usize
    where
        F: FnMut(T),
    {
        let mut consumed = 0;
        while let Some(value) = self.pop() {
            f(value);
            consumed += 1;
        }
        consumed
    }
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable producer handle for a shared [`MessageQueue`].
#[derive(Debug)]
pub struct MessageSender<T> {
    queue: Arc<MessageQueue<T>>,
}

impl<T> MessageSender<T> {
    pub fn new(queue: Arc<MessageQueue<T>>) -> Self {
        Self { queue }
    }

    pub fn send(&self, value: T) {
        self.queue.push(value);
    }
}

// Derive would require `T: Clone`.
impl<T> Clone for MessageSender<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}
