//! Unbounded blocking channel.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

struct State<T> {
    items: VecDeque<T>,
    closed: bool,
}

/// Closable unbounded multi-producer multi-consumer hand-off queue.
///
/// Producers never block: [`BlockingChannel::put`] only fails once the channel is closed.
/// Consumers block in [`BlockingChannel::take`] until an item arrives or the channel is closed.
/// Items are handed out in insertion order and each item is delivered to exactly one consumer.
pub struct BlockingChannel<T> {
    state: Mutex<State<T>>,
    not_empty: Condvar,
}

impl<T> BlockingChannel<T> {
    /// Creates an open empty channel.
    pub fn new() -> Self {
        BlockingChannel {
            state: Mutex::new(State {
                items: VecDeque::new(),
                closed: false,
            }),
            not_empty: Condvar::new(),
        }
    }

    /// Enqueues an item and wakes one waiting consumer.
    /// Returns `false` and drops the item if the channel is already closed.
    pub fn put(&self, item: T) -> bool {
        let mut state = self.lock();
        if state.closed {
            return false;
        }

        state.items.push_back(item);
        self.not_empty.notify_one();

        return true;
    }

    /// Removes the oldest item, blocking until one is available.
    /// Returns [`None`] once the channel is closed and drained.
    pub fn take(&self) -> Option<T> {
        let mut state = self.lock();
        while state.items.is_empty() && !state.closed {
            state = self.not_empty.wait(state).unwrap_or_else(PoisonError::into_inner);
        }

        state.items.pop_front()
    }

    /// Closes the channel. Already queued items remain retrievable.
    pub fn close(&self) {
        self.shutdown(false);
    }

    /// Closes the channel and discards all queued items.
    pub fn cancel(&self) {
        self.shutdown(true);
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Returns the number of queued items.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    fn shutdown(&self, discard: bool) {
        let discarded = {
            let mut state = self.lock();
            state.closed = true;
            self.not_empty.notify_all();

            if discard {
                std::mem::take(&mut state.items)
            } else {
                VecDeque::new()
            }
        };
        // dropped outside of the critical section
        drop(discarded);
    }

    // the state is consistent between operations so a poisoned lock is still usable
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for BlockingChannel<T> {
    fn default() -> Self {
        BlockingChannel::new()
    }
}
