// Copyright 2023 The RabbitMQ Rust Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::VecDeque;
use std::fmt;
use std::iter::FusedIterator;
use std::time::Instant;

use parking_lot::Condvar;
use parking_lot::Mutex;
use parking_lot::MutexGuard;
use rabbitmq_error::RabbitMQError;
use rabbitmq_error::RabbitMQResult;

use crate::timeout::Timeout;

struct State<T> {
    items: VecDeque<T>,
    open: bool,
}

/// A thread-safe, closable FIFO queue used as the rendezvous point between a
/// delivery dispatcher and the threads consuming its deliveries.
///
/// The buffer and the open flag sit behind one `parking_lot::Mutex` with one
/// `parking_lot::Condvar`. `enqueue` wakes a single waiter; `close` wakes all
/// of them so every blocked dequeuer observes the closed state.
///
/// Closing does not discard buffered items. Dequeue operations keep returning
/// items until the buffer is empty and only then report
/// [`RabbitMQError::QueueClosed`].
pub struct ClosableBlockingQueue<T> {
    state: Mutex<State<T>>,
    available: Condvar,
}

impl<T> Default for ClosableBlockingQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ClosableBlockingQueue<T> {
    /// Creates a new, open and empty queue.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a new queue with room for `capacity` items before reallocating.
    /// The queue is unbounded either way.
    pub fn with_capacity(capacity: usize) -> Self {
        ClosableBlockingQueue {
            state: Mutex::new(State {
                items: VecDeque::with_capacity(capacity),
                open: true,
            }),
            available: Condvar::new(),
        }
    }

    /// Appends an item to the tail of the queue and wakes one waiting thread.
    ///
    /// Never blocks beyond acquiring the lock.
    ///
    /// # Errors
    ///
    /// [`RabbitMQError::QueueClosed`] if the queue was closed before the call.
    pub fn enqueue(&self, item: T) -> RabbitMQResult<()> {
        let mut state = self.state.lock();
        if !state.open {
            return Err(RabbitMQError::QueueClosed);
        }
        state.items.push_back(item);
        self.available.notify_one();
        Ok(())
    }

    /// Removes and returns the head item, blocking the calling thread until
    /// one is available.
    ///
    /// # Errors
    ///
    /// [`RabbitMQError::QueueClosed`] once the queue is closed and drained.
    pub fn dequeue(&self) -> RabbitMQResult<T> {
        let mut state = self.state.lock();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Ok(item);
            }
            if !state.open {
                return Err(RabbitMQError::QueueClosed);
            }
            self.available.wait(&mut state);
        }
    }

    /// Removes and returns the head item if there is one, without blocking.
    ///
    /// Returns `Ok(None)` when the queue is open and empty.
    ///
    /// # Errors
    ///
    /// [`RabbitMQError::QueueClosed`] if the queue is closed and empty.
    pub fn try_dequeue(&self) -> RabbitMQResult<Option<T>> {
        let mut state = self.state.lock();
        Self::pop_or_closed(&mut state)
    }

    /// Removes and returns the head item, or `default` if the queue is open
    /// and empty. Never blocks.
    ///
    /// # Errors
    ///
    /// [`RabbitMQError::QueueClosed`] if the queue is closed and empty.
    pub fn dequeue_no_wait(&self, default: T) -> RabbitMQResult<T> {
        Ok(self.try_dequeue()?.unwrap_or(default))
    }

    /// Removes and returns the head item, waiting at most `timeout` for one to
    /// arrive.
    ///
    /// Returns `Ok(None)` if the timeout elapsed with the queue still open and
    /// empty. `Timeout::INFINITE` behaves exactly like [`dequeue`](Self::dequeue)
    /// and a zero timeout exactly like [`try_dequeue`](Self::try_dequeue).
    ///
    /// # Errors
    ///
    /// [`RabbitMQError::QueueClosed`] if the queue is, or becomes, closed while
    /// the buffer is empty.
    pub fn dequeue_timeout(&self, timeout: impl Into<Timeout>) -> RabbitMQResult<Option<T>> {
        let deadline = match timeout.into().deadline(Instant::now()) {
            Some(deadline) => deadline,
            None => return self.dequeue().map(Some),
        };
        let mut state = self.state.lock();
        self.wait_for_item(&mut state, Some(deadline));
        Self::pop_or_closed(&mut state)
    }

    /// Blocks until the buffer is non-empty, without removing anything.
    ///
    /// Returns `false` once `timeout` elapses, or as soon as the queue is
    /// closed and empty.
    pub fn wait_for_message(&self, timeout: impl Into<Timeout>) -> bool {
        let deadline = timeout.into().deadline(Instant::now());
        let mut state = self.state.lock();
        let (available, waited) = self.wait_for_item(&mut state, deadline);
        if available && waited {
            // The wakeup that got us here was meant for a consumer of the
            // item, which is still buffered.
            self.available.notify_one();
        }
        available
    }

    /// Closes the queue and wakes every waiting thread.
    ///
    /// Returns `true` if this call closed the queue, `false` if it was
    /// already closed.
    pub fn close(&self) -> bool {
        let mut state = self.state.lock();
        if !state.open {
            return false;
        }
        state.open = false;
        self.available.notify_all();
        true
    }

    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// Number of buffered items.
    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    /// A blocking iterator draining the queue until it is closed.
    ///
    /// Iterators created on the same queue compete for items: each item is
    /// yielded by exactly one of them.
    pub fn iter(&self) -> DequeueIter<'_, T> {
        DequeueIter {
            queue: self,
            finished: false,
        }
    }

    fn pop_or_closed(state: &mut MutexGuard<'_, State<T>>) -> RabbitMQResult<Option<T>> {
        match state.items.pop_front() {
            Some(item) => Ok(Some(item)),
            None if state.open => Ok(None),
            None => Err(RabbitMQError::QueueClosed),
        }
    }

    /// Waits on the condition variable until an item is buffered, the queue
    /// is closed, or `deadline` passes. The predicate is re-checked after
    /// every wakeup.
    ///
    /// Returns whether an item is buffered, and whether the thread waited at
    /// all.
    fn wait_for_item(&self, state: &mut MutexGuard<'_, State<T>>, deadline: Option<Instant>) -> (bool, bool) {
        let mut waited = false;
        loop {
            if !state.items.is_empty() {
                return (true, waited);
            }
            if !state.open {
                return (false, waited);
            }
            match deadline {
                None => self.available.wait(state),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return (false, waited);
                    }
                    let _ = self.available.wait_until(state, deadline);
                }
            }
            waited = true;
        }
    }
}

impl<T> fmt::Debug for ClosableBlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ClosableBlockingQueue")
            .field("len", &state.items.len())
            .field("open", &state.open)
            .finish()
    }
}

impl<'a, T> IntoIterator for &'a ClosableBlockingQueue<T> {
    type Item = T;
    type IntoIter = DequeueIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Blocking iterator over a [`ClosableBlockingQueue`], built from repeated
/// [`dequeue`](ClosableBlockingQueue::dequeue) calls.
///
/// Ends the first time the queue reports closure and never restarts, even if
/// the queue is shared with other iterators.
pub struct DequeueIter<'a, T> {
    queue: &'a ClosableBlockingQueue<T>,
    finished: bool,
}

impl<T> Iterator for DequeueIter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        if self.finished {
            return None;
        }
        match self.queue.dequeue() {
            Ok(item) => Some(item),
            Err(_) => {
                self.finished = true;
                None
            }
        }
    }
}

impl<T> FusedIterator for DequeueIter<'_, T> {}
