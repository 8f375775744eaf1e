//! Bounded, closable, blocking FIFO queue.
//!
//! One lock guards the buffer and the closed flag. Two condition variables
//! carry the wakeups: `not_full` for producers and `not_empty` for
//! consumers. Closing broadcasts on both so every parked caller re-checks
//! its predicate and observes the closure.
//!
//! # Examples
//!
//! ```
//! use foundation_sync::BoundedBlockingQueue;
//!
//! let queue = BoundedBlockingQueue::new(2);
//! assert!(queue.put(1));
//! assert!(queue.offer(2));
//! assert!(!queue.offer(3)); // full
//!
//! queue.close();
//! assert!(!queue.put(4)); // closed
//!
//! // Buffered items stay drainable after close
//! assert_eq!(queue.take(), Some(1));
//! assert_eq!(queue.take(), Some(2));
//! assert_eq!(queue.take(), None);
//! ```

use core::fmt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard};

use crate::primitives::{CapacityError, PushError, TryPushError};

/// A capacity-limited FIFO channel with a one-way close transition.
///
/// Producers block in [`put`](Self::put) while the queue is full, consumers
/// block in [`take`](Self::take) while it is empty. After
/// [`close`](Self::close) no element is admitted, but everything already
/// buffered can still be taken.
pub struct BoundedBlockingQueue<T> {
    state: Mutex<State<T>>,
    not_full: Condvar,
    not_empty: Condvar,
    // Mirror of `State::closed` for lock-free polling
    closed: AtomicBool,
    capacity: usize,
}

struct State<T> {
    buffer: VecDeque<T>,
    closed: bool,
    // Threads currently parked on `not_full` / `not_empty`
    waiting_producers: usize,
    waiting_consumers: usize,
}

impl<T> BoundedBlockingQueue<T> {
    /// Creates an empty, open queue holding at most `capacity` elements.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "BoundedBlockingQueue capacity must be > 0");
        Self::with_capacity_unchecked(capacity)
    }

    /// Creates an empty, open queue, rejecting a zero capacity.
    ///
    /// # Errors
    ///
    /// Returns [`CapacityError`] if `capacity` is 0.
    pub fn try_new(capacity: usize) -> Result<Self, CapacityError> {
        if capacity == 0 {
            return Err(CapacityError);
        }
        Ok(Self::with_capacity_unchecked(capacity))
    }

    fn with_capacity_unchecked(capacity: usize) -> Self {
        Self {
            state: Mutex::new(State {
                buffer: VecDeque::with_capacity(capacity),
                closed: false,
                waiting_producers: 0,
                waiting_consumers: 0,
            }),
            not_full: Condvar::new(),
            not_empty: Condvar::new(),
            closed: AtomicBool::new(false),
            capacity,
        }
    }

    /// Enqueues `element`, blocking while the queue is full.
    ///
    /// Returns `false` without enqueuing if the queue is closed, either
    /// before the call or while the caller was waiting for space.
    pub fn put(&self, element: T) -> bool {
        self.push(element).is_ok()
    }

    /// Enqueues `element`, blocking while the queue is full.
    ///
    /// # Errors
    ///
    /// Returns [`PushError`] carrying `element` back if the queue is closed
    /// before space becomes available.
    pub fn push(&self, element: T) -> Result<(), PushError<T>> {
        let mut state = self.lock_state();

        loop {
            if state.closed {
                return Err(PushError(element));
            }
            if state.buffer.len() < self.capacity {
                break;
            }

            state.waiting_producers += 1;
            state = match self.not_full.wait(state) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
            state.waiting_producers -= 1;
        }

        state.buffer.push_back(element);
        let wake_consumer = state.waiting_consumers > 0;
        drop(state);

        if wake_consumer {
            self.not_empty.notify_one();
        }
        Ok(())
    }

    /// Enqueues `element` only if the queue is open and has room right now.
    ///
    /// Never blocks. Returns `false` if the queue is full or closed.
    #[must_use]
    pub fn offer(&self, element: T) -> bool {
        self.try_push(element).is_ok()
    }

    /// Enqueues `element` only if the queue is open and has room right now.
    ///
    /// # Errors
    ///
    /// Returns [`TryPushError::Closed`] or [`TryPushError::Full`] carrying
    /// `element` back.
    pub fn try_push(&self, element: T) -> Result<(), TryPushError<T>> {
        let mut state = self.lock_state();

        if state.closed {
            return Err(TryPushError::Closed(element));
        }
        if state.buffer.len() >= self.capacity {
            return Err(TryPushError::Full(element));
        }

        state.buffer.push_back(element);
        let wake_consumer = state.waiting_consumers > 0;
        drop(state);

        if wake_consumer {
            self.not_empty.notify_one();
        }
        Ok(())
    }

    /// Removes the head element, blocking while the queue is empty and open.
    ///
    /// Returns `None` once the queue is closed and every buffered element
    /// has been taken. From then on it returns `None` without blocking.
    pub fn take(&self) -> Option<T> {
        let mut state = self.lock_state();

        let element = loop {
            if let Some(element) = state.buffer.pop_front() {
                break element;
            }
            if state.closed {
                return None;
            }

            state.waiting_consumers += 1;
            state = match self.not_empty.wait(state) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
            state.waiting_consumers -= 1;
        };

        let wake_producer = state.waiting_producers > 0;
        drop(state);

        if wake_producer {
            self.not_full.notify_one();
        }
        Some(element)
    }

    /// Closes the queue.
    ///
    /// Every blocked producer returns `false`, and every blocked consumer
    /// either receives a remaining element or `None` once the buffer is
    /// empty. Closing an already closed queue does nothing.
    pub fn close(&self) {
        let mut state = self.lock_state();
        if state.closed {
            return;
        }

        state.closed = true;
        self.closed.store(true, Ordering::Release);
        tracing::debug!(
            buffered = state.buffer.len(),
            waiting_producers = state.waiting_producers,
            waiting_consumers = state.waiting_consumers,
            "closing blocking queue"
        );
        drop(state);

        self.not_full.notify_all();
        self.not_empty.notify_all();
    }

    /// Returns whether the queue has been closed.
    ///
    /// Reads an atomic mirror of the flag, so a thread may poll this in a
    /// tight loop without contending on the queue lock.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Returns the number of buffered elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_state().buffer.len()
    }

    /// Returns `true` if no element is buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the maximum number of buffered elements.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns a blocking iterator that takes elements until the queue is
    /// closed and drained.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { queue: self }
    }

    // The guarded state is only mutated through complete push/pop calls, so a
    // panicking holder cannot leave it half-updated.
    fn lock_state(&self) -> MutexGuard<'_, State<T>> {
        match self.state.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }
}

impl<T> fmt::Debug for BoundedBlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedBlockingQueue")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl<'a, T> IntoIterator for &'a BoundedBlockingQueue<T> {
    type Item = T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Blocking iterator over a [`BoundedBlockingQueue`].
///
/// Each call to `next` is a [`take`](BoundedBlockingQueue::take).
pub struct Iter<'a, T> {
    queue: &'a BoundedBlockingQueue<T>,
}

impl<T> Iterator for Iter<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.queue.take()
    }
}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter").field("queue", self.queue).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ntest::timeout;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;
    use tracing_test::traced_test;

    /// WHY: A queue that can hold nothing could never make progress
    /// WHAT: `try_new(0)` fails while `new(0)` panics
    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(
            BoundedBlockingQueue::<i32>::try_new(0).unwrap_err(),
            CapacityError
        );
        assert!(std::panic::catch_unwind(|| BoundedBlockingQueue::<i32>::new(0)).is_err());
    }

    /// WHY: Validates FIFO order and slot reuse on a single thread
    /// WHAT: Interleaved puts and takes come back in insertion order
    #[test]
    #[timeout(1000)]
    fn test_single_thread_fifo() {
        let queue = BoundedBlockingQueue::new(4);
        assert!(queue.put(1));
        assert!(queue.put(2));
        assert!(queue.put(3));
        assert_eq!(queue.take(), Some(1));
        assert_eq!(queue.take(), Some(2));
        assert!(queue.put(1));
        assert!(queue.put(2));
        assert!(queue.put(3));
        assert_eq!(queue.take(), Some(3));
        assert_eq!(queue.take(), Some(1));
        assert_eq!(queue.take(), Some(2));
        assert_eq!(queue.take(), Some(3));
        assert!(queue.is_empty());
    }

    /// WHY: `offer` must respect capacity without blocking
    /// WHAT: Offers beyond capacity are rejected and hand the element back
    #[test]
    #[timeout(1000)]
    fn test_offer_when_full() {
        let queue = BoundedBlockingQueue::new(2);
        assert!(queue.offer("a"));
        assert!(queue.offer("b"));
        assert!(!queue.offer("c"));
        assert_eq!(queue.try_push("d"), Err(TryPushError::Full("d")));
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.capacity(), 2);
    }

    /// WHY: A closed queue refuses everything and never blocks
    /// WHAT: put/offer fail, take returns `None` repeatedly
    #[test]
    #[traced_test]
    fn test_close_empty_queue() {
        let queue = BoundedBlockingQueue::new(4);
        assert!(!queue.is_closed());
        queue.close();
        assert!(queue.is_closed());
        assert!(!queue.put(5));
        assert_eq!(queue.take(), None);
        assert!(!queue.offer(5));
        assert_eq!(queue.take(), None);
        assert!(logs_contain("closing blocking queue"));
    }

    /// WHY: Closing must not discard buffered elements
    /// WHAT: Elements present at close are drained in order, then `None`
    #[test]
    #[timeout(1000)]
    fn test_close_drains_buffered() {
        let queue = BoundedBlockingQueue::new(3);
        assert!(queue.put(1));
        assert!(queue.put(2));
        queue.close();
        queue.close();

        assert_eq!(queue.push(3), Err(PushError(3)));
        assert_eq!(queue.try_push(4), Err(TryPushError::Closed(4)));
        assert_eq!(queue.iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(queue.take(), None);
    }

    /// WHY: A producer parked on a full queue must be released by close
    /// WHAT: The blocked `push` returns the element instead of enqueuing it
    #[test]
    #[timeout(5000)]
    fn test_close_releases_blocked_producer() {
        let queue = Arc::new(BoundedBlockingQueue::new(1));
        assert!(queue.put(String::from("first")));

        let producer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.push(String::from("second")))
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();

        let rejected = producer.join().unwrap().unwrap_err().into_inner();
        assert_eq!(rejected, "second");
        assert_eq!(queue.take().as_deref(), Some("first"));
        assert_eq!(queue.take(), None);
    }

    /// WHY: A consumer parked on an empty queue must be released by close
    /// WHAT: The blocked `take` returns `None`
    #[test]
    #[timeout(5000)]
    fn test_close_releases_blocked_consumer() {
        let queue = Arc::new(BoundedBlockingQueue::<u8>::new(1));

        let consumer = {
            let queue = Arc::clone(&queue);
            thread::spawn(move || queue.take())
        };

        thread::sleep(Duration::from_millis(50));
        queue.close();

        assert_eq!(consumer.join().unwrap(), None);
    }

    /// WHY: The queue is shared across threads by reference
    /// WHAT: It is `Send + Sync` for `Send` payloads
    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BoundedBlockingQueue<Vec<u8>>>();
    }

    /// WHY: Diagnostics should not require locking by hand
    /// WHAT: `Debug` reports capacity, length and closed state
    #[test]
    fn test_debug() {
        let queue = BoundedBlockingQueue::new(3);
        assert!(queue.put(1));
        let rendered = format!("{queue:?}");
        assert!(rendered.contains("capacity: 3"));
        assert!(rendered.contains("len: 1"));
        assert!(rendered.contains("closed: false"));
    }
}
