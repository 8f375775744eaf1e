//! Producer-consumer pipeline over a `BoundedBlockingQueue`.

use core::time::Duration;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use foundation_sync::BoundedBlockingQueue;

use crate::thread_group::{TaskHandle, ThreadGroup};

/// Outcome of a [`Pipeline`] run.
#[derive(Debug, Clone)]
pub struct PipelineReport<T> {
    /// Whether every producer and consumer finished before the deadline
    pub completed: bool,
    /// Elements taken by each consumer, in the order it took them
    pub consumed: Vec<Vec<T>>,
    /// Samples a producer could not enqueue because the queue was closed
    /// under it
    pub rejected: usize,
}

impl<T> PipelineReport<T> {
    /// Returns the total number of elements taken by all consumers.
    #[must_use]
    pub fn total_consumed(&self) -> usize {
        self.consumed.iter().map(Vec::len).sum()
    }

    /// Returns every consumed element, consumer by consumer.
    pub fn flatten(self) -> Vec<T> {
        self.consumed.into_iter().flatten().collect()
    }
}

/// Runs producers and consumers against one bounded queue.
///
/// Producers share a cursor over the samples and `put` one element per
/// claimed index. The last producer to finish closes the queue, so no
/// producer is still blocked in `put` when the close happens. Consumers
/// `take` until the queue is closed and drained.
///
/// # Examples
///
/// ```
/// use foundation_testing::scenarios::Pipeline;
/// use std::time::Duration;
///
/// let report = Pipeline::new(4)
///     .producers(2)
///     .consumers(2)
///     .deadline(Duration::from_secs(10))
///     .run((1..=100).collect::<Vec<u32>>());
///
/// assert!(report.completed);
/// assert_eq!(report.rejected, 0);
/// assert_eq!(report.total_consumed(), 100);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    capacity: usize,
    producers: usize,
    consumers: usize,
    deadline: Duration,
}

impl Pipeline {
    /// Creates a one producer, one consumer pipeline over a queue of
    /// `capacity`, with a 10 second deadline.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            producers: 1,
            consumers: 1,
            deadline: Duration::from_secs(10),
        }
    }

    /// Sets the number of producer threads.
    #[must_use]
    pub const fn producers(mut self, count: usize) -> Self {
        self.producers = count;
        self
    }

    /// Sets the number of consumer threads.
    #[must_use]
    pub const fn consumers(mut self, count: usize) -> Self {
        self.consumers = count;
        self
    }

    /// Sets the deadline for every thread to finish.
    #[must_use]
    pub const fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    /// Feeds `samples` through the queue and collects what each consumer
    /// took.
    ///
    /// If the deadline is missed the queue is closed, which releases every
    /// blocked producer and consumer, and the report carries
    /// `completed == false` with whatever was consumed. Samples refused by
    /// the closed queue are counted in `rejected`.
    ///
    /// # Panics
    ///
    /// Panics if the capacity is 0, if there are no producers (the queue
    /// would never close), or if a worker thread panics.
    pub fn run<T>(&self, samples: Vec<T>) -> PipelineReport<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        assert!(self.producers > 0, "Pipeline needs at least one producer");

        let queue = Arc::new(BoundedBlockingQueue::new(self.capacity));
        let samples = Arc::new(samples);
        let cursor = Arc::new(AtomicUsize::new(0));
        let live_producers = Arc::new(AtomicUsize::new(self.producers));
        let rejected = Arc::new(AtomicUsize::new(0));

        let mut threads = ThreadGroup::new();

        for _ in 0..self.producers {
            let queue = Arc::clone(&queue);
            let samples = Arc::clone(&samples);
            let cursor = Arc::clone(&cursor);
            let live_producers = Arc::clone(&live_producers);
            let rejected = Arc::clone(&rejected);

            threads.thread(move || {
                while let Some(sample) = samples.get(cursor.fetch_add(1, Ordering::Relaxed)) {
                    if !queue.put(sample.clone()) {
                        // Only a deadline miss closes the queue this early
                        let remaining = samples
                            .len()
                            .saturating_sub(cursor.load(Ordering::Relaxed));
                        tracing::warn!(remaining, "pipeline queue closed under a producer");
                        rejected.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                }

                if live_producers.fetch_sub(1, Ordering::AcqRel) == 1 {
                    queue.close();
                }
            });
        }

        let handles: Vec<TaskHandle<Vec<T>>> = (0..self.consumers)
            .map(|_| {
                let queue = Arc::clone(&queue);
                threads.spawn(move || queue.iter().collect())
            })
            .collect();

        let completed = threads.await_completion(self.deadline);
        if !completed {
            queue.close();
        }
        drop(threads);

        let consumed = handles
            .into_iter()
            .map(|handle| handle.get().unwrap_or_default())
            .collect();

        PipelineReport {
            completed,
            consumed,
            rejected: rejected.load(Ordering::Relaxed),
        }
    }
}
