//! Multi-threaded tests for `BoundedBlockingQueue`.
//!
//! These tests verify ordering, loss/duplication, blocking and close
//! behavior under real thread interleavings.

use foundation_sync::BoundedBlockingQueue;
use foundation_testing::scenarios::Pipeline;
use foundation_testing::{timeout_millis, timeout_secs, SampleGenerator, ThreadGroup};
use serial_test::serial;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

#[test]
#[serial]
fn test_single_producer_single_consumer() {
    let samples = SampleGenerator::new().random_ints(1_000_000);

    let report = Pipeline::new(10)
        .producers(1)
        .consumers(1)
        .deadline(timeout_secs(10))
        .run(samples.clone());

    assert!(report.completed, "Timeout exceeded");
    let consumed = report.flatten();
    assert_eq!(
        consumed.len(),
        samples.len(),
        "Queue loses / duplicates elements"
    );
    assert!(consumed == samples, "Wrong element order");
}

#[test]
#[serial]
fn test_single_producer_multi_consumer() {
    const NUM_SAMPLES: usize = 1_000_000;

    let samples = SampleGenerator::new().serial_ints(NUM_SAMPLES);

    let report = Pipeline::new(10)
        .producers(1)
        .consumers(3)
        .deadline(timeout_secs(10))
        .run(samples);

    assert!(report.completed, "Timeout exceeded");
    assert_eq!(report.consumed.len(), 3);

    let mut total = HashSet::with_capacity(NUM_SAMPLES);
    for taken in &report.consumed {
        assert!(
            taken.windows(2).all(|w| w[0] < w[1]),
            "Queue violates FIFO order"
        );
        total.extend(taken.iter().copied());
    }

    assert_eq!(total.len(), NUM_SAMPLES, "Queue loses elements");
    assert_eq!(
        report.total_consumed(),
        NUM_SAMPLES,
        "Queue duplicates elements"
    );
}

#[test]
#[serial]
fn test_multi_producer_multi_consumer() {
    const NUM_SAMPLES: usize = 2_000_000;

    let samples = SampleGenerator::new().serial_ints(NUM_SAMPLES);

    let report = Pipeline::new(10)
        .producers(3)
        .consumers(3)
        .deadline(timeout_secs(20))
        .run(samples.clone());

    assert!(report.completed, "Timeout exceeded");
    assert_eq!(report.rejected, 0, "Producer rejected before all samples were sent");
    assert_eq!(
        report.total_consumed(),
        NUM_SAMPLES,
        "Queue loses / duplicates elements"
    );

    let total: HashSet<i32> = report.flatten().into_iter().collect();
    let expected: HashSet<i32> = samples.into_iter().collect();
    assert_eq!(total, expected, "Queue loses / duplicates elements");
}

#[test]
#[serial]
fn test_capacity_never_exceeded_under_contention() {
    const CAPACITY: usize = 4;
    const PER_PRODUCER: usize = 50_000;

    let queue = Arc::new(BoundedBlockingQueue::new(CAPACITY));
    let live_producers = Arc::new(AtomicUsize::new(3));
    let mut threads = ThreadGroup::new();

    for _ in 0..3 {
        let queue = Arc::clone(&queue);
        let live_producers = Arc::clone(&live_producers);
        threads.thread(move || {
            for value in 0..PER_PRODUCER {
                assert!(queue.put(value));
                assert!(queue.len() <= CAPACITY, "Capacity exceeded");
            }
            if live_producers.fetch_sub(1, Ordering::AcqRel) == 1 {
                queue.close();
            }
        });
    }

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let queue = Arc::clone(&queue);
            threads.spawn(move || {
                let mut taken = 0;
                let mut peak = 0;
                while queue.take().is_some() {
                    taken += 1;
                    peak = peak.max(queue.len());
                }
                (taken, peak)
            })
        })
        .collect();

    assert!(threads.await_completion(timeout_secs(10)), "Timeout exceeded");

    let mut total = 0;
    for handle in consumers {
        let (taken, peak) = handle.get().unwrap();
        assert!(peak <= CAPACITY, "Capacity exceeded: observed {peak}");
        total += taken;
    }
    assert_eq!(total, 3 * PER_PRODUCER, "Queue loses / duplicates elements");
}

#[test]
#[serial]
fn test_mixed_offer_and_put_no_loss() {
    const PER_PRODUCER: i32 = 20_000;

    let queue = Arc::new(BoundedBlockingQueue::new(8));
    let mut threads = ThreadGroup::new();

    // Producer 0 only offers, spinning on a full queue; producer 1 blocks
    let admitted: Vec<_> = (0..2)
        .map(|producer| {
            let queue = Arc::clone(&queue);
            threads.spawn(move || {
                let base = producer * PER_PRODUCER;
                for value in base..base + PER_PRODUCER {
                    if producer == 0 {
                        while !queue.offer(value) {
                            thread::yield_now();
                        }
                    } else {
                        assert!(queue.put(value));
                    }
                }
            })
        })
        .collect();

    let consumers: Vec<_> = (0..2)
        .map(|_| {
            let queue = Arc::clone(&queue);
            threads.spawn(move || queue.iter().collect::<Vec<i32>>())
        })
        .collect();

    for handle in admitted {
        handle.get().unwrap();
    }
    queue.close();

    assert!(threads.await_completion(timeout_secs(10)), "Timeout exceeded");

    let mut all: Vec<i32> = consumers
        .into_iter()
        .flat_map(|handle| handle.get().unwrap())
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..2 * PER_PRODUCER).collect::<Vec<_>>());
}

#[test]
#[serial]
fn test_consumer_blocking() {
    let queue = Arc::new(BoundedBlockingQueue::new(10));
    let mut threads = ThreadGroup::new();

    let producer_queue = Arc::clone(&queue);
    threads.thread(move || {
        producer_queue.put(1);
        producer_queue.put(2);
    });
    assert!(threads.await_completion(timeout_millis(300)), "Timeout exceeded");

    let consumer_queue = Arc::clone(&queue);
    threads.thread(move || {
        assert_eq!(consumer_queue.take(), Some(1));
        assert_eq!(consumer_queue.take(), Some(2));
        assert_eq!(consumer_queue.take(), Some(3));
    });
    assert!(
        !threads.await_completion(Duration::from_millis(200)),
        "Consumer was expected to block"
    );

    let producer_queue = Arc::clone(&queue);
    threads.thread(move || {
        producer_queue.put(3);
    });
    assert!(threads.await_completion(timeout_millis(300)), "Timeout exceeded");
}

#[test]
#[serial]
fn test_producer_blocking() {
    let queue = Arc::new(BoundedBlockingQueue::new(3));
    let mut threads = ThreadGroup::new();

    let producer_queue = Arc::clone(&queue);
    threads.thread(move || {
        assert!(producer_queue.put(1));
        assert!(producer_queue.put(2));
        assert!(producer_queue.put(3));
    });
    assert!(threads.await_completion(timeout_millis(300)), "Timeout exceeded");
    assert_eq!(queue.len(), 3);

    let producer_queue = Arc::clone(&queue);
    threads.thread(move || {
        assert!(producer_queue.put(4));
    });
    assert!(
        !threads.await_completion(Duration::from_millis(200)),
        "Producer was expected to block"
    );
    assert_eq!(queue.len(), 3, "Capacity exceeded");

    let consumer_queue = Arc::clone(&queue);
    threads.thread(move || {
        assert_eq!(consumer_queue.take(), Some(1));
    });
    assert!(threads.await_completion(timeout_millis(300)), "Timeout exceeded");

    let consumer_queue = Arc::clone(&queue);
    threads.thread(move || {
        assert_eq!(consumer_queue.take(), Some(2));
        assert_eq!(consumer_queue.take(), Some(3));
        assert_eq!(consumer_queue.take(), Some(4));
    });
    assert!(threads.await_completion(timeout_millis(300)), "Timeout exceeded");
}

#[test]
fn test_single_thread() {
    let mut threads = ThreadGroup::new();

    threads.thread(|| {
        let queue = BoundedBlockingQueue::new(4);
        queue.put(1);
        queue.put(2);
        queue.put(3);
        assert_eq!(queue.take(), Some(1));
        assert_eq!(queue.take(), Some(2));
        queue.put(1);
        queue.put(2);
        queue.put(3);
        assert_eq!(queue.take(), Some(3));
        assert_eq!(queue.take(), Some(1));
        assert_eq!(queue.take(), Some(2));
        assert_eq!(queue.take(), Some(3));
    });

    assert!(threads.await_completion(timeout_secs(1)), "Timeout exceeded");
}

#[test]
fn test_queue_close() {
    let mut threads = ThreadGroup::new();

    threads.thread(|| {
        let queue = BoundedBlockingQueue::new(4);
        assert!(!queue.is_closed());
        queue.close();
        assert!(queue.is_closed());
        assert!(!queue.put(5));
        assert_eq!(queue.take(), None);
        assert!(!queue.offer(5));
        assert_eq!(queue.take(), None);
    });

    assert!(threads.await_completion(timeout_secs(1)), "Timeout exceeded");
}

#[test]
#[serial]
fn test_close_wakes_all_waiters() {
    let full = Arc::new(BoundedBlockingQueue::new(1));
    let empty = Arc::new(BoundedBlockingQueue::<u32>::new(1));
    assert!(full.put(0));

    let mut threads = ThreadGroup::new();

    let producers: Vec<_> = (1..=3)
        .map(|value| {
            let full = Arc::clone(&full);
            threads.spawn(move || full.put(value))
        })
        .collect();
    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let empty = Arc::clone(&empty);
            threads.spawn(move || empty.take())
        })
        .collect();

    assert!(
        !threads.await_completion(Duration::from_millis(200)),
        "Waiters were expected to block"
    );

    full.close();
    empty.close();
    assert!(threads.await_completion(timeout_secs(1)), "Timeout exceeded");

    for handle in producers {
        assert!(!handle.get().unwrap(), "Put succeeded on a closed queue");
    }
    for handle in consumers {
        assert_eq!(handle.get().unwrap(), None);
    }

    // The element buffered before close is still drainable
    assert_eq!(full.take(), Some(0));
    assert_eq!(full.take(), None);
}

#[test]
#[serial]
fn test_close_while_draining() {
    let queue = Arc::new(BoundedBlockingQueue::new(64));
    for i in 0..64 {
        assert!(queue.offer(i));
    }

    let mut threads = ThreadGroup::new();
    let consumers: Vec<_> = (0..4)
        .map(|_| {
            let queue = Arc::clone(&queue);
            threads.spawn(move || queue.iter().collect::<Vec<i32>>())
        })
        .collect();

    queue.close();
    assert!(threads.await_completion(timeout_secs(1)), "Timeout exceeded");

    let mut drained: Vec<i32> = consumers
        .into_iter()
        .flat_map(|handle| handle.get().unwrap())
        .collect();
    drained.sort_unstable();
    assert_eq!(drained, (0..64).collect::<Vec<_>>());
    assert_eq!(queue.take(), None);
}

#[test]
fn test_is_closed_polling_does_not_stall_holder() {
    let queue = Arc::new(BoundedBlockingQueue::new(2));
    let mut threads = ThreadGroup::new();

    for _ in 0..2 {
        let queue = Arc::clone(&queue);
        threads.thread(move || while !queue.is_closed() {});
    }

    let worker = Arc::clone(&queue);
    threads.thread(move || {
        for i in 0..10_000 {
            assert!(worker.put(i));
            assert_eq!(worker.take(), Some(i));
        }
        worker.close();
    });

    assert!(threads.await_completion(timeout_secs(5)), "Timeout exceeded");
}
