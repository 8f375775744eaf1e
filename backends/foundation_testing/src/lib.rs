//! Test infrastructure for the `foundation_sync` primitives.
//!
//! This crate provides:
//! - **Thread harness**: [`ThreadGroup`] launches tasks and checks them against a deadline
//! - **Sample data**: [`SampleGenerator`] yields seeded random and serial integers
//! - **Timeout scaling**: [`timeout`] widens deadlines on slow machines
//! - **Stress test framework**: Configurable high-contention testing
//! - **Scenarios**: Producer-consumer pipelines
//!
//! # Examples
//!
//! ```rust
//! use foundation_testing::{timeout::timeout_secs, ThreadGroup};
//! use foundation_sync::BoundedBlockingQueue;
//! use std::sync::Arc;
//!
//! let queue = Arc::new(BoundedBlockingQueue::new(3));
//! let mut threads = ThreadGroup::new();
//!
//! let producer_queue = Arc::clone(&queue);
//! threads.thread(move || {
//!     for i in 1..=3 {
//!         producer_queue.put(i);
//!     }
//! });
//!
//! assert!(threads.await_completion(timeout_secs(1)));
//! assert_eq!(queue.take(), Some(1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)] // Common for testing crates

pub mod samples;
pub mod scenarios;
pub mod stress;
pub mod thread_group;
pub mod timeout;

// Re-export commonly used items
pub use samples::SampleGenerator;
pub use stress::{StressConfig, StressHarness, StressResult};
pub use thread_group::{DynamicLatch, TaskError, TaskHandle, ThreadGroup};
pub use timeout::{scale_timeout, timeout_millis, timeout_secs, TimeoutScale};
