//! Thread coordination primitives for the foundation crates.
//!
//! This crate provides:
//! - **[`BoundedBlockingQueue`]**: a capacity-limited, closable FIFO channel
//! - **[`Mutex`]**: an exclusive, non-reentrant lock with spin-then-park waiting
//!
//! # Examples
//!
//! ```rust
//! use foundation_sync::{BoundedBlockingQueue, Mutex};
//! use std::sync::Arc;
//! use std::thread;
//!
//! let queue = Arc::new(BoundedBlockingQueue::new(4));
//!
//! let producer = {
//!     let queue = Arc::clone(&queue);
//!     thread::spawn(move || {
//!         for i in 0..10 {
//!             assert!(queue.put(i));
//!         }
//!         queue.close();
//!     })
//! };
//!
//! let taken: Vec<i32> = queue.iter().collect();
//! producer.join().unwrap();
//! assert_eq!(taken, (0..10).collect::<Vec<_>>());
//!
//! let mutex = Mutex::new();
//! {
//!     let _guard = mutex.scoped();
//!     assert!(!mutex.try_lock());
//! }
//! assert!(mutex.try_lock());
//! unsafe { mutex.unlock() };
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod primitives;

// Re-export commonly used items
pub use primitives::{
    BoundedBlockingQueue, CapacityError, Iter, Mutex, MutexGuard, PushError, SpinWait,
    TryPushError,
};
