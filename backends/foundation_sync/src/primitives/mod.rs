//! Blocking synchronization primitives for preemptive OS threads.

// Public modules
pub mod blocking_queue;
pub mod errors;
pub mod mutex;
pub mod spin_wait;

// Re-export queue types
pub use blocking_queue::{BoundedBlockingQueue, Iter};
pub use errors::{CapacityError, PushError, TryPushError};

// Re-export mutex types
pub use mutex::{Mutex, MutexGuard};

// Re-export synchronization helpers
pub use spin_wait::SpinWait;
