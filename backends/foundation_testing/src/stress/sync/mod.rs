//! Stress tests for synchronization primitives.

pub mod mutex;

pub use mutex::{
    iterations_for_steps, run_mutex_exclusion_stress, run_try_lock_stress, ExclusiveCell,
};
