//! `Mutex` stress tests.
//!
//! Every run drives a shared [`ExclusiveCell`] that has no synchronization
//! of its own. Inside the lock a thread expects the counter to start at
//! zero, increments it `steps` times (churning a small PRNG between
//! increments to stretch the critical section), checks it reached `steps`
//! and resets it. Any overlap between two holders shows up as a wrong
//! count.

use core::cell::UnsafeCell;
use core::ptr;
use std::sync::Arc;
use std::thread;

use foundation_sync::{Mutex, MutexGuard};

use crate::stress::{StressConfig, StressHarness, StressResult};

// MINSTD parameters
const CHURN_MULTIPLIER: u64 = 48_271;
const CHURN_MODULUS: u64 = 2_147_483_647;
const CHURN_SEED: u64 = 17;

/// Critical-section state that is only ever protected by an external lock.
///
/// All accessors are `unsafe`: the caller must hold the lock that guards
/// this cell. Reads and writes are volatile so the compiler cannot fold the
/// increment loop into a single store.
pub struct ExclusiveCell {
    counter: UnsafeCell<u32>,
    churn: UnsafeCell<u64>,
}

// SAFETY: every access goes through the unsafe accessors, whose contract
// requires holding the guarding lock.
unsafe impl Sync for ExclusiveCell {}

impl ExclusiveCell {
    /// Creates a cell with a zero counter.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            counter: UnsafeCell::new(0),
            churn: UnsafeCell::new(CHURN_SEED),
        }
    }

    /// Reads the counter.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock guarding this cell.
    #[inline]
    #[must_use]
    pub unsafe fn load(&self) -> u32 {
        ptr::read_volatile(self.counter.get())
    }

    /// Writes the counter.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock guarding this cell.
    #[inline]
    pub unsafe fn store(&self, value: u32) {
        ptr::write_volatile(self.counter.get(), value);
    }

    /// Advances the internal PRNG by one step.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock guarding this cell.
    #[inline]
    pub unsafe fn churn(&self) {
        let state = ptr::read_volatile(self.churn.get());
        ptr::write_volatile(self.churn.get(), state * CHURN_MULTIPLIER % CHURN_MODULUS);
    }

    /// Runs one critical section of `steps` increments.
    ///
    /// Returns `false` if another thread was observed inside the same
    /// section.
    ///
    /// # Safety
    ///
    /// The caller must hold the lock guarding this cell.
    pub unsafe fn exclusive_pass(&self, steps: u32) -> bool {
        let clean_entry = self.load() == 0;
        for _ in 0..steps {
            self.store(self.load().wrapping_add(1));
            self.churn();
        }
        let clean_exit = self.load() == steps;
        self.store(0);
        clean_entry && clean_exit
    }
}

impl Default for ExclusiveCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Number of lock cycles per thread for a critical section of `steps`.
///
/// Short sections get many cycles, long sections few, so every size costs
/// roughly the same wall time.
#[must_use]
pub fn iterations_for_steps(steps: u32) -> usize {
    let steps = steps.max(1) as usize;
    if steps < 10 {
        128 * 1024 / steps
    } else {
        (8 * 1024 * 1024 / steps).max(1)
    }
}

/// Runs the blocking-lock exclusion stress test.
///
/// Every iteration takes the lock with [`Mutex::scoped`] and runs one
/// critical section of `steps` increments. A failure means exclusion was
/// violated.
///
/// # Examples
///
/// ```
/// use foundation_testing::stress::{StressConfig, sync::run_mutex_exclusion_stress};
///
/// let config = StressConfig::new().threads(3).iterations(1000);
/// let result = run_mutex_exclusion_stress(config, 10);
///
/// assert!(result.completed);
/// assert_eq!(result.failures, 0);
/// ```
#[must_use]
pub fn run_mutex_exclusion_stress(config: StressConfig, steps: u32) -> StressResult {
    let mutex = Arc::new(Mutex::new());
    let cell = Arc::new(ExclusiveCell::new());

    let harness = StressHarness::new(config);

    harness.run(move |_thread_id, _iteration| {
        let _guard = mutex.scoped();
        // SAFETY: `_guard` holds the lock guarding `cell`
        unsafe { cell.exclusive_pass(steps) }
    })
}

/// Runs the mixed `try_lock`/`lock` exclusion stress test.
///
/// Every fifth iteration blocks in [`Mutex::lock`]; the others use
/// [`Mutex::try_lock`] and yield when the lock is busy. Acquired locks are
/// adopted by a [`MutexGuard`]. A failure means exclusion was violated; a
/// busy `try_lock` is not a failure.
#[must_use]
pub fn run_try_lock_stress(config: StressConfig, steps: u32) -> StressResult {
    let mutex = Arc::new(Mutex::new());
    let cell = Arc::new(ExclusiveCell::new());

    let harness = StressHarness::new(config);

    harness.run(move |_thread_id, iteration| {
        let locked = if iteration % 5 == 0 {
            mutex.lock();
            true
        } else {
            mutex.try_lock()
        };

        if locked {
            // SAFETY: the lock was acquired just above on this thread
            let _guard = unsafe { MutexGuard::adopt(&mutex) };
            // SAFETY: `_guard` holds the lock guarding `cell`
            unsafe { cell.exclusive_pass(steps) }
        } else {
            thread::yield_now();
            true
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// WHY: Cycle counts must scale inversely with section length
    /// WHAT: Known sizes map to the expected iteration counts
    #[test]
    fn test_iterations_for_steps() {
        assert_eq!(iterations_for_steps(1), 128 * 1024);
        assert_eq!(iterations_for_steps(0), 128 * 1024);
        assert_eq!(iterations_for_steps(100), 83_886);
        assert_eq!(iterations_for_steps(1024), 8 * 1024);
        assert_eq!(iterations_for_steps(8 * 1024 * 1024), 1);
    }

    /// WHY: A single holder must always pass
    /// WHAT: Sequential passes leave the counter at zero
    #[test]
    fn test_exclusive_pass_single_thread() {
        let cell = ExclusiveCell::default();
        unsafe {
            assert!(cell.exclusive_pass(5));
            assert!(cell.exclusive_pass(0));
            assert_eq!(cell.load(), 0);
        }
    }

    /// WHY: The check must actually detect an overlapping holder
    /// WHAT: A dirty counter on entry fails the pass
    #[test]
    fn test_exclusive_pass_detects_overlap() {
        let cell = ExclusiveCell::new();
        unsafe {
            cell.store(1);
            assert!(!cell.exclusive_pass(3));
            assert_eq!(cell.load(), 0);
        }
    }
}
