//! Bounded backoff for contended acquisition.
//!
//! The first rounds issue an exponentially growing number of CPU spin hints.
//! Later rounds hand the time slice back to the scheduler. Once exhausted,
//! the caller is expected to park instead of burning more cycles.
//!
//! # Examples
//!
//! ```
//! use foundation_sync::primitives::SpinWait;
//!
//! let mut spin = SpinWait::new();
//!
//! loop {
//!     if try_acquire() {
//!         break;
//!     }
//!
//!     if !spin.spin() {
//!         // Backoff exhausted, time to park
//!         break;
//!     }
//! }
//! # fn try_acquire() -> bool { true }
//! ```

use core::hint;
use std::thread;

// Rounds spent issuing spin hints (1, 2, 4, ... 2^(SPIN_ROUNDS - 1) per round)
const SPIN_ROUNDS: u32 = 6;

// Total rounds, including the ones that yield to the scheduler
const SPIN_LIMIT: u32 = 10;

/// Exponential spin-then-yield backoff.
///
/// # Algorithm
///
/// - Rounds `0..SPIN_ROUNDS`: `2^round` `spin_loop` hints
/// - Rounds `SPIN_ROUNDS..SPIN_LIMIT`: one `thread::yield_now`
/// - Afterwards: `spin` returns `false`
#[derive(Debug)]
pub struct SpinWait {
    counter: u32,
}

impl SpinWait {
    /// Creates a new `SpinWait` instance.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { counter: 0 }
    }

    /// Performs one backoff round.
    ///
    /// Returns `true` if the round was performed, or `false` once the limit
    /// is reached and the caller should block instead.
    #[inline]
    pub fn spin(&mut self) -> bool {
        if self.counter >= SPIN_LIMIT {
            return false;
        }

        if self.counter < SPIN_ROUNDS {
            for _ in 0..(1u32 << self.counter) {
                hint::spin_loop();
            }
        } else {
            thread::yield_now();
        }

        self.counter += 1;
        true
    }

    /// Resets the round counter so the instance can be reused.
    #[inline]
    pub fn reset(&mut self) {
        self.counter = 0;
    }

    /// Returns how many rounds have been performed.
    #[inline]
    #[must_use]
    pub fn counter(&self) -> u32 {
        self.counter
    }

    /// Returns whether the backoff has reached its limit.
    #[inline]
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.counter >= SPIN_LIMIT
    }
}

impl Default for SpinWait {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
