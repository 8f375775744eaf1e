//! Exclusive, non-reentrant lock with spin-then-park waiting.
//!
//! The lock is a single atomic state word. An uncontended acquire is one
//! compare-exchange. A contended acquirer backs off with [`SpinWait`] and,
//! if the lock is still held, marks the word `CONTENDED` and sleeps on an
//! internal condition variable. Release only touches the sleeper side when
//! the word says someone may be asleep.
//!
//! # Examples
//!
//! ```
//! use foundation_sync::Mutex;
//!
//! let mutex = Mutex::new();
//!
//! {
//!     let _guard = mutex.scoped();
//!     // critical section
//! } // Lock released here
//!
//! if mutex.try_lock() {
//!     // SAFETY: acquired by the `try_lock` above on this thread
//!     unsafe { mutex.unlock() };
//! }
//! ```

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex as SleeperLock};

use crate::primitives::SpinWait;

// State encoding:
// UNLOCKED: nobody holds the lock
// LOCKED: held, no thread is sleeping on it
// CONTENDED: held, sleepers may exist and must be woken on release
const UNLOCKED: u8 = 0;
const LOCKED: u8 = 1;
const CONTENDED: u8 = 2;

/// A mutual exclusion lock that protects no data of its own.
///
/// The lock has no notion of an owner: it must not be acquired twice by the
/// same thread, and only the thread holding it may release it. Waiters are
/// not queued fairly, a releasing thread may immediately re-acquire.
pub struct Mutex {
    state: AtomicU8,
    sleepers: SleeperLock<()>,
    wakeup: Condvar,
}

/// RAII guard for [`Mutex`]; releases the lock when dropped.
#[must_use = "if unused the Mutex will immediately unlock"]
pub struct MutexGuard<'a> {
    mutex: &'a Mutex,
}

impl Mutex {
    /// Creates a new unlocked mutex.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: AtomicU8::new(UNLOCKED),
            sleepers: SleeperLock::new(()),
            wakeup: Condvar::new(),
        }
    }

    /// Acquires the lock, blocking until it becomes available.
    #[inline]
    pub fn lock(&self) {
        // Fast path: try to acquire immediately
        if self
            .state
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
        {
            return;
        }

        // Slow path: back off, then park
        self.lock_contended();
    }

    #[cold]
    fn lock_contended(&self) {
        let mut spin_wait = SpinWait::new();
        while spin_wait.spin() {
            match self.state.load(Ordering::Relaxed) {
                UNLOCKED => {
                    if self
                        .state
                        .compare_exchange_weak(
                            UNLOCKED,
                            LOCKED,
                            Ordering::Acquire,
                            Ordering::Relaxed,
                        )
                        .is_ok()
                    {
                        return;
                    }
                }
                // Others are already asleep, spinning will not beat them
                CONTENDED => break,
                _ => {}
            }
        }

        // Whoever takes the lock from here on leaves it CONTENDED, so the
        // eventual release wakes the next sleeper.
        while self.state.swap(CONTENDED, Ordering::Acquire) != UNLOCKED {
            self.park();
        }
    }

    fn park(&self) {
        tracing::trace!("mutex contended, parking");

        let mut sleepers = match self.sleepers.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };

        // Checked under the sleeper lock: a releasing thread takes the same
        // lock before notifying, so the wakeup cannot slip in between the
        // check and the wait.
        while self.state.load(Ordering::Relaxed) == CONTENDED {
            sleepers = match self.wakeup.wait(sleepers) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
        }
    }

    /// Attempts to acquire the lock without blocking.
    ///
    /// Returns `true` if the lock was acquired, `false` if it is held.
    #[inline]
    #[must_use]
    pub fn try_lock(&self) -> bool {
        self.state
            .compare_exchange(UNLOCKED, LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Releases the lock.
    ///
    /// # Safety
    ///
    /// This must only be called by the thread that currently holds the lock,
    /// acquired through [`lock`](Self::lock) or [`try_lock`](Self::try_lock)
    /// and not owned by a [`MutexGuard`].
    #[inline]
    pub unsafe fn unlock(&self) {
        if self.state.swap(UNLOCKED, Ordering::Release) == CONTENDED {
            self.wake_one();
        }
    }

    #[cold]
    fn wake_one(&self) {
        let _sleepers = match self.sleepers.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        };
        self.wakeup.notify_one();
    }

    /// Acquires the lock and returns a guard that releases it on drop.
    #[inline]
    pub fn scoped(&self) -> MutexGuard<'_> {
        self.lock();
        MutexGuard { mutex: self }
    }

    /// Attempts to acquire the lock without blocking, returning a guard on
    /// success.
    #[inline]
    pub fn try_scoped(&self) -> Option<MutexGuard<'_>> {
        if self.try_lock() {
            Some(MutexGuard { mutex: self })
        } else {
            None
        }
    }

    /// Returns whether the lock is currently held.
    ///
    /// This is a snapshot and may be stale by the time it is observed.
    #[inline]
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != UNLOCKED
    }
}

impl Default for Mutex {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mutex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutex")
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

impl<'a> MutexGuard<'a> {
    /// Wraps a lock the calling thread already holds, so that it is released
    /// when the guard drops.
    ///
    /// # Safety
    ///
    /// The calling thread must hold `mutex` through a successful
    /// [`Mutex::lock`] or [`Mutex::try_lock`], and must not release it by
    /// any other means.
    #[inline]
    pub unsafe fn adopt(mutex: &'a Mutex) -> Self {
        Self { mutex }
    }

    /// Returns the mutex this guard releases.
    #[inline]
    #[must_use]
    pub fn mutex(&self) -> &'a Mutex {
        self.mutex
    }
}

impl Drop for MutexGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: the guard only exists while its thread holds the lock
        unsafe {
            self.mutex.unlock();
        }
    }
}

impl fmt::Debug for MutexGuard<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexGuard").finish_non_exhaustive()
    }
}
