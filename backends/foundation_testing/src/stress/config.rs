//! Stress test configuration.

use core::time::Duration;

/// Configuration for stress tests.
#[derive(Debug, Clone, Copy)]
pub struct StressConfig {
    /// Number of threads to spawn
    thread_count: usize,
    /// Number of iterations per thread
    iterations: usize,
    /// Optional deadline for all threads to finish
    deadline: Option<Duration>,
}

impl StressConfig {
    /// Creates a new stress test configuration with default values.
    ///
    /// Defaults:
    /// - `thread_count`: 4
    /// - `iterations`: 1000
    /// - `deadline`: None (wait for completion)
    #[must_use]
    pub const fn new() -> Self {
        Self {
            thread_count: 4,
            iterations: 1000,
            deadline: None,
        }
    }

    /// Sets the number of threads to spawn.
    #[must_use]
    pub const fn threads(mut self, count: usize) -> Self {
        self.thread_count = count;
        self
    }

    /// Sets the number of iterations per thread.
    #[must_use]
    pub const fn iterations(mut self, count: usize) -> Self {
        self.iterations = count;
        self
    }

    /// Sets the deadline for the whole run.
    ///
    /// If the threads have not finished by then, the run is reported as
    /// incomplete and the remaining threads are told to stop.
    #[must_use]
    pub const fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the deadline in seconds, scaled by the process timeout factor.
    #[must_use]
    pub fn deadline_secs(self, secs: u64) -> Self {
        self.deadline(crate::timeout::timeout_secs(secs))
    }

    /// Returns the thread count.
    #[must_use]
    pub const fn get_thread_count(&self) -> usize {
        self.thread_count
    }

    /// Returns the iteration count.
    #[must_use]
    pub const fn get_iterations(&self) -> usize {
        self.iterations
    }

    /// Returns the optional deadline.
    #[must_use]
    pub const fn get_deadline(&self) -> Option<Duration> {
        self.deadline
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self::new()
    }
}
