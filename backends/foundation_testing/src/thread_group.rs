//! Thread launcher with deadline-based completion checks.
//!
//! A [`ThreadGroup`] starts independent OS threads and answers one question:
//! did every one of them finish before a deadline? Completion is counted by
//! a shared [`DynamicLatch`], so the group can keep growing between checks.
//! Dropping the group joins every thread, whether or not the deadline was
//! met.

use core::fmt;
use core::time::Duration;
use std::any::Any;
use std::panic;
use std::sync::mpsc::{self, Receiver, RecvError};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

/// A completion counter whose target is chosen by each waiter.
///
/// Tasks call [`satisfy`](Self::satisfy) once when they finish; waiters block
/// until the count reaches the number they ask for.
#[derive(Debug, Default)]
pub struct DynamicLatch {
    completed: Mutex<usize>,
    condvar: Condvar,
}

impl DynamicLatch {
    /// Creates a latch with no completions recorded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completion and wakes every waiter.
    pub fn satisfy(&self) {
        let mut completed = self.lock_count();
        *completed += 1;
        drop(completed);
        self.condvar.notify_all();
    }

    /// Returns the number of completions recorded so far.
    #[must_use]
    pub fn count(&self) -> usize {
        *self.lock_count()
    }

    /// Blocks until at least `n` completions have been recorded.
    pub fn wait(&self, n: usize) {
        let mut completed = self.lock_count();
        while *completed < n {
            completed = match self.condvar.wait(completed) {
                Ok(g) => g,
                Err(e) => e.into_inner(),
            };
        }
    }

    /// Blocks until at least `n` completions have been recorded or `timeout`
    /// elapses.
    ///
    /// Returns `true` if the count was reached in time.
    #[must_use]
    pub fn wait_timeout(&self, n: usize, timeout: Duration) -> bool {
        let completed = self.lock_count();
        let (completed, _result) =
            match self
                .condvar
                .wait_timeout_while(completed, timeout, |completed| *completed < n)
            {
                Ok(r) => r,
                Err(e) => e.into_inner(),
            };
        *completed >= n
    }

    fn lock_count(&self) -> MutexGuard<'_, usize> {
        match self.completed.lock() {
            Ok(g) => g,
            Err(e) => e.into_inner(),
        }
    }
}

/// Error returned by [`TaskHandle::get`].
#[derive(Debug, derive_more::From)]
pub enum TaskError {
    /// The task ended without producing a value, which only happens when it
    /// panicked.
    Panicked(RecvError),
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Panicked(_) => f.write_str("task panicked before producing a value"),
        }
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Panicked(err) => Some(err),
        }
    }
}

/// The eventual result of a task started with [`ThreadGroup::spawn`].
pub struct TaskHandle<R> {
    receiver: Receiver<R>,
}

impl<R> TaskHandle<R> {
    /// Blocks until the task finishes and returns its value.
    ///
    /// # Errors
    ///
    /// Returns [`TaskError::Panicked`] if the task panicked.
    pub fn get(self) -> Result<R, TaskError> {
        Ok(self.receiver.recv()?)
    }
}

impl<R> fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle").finish_non_exhaustive()
    }
}

// Counts the task as completed on every exit path, including unwinding.
struct CompletionGuard {
    latch: Arc<DynamicLatch>,
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            let current = thread::current();
            tracing::error!(
                thread = current.name().unwrap_or("<unnamed>"),
                "thread group task panicked"
            );
        }
        self.latch.satisfy();
    }
}

/// A set of concurrently running threads, joined on drop.
///
/// # Examples
///
/// ```
/// use foundation_testing::ThreadGroup;
/// use std::time::Duration;
///
/// let mut threads = ThreadGroup::new();
/// threads.thread(|| {
///     // some work
/// });
/// let answer = threads.spawn(|| 6 * 7);
///
/// assert!(threads.await_completion(Duration::from_secs(1)));
/// assert_eq!(answer.get().unwrap(), 42);
/// ```
///
/// # Panics
///
/// Dropping the group re-raises the first panic of any of its threads,
/// unless the dropping thread is already unwinding.
pub struct ThreadGroup {
    threads: Vec<JoinHandle<()>>,
    completion: Arc<DynamicLatch>,
}

impl ThreadGroup {
    /// Creates an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self {
            threads: Vec::new(),
            completion: Arc::new(DynamicLatch::new()),
        }
    }

    /// Starts `func` on a new thread.
    ///
    /// # Panics
    ///
    /// Panics if the operating system refuses to create the thread.
    pub fn thread<F>(&mut self, func: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = CompletionGuard {
            latch: Arc::clone(&self.completion),
        };
        let index = self.threads.len();

        let handle = thread::Builder::new()
            .name(format!("thread-group-{index}"))
            .spawn(move || {
                let _guard = guard;
                func();
            })
            .expect("failed to spawn thread group task");

        tracing::debug!(index, "thread group task started");
        self.threads.push(handle);
    }

    /// Starts `func` on a new thread and returns a handle to its result.
    pub fn spawn<F, R>(&mut self, func: F) -> TaskHandle<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (sender, receiver) = mpsc::sync_channel(1);
        self.thread(move || {
            // The handle may have been dropped; the value is then discarded.
            let _ = sender.send(func());
        });
        TaskHandle { receiver }
    }

    /// Returns the number of threads started so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.threads.len()
    }

    /// Returns `true` if no thread has been started.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Waits until every thread started so far has finished, or `timeout`
    /// elapses.
    ///
    /// Returns `true` if all of them finished in time. A thread that
    /// panicked counts as finished.
    #[must_use]
    pub fn await_completion(&self, timeout: Duration) -> bool {
        let completed = self.completion.wait_timeout(self.threads.len(), timeout);
        if !completed {
            tracing::warn!(
                started = self.threads.len(),
                finished = self.completion.count(),
                ?timeout,
                "thread group missed its deadline"
            );
        }
        completed
    }

    /// Lets the threads run on without joining them.
    ///
    /// Used when a deadline was missed and the threads may never finish.
    pub fn detach(mut self) {
        let detached = std::mem::take(&mut self.threads);
        tracing::debug!(count = detached.len(), "detaching thread group");
        drop(detached);
    }
}

impl Default for ThreadGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ThreadGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadGroup")
            .field("started", &self.threads.len())
            .field("finished", &self.completion.count())
            .finish()
    }
}

impl Drop for ThreadGroup {
    fn drop(&mut self) {
        let mut first_panic: Option<Box<dyn Any + Send>> = None;

        for handle in self.threads.drain(..) {
            if let Err(payload) = handle.join() {
                first_panic.get_or_insert(payload);
            }
        }

        if let Some(payload) = first_panic {
            if !thread::panicking() {
                panic::resume_unwind(payload);
            }
        }
    }
}
