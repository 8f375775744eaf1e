//! Error types for the blocking queue.
//!
//! Rejected elements are carried back inside the error so the caller keeps
//! ownership of anything the queue did not admit.

use core::error::Error;
use core::fmt;

/// Returned by [`BoundedBlockingQueue::try_new`](crate::BoundedBlockingQueue::try_new)
/// when asked for a queue that can hold nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityError;

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("queue capacity must be greater than 0")
    }
}

impl Error for CapacityError {}

/// A blocking push failed because the queue is closed.
///
/// The element that could not be enqueued is returned to the caller.
#[derive(PartialEq, Eq)]
pub struct PushError<T>(pub T);

impl<T> PushError<T> {
    /// Consumes the error, returning the rejected element.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PushError").finish_non_exhaustive()
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("pushing into a closed queue")
    }
}

impl<T> Error for PushError<T> {}

/// A non-blocking push failed.
#[derive(PartialEq, Eq)]
pub enum TryPushError<T> {
    /// The queue is at capacity.
    Full(T),
    /// The queue is closed.
    Closed(T),
}

impl<T> TryPushError<T> {
    /// Consumes the error, returning the rejected element.
    #[inline]
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(element) | Self::Closed(element) => element,
        }
    }

    /// Returns `true` if the push failed because the queue was full.
    #[inline]
    #[must_use]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    /// Returns `true` if the push failed because the queue was closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

impl<T> From<PushError<T>> for TryPushError<T> {
    fn from(err: PushError<T>) -> Self {
        Self::Closed(err.0)
    }
}

impl<T> fmt::Debug for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("Full(..)"),
            Self::Closed(_) => f.write_str("Closed(..)"),
        }
    }
}

impl<T> fmt::Display for TryPushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Full(_) => f.write_str("pushing into a full queue"),
            Self::Closed(_) => f.write_str("pushing into a closed queue"),
        }
    }
}

impl<T> Error for TryPushError<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    /// WHY: A rejected element must never be lost
    /// WHAT: `into_inner` hands the element back for both error kinds
    #[test]
    fn test_into_inner_returns_element() {
        assert_eq!(PushError(String::from("a")).into_inner(), "a");
        assert_eq!(TryPushError::Full(7).into_inner(), 7);
        assert_eq!(TryPushError::Closed(8).into_inner(), 8);
    }

    /// WHY: Callers branch on the failure kind
    /// WHAT: `is_full`/`is_closed` match the variant, and a closed push converts to `Closed`
    #[test]
    fn test_kind_predicates() {
        let full = TryPushError::Full(1);
        assert!(full.is_full());
        assert!(!full.is_closed());

        let closed: TryPushError<i32> = PushError(2).into();
        assert!(closed.is_closed());
        assert_eq!(closed, TryPushError::Closed(2));
    }

    /// WHY: Errors are surfaced through `Display`
    /// WHAT: Messages describe the rejection without requiring `T: Debug`
    #[test]
    fn test_display() {
        struct Opaque;

        assert_eq!(
            TryPushError::Full(Opaque).to_string(),
            "pushing into a full queue"
        );
        assert_eq!(PushError(Opaque).to_string(), "pushing into a closed queue");
        assert_eq!(format!("{:?}", TryPushError::Closed(Opaque)), "Closed(..)");
        assert_eq!(
            CapacityError.to_string(),
            "queue capacity must be greater than 0"
        );
    }
}
