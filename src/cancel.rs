//! Cooperative cancellation.
//!
//! Long-running work (sort merge steps, filter chunks) calls
//! [`Checkpoint::checkpoint`] between bounded units of work. The checkpoint
//! first yields to the host so pending control messages are processed, then
//! reports whether the computation has been superseded. Cancellation is
//! advisory: a unit of work always runs to its own boundary.

/// Marker returned when a computation observed that it was superseded.
///
/// Carries no data on purpose: a cancelled computation has nothing the
/// caller may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

/// Host hook polled at every cooperative checkpoint.
pub trait Checkpoint {
    /// Let higher-priority events (a newer request, a dataset replacement)
    /// interleave before work resumes.
    fn yield_now(&mut self);

    /// True once the computation is no longer authoritative.
    fn should_cancel(&mut self) -> bool;

    /// Yield, then re-check cancellation.
    fn checkpoint(&mut self) -> bool {
        self.yield_now();
        self.should_cancel()
    }
}

/// Any `FnMut() -> bool` is a checkpoint with nothing to yield to.
impl<F> Checkpoint for F
where
    F: FnMut() -> bool,
{
    fn yield_now(&mut self) {}

    fn should_cancel(&mut self) -> bool {
        self()
    }
}

/// Checkpoint for callers that never cancel.
#[derive(Debug, Default, Clone, Copy)]
pub struct NeverCancel;

impl Checkpoint for NeverCancel {
    fn yield_now(&mut self) {}

    fn should_cancel(&mut self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_checkpoint() {
        let mut calls = 0;
        let mut cancel_on_third = || {
            calls += 1;
            calls >= 3
        };
        assert!(!cancel_on_third.checkpoint());
        assert!(!cancel_on_third.checkpoint());
        assert!(cancel_on_third.checkpoint());
    }

    #[test]
    fn test_never_cancel() {
        let mut never = NeverCancel;
        for _ in 0..10 {
            assert!(!never.checkpoint());
        }
    }
}
