//! Request status and its lock-free transition cell.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle status reported by `QueueManager::query`.
///
/// `NotFound` is never stored on a request; it is the answer for ids that
/// were never submitted or have already been removed from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    Pending,
    Running,
    Cancelled,
    Finished,
    Failed,
    NotFound,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Running => "running",
            RequestStatus::Cancelled => "cancelled",
            RequestStatus::Finished => "finished",
            RequestStatus::Failed => "failed",
            RequestStatus::NotFound => "not-found",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RequestStatus::Cancelled | RequestStatus::Finished | RequestStatus::Failed
        )
    }

    fn to_u8(self) -> u8 {
        match self {
            RequestStatus::Pending => 0,
            RequestStatus::Running => 1,
            RequestStatus::Cancelled => 2,
            RequestStatus::Finished => 3,
            RequestStatus::Failed => 4,
            RequestStatus::NotFound => 5,
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => RequestStatus::Pending,
            1 => RequestStatus::Running,
            2 => RequestStatus::Cancelled,
            3 => RequestStatus::Finished,
            4 => RequestStatus::Failed,
            _ => RequestStatus::NotFound,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Atomic status slot. Moves only forward: Pending -> Running -> terminal,
/// with Cancelled reachable from Pending or Running. Terminal states stick.
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl StatusCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(RequestStatus::Pending.to_u8()))
    }

    pub fn get(&self) -> RequestStatus {
        RequestStatus::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Pending -> Running. Returns false (and changes nothing) otherwise,
    /// e.g. when the request was cancelled while still queued.
    pub(crate) fn mark_running(&self) -> bool {
        self.transition(RequestStatus::Running, |s| s == RequestStatus::Pending)
    }

    /// Pending|Running -> Cancelled.
    pub(crate) fn mark_cancelled(&self) -> bool {
        self.transition(RequestStatus::Cancelled, |s| !s.is_terminal())
    }

    /// Moves a live request to a terminal state. A Cancelled request stays Cancelled.
    pub(crate) fn mark_terminal(&self, to: RequestStatus) -> bool {
        debug_assert!(to.is_terminal());
        self.transition(to, |s| !s.is_terminal())
    }

    fn transition(&self, to: RequestStatus, allowed: impl Fn(RequestStatus) -> bool) -> bool {
        let mut current = self.0.load(Ordering::Acquire);
        loop {
            if !allowed(RequestStatus::from_u8(current)) {
                return false;
            }
            match self.0.compare_exchange_weak(
                current,
                to.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_path() {
        let cell = StatusCell::new();
        assert_eq!(cell.get(), RequestStatus::Pending);
        assert!(cell.mark_running());
        assert_eq!(cell.get(), RequestStatus::Running);
        assert!(cell.mark_terminal(RequestStatus::Finished));
        assert_eq!(cell.get(), RequestStatus::Finished);
    }

    #[test]
    fn cancelled_is_never_reversed() {
        let cell = StatusCell::new();
        assert!(cell.mark_cancelled());
        assert!(!cell.mark_running());
        assert!(!cell.mark_terminal(RequestStatus::Finished));
        assert!(!cell.mark_cancelled());
        assert_eq!(cell.get(), RequestStatus::Cancelled);
    }

    #[test]
    fn cancel_while_running() {
        let cell = StatusCell::new();
        assert!(cell.mark_running());
        assert!(cell.mark_cancelled());
        assert!(!cell.mark_terminal(RequestStatus::Failed));
        assert_eq!(cell.get(), RequestStatus::Cancelled);
    }

    #[test]
    fn finished_cannot_be_cancelled() {
        let cell = StatusCell::new();
        assert!(cell.mark_running());
        assert!(cell.mark_terminal(RequestStatus::Finished));
        assert!(!cell.mark_cancelled());
        assert_eq!(cell.get(), RequestStatus::Finished);
    }

    #[test]
    fn display_names() {
        assert_eq!(RequestStatus::NotFound.to_string(), "not-found");
        assert_eq!(RequestStatus::Running.to_string(), "running");
    }
}
