//! Download request: identity, priority, payload, and shared lifecycle state.
//!
//! A `Request` is created by the queue manager on submit and shared (via `Arc`)
//! between the registry, the ordering queue, and the dispatcher running it.
//! Identity and payload are immutable; status and the cancel flag are atomic
//! so any of those holders can read or update them without extra locking.

mod cancel;
mod status;

use std::fmt;
use std::path::PathBuf;

pub use cancel::CancelToken;
pub use status::RequestStatus;
pub(crate) use status::StatusCell;

/// Externally visible request id. Doubles as the FIFO sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId(pub u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Dispatch priority. Numerically smaller values are dispatched first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub u32);

impl Priority {
    pub const HIGHEST: Priority = Priority(0);
    pub const HIGH: Priority = Priority(1);
    pub const NORMAL: Priority = Priority(5);
    pub const LOW: Priority = Priority(10);
}

impl Default for Priority {
    fn default() -> Self {
        Priority::NORMAL
    }
}

impl From<u32> for Priority {
    fn from(value: u32) -> Self {
        Priority(value)
    }
}

/// What a caller hands to `QueueManager::submit`.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub url: String,
    pub destination: PathBuf,
    pub priority: Priority,
}

impl NewRequest {
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            priority: Priority::default(),
        }
    }

    pub fn with_priority(mut self, priority: impl Into<Priority>) -> Self {
        self.priority = priority.into();
        self
    }
}

/// One download job known to a queue manager.
#[derive(Debug)]
pub struct Request {
    id: RequestId,
    priority: Priority,
    url: String,
    destination: PathBuf,
    status: StatusCell,
    cancel: CancelToken,
}

impl Request {
    /// Builds a Pending request with its assigned id.
    pub(crate) fn new(id: RequestId, new: NewRequest) -> Self {
        Self {
            id,
            priority: new.priority,
            url: new.url,
            destination: new.destination,
            status: StatusCell::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn destination(&self) -> &std::path::Path {
        &self.destination
    }

    pub fn status(&self) -> RequestStatus {
        self.status.get()
    }

    /// True once `cancel` has been requested. Transfers must poll this.
    pub fn is_cancel_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Clone of the cancel flag, for transfers that hand it to callbacks.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Raises the cancel flag and moves a live status to Cancelled.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
        self.status.mark_cancelled();
    }

    pub(crate) fn status_cell(&self) -> &StatusCell {
        &self.status
    }
}

/// Read-only view of a tracked request, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestInfo {
    pub id: RequestId,
    pub priority: Priority,
    pub url: String,
    pub status: RequestStatus,
}

impl From<&Request> for RequestInfo {
    fn from(r: &Request) -> Self {
        Self {
            id: r.id,
            priority: r.priority,
            url: r.url.clone(),
            status: r.status(),
        }
    }
}
