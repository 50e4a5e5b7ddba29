//! Transfer collaborator: the code that actually moves bytes for one request.
//!
//! The queue core only needs "run this request to completion" from it. A
//! dispatcher calls `Transfer::run` synchronously on its own thread and then
//! reports the result to the manager exactly once, whatever the outcome.
//!
//! Cancellation is cooperative. Implementations must check
//! `Request::is_cancel_requested` (or a cloned `CancelToken`) before starting
//! and at bounded intervals while running, and return
//! `TransferError::Aborted` once they see it set. The core never interrupts
//! a running transfer. Retries, if any, also belong here.

mod http;

use std::fmt;

use crate::request::Request;

pub use http::{part_path, CurlTransfer};

/// Error returned by a transfer. `Aborted` is the cancellation path; every
/// other variant is reported as a failure.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("transfer aborted by cancellation")]
    Aborted,
    #[error("HTTP {0}")]
    Http(u32),
    #[error(transparent)]
    Curl(#[from] curl::Error),
    #[error("storage: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Other(String),
}

/// Performs one download. Must be shareable across dispatcher threads.
pub trait Transfer: Send + Sync {
    fn run(&self, request: &Request) -> Result<(), TransferError>;
}

impl<F> Transfer for F
where
    F: Fn(&Request) -> Result<(), TransferError> + Send + Sync,
{
    fn run(&self, request: &Request) -> Result<(), TransferError> {
        self(request)
    }
}

/// How a dispatched request ended, as seen by the manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Completed,
    Cancelled,
    Failed(String),
}

impl TransferOutcome {
    /// Folds a transfer result together with the request's cancel flag.
    /// Any error on a cancelled request counts as a cancellation.
    pub fn from_result(result: Result<(), TransferError>, cancel_requested: bool) -> Self {
        match result {
            Ok(()) => TransferOutcome::Completed,
            Err(TransferError::Aborted) => TransferOutcome::Cancelled,
            Err(_) if cancel_requested => TransferOutcome::Cancelled,
            Err(e) => TransferOutcome::Failed(e.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TransferOutcome::Completed)
    }
}

impl fmt::Display for TransferOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOutcome::Completed => write!(f, "completed"),
            TransferOutcome::Cancelled => write!(f, "cancelled"),
            TransferOutcome::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}
