pub mod config;
pub mod logging;

pub mod destination;
mod dispatcher;
pub mod error;
pub mod manager;
pub mod queue;
pub mod registry;
pub mod request;
pub mod transfer;

pub use error::QueueError;
pub use manager::{Completion, QueueManager};
pub use request::{CancelToken, NewRequest, Priority, Request, RequestId, RequestInfo, RequestStatus};
pub use transfer::{CurlTransfer, Transfer, TransferError, TransferOutcome};
