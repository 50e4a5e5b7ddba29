//! Queue manager: id assignment, submit/query/cancel, and pool lifecycle.
//!
//! Data flow: `submit` assigns an id, records the request in the registry and
//! pushes it on the ordering queue. A dispatcher pops it, runs the transfer,
//! and calls back into `Shared::finish`, which drops the registry entry. After
//! that the id is unknown again and `query` answers `NotFound`.
//!
//! One manager is constructed per process (or per test) and passed around by
//! reference or `Arc`; nothing here is global.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::SdmConfig;
use crate::dispatcher::DispatcherPool;
use crate::error::QueueError;
use crate::queue::OrderingQueue;
use crate::registry::RequestRegistry;
use crate::request::{NewRequest, Request, RequestId, RequestInfo, RequestStatus};
use crate::transfer::{CurlTransfer, Transfer, TransferOutcome};

/// Sent once for every request a dispatcher completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub id: RequestId,
    pub url: String,
    pub outcome: TransferOutcome,
}

/// State shared between the manager and its dispatcher threads.
pub(crate) struct Shared {
    pub(crate) registry: RequestRegistry,
    pub(crate) queue: OrderingQueue,
    pub(crate) transfer: Arc<dyn Transfer>,
    completions: Mutex<Option<Sender<Completion>>>,
}

impl Shared {
    /// Dispatcher callback: record the outcome, drop the registry entry,
    /// notify listeners. Safe to call for a request `cancel_all` already removed.
    ///
    /// The status cell decides: if a cancel landed before the transfer
    /// reported, the request stays Cancelled and listeners are told Cancelled
    /// too, even when the transfer itself returned success.
    pub(crate) fn finish(&self, request: &Request, outcome: TransferOutcome) {
        let id = request.id();
        let status = request.status_cell();
        let applied = match outcome {
            TransferOutcome::Completed => status.mark_terminal(RequestStatus::Finished),
            TransferOutcome::Cancelled => status.mark_cancelled(),
            TransferOutcome::Failed(_) => status.mark_terminal(RequestStatus::Failed),
        };
        let outcome = if !applied && status.get() == RequestStatus::Cancelled {
            TransferOutcome::Cancelled
        } else {
            outcome
        };

        if self.registry.remove(id) {
            tracing::info!(%id, %outcome, in_flight = self.registry.len(), "request finished");
        } else {
            tracing::debug!(%id, %outcome, "finish for request no longer tracked");
        }

        let completions = self.completions.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(tx) = completions.as_ref() {
            let event = Completion {
                id,
                url: request.url().to_string(),
                outcome,
            };
            if tx.send(event).is_err() {
                tracing::debug!(%id, "completion listener gone");
            }
        }
    }
}

/// Top-level orchestrator. All methods take `&self`; share it with `Arc`.
pub struct QueueManager {
    shared: Arc<Shared>,
    pool: Mutex<DispatcherPool>,
    sequence: AtomicU64,
}

impl QueueManager {
    /// Manager with `pool_size` dispatchers (at least one) driving `transfer`.
    pub fn new(transfer: Arc<dyn Transfer>, pool_size: usize) -> Self {
        Self {
            shared: Arc::new(Shared {
                registry: RequestRegistry::new(),
                queue: OrderingQueue::new(),
                transfer,
                completions: Mutex::new(None),
            }),
            pool: Mutex::new(DispatcherPool::new(pool_size)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Manager using the bundled curl transfer and the configured pool size.
    pub fn from_config(cfg: &SdmConfig) -> Self {
        Self::new(
            Arc::new(CurlTransfer::new(cfg.transfer.clone())),
            cfg.pool_size(),
        )
    }

    /// Routes a `Completion` for each finished request into `tx`.
    pub fn with_completions(self, tx: Sender<Completion>) -> Self {
        *self.shared.completions.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        self
    }

    fn pool(&self) -> MutexGuard<'_, DispatcherPool> {
        self.pool.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queues a download and returns its id without waiting for it to run.
    /// Ids are strictly increasing and never reused, also across threads.
    /// Requests submitted before `start` simply wait in the queue.
    pub fn submit(&self, new: NewRequest) -> RequestId {
        let id = RequestId(self.sequence.fetch_add(1, Ordering::SeqCst) + 1);
        let request = Arc::new(Request::new(id, new));
        tracing::debug!(%id, priority = request.priority().0, url = request.url(), "submit");
        self.shared.registry.add(Arc::clone(&request));
        self.shared.queue.push(request);
        id
    }

    /// Current status, or `NotFound` for ids never submitted or already finished.
    pub fn query(&self, id: RequestId) -> RequestStatus {
        self.shared
            .registry
            .with(id, |r| r.status())
            .unwrap_or(RequestStatus::NotFound)
    }

    /// Raises the cancel flag on a tracked request. Returns false for unknown ids.
    ///
    /// The entry stays registered (and queued, if not yet dispatched); a
    /// dispatcher still picks it up, the transfer sees the flag, and the
    /// normal finish path removes it as Cancelled.
    pub fn cancel(&self, id: RequestId) -> bool {
        let found = self.shared.registry.with(id, |r| r.cancel()).is_some();
        if found {
            tracing::info!(%id, "cancel requested");
        } else {
            tracing::debug!(%id, "cancel for unknown request");
        }
        found
    }

    /// Bulk reset: flags every tracked request as cancelled so running
    /// transfers abort, stops (joins) all dispatchers, then empties the
    /// ordering queue and the registry. Returns how many requests were tracked.
    ///
    /// Queued requests are dropped without a `Completion`; in-flight ones
    /// still report through the finish path while the pool winds down.
    ///
    /// The queue is drained before the registry. A `submit` racing this call
    /// can therefore only leave a queued request with no registry entry,
    /// never a registry entry with nothing queued; dispatchers discard
    /// queued requests that are no longer tracked.
    pub fn cancel_all(&self) -> usize {
        let mut tracked = 0usize;
        self.shared.registry.for_each(|r| {
            r.cancel();
            tracked += 1;
        });
        self.stop();
        let dropped = self.shared.queue.clear();
        let cleared = self.shared.registry.clear();
        tracing::info!(tracked, cleared, dropped, "cancelled all requests");
        tracked
    }

    /// Drops a request from the registry. Idempotent: returns false if the
    /// request was already gone (finished, or cleared by `cancel_all`).
    pub fn finish(&self, id: RequestId) -> bool {
        self.shared.registry.remove(id)
    }

    /// Starts a fresh dispatcher generation, stopping (and joining) any
    /// running one first. The pool lock is never held across a join.
    pub fn start(&self) -> Result<(), QueueError> {
        let retired = self.pool().retire(&self.shared);
        retired.join();
        let spawned = self.pool().spawn(&self.shared);
        if let Err(failure) = spawned {
            failure.retired.join();
            return Err(failure.error);
        }
        Ok(())
    }

    /// Stops dispatchers after their current item and waits for them.
    /// Queued requests stay queued. Safe to call from inside a transfer.
    pub fn stop(&self) {
        let retired = self.pool().retire(&self.shared);
        retired.join();
    }

    pub fn is_running(&self) -> bool {
        self.pool().is_running()
    }

    /// Number of live dispatcher threads.
    pub fn dispatcher_count(&self) -> usize {
        self.pool().worker_count()
    }

    pub fn pool_size(&self) -> usize {
        self.pool().size()
    }

    /// Dispatcher generation; bumps on every `start`.
    pub fn generation(&self) -> u64 {
        self.pool().generation()
    }

    /// Requests currently tracked (queued or running).
    pub fn in_flight(&self) -> usize {
        self.shared.registry.len()
    }

    /// Requests waiting in the ordering queue.
    pub fn queued(&self) -> usize {
        self.shared.queue.len()
    }

    /// Every tracked request, sorted by id.
    pub fn snapshot(&self) -> Vec<RequestInfo> {
        let mut out = Vec::new();
        self.shared
            .registry
            .for_each(|r| out.push(RequestInfo::from(r.as_ref())));
        out.sort_by_key(|info| info.id);
        out
    }
}

impl Drop for QueueManager {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for QueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueManager")
            .field("in_flight", &self.in_flight())
            .field("queued", &self.queued())
            .field("generation", &self.generation())
            .finish()
    }
}
