//! Worker loop: pop, mark running, transfer, report.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::manager::Shared;
use crate::request::Request;
use crate::transfer::TransferOutcome;

pub(super) fn run(shared: &Shared, active: &AtomicU64, generation: u64, index: usize) {
    tracing::debug!(generation, index, "dispatcher up");
    let keep_running = || active.load(Ordering::Acquire) == generation;
    while let Some(request) = shared.queue.pop_while(keep_running) {
        dispatch(shared, request);
    }
    tracing::debug!(generation, index, "dispatcher down");
}

/// Runs one tracked request through the transfer and reports it exactly
/// once, even if the transfer panics.
fn dispatch(shared: &Shared, request: Arc<Request>) {
    let id = request.id();
    // Removed by cancel_all or an explicit finish while still queued.
    if shared.registry.find(id).is_none() {
        tracing::debug!(%id, "dropping queued request that is no longer tracked");
        return;
    }
    if request.status_cell().mark_running() {
        tracing::debug!(%id, priority = request.priority().0, "dispatching");
    } else {
        tracing::debug!(%id, status = %request.status(), "dispatching request cancelled while queued");
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| shared.transfer.run(&request)));
    let outcome = match result {
        Ok(r) => TransferOutcome::from_result(r, request.is_cancel_requested()),
        Err(_) => {
            tracing::error!(%id, "transfer panicked");
            TransferOutcome::Failed("transfer panicked".to_string())
        }
    };
    shared.finish(&request, outcome);
}
