//! `sdm get <url>...` – queue downloads, run the dispatchers, report outcomes.

use anyhow::Result;
use sdm_core::config::SdmConfig;
use sdm_core::destination::destination_for;
use sdm_core::{Completion, CurlTransfer, NewRequest, QueueManager, RequestId, TransferOutcome};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::sync::Arc;

/// Per-invocation overrides for `sdm get`.
#[derive(Debug, Clone, Default)]
pub struct GetOptions {
    pub priority: u32,
    pub dispatchers: Option<usize>,
    pub dir: Option<PathBuf>,
}

/// Tally of completions seen by the waiter.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Summary {
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Requests that never reported (dropped by an interrupt).
    pub unfinished: usize,
}

pub async fn run_get(cfg: &SdmConfig, urls: Vec<String>, opts: GetOptions) -> Result<()> {
    let dir = match opts.dir.or_else(|| cfg.download_dir.clone()) {
        Some(d) => d,
        None => std::env::current_dir()?,
    };
    let pool_size = opts.dispatchers.unwrap_or_else(|| cfg.pool_size()).max(1);

    let (tx, rx) = std::sync::mpsc::channel();
    let manager = QueueManager::new(Arc::new(CurlTransfer::new(cfg.transfer.clone())), pool_size)
        .with_completions(tx);

    let mut pending = HashSet::new();
    for url in urls {
        let dest = destination_for(&url, &dir);
        println!("Queued: {} -> {}", url, dest.display());
        let id = manager.submit(NewRequest::new(url, dest).with_priority(opts.priority));
        pending.insert(id);
    }
    manager.start()?;
    tracing::info!(requests = pending.len(), dispatchers = pool_size, "get started");

    let mut waiter = tokio::task::spawn_blocking(move || collect(&rx, pending));
    let summary = tokio::select! {
        res = &mut waiter => res?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted; cancelling downloads...");
            tokio::task::block_in_place(|| manager.cancel_all());
            // Dropping the manager closes the completion channel so the waiter returns.
            drop(manager);
            waiter.await?
        }
    };

    println!(
        "{} completed, {} failed, {} cancelled",
        summary.completed,
        summary.failed,
        summary.cancelled + summary.unfinished
    );
    if summary.failed + summary.cancelled + summary.unfinished > 0 {
        anyhow::bail!("not all downloads completed");
    }
    Ok(())
}

/// Blocks until every id in `pending` has reported or the channel closes.
pub(crate) fn collect(rx: &Receiver<Completion>, mut pending: HashSet<RequestId>) -> Summary {
    let mut summary = Summary::default();
    while !pending.is_empty() {
        let Ok(done) = rx.recv() else {
            break;
        };
        if !pending.remove(&done.id) {
            continue;
        }
        match &done.outcome {
            TransferOutcome::Completed => summary.completed += 1,
            TransferOutcome::Cancelled => summary.cancelled += 1,
            TransferOutcome::Failed(_) => summary.failed += 1,
        }
        println!("[{}] {}: {}", done.id, done.outcome, done.url);
    }
    summary.unfinished = pending.len();
    summary
}
