//! Errors surfaced by the queue core.
//!
//! Unknown ids and duplicate finishes are not errors (see `QueueManager`);
//! the only fallible operation is starting dispatcher threads.

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("failed to spawn dispatcher thread {index} (generation {generation}): {source}")]
    Spawn {
        generation: u64,
        index: usize,
        #[source]
        source: std::io::Error,
    },
}
