//! Restartable pool of dispatcher threads.
//!
//! Each start opens a new generation and spawns `size` workers bound to it.
//! Retiring a generation closes it, wakes workers parked on the empty queue,
//! and hands their join handles back to the caller; joining happens outside
//! the pool lock so a transfer may itself stop or query the pool. A worker in
//! the middle of a transfer finishes that item first. Because a worker only
//! serves the generation it was spawned for, a restart can never leave old
//! and new workers pulling from the queue together.

mod worker;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::error::QueueError;
use crate::manager::Shared;

/// Generation value meaning "no live generation".
const STOPPED: u64 = 0;

#[derive(Debug)]
pub(crate) struct DispatcherPool {
    size: usize,
    generation: u64,
    active: Arc<AtomicU64>,
    workers: Vec<JoinHandle<()>>,
}

/// Workers of a closed generation, still to be joined.
#[derive(Debug)]
#[must_use = "retired workers must be joined"]
pub(crate) struct Retired {
    generation: u64,
    handles: Vec<JoinHandle<()>>,
}

impl Retired {
    /// Waits for every retired worker except the calling thread.
    /// Must not be called while holding the pool lock.
    pub(crate) fn join(self) -> usize {
        let count = self.handles.len();
        if count == 0 {
            return 0;
        }
        let me = thread::current().id();
        for handle in self.handles {
            // A transfer that stops its own pool cannot wait for itself.
            if handle.thread().id() == me {
                continue;
            }
            if handle.join().is_err() {
                tracing::warn!(generation = self.generation, "dispatcher thread panicked");
            }
        }
        tracing::info!(generation = self.generation, dispatchers = count, "dispatcher pool stopped");
        count
    }
}

/// A failed spawn: the error plus the workers that did start, already retired.
pub(crate) struct SpawnFailure {
    pub(crate) error: QueueError,
    pub(crate) retired: Retired,
}

impl DispatcherPool {
    pub(crate) fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            generation: STOPPED,
            active: Arc::new(AtomicU64::new(STOPPED)),
            workers: Vec::new(),
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Generation of the most recent start (0 before the first start).
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    pub(crate) fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Closes the live generation and takes its workers out of the pool.
    /// Cheap; the caller joins the result after releasing the lock.
    pub(crate) fn retire(&mut self, shared: &Shared) -> Retired {
        self.active.store(STOPPED, Ordering::Release);
        if !self.workers.is_empty() {
            shared.queue.wake_all();
        }
        Retired {
            generation: self.generation,
            handles: std::mem::take(&mut self.workers),
        }
    }

    /// Spawns a new generation unless one is already live (another caller
    /// won a concurrent start), in which case that generation is kept.
    pub(crate) fn spawn(&mut self, shared: &Arc<Shared>) -> Result<u64, SpawnFailure> {
        if !self.workers.is_empty() {
            return Ok(self.generation);
        }

        self.generation += 1;
        let generation = self.generation;
        self.active.store(generation, Ordering::Release);

        for index in 0..self.size {
            let shared_w = Arc::clone(shared);
            let active = Arc::clone(&self.active);
            let spawned = thread::Builder::new()
                .name(format!("sdm-dispatch-{}-{}", generation, index))
                .spawn(move || worker::run(&shared_w, &active, generation, index));
            match spawned {
                Ok(handle) => self.workers.push(handle),
                Err(source) => {
                    return Err(SpawnFailure {
                        error: QueueError::Spawn {
                            generation,
                            index,
                            source,
                        },
                        retired: self.retire(shared),
                    });
                }
            }
        }

        tracing::info!(generation, dispatchers = self.size, "dispatcher pool started");
        Ok(generation)
    }
}
