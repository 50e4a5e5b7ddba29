//! Blocking priority queue of requests.
//!
//! A binary heap guarded by a mutex, with a condvar to park dispatchers while
//! the queue is empty. Ordering is (priority ascending, id ascending): the
//! numerically smallest priority is dispatched first, and equal priorities
//! come out in submission order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::request::Request;

/// Heap entry. `BinaryHeap` is a max-heap, so `Ord` is reversed on the
/// (priority, id) key to pop the smallest key first.
#[derive(Debug)]
struct Entry(Arc<Request>);

impl Entry {
    fn key(&self) -> (crate::request::Priority, crate::request::RequestId) {
        (self.0.priority(), self.0.id())
    }
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// Thread-safe ordering queue. Needs no external lock.
#[derive(Debug, Default)]
pub struct OrderingQueue {
    heap: Mutex<BinaryHeap<Entry>>,
    available: Condvar,
}

impl OrderingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BinaryHeap<Entry>> {
        self.heap.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts a request and wakes one waiting dispatcher.
    pub fn push(&self, request: Arc<Request>) {
        self.lock().push(Entry(request));
        self.available.notify_one();
    }

    /// Blocks until a request is available and returns the best one.
    pub fn pop(&self) -> Arc<Request> {
        let mut heap = self.lock();
        loop {
            if let Some(Entry(r)) = heap.pop() {
                return r;
            }
            heap = self
                .available
                .wait(heap)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Like `pop`, but gives up and returns `None` once `keep_running` reads
    /// false. `keep_running` is re-checked every time the waiter is woken, so
    /// whoever flips it must call `wake_all` afterwards.
    pub fn pop_while(&self, keep_running: impl Fn() -> bool) -> Option<Arc<Request>> {
        let mut heap = self.lock();
        loop {
            if !keep_running() {
                return None;
            }
            if let Some(Entry(r)) = heap.pop() {
                return Some(r);
            }
            heap = self
                .available
                .wait(heap)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    pub fn try_pop(&self) -> Option<Arc<Request>> {
        self.lock().pop().map(|Entry(r)| r)
    }

    /// Wakes every blocked `pop_while` so it re-checks its predicate.
    /// Takes the lock first so a waiter between its check and its wait
    /// cannot miss the notification.
    pub fn wake_all(&self) {
        let _heap = self.lock();
        self.available.notify_all();
    }

    /// Removes every queued request, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut heap = self.lock();
        let n = heap.len();
        heap.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
