//! Authoritative set of requests that are queued or in flight.
//!
//! Every read and write goes through one mutex, so cancel, finish, query and
//! bulk clear are fully serialized: when cancel races finish, whichever takes
//! the lock first wins and the other sees the outcome.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::request::{Request, RequestId};

#[derive(Debug, Default)]
pub struct RequestRegistry {
    requests: Mutex<HashMap<RequestId, Arc<Request>>>,
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<RequestId, Arc<Request>>> {
        // Entries are only ever inserted or removed whole; poison carries no torn state.
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add(&self, request: Arc<Request>) {
        self.lock().insert(request.id(), request);
    }

    /// Removes the request. Returns false if it was already gone.
    pub fn remove(&self, id: RequestId) -> bool {
        self.lock().remove(&id).is_some()
    }

    pub fn find(&self, id: RequestId) -> Option<Arc<Request>> {
        self.lock().get(&id).cloned()
    }

    /// Runs `f` on `id` while holding the registry lock. `None` if unknown.
    pub fn with<T>(&self, id: RequestId, f: impl FnOnce(&Request) -> T) -> Option<T> {
        self.lock().get(&id).map(|r| f(r.as_ref()))
    }

    /// Visits every tracked request under the lock, in no particular order.
    pub fn for_each(&self, mut f: impl FnMut(&Arc<Request>)) {
        for r in self.lock().values() {
            f(r);
        }
    }

    /// Drops every entry, returning how many were tracked.
    pub fn clear(&self) -> usize {
        let mut map = self.lock();
        let n = map.len();
        map.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
