//! Test transfers: one that records dispatch order, one that blocks until released.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex, OnceLock, Weak};
use std::thread;
use std::time::Duration;

use sdm_core::{QueueManager, Request, RequestId, Transfer, TransferError};

/// Records (id, cancel flag at start) for every request it runs, in order.
#[derive(Default)]
pub struct Recorder {
    pub seen: Mutex<Vec<(RequestId, bool)>>,
}

impl Recorder {
    pub fn order(&self) -> Vec<RequestId> {
        self.seen.lock().unwrap().iter().map(|(id, _)| *id).collect()
    }

    pub fn saw_cancel(&self, id: RequestId) -> Option<bool> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .find(|(seen, _)| *seen == id)
            .map(|(_, flag)| *flag)
    }
}

impl Transfer for Recorder {
    fn run(&self, request: &Request) -> Result<(), TransferError> {
        let cancelled = request.is_cancel_requested();
        self.seen.lock().unwrap().push((request.id(), cancelled));
        if cancelled {
            return Err(TransferError::Aborted);
        }
        Ok(())
    }
}

/// Blocks each transfer until `release` is called or the request is cancelled,
/// polling the flag every few milliseconds. Announces each start on `started`.
pub struct Gate {
    honor_cancel: bool,
    released: AtomicBool,
    running: AtomicUsize,
    started: Mutex<mpsc::Sender<RequestId>>,
}

impl Gate {
    pub fn new() -> (Arc<Self>, mpsc::Receiver<RequestId>) {
        Self::build(true)
    }

    /// A gate whose transfers never look at the cancel flag and only end on `release`.
    pub fn ignoring_cancel() -> (Arc<Self>, mpsc::Receiver<RequestId>) {
        Self::build(false)
    }

    fn build(honor_cancel: bool) -> (Arc<Self>, mpsc::Receiver<RequestId>) {
        let (tx, rx) = mpsc::channel();
        let gate = Arc::new(Self {
            honor_cancel,
            released: AtomicBool::new(false),
            running: AtomicUsize::new(0),
            started: Mutex::new(tx),
        });
        (gate, rx)
    }

    pub fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }
}

impl Transfer for Gate {
    fn run(&self, request: &Request) -> Result<(), TransferError> {
        self.running.fetch_add(1, Ordering::SeqCst);
        let _ = self.started.lock().unwrap().send(request.id());
        let result = loop {
            if self.honor_cancel && request.is_cancel_requested() {
                break Err(TransferError::Aborted);
            }
            if self.released.load(Ordering::SeqCst) {
                break Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        };
        self.running.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Stops its own manager from inside the transfer, after a short delay.
pub struct SelfStopper {
    manager: OnceLock<Weak<QueueManager>>,
    started: Mutex<mpsc::Sender<RequestId>>,
    delay: Duration,
}

impl SelfStopper {
    pub fn new(delay: Duration) -> (Arc<Self>, mpsc::Receiver<RequestId>) {
        let (tx, rx) = mpsc::channel();
        let stopper = Arc::new(Self {
            manager: OnceLock::new(),
            started: Mutex::new(tx),
            delay,
        });
        (stopper, rx)
    }

    pub fn attach(&self, manager: &Arc<QueueManager>) {
        let _ = self.manager.set(Arc::downgrade(manager));
    }
}

impl Transfer for SelfStopper {
    fn run(&self, request: &Request) -> Result<(), TransferError> {
        let _ = self.started.lock().unwrap().send(request.id());
        thread::sleep(self.delay);
        if let Some(m) = self.manager.get().and_then(Weak::upgrade) {
            m.stop();
        }
        Ok(())
    }
}
