use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parallelogram_core::Request;
use tokio::sync::Mutex;

/// A received request tagged with the address it arrived from, so the
/// processor loop knows where to send the response.
pub struct QueuedRequest {
    pub from: SocketAddr,
    pub request: Request,
}

/// FIFO queue of accepted-but-not-yet-processed chunks. Single producer
/// (the acceptor, one push per accepted connection), single consumer (the
/// processor loop) — logically MPMC only in that the acceptor spawns a
/// short-lived task per connection to do the push, per §5.
///
/// The queue's current length doubles as this worker's self-reported
/// "load" for the discovery responder (§4.5): busier workers have more
/// queued work, so length is monotone in "busier is larger".
#[derive(Clone)]
pub struct ChunkQueue {
    inner: Arc<Mutex<VecDeque<QueuedRequest>>>,
    // Mirrors `inner`'s length so the discovery responder's `load_fn` (§4.5)
    // can read it synchronously without awaiting the queue's own mutex from
    // inside a `tokio::select!` branch it doesn't otherwise need.
    len: Arc<AtomicUsize>,
}

impl ChunkQueue {
    pub fn new() -> Self {
        ChunkQueue {
            inner: Arc::new(Mutex::new(VecDeque::new())),
            len: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn push(&self, item: QueuedRequest) {
        self.inner.lock().await.push_back(item);
        self.len.fetch_add(1, Ordering::SeqCst);
    }

    pub async fn pop(&self) -> Option<QueuedRequest> {
        let item = self.inner.lock().await.pop_front();
        if item.is_some() {
            self.len.fetch_sub(1, Ordering::SeqCst);
        }
        item
    }

    /// Current queue depth, read without locking — this worker's load.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::SeqCst)
    }
}

impl Default for ChunkQueue {
    fn default() -> Self {
        Self::new()
    }
}
