//! Backend request stream shared by the channel forwarders.
//!
//! All forwarders push into one queue, and a single writer (the responder's
//! transport task) drains it. The receiving half is shared so a re-opened
//! backend stream keeps draining the same queue after a failure. A request
//! the writer took but could not deliver goes back to the front, ahead of
//! anything still in the channel.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};

use tokio::sync::{Mutex, Notify, mpsc};

use super::types::{Blob, Content, LiveRequest};

/// Returned when pushing into a queue that was already closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("live request queue closed")]
pub struct QueueClosed;

/// Multi-producer request queue with a shared, re-attachable consumer.
#[derive(Clone)]
pub struct LiveRequestQueue {
    tx: mpsc::UnboundedSender<LiveRequest>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<LiveRequest>>>,
    pending: Arc<std::sync::Mutex<VecDeque<LiveRequest>>>,
    requeued: Arc<Notify>,
    closed: Arc<AtomicBool>,
}

impl LiveRequestQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            pending: Arc::new(std::sync::Mutex::new(VecDeque::new())),
            requeued: Arc::new(Notify::new()),
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Queue a realtime media blob.
    pub fn send_realtime(&self, blob: Blob) -> Result<(), QueueClosed> {
        self.push(LiveRequest::Realtime(blob))
    }

    /// Queue a structured user turn.
    pub fn send_content(&self, content: Content) -> Result<(), QueueClosed> {
        self.push(LiveRequest::Content(content))
    }

    /// Push the close sentinel. Later sends fail with [`QueueClosed`].
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            let _ = self.tx.send(LiveRequest::Close);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wait for the next request.
    ///
    /// Only one consumer receives at a time; a second caller waits for the
    /// first to release the receiver.
    pub async fn recv(&self) -> Option<LiveRequest> {
        let mut rx = self.rx.lock().await;
        loop {
            let requeued = self.requeued.notified();
            if let Some(request) = self.take_pending() {
                return Some(request);
            }
            tokio::select! {
                request = rx.recv() => return request,
                () = requeued => {}
            }
        }
    }

    /// Put back a request that was received but never delivered. It is
    /// returned by the next [`recv`](Self::recv) ahead of queued requests.
    pub fn requeue_front(&self, request: LiveRequest) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_front(request);
        self.requeued.notify_waiters();
    }

    /// Take a request for delivery. Dropping the returned guard without
    /// calling [`Unacked::ack`] requeues it.
    pub async fn recv_unacked(&self) -> Option<Unacked> {
        let request = self.recv().await?;
        Some(Unacked {
            queue: self.clone(),
            request,
            acked: false,
        })
    }

    fn take_pending(&self) -> Option<LiveRequest> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn push(&self, request: LiveRequest) -> Result<(), QueueClosed> {
        if self.is_closed() {
            return Err(QueueClosed);
        }
        self.tx.send(request).map_err(|_| QueueClosed)
    }
}

/// A request taken off the queue but not yet written to the backend.
pub struct Unacked {
    queue: LiveRequestQueue,
    request: LiveRequest,
    acked: bool,
}

impl Unacked {
    pub const fn request(&self) -> &LiveRequest {
        &self.request
    }

    /// Mark the request delivered.
    pub fn ack(mut self) {
        self.acked = true;
    }
}

impl Drop for Unacked {
    fn drop(&mut self) {
        if !self.acked {
            let request = std::mem::replace(&mut self.request, LiveRequest::Close);
            self.queue.requeue_front(request);
        }
    }
}

impl Default for LiveRequestQueue {
    fn default() -> Self {
        Self::new()
    }
}
