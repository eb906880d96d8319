//! Bounded hand-off between submission and the dispatcher.
//!
//! Entries are job ids, never job bodies. A full queue evicts its oldest
//! entry instead of making the producer wait.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use uuid::Uuid;

/// Default number of entries held before the oldest is dropped.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Handle to a job waiting for processing. The job body stays in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueueEntry {
    pub job_id: Uuid,
}

impl From<Uuid> for QueueEntry {
    fn from(job_id: Uuid) -> Self {
        Self { job_id }
    }
}

/// What happened to an entry handed to [`JobQueue::enqueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted,
    /// Accepted after evicting the longest-waiting entry.
    DroppedOldest(QueueEntry),
    /// The queue is closed; the entry was discarded.
    Closed,
}

struct Inner {
    entries: VecDeque<QueueEntry>,
    closed: bool,
}

/// Bounded in-memory job queue with drop-oldest overflow.
///
/// Producers never wait: a full queue evicts its oldest entry to make room.
/// Consumers wait in [`dequeue`](Self::dequeue) until an entry arrives or the
/// queue is closed and drained.
pub struct JobQueue {
    inner: Mutex<Inner>,
    available: Notify,
    capacity: usize,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Notify::new(),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Critical sections only touch the deque; a poisoned guard is still consistent.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a job handle without waiting.
    pub fn enqueue(&self, entry: QueueEntry) -> Admission {
        let admission = {
            let mut inner = self.lock();
            if inner.closed {
                return Admission::Closed;
            }

            let dropped = if inner.entries.len() >= self.capacity {
                inner.entries.pop_front()
            } else {
                None
            };
            inner.entries.push_back(entry);
            metrics::gauge!("tracking_queue_depth").set(inner.entries.len() as f64);

            match dropped {
                Some(old) => Admission::DroppedOldest(old),
                None => Admission::Accepted,
            }
        };

        if let Admission::DroppedOldest(old) = admission {
            metrics::counter!("tracking_queue_dropped_total").increment(1);
            tracing::warn!(
                dropped_job_id = %old.job_id,
                job_id = %entry.job_id,
                capacity = self.capacity,
                "Job queue full, dropped oldest entry"
            );
        }

        self.available.notify_one();
        admission
    }

    /// Wait for the next entry. Returns `None` once the queue is closed and empty.
    pub async fn dequeue(&self) -> Option<QueueEntry> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut inner = self.lock();
                if let Some(entry) = inner.entries.pop_front() {
                    metrics::gauge!("tracking_queue_depth").set(inner.entries.len() as f64);
                    if !inner.entries.is_empty() {
                        self.available.notify_one();
                    }
                    return Some(entry);
                }
                if inner.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Stop admitting entries. Queued entries are still delivered.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Current number of queued entries.
    pub fn depth(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
