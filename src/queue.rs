use crate::error::Result;
use crate::hooks;
use crate::protocol::{FusionMode, FusionRequest, QueueSubscription, Subscription};
use crate::signal::Context;
use crossbeam::queue::ArrayQueue;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

/// How a fused queue handles an offer when it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Hand the value back to the producer.
    Reject,
    /// Evict the oldest queued value, diverting it through the dropped-next
    /// hook family, and accept the new one.
    DropOldest,
}

/// A lock-free pollable queue shared between adjacent fused stages.
#[derive(Debug)]
pub struct FusedQueue<T: Send> {
    queue: Arc<ArrayQueue<T>>,
    policy: OverflowPolicy,
    dropped_count: Arc<AtomicU64>,
    context: Context,
}

impl<T: Send> Clone for FusedQueue<T> {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
            policy: self.policy,
            dropped_count: Arc::clone(&self.dropped_count),
            context: self.context.clone(),
        }
    }
}

impl<T: Send + 'static> FusedQueue<T> {
    /// Create a queue with the given capacity and overflow policy.
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            queue: Arc::new(ArrayQueue::new(capacity)),
            policy,
            dropped_count: Arc::new(AtomicU64::new(0)),
            context: Context::new(),
        }
    }

    /// Attach a diagnostic context surfaced on drop diversions.
    pub fn with_context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Offer a value. Returns the value back when the queue is full under
    /// the [`OverflowPolicy::Reject`] policy.
    pub fn push(&self, item: T) -> std::result::Result<(), T> {
        match self.queue.push(item) {
            Ok(()) => Ok(()),
            Err(item) => match self.policy {
                OverflowPolicy::Reject => Err(item),
                OverflowPolicy::DropOldest => {
                    if let Some(evicted) = self.queue.pop() {
                        self.dropped_count.fetch_add(1, Ordering::Relaxed);
                        let any: &(dyn Any + Send) = &evicted;
                        if let Err(e) = hooks::next_dropped(any, &self.context) {
                            tracing::warn!(error = %e, "dropped-next hook failed on queue eviction");
                        }
                    }
                    // A concurrent consumer may have raced the eviction; the
                    // slot it freed serves the same purpose.
                    self.queue.push(item)
                }
            },
        }
    }

    /// Pull the next value.
    pub fn pop(&self) -> Option<T> {
        self.queue.pop()
    }

    /// Current number of queued values.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Fixed capacity of the queue.
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Discard all queued values.
    pub fn clear(&self) {
        while self.queue.pop().is_some() {}
    }

    /// Number of values evicted under [`OverflowPolicy::DropOldest`].
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }
}

const GRANT_NONE: u8 = 0;
const GRANT_SYNC: u8 = 1;

/// A pre-filled finite source exposed as a queue subscription.
///
/// Grants synchronous fusion: a downstream that negotiates `Sync` drains the
/// queue via `poll` and treats the empty marker as completion.
pub struct QueueSource<T: Send> {
    queue: FusedQueue<T>,
    granted: AtomicU8,
    cancelled: AtomicBool,
}

impl<T: Send + 'static> QueueSource<T> {
    /// Build a source holding exactly `items`.
    pub fn from_vec(items: Vec<T>) -> Arc<Self> {
        let queue = FusedQueue::new(items.len().max(1), OverflowPolicy::Reject);
        for item in items {
            // Capacity covers the initial fill by construction.
            let _ = queue.push(item);
        }
        Arc::new(Self {
            queue,
            granted: AtomicU8::new(GRANT_NONE),
            cancelled: AtomicBool::new(false),
        })
    }

    /// Whether the source was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl<T: Send + 'static> Subscription for QueueSource<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            tracing::warn!("non-positive demand requested from queue source");
        }
        // Demand accounting is bypassed once fusion is granted; a downstream
        // that declines fusion drains via poll as well.
    }

    fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            self.queue.clear();
        }
    }
}

impl<T: Send + 'static> QueueSubscription<T> for QueueSource<T> {
    fn request_fusion(&self, request: FusionRequest) -> FusionMode {
        if request.mode.allows_sync() {
            self.granted.store(GRANT_SYNC, Ordering::Release);
            FusionMode::Sync
        } else {
            FusionMode::None
        }
    }

    fn poll(&self) -> Result<Option<T>> {
        if self.cancelled.load(Ordering::Acquire) {
            return Ok(None);
        }
        Ok(self.queue.pop())
    }

    fn len(&self) -> usize {
        self.queue.len()
    }

    fn clear(&self) {
        self.queue.clear();
    }
}
