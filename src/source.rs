//! A finite in-memory source driving a stage chain through demand
//! accounting.
//!
//! Delivery runs through a work-in-progress counter so that demand arriving
//! from any thread, including from inside a delivery, folds into the single
//! active drain instead of re-entering it.

use crate::protocol::{Downstream, Subscription, Upstream};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// A source emitting a fixed set of values on demand.
pub struct VecSource<T> {
    items: Vec<T>,
}

impl<T: Send + 'static> VecSource<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Attach `downstream` and serve its demand until exhaustion,
    /// cancellation, or a fatal escalation out of the consumer.
    pub fn subscribe(self, downstream: Downstream<T>) {
        let state = Arc::new(DrainState {
            items: Mutex::new(VecDeque::from(self.items)),
            downstream: Mutex::new(downstream),
            requested: AtomicU64::new(0),
            wip: AtomicU64::new(1),
            cancelled: AtomicBool::new(false),
            done: AtomicBool::new(false),
        });
        // The pre-set wip defers any demand requested during the handshake
        // into the owner loop below, keeping delivery off the handshake's
        // own call stack.
        state
            .downstream
            .lock()
            .on_subscribe(Upstream::Demand(Arc::clone(&state) as Arc<dyn Subscription>));
        state.run_owner_loop(1);
    }
}

struct DrainState<T> {
    items: Mutex<VecDeque<T>>,
    downstream: Mutex<Downstream<T>>,
    requested: AtomicU64,
    wip: AtomicU64,
    cancelled: AtomicBool,
    done: AtomicBool,
}

impl<T: Send + 'static> DrainState<T> {
    fn drain(&self) {
        if self.wip.fetch_add(1, Ordering::AcqRel) != 0 {
            return;
        }
        self.run_owner_loop(1);
    }

    fn run_owner_loop(&self, mut missed: u64) {
        loop {
            self.deliver();
            let now = self.wip.fetch_sub(missed, Ordering::AcqRel) - missed;
            if now == 0 {
                break;
            }
            missed = now;
        }
    }

    fn deliver(&self) {
        if self.done.load(Ordering::Acquire) {
            return;
        }
        loop {
            if self.cancelled.load(Ordering::Acquire) {
                self.items.lock().clear();
                return;
            }
            if self.requested.load(Ordering::Acquire) == 0 {
                // An exhausted source completes without waiting for demand.
                if self.items.lock().is_empty() {
                    self.complete();
                }
                return;
            }
            let item = self.items.lock().pop_front();
            match item {
                None => {
                    self.complete();
                    return;
                }
                Some(value) => {
                    self.requested.fetch_sub(1, Ordering::AcqRel);
                    if let Err(e) = self.downstream.lock().on_next(value) {
                        tracing::error!(error = %e, "fatal escalation from downstream, stopping source");
                        self.cancelled.store(true, Ordering::Release);
                        return;
                    }
                }
            }
        }
    }

    fn complete(&self) {
        if self.done.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Err(e) = self.downstream.lock().on_complete() {
            tracing::error!(error = %e, "fatal escalation from completion");
        }
    }
}

impl<T: Send + 'static> Subscription for DrainState<T> {
    fn request(&self, n: u64) {
        if n == 0 {
            tracing::warn!("non-positive demand requested from vec source");
            return;
        }
        let mut current = self.requested.load(Ordering::Relaxed);
        loop {
            let next = current.saturating_add(n);
            match self.requested.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
        self.drain();
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FlowError, Result};
    use crate::protocol::Subscriber;
    use std::sync::atomic::AtomicUsize;

    struct Consumer {
        demand: u64,
        upstream: Arc<Mutex<Option<Upstream<u32>>>>,
        values: Arc<Mutex<Vec<u32>>>,
        completions: Arc<AtomicUsize>,
    }

    impl Subscriber<u32> for Consumer {
        fn on_subscribe(&mut self, upstream: Upstream<u32>) {
            upstream.request(self.demand);
            *self.upstream.lock() = Some(upstream);
        }

        fn on_next(&mut self, value: u32) -> Result<()> {
            self.values.lock().push(value);
            Ok(())
        }

        fn on_error(&mut self, _error: FlowError) -> Result<()> {
            Ok(())
        }

        fn on_complete(&mut self) -> Result<()> {
            self.completions.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn consumer(
        demand: u64,
    ) -> (
        Consumer,
        Arc<Mutex<Option<Upstream<u32>>>>,
        Arc<Mutex<Vec<u32>>>,
        Arc<AtomicUsize>,
    ) {
        let upstream = Arc::new(Mutex::new(None));
        let values = Arc::new(Mutex::new(Vec::new()));
        let completions = Arc::new(AtomicUsize::new(0));
        (
            Consumer {
                demand,
                upstream: Arc::clone(&upstream),
                values: Arc::clone(&values),
                completions: Arc::clone(&completions),
            },
            upstream,
            values,
            completions,
        )
    }

    #[test]
    fn test_unbounded_demand_drains_everything() {
        let (c, _, values, completions) = consumer(u64::MAX);
        VecSource::new(vec![1, 2, 3]).subscribe(Downstream::plain(c));
        assert_eq!(*values.lock(), vec![1, 2, 3]);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_bounded_demand_pauses_and_resumes() {
        let (c, upstream, values, completions) = consumer(2);
        VecSource::new(vec![1, 2, 3, 4]).subscribe(Downstream::plain(c));
        assert_eq!(*values.lock(), vec![1, 2]);
        assert_eq!(completions.load(Ordering::SeqCst), 0);

        if let Some(up) = upstream.lock().as_ref() {
            up.request(10);
        }
        assert_eq!(*values.lock(), vec![1, 2, 3, 4]);
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_source_completes_without_demand() {
        let (c, _, values, completions) = consumer(0);
        VecSource::<u32>::new(vec![]).subscribe(Downstream::plain(c));
        assert!(values.lock().is_empty());
        assert_eq!(completions.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cancel_stops_delivery() {
        let (c, upstream, values, completions) = consumer(1);
        VecSource::new(vec![1, 2, 3]).subscribe(Downstream::plain(c));
        assert_eq!(*values.lock(), vec![1]);

        let guard = upstream.lock();
        let up = guard.as_ref().cloned();
        drop(guard);
        if let Some(up) = up {
            up.cancel();
            up.request(10);
        }
        assert_eq!(*values.lock(), vec![1]);
        assert_eq!(completions.load(Ordering::SeqCst), 0);
    }
}
